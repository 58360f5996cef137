//! Integration tests for allowsync.
//!
//! These run the compiled binary. Firewall tests point `az_path` at a small
//! shell script that keeps the rule list in a text file, so they need a
//! POSIX shell but no Azure subscription.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the compiled binary
fn get_binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    path.pop(); // Remove deps directory
    path.push("allowsync");
    path
}

/// Run allowsync with the given arguments and environment
fn run_allowsync(args: &[&str], env: &[(&str, &Path)]) -> Output {
    let mut cmd = Command::new(get_binary_path());
    cmd.args(args);
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.output().expect("Failed to execute allowsync")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_version_command() {
    let output = run_allowsync(&["version"], &[]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("allowsync"));
}

#[test]
fn test_help_command() {
    let output = run_allowsync(&["--help"], &[]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("sync"));
    assert!(text.contains("wipe"));
    assert!(text.contains("access"));
}

#[test]
fn test_validate_reports_rejected_lines() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("ips.txt");
    std::fs::write(&file, "# office\n203.0.113.7\n256.1.1.1\nnot-an-ip\n\n198.51.100.2\n").unwrap();

    let output = run_allowsync(&["validate", file.to_str().unwrap()], &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("line 3: '256.1.1.1'"));
    assert!(text.contains("line 4: 'not-an-ip'"));
    assert!(text.contains("Desired addresses (2 entries)"));
    assert!(text.contains("198.51.100.2"));
}

#[test]
fn test_validate_empty_file_fails() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("ips.txt");
    std::fs::write(&file, "# nothing here\n\n").unwrap();

    let output = run_allowsync(&["validate", file.to_str().unwrap()], &[]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Desired state is empty"));
}

#[test]
fn test_sync_without_account_fails() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("ips.txt");
    std::fs::write(&file, "203.0.113.7\n").unwrap();
    let config = dir.path().join("missing.yaml");

    let output = run_allowsync(
        &[
            "sync",
            "--file",
            file.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ],
        &[],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("No storage account given"));
}

#[test]
fn test_wipe_requires_confirmation() {
    let output = run_allowsync(&["wipe", "-a", "stdemo01", "-g", "rg-demo"], &[]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--yes"));
}

#[test]
fn test_flag_toggle_persists() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("allowsync.yaml");
    std::fs::write(&config, "flags:\n  private_dns_zone: true\n").unwrap();
    let config_arg = config.to_str().unwrap();

    let output = run_allowsync(&["flag", "toggle", "private_dns_zone", "-c", config_arg], &[]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("private_dns_zone = false"));

    let output = run_allowsync(&["flag", "list", "-c", config_arg], &[]);
    assert!(stdout(&output).contains("false"));

    let output = run_allowsync(&["flag", "toggle", "unknown_flag", "-c", config_arg], &[]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Flag 'unknown_flag' not found"));
}

#[test]
fn test_flag_toggle_env_file() {
    let dir = TempDir::new().unwrap();
    let env_file = dir.path().join("deploy.env");
    std::fs::write(&env_file, "LOCATION=\"westeurope\"\nUSE_PRIVATE_DNS=\"true\"\n").unwrap();

    let output = run_allowsync(
        &[
            "flag",
            "toggle",
            "USE_PRIVATE_DNS",
            "--env-file",
            env_file.to_str().unwrap(),
        ],
        &[],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        std::fs::read_to_string(&env_file).unwrap(),
        "LOCATION=\"westeurope\"\nUSE_PRIVATE_DNS=\"false\"\n"
    );
}

#[cfg(unix)]
mod fake_az {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Stand-in for the Azure CLI. Rules live in `$FAKE_AZ_STATE`; every
    /// call is appended to `$FAKE_AZ_LOG`; a mutation of `$FAKE_AZ_FAIL` fails.
    const SCRIPT: &str = r#"#!/bin/sh
echo "$*" >> "$FAKE_AZ_LOG"
case "$1" in
  --version) echo "azure-cli 2.60.0"; exit 0 ;;
  account) exit 0 ;;
esac
if [ "$3" != "network-rule" ]; then
  echo "stdemo01"
  exit 0
fi
action="$4"
ip=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--ip-address" ]; then ip="$2"; fi
  shift
done
if [ -n "$ip" ] && [ "$ip" = "$FAKE_AZ_FAIL" ]; then
  echo "ERROR: (AuthorizationFailed) denied" >&2
  exit 1
fi
case "$action" in
  list) cat "$FAKE_AZ_STATE" ;;
  add) echo "$ip" >> "$FAKE_AZ_STATE" ;;
  remove)
    grep -v -x -F "$ip" "$FAKE_AZ_STATE" > "$FAKE_AZ_STATE.tmp"
    mv "$FAKE_AZ_STATE.tmp" "$FAKE_AZ_STATE"
    ;;
esac
exit 0
"#;

    struct Fixture {
        dir: TempDir,
        config: PathBuf,
        state: PathBuf,
        log: PathBuf,
        backups: PathBuf,
    }

    impl Fixture {
        fn new(rules: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let script = dir.path().join("fake-az");
            std::fs::write(&script, SCRIPT).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

            let state = dir.path().join("rules.txt");
            std::fs::write(&state, rules).unwrap();
            let log = dir.path().join("calls.log");
            let backups = dir.path().join("backups");
            std::fs::create_dir(&backups).unwrap();

            let config = dir.path().join("allowsync.yaml");
            std::fs::write(
                &config,
                format!(
                    "account: stdemo01\nresource_group: rg-demo\naz_path: {}\n",
                    script.display()
                ),
            )
            .unwrap();

            Self {
                dir,
                config,
                state,
                log,
                backups,
            }
        }

        fn desired(&self, content: &str) -> PathBuf {
            let path = self.dir.path().join("desired.txt");
            std::fs::write(&path, content).unwrap();
            path
        }

        fn run(&self, args: &[&str], fail_on: Option<&Path>) -> Output {
            let mut full = args.to_vec();
            full.extend(["--config", self.config.to_str().unwrap()]);
            let mut env = vec![("FAKE_AZ_STATE", self.state.as_path()), ("FAKE_AZ_LOG", self.log.as_path())];
            if let Some(ip) = fail_on {
                env.push(("FAKE_AZ_FAIL", ip));
            }
            run_allowsync(&full, &env)
        }

        fn rules(&self) -> Vec<String> {
            let mut rules: Vec<String> = std::fs::read_to_string(&self.state)
                .unwrap()
                .lines()
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect();
            rules.sort();
            rules
        }

        fn calls(&self) -> Vec<String> {
            std::fs::read_to_string(&self.log)
                .unwrap_or_default()
                .lines()
                .map(String::from)
                .collect()
        }

        fn backup_files(&self) -> Vec<PathBuf> {
            std::fs::read_dir(&self.backups)
                .unwrap()
                .map(|e| e.unwrap().path())
                .collect()
        }
    }

    #[test]
    fn test_sync_replace_converges_with_backup() {
        let fx = Fixture::new("1.1.1.1\n2.2.2.2\n");
        let desired = fx.desired("2.2.2.2\n3.3.3.3\n");

        let output = fx.run(
            &[
                "sync",
                "--file",
                desired.to_str().unwrap(),
                "--mode",
                "replace",
                "--backup-dir",
                fx.backups.to_str().unwrap(),
            ],
            None,
        );
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(fx.rules(), vec!["2.2.2.2", "3.3.3.3"]);

        let text = stdout(&output);
        assert!(text.contains("Added:           1"));
        assert!(text.contains("Removed:         1"));
        assert!(text.contains("Already present: 1"));

        let backups = fx.backup_files();
        assert_eq!(backups.len(), 1);
        assert_eq!(std::fs::read_to_string(&backups[0]).unwrap(), "1.1.1.1\n2.2.2.2\n");

        // The removal is issued before the addition
        let calls = fx.calls();
        let remove = calls.iter().position(|c| c.contains("network-rule remove")).unwrap();
        let add = calls.iter().position(|c| c.contains("network-rule add")).unwrap();
        assert!(remove < add);
    }

    #[test]
    fn test_sync_merge_keeps_extra_rules() {
        let fx = Fixture::new("1.1.1.1\n");
        let desired = fx.desired("3.3.3.3\n");

        let output = fx.run(&["sync", "--file", desired.to_str().unwrap(), "--no-backup"], None);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(fx.rules(), vec!["1.1.1.1", "3.3.3.3"]);
        assert!(fx.backup_files().is_empty());
    }

    #[test]
    fn test_sync_dry_run_changes_nothing() {
        let fx = Fixture::new("1.1.1.1\n");
        let desired = fx.desired("3.3.3.3\n");

        let output = fx.run(
            &["sync", "--file", desired.to_str().unwrap(), "--mode", "replace", "--dry-run"],
            None,
        );
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(fx.rules(), vec!["1.1.1.1"]);

        let text = stdout(&output);
        assert!(text.contains("- 1.1.1.1"));
        assert!(text.contains("+ 3.3.3.3"));
        assert!(!fx.calls().iter().any(|c| c.contains("network-rule add")));
    }

    #[test]
    fn test_sync_partial_failure_exits_nonzero() {
        let fx = Fixture::new("");
        let desired = fx.desired("3.3.3.3\n4.4.4.4\n5.5.5.5\n");

        let output = fx.run(
            &["sync", "--file", desired.to_str().unwrap(), "--no-backup"],
            Some(Path::new("4.4.4.4")),
        );
        assert!(!output.status.success());
        assert_eq!(fx.rules(), vec!["3.3.3.3", "5.5.5.5"]);
        assert!(stdout(&output).contains("Failed:          1"));
        assert!(stderr(&output).contains("1 of 3 operations failed"));
    }

    #[test]
    fn test_sync_empty_desired_makes_no_calls() {
        let fx = Fixture::new("1.1.1.1\n");
        let desired = fx.desired("garbage\n");

        let output = fx.run(&["sync", "--file", desired.to_str().unwrap(), "--mode", "replace"], None);
        assert!(!output.status.success());
        assert_eq!(fx.rules(), vec!["1.1.1.1"]);
        assert!(fx.calls().is_empty());
    }

    #[test]
    fn test_list_and_wipe() {
        let fx = Fixture::new("1.1.1.1\n10.0.0.0/24\n2.2.2.2\n");

        let output = fx.run(&["list"], None);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let text = stdout(&output);
        assert!(text.contains("(2 entries)"));
        // The range rule is not managed but must not go unnoticed
        assert!(text.contains("left untouched: 10.0.0.0/24"));

        let output = fx.run(&["wipe", "--yes", "--no-backup"], None);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert_eq!(fx.rules(), vec!["10.0.0.0/24"]);
    }
}
