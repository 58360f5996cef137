//! Snapshots of the remote allow-list taken before mutations.
//!
//! Backups are write-only from this tool's point of view: they exist for
//! manual recovery and are never read back.

use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::address::AllowList;
use crate::error::AllowsyncError;

/// `backup-<account>-<YYYYMMDD-HHmmss>.txt`
pub fn backup_file_name(account: &str, at: DateTime<Local>) -> String {
    format!("backup-{}-{}.txt", account, at.format("%Y%m%d-%H%M%S"))
}

/// Write `rules` (one address per line, sorted) to a new file in `dir`.
///
/// The file is created with create-new semantics: an existing backup with
/// the same name is never overwritten.
pub fn write_backup(
    dir: &Path,
    account: &str,
    rules: &AllowList,
    at: DateTime<Local>,
) -> Result<PathBuf, AllowsyncError> {
    let path = dir.join(backup_file_name(account, at));
    let fail = |e: std::io::Error| {
        AllowsyncError::BackupWriteFailed(format!("{}: {}", path.display(), e))
    };

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(fail)?;
    file.write_all(rules.to_lines().as_bytes()).map_err(fail)?;
    file.sync_all().map_err(fail)?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Ipv4Address;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    fn rules(ips: &[&str]) -> AllowList {
        ips.iter().map(|s| Ipv4Address::parse(s).unwrap()).collect()
    }

    #[test]
    fn test_backup_file_name() {
        assert_eq!(
            backup_file_name("stdemo01", fixed_time()),
            "backup-stdemo01-20260314-092653.txt"
        );
    }

    #[test]
    fn test_write_backup_content_sorted() {
        let dir = TempDir::new().unwrap();
        let path = write_backup(
            dir.path(),
            "stdemo01",
            &rules(&["2.2.2.2", "10.0.0.1", "1.1.1.1"]),
            fixed_time(),
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1.1.1.1\n10.0.0.1\n2.2.2.2\n");
    }

    #[test]
    fn test_write_backup_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let first = rules(&["1.1.1.1"]);
        let path = write_backup(dir.path(), "stdemo01", &first, fixed_time()).unwrap();

        let second = write_backup(dir.path(), "stdemo01", &rules(&["9.9.9.9"]), fixed_time());
        assert!(matches!(second, Err(AllowsyncError::BackupWriteFailed(_))));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "1.1.1.1\n");
    }

    #[test]
    fn test_write_backup_missing_dir() {
        let dir = TempDir::new().unwrap();
        let result = write_backup(
            &dir.path().join("nope"),
            "stdemo01",
            &rules(&["1.1.1.1"]),
            fixed_time(),
        );
        assert!(matches!(result, Err(AllowsyncError::BackupWriteFailed(_))));
    }
}
