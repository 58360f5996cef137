//! Sync command implementation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::address::{parse_allowlist, AllowList};
use crate::cli::DesiredSource;
use crate::commands::{connect, ensure_success, print_list, print_rejects, print_report};
use crate::config::{Config, SyncMode};
use crate::detect::IpDetector;
use crate::reconcile::Reconciler;

/// Options of a single sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub mode: Option<SyncMode>,
    pub no_backup: bool,
    pub backup_dir: Option<PathBuf>,
    pub dry_run: bool,
}

/// Run the sync command
pub async fn run(source: DesiredSource, options: SyncOptions, config: &Config) -> Result<()> {
    // Fail on a missing target before doing any network work
    config.target()?;

    let desired = load_desired(&source, config).await?;
    let mode = options.mode.unwrap_or(config.mode);

    let (firewall, target) = connect(config)?;
    println!("[OK] Connected to {}", target);

    let backup_dir: Option<&Path> = if options.no_backup || !config.backup.enabled {
        None
    } else {
        Some(options.backup_dir.as_deref().unwrap_or(&config.backup.dir))
    };

    let mut reconciler = Reconciler::new(&firewall, &target);
    if let Some(dir) = backup_dir {
        reconciler = reconciler.with_backup(dir);
    }

    if options.dry_run {
        let (remote, plan) = reconciler.plan(&desired, mode)?;
        println!();
        print_list("Current firewall rules", &remote);
        println!();
        println!("Plan ({} mode):", mode);
        for addr in &plan.removals {
            println!("  - {}", addr);
        }
        for addr in &plan.additions {
            println!("  + {}", addr);
        }
        if plan.is_noop() {
            println!("  (nothing to do)");
        }
        println!();
        println!("[OK] Dry run, no changes made");
        return Ok(());
    }

    let report = reconciler.reconcile(&desired, mode)?;
    print_report(&report);
    ensure_success(&report)?;

    println!("[OK] Firewall of {} is in sync", target.account);
    Ok(())
}

async fn load_desired(source: &DesiredSource, config: &Config) -> Result<AllowList> {
    if let Some(ref path) = source.file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read desired-state file {:?}", path))?;
        let parsed = parse_allowlist(&content);
        print_rejects(&parsed);
        let desired = parsed.into_desired()?;
        info!("Loaded {} addresses from {:?}", desired.len(), path);
        return Ok(desired);
    }

    let detector = IpDetector::new(&config.ip_detection)?;
    let addr = detector.detect().await?;
    println!("[OK] Public IP: {}", addr);
    Ok(std::iter::once(addr).collect())
}
