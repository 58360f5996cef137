//! CLI command implementations.

pub mod access;
pub mod detect;
pub mod flag;
pub mod list;
pub mod resolve;
pub mod sync;
pub mod validate;
pub mod wipe;

use anyhow::{Context, Result};
use std::path::Path;

use crate::address::{AllowList, ParseReport};
use crate::config::Config;
use crate::firewall::{AzureCli, FirewallService, StorageTarget};
use crate::reconcile::Report;

/// Load the config file (or defaults) and apply `--account` / `--resource-group`
pub fn load_config(
    config_path: &Path,
    account: Option<String>,
    resource_group: Option<String>,
) -> Result<Config> {
    let config = Config::load_or_default(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?
        .with_overrides(account, resource_group);
    config.validate()?;
    Ok(config)
}

/// Resolve the target and make sure the firewall can be reached
pub(crate) fn connect(config: &Config) -> Result<(AzureCli, StorageTarget)> {
    let target = config.target()?;
    let firewall = AzureCli::new(config.az_path.clone());
    firewall.check_prerequisites(&target)?;
    Ok((firewall, target))
}

/// Print every rejected line of a desired-state source
pub(crate) fn print_rejects(report: &ParseReport) {
    for rejected in &report.rejected {
        println!(
            "[SKIP] line {}: '{}' ({})",
            rejected.line, rejected.content, rejected.reason
        );
    }
}

pub(crate) fn print_list(title: &str, list: &AllowList) {
    println!("{} ({} entries):", title, list.len());
    if list.is_empty() {
        println!("  (empty)");
    } else {
        for addr in list {
            println!("  {}", addr);
        }
    }
}

/// Final summary: counts, failures, and the rules as re-read from the firewall
pub(crate) fn print_report(report: &Report) {
    println!();
    println!("Summary:");
    println!("  Added:           {}", report.added());
    println!("  Removed:         {}", report.removed());
    println!("  Already present: {}", report.plan.already_present.len());
    println!("  Failed:          {}", report.failed());
    if let Some(ref path) = report.backup {
        println!("  Backup:          {}", path.display());
    }

    for failure in report.failures() {
        if let Err(ref e) = failure.result {
            println!("[FAIL] {}", e);
        }
    }

    println!();
    match report.final_state {
        Some(ref state) => print_list("Current firewall rules", state),
        None => println!("Current firewall rules: (could not be read back)"),
    }
    println!();
}

/// Turn a report with failures into a non-zero exit
pub(crate) fn ensure_success(report: &Report) -> Result<()> {
    if !report.is_success() {
        anyhow::bail!(
            "{} of {} operations failed",
            report.failed(),
            report.outcomes.len()
        );
    }
    Ok(())
}
