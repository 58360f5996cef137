//! Wipe command implementation.

use anyhow::Result;

use crate::commands::{connect, ensure_success, print_report};
use crate::config::Config;
use crate::reconcile::Reconciler;

/// Run the wipe command
pub async fn run(yes: bool, no_backup: bool, config: &Config) -> Result<()> {
    if !yes {
        anyhow::bail!("Refusing to remove every firewall rule without --yes");
    }

    let (firewall, target) = connect(config)?;

    let mut reconciler = Reconciler::new(&firewall, &target);
    if !no_backup && config.backup.enabled {
        reconciler = reconciler.with_backup(&config.backup.dir);
    }

    let report = reconciler.wipe()?;
    print_report(&report);
    ensure_success(&report)?;

    println!("[OK] All IP rules removed from {}", target.account);
    Ok(())
}
