//! Network access command implementation.

use anyhow::Result;

use crate::cli::AccessAction;
use crate::commands::connect;
use crate::config::Config;
use crate::firewall::{FirewallService, NetworkAccess, NetworkAccessUpdate};

/// Run the access command
pub async fn run(action: AccessAction, config: &Config) -> Result<()> {
    let (firewall, target) = connect(config)?;

    match action {
        AccessAction::Show => {
            let access = firewall.network_access(&target)?;
            print_access(&access);
        }
        AccessAction::Set {
            public_access,
            default_action,
        } => {
            let update = NetworkAccessUpdate {
                public_access,
                default_action,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to change: pass --public-access and/or --default-action");
            }
            firewall.set_network_access(&target, update)?;
            println!("[OK] Network access of {} updated", target.account);
            print_access(&firewall.network_access(&target)?);
        }
    }

    Ok(())
}

fn print_access(access: &NetworkAccess) {
    let unset = || "(not set)".to_string();
    println!();
    println!(
        "Public network access: {}",
        access.public_access.map(|v| v.to_string()).unwrap_or_else(unset)
    );
    println!(
        "Default action:        {}",
        access.default_action.map(|v| v.to_string()).unwrap_or_else(unset)
    );
    println!();
}
