//! List command implementation.

use anyhow::Result;

use crate::commands::{connect, print_list};
use crate::config::Config;
use crate::firewall::FirewallService;

/// Run the list command
pub async fn run(config: &Config) -> Result<()> {
    let (firewall, target) = connect(config)?;
    let rules = firewall.list_ip_rules(&target)?;

    println!();
    print_list(&format!("Firewall rules of {}", target), &rules);
    println!();
    Ok(())
}
