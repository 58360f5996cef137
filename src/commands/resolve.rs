//! Resolve command implementation.

use anyhow::Result;

use crate::config::{is_valid_account_name, Config, PRIVATE_DNS_FLAG};
use crate::dns::{blob_endpoint, classify, resolve_host, resolve_ptr, Reachability, Resolution};

/// Run the resolve command
pub async fn run(ptr: bool, config: &Config) -> Result<()> {
    if !is_valid_account_name(&config.account) {
        anyhow::bail!(
            "No valid storage account given (use --account or set 'account' in the config file)"
        );
    }

    let host = blob_endpoint(&config.account);
    println!();
    println!("Resolving {}", host);

    let addrs = match resolve_host(&host).await {
        Resolution::Addresses(addrs) if !addrs.is_empty() => addrs,
        Resolution::Addresses(_) => anyhow::bail!("{} resolved to no addresses", host),
        Resolution::Failed(e) => anyhow::bail!("Failed to resolve {}: {}", host, e),
        Resolution::TimedOut => anyhow::bail!("Timed out resolving {}", host),
    };

    for ip in &addrs {
        if ptr {
            println!("  {:<40} {:<8} {}", ip, classify(*ip), resolve_ptr(*ip).await);
        } else {
            println!("  {:<40} {}", ip, classify(*ip));
        }
    }
    println!();

    let all_private = addrs.iter().all(|ip| classify(*ip) == Reachability::Private);
    let expect_private = config.flags.get(PRIVATE_DNS_FLAG).copied().unwrap_or(false);

    match (all_private, expect_private) {
        (true, _) => println!("[OK] Traffic to {} uses the private endpoint", config.account),
        (false, true) => println!(
            "[WARN] {} resolves publicly although '{}' is enabled",
            host, PRIVATE_DNS_FLAG
        ),
        (false, false) => println!("[OK] {} resolves to its public endpoint", host),
    }
    Ok(())
}
