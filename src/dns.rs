//! DNS inspection of a storage account endpoint.
//!
//! With a private endpoint and private DNS zone in place, the public blob
//! host name resolves (through a CNAME to `privatelink`) to an address in
//! the virtual network. Resolving it from inside the network therefore
//! tells whether traffic will take the private path.

use std::net::IpAddr;
use std::time::Duration;

/// Default DNS resolution timeout in seconds
const DNS_TIMEOUT_SECS: u64 = 5;

/// Blob service host name for a storage account
pub fn blob_endpoint(account: &str) -> String {
    format!("{}.blob.core.windows.net", account)
}

/// How a resolved address would be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    /// RFC 1918 / unique-local: through the private endpoint
    Private,
    Public,
}

impl std::fmt::Display for Reachability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reachability::Private => f.write_str("private"),
            Reachability::Public => f.write_str("public"),
        }
    }
}

pub fn classify(ip: IpAddr) -> Reachability {
    let private = match ip {
        IpAddr::V4(v4) => v4.is_private(),
        // fc00::/7 unique local
        IpAddr::V6(v6) => (v6.segments()[0] & 0xfe00) == 0xfc00,
    };
    if private {
        Reachability::Private
    } else {
        Reachability::Public
    }
}

/// Outcome of a forward lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Addresses(Vec<IpAddr>),
    Failed(String),
    TimedOut,
}

/// Resolve `host` with the system resolver, bounded by a timeout.
pub async fn resolve_host(host: &str) -> Resolution {
    resolve_host_with_timeout(host, Duration::from_secs(DNS_TIMEOUT_SECS)).await
}

pub async fn resolve_host_with_timeout(host: &str, timeout: Duration) -> Resolution {
    let owned = host.to_string();
    let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_host(&owned));

    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(Ok(mut addrs))) => {
            addrs.sort();
            addrs.dedup();
            Resolution::Addresses(addrs)
        }
        Ok(Ok(Err(e))) => Resolution::Failed(e.to_string()),
        Ok(Err(e)) => Resolution::Failed(format!("lookup task failed: {}", e)),
        Err(_) => Resolution::TimedOut,
    }
}

/// Reverse (PTR) lookup with the same timeout, for display only.
pub async fn resolve_ptr(ip: IpAddr) -> String {
    let dns_future = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip));

    match tokio::time::timeout(Duration::from_secs(DNS_TIMEOUT_SECS), dns_future).await {
        Ok(Ok(Ok(hostname))) => hostname,
        Ok(Ok(Err(_))) => "(no PTR)".to_string(),
        Ok(Err(_)) => "(DNS failed)".to_string(),
        Err(_) => "(DNS timeout)".to_string(),
    }
}
