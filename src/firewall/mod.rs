//! Storage firewall service abstraction.
//!
//! The reconciler only sees [`FirewallService`]; [`AzureCli`] implements it
//! on top of the `az` command-line tool.

mod azure;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use azure::AzureCli;

use crate::address::{AllowList, Ipv4Address};
use crate::error::AllowsyncError;

/// The (account, resource group) pair every firewall operation targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    pub account: String,
    pub resource_group: String,
}

impl fmt::Display for StorageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (resource group {})", self.account, self.resource_group)
    }
}

/// Whether the account accepts traffic from public networks at all
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum PublicAccess {
    Enabled,
    Disabled,
}

/// Action applied to traffic that matches no rule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum DefaultAction {
    Allow,
    Deny,
}

impl fmt::Display for PublicAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicAccess::Enabled => f.write_str("Enabled"),
            PublicAccess::Disabled => f.write_str("Disabled"),
        }
    }
}

impl fmt::Display for DefaultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultAction::Allow => f.write_str("Allow"),
            DefaultAction::Deny => f.write_str("Deny"),
        }
    }
}

/// Network access settings of a storage account.
///
/// Either field may be absent on accounts created before the setting
/// existed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkAccess {
    pub public_access: Option<PublicAccess>,
    pub default_action: Option<DefaultAction>,
}

/// A partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkAccessUpdate {
    pub public_access: Option<PublicAccess>,
    pub default_action: Option<DefaultAction>,
}

impl NetworkAccessUpdate {
    pub fn is_empty(&self) -> bool {
        self.public_access.is_none() && self.default_action.is_none()
    }
}

/// Operations the storage firewall exposes.
///
/// Calls are blocking and run to completion; there is no timeout beyond
/// whatever the underlying tool applies.
pub trait FirewallService {
    /// Fail fast if the tool is missing, the session is not authenticated,
    /// or the account does not exist.
    fn check_prerequisites(&self, target: &StorageTarget) -> Result<(), AllowsyncError>;

    /// Current allow-list. Malformed entries are dropped, but a failing
    /// call is an error, never an empty list.
    fn list_ip_rules(&self, target: &StorageTarget) -> Result<AllowList, AllowsyncError>;

    fn add_ip_rule(&self, target: &StorageTarget, addr: &Ipv4Address) -> Result<(), AllowsyncError>;

    fn remove_ip_rule(
        &self,
        target: &StorageTarget,
        addr: &Ipv4Address,
    ) -> Result<(), AllowsyncError>;

    fn network_access(&self, target: &StorageTarget) -> Result<NetworkAccess, AllowsyncError>;

    fn set_network_access(
        &self,
        target: &StorageTarget,
        update: NetworkAccessUpdate,
    ) -> Result<(), AllowsyncError>;
}
