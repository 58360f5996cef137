//! Error types for allowsync.

use std::fmt;
use thiserror::Error;

/// Why a candidate address was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFault {
    /// Not exactly four numeric groups
    Format,
    /// A group's value exceeds 255
    Range,
}

impl fmt::Display for AddressFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFault::Format => f.write_str("invalid format"),
            AddressFault::Range => f.write_str("octet out of range"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AllowsyncError {
    #[error("Invalid IPv4 address '{input}': {reason}")]
    InvalidAddress { input: String, reason: AddressFault },

    #[error("Desired state is empty: no valid addresses to apply")]
    EmptyDesiredState,

    #[error("Public IP detection failed: {0}")]
    IpDetectionFailed(String),

    #[error("Failed to fetch firewall rules: {0}")]
    RemoteFetchFailed(String),

    #[error("Failed to {operation} rule {address}: {cause}")]
    RuleMutationFailed {
        operation: String,
        address: String,
        cause: String,
    },

    #[error("Failed to write backup: {0}")]
    BackupWriteFailed(String),

    #[error("Flag '{0}' not found")]
    ConfigFlagNotFound(String),

    #[error("Prerequisite check failed: {0}")]
    Prerequisite(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
