//! Configuration management for allowsync.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::AllowsyncError;
use crate::firewall::StorageTarget;

/// Default IP echo services, queried in this order
pub const DEFAULT_ECHO_SERVICES: &[&str] = &[
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
    "https://ipinfo.io/ip",
];

/// Per-attempt timeout for echo services
pub const DEFAULT_DETECTION_TIMEOUT_SECS: u64 = 10;

/// Flag toggled by `flag toggle` when deploying with a private DNS zone
pub const PRIVATE_DNS_FLAG: &str = "private_dns_zone";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Storage account whose firewall is managed
    pub account: String,

    /// Resource group containing the account
    pub resource_group: String,

    /// Path or name of the cloud CLI binary
    pub az_path: String,

    /// Default reconciliation mode (merge, replace)
    pub mode: SyncMode,

    /// Backup of the remote allow-list before mutations
    pub backup: BackupConfig,

    /// Public IP detection
    pub ip_detection: IpDetectionConfig,

    /// Deployment feature flags
    pub flags: BTreeMap<String, bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: String::new(),
            resource_group: String::new(),
            az_path: "az".to_string(),
            mode: SyncMode::Merge,
            backup: BackupConfig::default(),
            ip_detection: IpDetectionConfig::default(),
            flags: default_flags(),
        }
    }
}

/// How desired state is applied to the remote allow-list
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Only add missing addresses
    #[default]
    Merge,
    /// Make the remote allow-list equal to the desired one
    Replace,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Merge => f.write_str("merge"),
            SyncMode::Replace => f.write_str("replace"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackupConfig {
    pub enabled: bool,
    /// Directory for `backup-<account>-<timestamp>.txt` files
    pub dir: PathBuf,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IpDetectionConfig {
    pub services: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for IpDetectionConfig {
    fn default() -> Self {
        Self {
            services: DEFAULT_ECHO_SERVICES.iter().map(|s| s.to_string()).collect(),
            timeout_secs: DEFAULT_DETECTION_TIMEOUT_SECS,
        }
    }
}

fn default_flags() -> BTreeMap<String, bool> {
    let mut flags = BTreeMap::new();
    flags.insert(PRIVATE_DNS_FLAG.to_string(), true);
    flags
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line overrides for the target account
    pub fn with_overrides(mut self, account: Option<String>, resource_group: Option<String>) -> Self {
        if let Some(account) = account {
            self.account = account;
        }
        if let Some(rg) = resource_group {
            self.resource_group = rg;
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.account.is_empty() && !is_valid_account_name(&self.account) {
            return Err(AllowsyncError::Config(format!(
                "Invalid storage account name '{}'. Use 3-24 lowercase letters and digits",
                self.account
            ))
            .into());
        }

        if !self.resource_group.is_empty() && !is_valid_resource_group(&self.resource_group) {
            return Err(AllowsyncError::Config(format!(
                "Invalid resource group name '{}'",
                self.resource_group
            ))
            .into());
        }

        if self.az_path.trim().is_empty() {
            return Err(AllowsyncError::Config("az_path cannot be empty".to_string()).into());
        }

        if self.ip_detection.timeout_secs == 0 {
            return Err(AllowsyncError::Config(
                "ip_detection.timeout_secs must be greater than zero".to_string(),
            )
            .into());
        }

        for url in &self.ip_detection.services {
            if !url.starts_with("https://") {
                return Err(AllowsyncError::Config(format!(
                    "IP echo service URL must use HTTPS: {}",
                    url
                ))
                .into());
            }
        }

        for name in self.flags.keys() {
            if !is_valid_flag_name(name) {
                return Err(AllowsyncError::Config(format!("Invalid flag name '{}'", name)).into());
            }
        }

        Ok(())
    }

    /// The account to operate on; both identifiers must be set.
    pub fn target(&self) -> Result<StorageTarget, AllowsyncError> {
        if self.account.is_empty() {
            return Err(AllowsyncError::Config(
                "No storage account given (use --account or set 'account' in the config file)"
                    .to_string(),
            ));
        }
        if self.resource_group.is_empty() {
            return Err(AllowsyncError::Config(
                "No resource group given (use --resource-group or set 'resource_group' in the config file)"
                    .to_string(),
            ));
        }
        if !is_valid_account_name(&self.account) {
            return Err(AllowsyncError::Config(format!(
                "Invalid storage account name '{}'",
                self.account
            )));
        }
        if !is_valid_resource_group(&self.resource_group) {
            return Err(AllowsyncError::Config(format!(
                "Invalid resource group name '{}'",
                self.resource_group
            )));
        }

        Ok(StorageTarget {
            account: self.account.clone(),
            resource_group: self.resource_group.clone(),
        })
    }

    /// Save configuration to a YAML file atomically
    ///
    /// Uses tempfile + rename so a crash never leaves a truncated file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        let parent_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .context("Failed to create temporary file for config")?;

        temp_file.write_all(content.as_bytes())?;
        temp_file.as_file().sync_all()?;

        temp_file
            .persist(path)
            .with_context(|| format!("Failed to persist config file: {:?}", path))?;

        Ok(())
    }
}

/// Storage account names: 3-24 characters, lowercase letters and digits only
pub fn is_valid_account_name(name: &str) -> bool {
    (3..=24).contains(&name.len())
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Resource group names: 1-90 characters of alphanumerics, `-`, `_`, `.`,
/// `(`, `)`, not ending in `.`
pub fn is_valid_resource_group(name: &str) -> bool {
    (1..=90).contains(&name.len())
        && !name.ends_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')'))
}

fn is_valid_flag_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
