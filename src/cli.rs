//! CLI argument parsing with clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SyncMode;
use crate::firewall::{DefaultAction, PublicAccess};

#[derive(Parser)]
#[command(name = "allowsync")]
#[command(author, version, about = "IP allow-list reconciler for cloud storage firewalls")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "allowsync.yaml", global = true)]
    pub config: PathBuf,

    /// Storage account name (overrides the config file)
    #[arg(short, long, global = true)]
    pub account: Option<String>,

    /// Resource group of the storage account (overrides the config file)
    #[arg(short = 'g', long, global = true)]
    pub resource_group: Option<String>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output, including every az invocation)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Converge the firewall allow-list to a desired state
    Sync {
        #[command(flatten)]
        source: DesiredSource,

        /// Reconciliation mode (default from config: merge)
        #[arg(long, value_enum)]
        mode: Option<SyncMode>,

        /// Do not write a backup of the current rules
        #[arg(long)]
        no_backup: bool,

        /// Directory for the backup file (default from config)
        #[arg(long)]
        backup_dir: Option<PathBuf>,

        /// Show the plan without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the IP rules currently configured
    List,

    /// Remove every IP rule from the firewall
    Wipe {
        /// Confirm removal of all rules
        #[arg(long)]
        yes: bool,

        /// Do not write a backup of the current rules
        #[arg(long)]
        no_backup: bool,
    },

    /// Inspect or change public network access
    Access {
        #[command(subcommand)]
        action: AccessAction,
    },

    /// Print the public IPv4 address of this machine
    Detect,

    /// Check a desired-state file without contacting the firewall
    Validate {
        /// File with one IPv4 address per line
        file: PathBuf,
    },

    /// Resolve the account's blob endpoint and show whether it is private
    Resolve {
        /// Also show reverse DNS for each address
        #[arg(long)]
        ptr: bool,
    },

    /// Manage deployment feature flags
    Flag {
        #[command(subcommand)]
        action: FlagAction,
    },

    /// Show version
    Version,
}

/// Where the desired allow-list comes from
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct DesiredSource {
    /// File with one IPv4 address per line (`#` comments allowed)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Use this machine's public IPv4 address
    #[arg(long)]
    pub detect: bool,
}

#[derive(Subcommand, Clone)]
pub enum AccessAction {
    /// Show public network access and the default action
    Show,
    /// Change public network access and/or the default action
    Set {
        #[arg(long, value_enum)]
        public_access: Option<PublicAccess>,

        #[arg(long, value_enum)]
        default_action: Option<DefaultAction>,
    },
}

#[derive(Subcommand, Clone)]
pub enum FlagAction {
    /// List flags from the config file
    List,
    /// Flip a flag between true and false
    Toggle {
        /// Flag name
        name: String,

        /// Toggle `NAME="true|false"` in this shell variable file instead
        #[arg(long)]
        env_file: Option<PathBuf>,
    },
}
