//! allowsync - IP allow-list reconciler for cloud storage firewalls
//!
//! Reads a desired set of IPv4 addresses (from a file or from the caller's
//! detected public address), compares it with the allow-list configured on
//! a storage account's network firewall, and issues the individual add and
//! remove calls that converge the two. Merge mode only adds; replace mode
//! also removes anything not desired.

pub mod address;
pub mod backup;
pub mod cli;
pub mod cmd_abstraction;
pub mod commands;
pub mod config;
pub mod detect;
pub mod dns;
pub mod error;
pub mod firewall;
pub mod flags;
pub mod lock;
pub mod reconcile;
