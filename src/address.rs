//! IPv4 address validation and allow-list parsing.
//!
//! Addresses are accepted only in strict dotted-decimal form: exactly four
//! groups of ASCII digits, each group in `0..=255`. Allow-lists are kept
//! ordered by the dotted-decimal string so every listing, backup and log
//! line comes out in the same order.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use tracing::warn;

use crate::error::{AddressFault, AllowsyncError};

/// A validated IPv4 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Address(Ipv4Addr);

impl Ipv4Address {
    /// Validate a single candidate.
    ///
    /// # Examples
    /// ```
    /// use allowsync::address::Ipv4Address;
    /// assert!(Ipv4Address::parse("192.168.1.1").is_ok());
    /// assert!(Ipv4Address::parse("256.1.1.1").is_err());
    /// assert!(Ipv4Address::parse("10.0.0").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, AllowsyncError> {
        Self::check(input).map_err(|reason| AllowsyncError::InvalidAddress {
            input: input.to_string(),
            reason,
        })
    }

    fn check(input: &str) -> Result<Self, AddressFault> {
        let groups: Vec<&str> = input.split('.').collect();
        if groups.len() != 4
            || groups
                .iter()
                .any(|g| g.is_empty() || !g.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(AddressFault::Format);
        }

        let mut octets = [0u8; 4];
        for (slot, group) in octets.iter_mut().zip(&groups) {
            // Digits-only, so a parse failure here can only be overflow
            *slot = group
                .parse::<u32>()
                .ok()
                .and_then(|v| u8::try_from(v).ok())
                .ok_or(AddressFault::Range)?;
        }

        Ok(Self(Ipv4Addr::from(octets)))
    }

    pub fn as_ipv4(&self) -> Ipv4Addr {
        self.0
    }
}

impl FromStr for Ipv4Address {
    type Err = AllowsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Ipv4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// Lexicographic on the dotted-decimal text, not numeric
impl Ord for Ipv4Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl PartialOrd for Ipv4Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A deduplicated set of addresses, iterated in ascending string order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList(BTreeSet<Ipv4Address>);

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the address was not already present.
    pub fn insert(&mut self, addr: Ipv4Address) -> bool {
        self.0.insert(addr)
    }

    pub fn remove(&mut self, addr: &Ipv4Address) -> bool {
        self.0.remove(addr)
    }

    pub fn contains(&self, addr: &Ipv4Address) -> bool {
        self.0.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ipv4Address> {
        self.0.iter()
    }

    /// Addresses in `self` that are not in `other`, sorted.
    pub fn difference(&self, other: &AllowList) -> Vec<Ipv4Address> {
        self.0.difference(&other.0).copied().collect()
    }

    /// Addresses in both sets, sorted.
    pub fn intersection(&self, other: &AllowList) -> Vec<Ipv4Address> {
        self.0.intersection(&other.0).copied().collect()
    }

    /// Render as one address per line, sorted, with a trailing newline.
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for addr in &self.0 {
            out.push_str(&addr.to_string());
            out.push('\n');
        }
        out
    }
}

impl FromIterator<Ipv4Address> for AllowList {
    fn from_iter<I: IntoIterator<Item = Ipv4Address>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AllowList {
    type Item = &'a Ipv4Address;
    type IntoIter = std::collections::btree_set::Iter<'a, Ipv4Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A line that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLine {
    /// 1-based line number in the source
    pub line: usize,
    pub content: String,
    pub reason: AddressFault,
}

/// Outcome of parsing a desired-state source.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub addresses: AllowList,
    pub rejected: Vec<RejectedLine>,
}

impl ParseReport {
    /// Fail with `EmptyDesiredState` if nothing valid was found.
    pub fn into_desired(self) -> Result<AllowList, AllowsyncError> {
        if self.addresses.is_empty() {
            return Err(AllowsyncError::EmptyDesiredState);
        }
        Ok(self.addresses)
    }
}

/// Returns `true` for lines that carry no candidate (blank or `#` comment).
fn is_ignorable(trimmed: &str) -> bool {
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Parse a desired-state source, one candidate per line.
///
/// Blank lines and `#` comments are skipped. Every other line is trimmed
/// and validated; failures are collected with their line number. A leading
/// UTF-8 byte-order mark is ignored.
pub fn parse_allowlist(content: &str) -> ParseReport {
    let mut report = ParseReport::default();

    for (idx, raw) in strip_bom(content).lines().enumerate() {
        let trimmed = raw.trim();
        if is_ignorable(trimmed) {
            continue;
        }

        match Ipv4Address::check(trimmed) {
            Ok(addr) => {
                report.addresses.insert(addr);
            }
            Err(reason) => report.rejected.push(RejectedLine {
                line: idx + 1,
                content: trimmed.to_string(),
                reason,
            }),
        }
    }

    report
}

fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

/// Parse listing output from the firewall service, dropping anything that
/// is not a plain IPv4 address (CIDR ranges included).
///
/// Dropped entries stay on the firewall untouched, so they are reported
/// with a warning.
pub fn parse_lenient(content: &str) -> AllowList {
    let (list, unmanaged) = split_listing(content);
    if !unmanaged.is_empty() {
        warn!(
            "{} remote rule(s) are not plain IPv4 addresses and are left untouched: {}",
            unmanaged.len(),
            unmanaged.join(", ")
        );
    }
    list
}

/// Plain addresses, and every other non-blank entry verbatim
fn split_listing(content: &str) -> (AllowList, Vec<String>) {
    let mut list = AllowList::new();
    let mut unmanaged = Vec::new();

    for line in strip_bom(content).lines().map(str::trim) {
        if is_ignorable(line) {
            continue;
        }
        match Ipv4Address::check(line) {
            Ok(addr) => {
                list.insert(addr);
            }
            Err(_) => unmanaged.push(line.to_string()),
        }
    }

    (list, unmanaged)
}
