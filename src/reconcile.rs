//! Convergence of the remote allow-list towards a desired state.
//!
//! The engine fetches the remote list, derives a [`Plan`], optionally
//! snapshots the remote list, then issues one call per address: removals
//! first, then additions, each in sorted order. A failing call is recorded
//! and the batch continues. The remote list is fetched again at the end so
//! the report shows what is actually configured.

use chrono::Local;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::address::{AllowList, Ipv4Address};
use crate::backup::write_backup;
use crate::config::SyncMode;
use crate::error::AllowsyncError;
use crate::firewall::{FirewallService, StorageTarget};

/// Which calls to issue, all lists sorted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub additions: Vec<Ipv4Address>,
    pub removals: Vec<Ipv4Address>,
    /// Desired addresses already configured remotely
    pub already_present: Vec<Ipv4Address>,
}

impl Plan {
    /// Derive the plan for `mode`.
    ///
    /// Merge never removes; replace removes everything not desired.
    pub fn compute(desired: &AllowList, remote: &AllowList, mode: SyncMode) -> Self {
        let removals = match mode {
            SyncMode::Merge => Vec::new(),
            SyncMode::Replace => remote.difference(desired),
        };
        Self {
            additions: desired.difference(remote),
            removals,
            already_present: desired.intersection(remote),
        }
    }

    /// Remove every remote rule.
    pub fn wipe(remote: &AllowList) -> Self {
        Self {
            removals: remote.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn is_noop(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => f.write_str("add"),
            Operation::Remove => f.write_str("remove"),
        }
    }
}

/// Result of one add/remove call
#[derive(Debug)]
pub struct OperationOutcome {
    pub operation: Operation,
    pub address: Ipv4Address,
    pub result: Result<(), AllowsyncError>,
}

/// Everything a run did, for the final summary
#[derive(Debug, Default)]
pub struct Report {
    pub plan: Plan,
    pub outcomes: Vec<OperationOutcome>,
    /// Path of the snapshot written before mutating, if any
    pub backup: Option<PathBuf>,
    /// Remote list fetched after mutating; `None` if that fetch failed
    pub final_state: Option<AllowList>,
}

impl Report {
    fn count(&self, op: Operation, ok: bool) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.operation == op && o.result.is_ok() == ok)
            .count()
    }

    pub fn added(&self) -> usize {
        self.count(Operation::Add, true)
    }

    pub fn removed(&self) -> usize {
        self.count(Operation::Remove, true)
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// `true` when every issued call succeeded
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Drives a [`FirewallService`] for a single target
pub struct Reconciler<'a, F: FirewallService + ?Sized> {
    firewall: &'a F,
    target: &'a StorageTarget,
    backup_dir: Option<&'a Path>,
}

impl<'a, F: FirewallService + ?Sized> Reconciler<'a, F> {
    pub fn new(firewall: &'a F, target: &'a StorageTarget) -> Self {
        Self {
            firewall,
            target,
            backup_dir: None,
        }
    }

    /// Snapshot the remote list into `dir` before mutating
    pub fn with_backup(mut self, dir: &'a Path) -> Self {
        self.backup_dir = Some(dir);
        self
    }

    /// Fetch remote state and compute the plan without changing anything.
    pub fn plan(
        &self,
        desired: &AllowList,
        mode: SyncMode,
    ) -> Result<(AllowList, Plan), AllowsyncError> {
        let remote = self.firewall.list_ip_rules(self.target)?;
        let plan = Plan::compute(desired, &remote, mode);
        Ok((remote, plan))
    }

    /// Converge the remote list towards `desired`.
    ///
    /// An empty desired set is refused; use [`Reconciler::wipe`] to remove
    /// every rule.
    pub fn reconcile(&self, desired: &AllowList, mode: SyncMode) -> Result<Report, AllowsyncError> {
        if desired.is_empty() {
            return Err(AllowsyncError::EmptyDesiredState);
        }

        let (remote, plan) = self.plan(desired, mode)?;
        info!(
            "Remote has {} rules; {} to add, {} to remove, {} already present ({} mode)",
            remote.len(),
            plan.additions.len(),
            plan.removals.len(),
            plan.already_present.len(),
            mode
        );
        self.execute(&remote, plan)
    }

    /// Remove every rule currently configured.
    pub fn wipe(&self) -> Result<Report, AllowsyncError> {
        let remote = self.firewall.list_ip_rules(self.target)?;
        info!("Removing all {} rules from {}", remote.len(), self.target);
        self.execute(&remote, Plan::wipe(&remote))
    }

    fn execute(&self, remote: &AllowList, plan: Plan) -> Result<Report, AllowsyncError> {
        let mut report = Report {
            backup: self.snapshot(remote),
            ..Report::default()
        };

        for addr in &plan.already_present {
            info!("{} already present", addr);
        }

        // Removals before additions, each in sorted order
        for addr in &plan.removals {
            report
                .outcomes
                .push(self.apply(Operation::Remove, addr));
        }
        for addr in &plan.additions {
            report.outcomes.push(self.apply(Operation::Add, addr));
        }
        report.plan = plan;

        if !report.plan.is_noop() {
            report.final_state = match self.firewall.list_ip_rules(self.target) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!("Could not re-read rules after changes: {}", e);
                    None
                }
            };
        } else {
            report.final_state = Some(remote.clone());
        }

        Ok(report)
    }

    fn snapshot(&self, remote: &AllowList) -> Option<PathBuf> {
        let dir = self.backup_dir?;
        if remote.is_empty() {
            return None;
        }

        match write_backup(dir, &self.target.account, remote, Local::now()) {
            Ok(path) => {
                info!("Backed up {} rules to {}", remote.len(), path.display());
                Some(path)
            }
            Err(e) => {
                warn!("{} (continuing without backup)", e);
                None
            }
        }
    }

    fn apply(&self, operation: Operation, addr: &Ipv4Address) -> OperationOutcome {
        let result = match operation {
            Operation::Add => self.firewall.add_ip_rule(self.target, addr),
            Operation::Remove => self.firewall.remove_ip_rule(self.target, addr),
        };

        match &result {
            Ok(()) => info!("{} {}: ok", operation, addr),
            Err(e) => error!("{}", e),
        }

        OperationOutcome {
            operation,
            address: *addr,
            result,
        }
    }
}
