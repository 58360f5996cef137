//! `az` CLI backend for the storage account firewall.

use tracing::debug;

use super::{FirewallService, NetworkAccess, NetworkAccessUpdate, StorageTarget};
use crate::address::{parse_lenient, AllowList, Ipv4Address};
use crate::cmd_abstraction::{args_to_strings, CommandExecutor, CommandOutput, RealCommandExecutor};
use crate::error::AllowsyncError;

const LIST_RULES_QUERY: &str = "ipRules[].ipAddressOrRange";
const NETWORK_ACCESS_QUERY: &str =
    "{publicAccess:publicNetworkAccess, defaultAction:networkRuleSet.defaultAction}";

/// Storage firewall driven through the Azure CLI
pub struct AzureCli<E: CommandExecutor = RealCommandExecutor> {
    executor: E,
    az_path: String,
}

impl AzureCli<RealCommandExecutor> {
    pub fn new(az_path: impl Into<String>) -> Self {
        Self::with_executor(RealCommandExecutor::new(), az_path)
    }
}

impl<E: CommandExecutor> AzureCli<E> {
    pub fn with_executor(executor: E, az_path: impl Into<String>) -> Self {
        Self {
            executor,
            az_path: az_path.into(),
        }
    }

    /// Run `az` and return its output, whatever the exit status.
    /// `Err` only when the binary could not be started.
    fn run(&self, args: &[&str]) -> anyhow::Result<CommandOutput> {
        debug!("Running {} {}", self.az_path, args.join(" "));
        self.executor.execute(&self.az_path, &args_to_strings(args))
    }

    fn rule_args<'a>(
        verb: &'a str,
        target: &'a StorageTarget,
        ip: &'a str,
    ) -> Vec<&'a str> {
        vec![
            "storage",
            "account",
            "network-rule",
            verb,
            "--account-name",
            target.account.as_str(),
            "--resource-group",
            target.resource_group.as_str(),
            "--ip-address",
            ip,
            "--output",
            "none",
        ]
    }

    fn mutate_rule(
        &self,
        verb: &str,
        target: &StorageTarget,
        addr: &Ipv4Address,
    ) -> Result<(), AllowsyncError> {
        let ip = addr.to_string();
        let failed = |cause: String| AllowsyncError::RuleMutationFailed {
            operation: verb.to_string(),
            address: ip.clone(),
            cause,
        };

        let output = self
            .run(&Self::rule_args(verb, target, &ip))
            .map_err(|e| failed(e.to_string()))?;
        if !output.success {
            return Err(failed(output.failure_reason()));
        }
        Ok(())
    }
}

impl<E: CommandExecutor> FirewallService for AzureCli<E> {
    fn check_prerequisites(&self, target: &StorageTarget) -> Result<(), AllowsyncError> {
        let version = self.run(&["--version"]).map_err(|e| {
            AllowsyncError::Prerequisite(format!(
                "Azure CLI '{}' is not available ({}). Install it or set az_path",
                self.az_path, e
            ))
        })?;
        if !version.success {
            return Err(AllowsyncError::Prerequisite(format!(
                "Azure CLI '{}' is not working: {}",
                self.az_path,
                version.failure_reason()
            )));
        }

        let account = self
            .run(&["account", "show", "--output", "none"])
            .map_err(|e| AllowsyncError::Prerequisite(e.to_string()))?;
        if !account.success {
            return Err(AllowsyncError::Prerequisite(format!(
                "Not logged in to Azure. Run 'az login' first ({})",
                account.failure_reason()
            )));
        }

        let storage = self
            .run(&[
                "storage",
                "account",
                "show",
                "--name",
                &target.account,
                "--resource-group",
                &target.resource_group,
                "--query",
                "name",
                "--output",
                "tsv",
            ])
            .map_err(|e| AllowsyncError::Prerequisite(e.to_string()))?;
        if !storage.success {
            return Err(AllowsyncError::Prerequisite(format!(
                "Storage account {} not found: {}",
                target,
                storage.failure_reason()
            )));
        }

        Ok(())
    }

    fn list_ip_rules(&self, target: &StorageTarget) -> Result<AllowList, AllowsyncError> {
        let output = self
            .run(&[
                "storage",
                "account",
                "network-rule",
                "list",
                "--account-name",
                &target.account,
                "--resource-group",
                &target.resource_group,
                "--query",
                LIST_RULES_QUERY,
                "--output",
                "tsv",
            ])
            .map_err(|e| AllowsyncError::RemoteFetchFailed(e.to_string()))?;

        if !output.success {
            return Err(AllowsyncError::RemoteFetchFailed(output.failure_reason()));
        }

        Ok(parse_lenient(&output.stdout))
    }

    fn add_ip_rule(&self, target: &StorageTarget, addr: &Ipv4Address) -> Result<(), AllowsyncError> {
        self.mutate_rule("add", target, addr)
    }

    fn remove_ip_rule(
        &self,
        target: &StorageTarget,
        addr: &Ipv4Address,
    ) -> Result<(), AllowsyncError> {
        self.mutate_rule("remove", target, addr)
    }

    fn network_access(&self, target: &StorageTarget) -> Result<NetworkAccess, AllowsyncError> {
        let output = self
            .run(&[
                "storage",
                "account",
                "show",
                "--name",
                &target.account,
                "--resource-group",
                &target.resource_group,
                "--query",
                NETWORK_ACCESS_QUERY,
                "--output",
                "json",
            ])
            .map_err(|e| AllowsyncError::RemoteFetchFailed(e.to_string()))?;

        if !output.success {
            return Err(AllowsyncError::RemoteFetchFailed(output.failure_reason()));
        }

        serde_json::from_str(&output.stdout).map_err(|e| {
            AllowsyncError::RemoteFetchFailed(format!("Unexpected network access output: {}", e))
        })
    }

    fn set_network_access(
        &self,
        target: &StorageTarget,
        update: NetworkAccessUpdate,
    ) -> Result<(), AllowsyncError> {
        let public_access = update.public_access.map(|p| p.to_string());
        let default_action = update.default_action.map(|d| d.to_string());

        let mut args: Vec<&str> = vec![
            "storage",
            "account",
            "update",
            "--name",
            target.account.as_str(),
            "--resource-group",
            target.resource_group.as_str(),
        ];
        if let Some(ref p) = public_access {
            args.extend(["--public-network-access", p.as_str()]);
        }
        if let Some(ref d) = default_action {
            args.extend(["--default-action", d.as_str()]);
        }
        args.extend(["--output", "none"]);

        let failed = |cause: String| AllowsyncError::RuleMutationFailed {
            operation: "update network access of".to_string(),
            address: target.account.clone(),
            cause,
        };
        let output = self.run(&args).map_err(|e| failed(e.to_string()))?;
        if !output.success {
            return Err(failed(output.failure_reason()));
        }
        Ok(())
    }
}
