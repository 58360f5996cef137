//! Public IPv4 detection through external echo services.

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::address::Ipv4Address;
use crate::config::IpDetectionConfig;
use crate::error::AllowsyncError;

/// Echo services answer with a bare address; anything larger is not one
const MAX_RESPONSE_SIZE: usize = 64;

/// Queries echo services in order until one returns a usable address
pub struct IpDetector {
    client: Client,
    services: Vec<String>,
}

impl IpDetector {
    /// Create a detector from configuration
    pub fn new(config: &IpDetectionConfig) -> Result<Self> {
        Self::with_services(
            config.services.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Create a detector with an explicit service list and per-attempt timeout
    pub fn with_services(services: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("allowsync/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, services })
    }

    /// Detect the caller's public IPv4 address.
    ///
    /// Services are tried one at a time in their configured order; the first
    /// response that is itself a valid address wins.
    pub async fn detect(&self) -> Result<Ipv4Address, AllowsyncError> {
        let mut failures = Vec::new();

        for url in &self.services {
            match self.query(url).await {
                Ok(addr) => {
                    info!("Detected public IP {} via {}", addr, url);
                    return Ok(addr);
                }
                Err(e) => {
                    warn!("IP echo service {} unusable: {:#}", url, e);
                    failures.push(format!("{}: {:#}", url, e));
                }
            }
        }

        if failures.is_empty() {
            return Err(AllowsyncError::IpDetectionFailed(
                "no echo services configured".to_string(),
            ));
        }
        Err(AllowsyncError::IpDetectionFailed(failures.join("; ")))
    }

    async fn query(&self, url: &str) -> Result<Ipv4Address> {
        debug!("Querying {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }
        if let Some(len) = response.content_length() {
            if len as usize > MAX_RESPONSE_SIZE {
                anyhow::bail!("Response too large: {} bytes", len);
            }
        }

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        parse_echo_response(&body)
            .ok_or_else(|| anyhow::anyhow!("Response is not an IPv4 address"))
    }
}

/// Interpret an echo service body: a single IPv4 address, optionally
/// surrounded by whitespace.
pub fn parse_echo_response(body: &str) -> Option<Ipv4Address> {
    if body.len() > MAX_RESPONSE_SIZE {
        return None;
    }
    Ipv4Address::parse(body.trim()).ok()
}
