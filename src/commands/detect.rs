//! Detect command implementation.

use anyhow::Result;

use crate::config::Config;
use crate::detect::IpDetector;

/// Run the detect command
pub async fn run(config: &Config) -> Result<()> {
    let detector = IpDetector::new(&config.ip_detection)?;
    let addr = detector.detect().await?;
    println!("{}", addr);
    Ok(())
}
