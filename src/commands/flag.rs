//! Flag command implementation.

use anyhow::Result;
use std::path::Path;

use crate::cli::FlagAction;
use crate::config::Config;
use crate::flags::{toggle_assignment_file, toggle_flag};
use crate::lock::LockGuard;

/// Run the flag command
pub async fn run(action: FlagAction, config_path: &Path) -> Result<()> {
    match action {
        FlagAction::List => {
            let config = Config::load_or_default(config_path)?;
            if config.flags.is_empty() {
                println!("No flags defined");
            }
            for (name, value) in &config.flags {
                println!("{:<24} {}", name, value);
            }
        }
        FlagAction::Toggle { name, env_file } => {
            let value = match env_file {
                Some(path) => {
                    let _lock = LockGuard::acquire_for(&path)?;
                    toggle_assignment_file(&path, &name)?
                }
                None => {
                    let _lock = LockGuard::acquire_for(config_path)?;
                    let mut config = Config::load_or_default(config_path)?;
                    let value = toggle_flag(&mut config, &name)?;
                    config.save(config_path)?;
                    value
                }
            };
            println!("[OK] {} = {}", name, value);
        }
    }

    Ok(())
}
