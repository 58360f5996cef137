//! Validate command implementation.

use anyhow::{Context, Result};
use std::path::Path;

use crate::address::parse_allowlist;
use crate::commands::{print_list, print_rejects};

/// Run the validate command
pub async fn run(file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read desired-state file {:?}", file))?;
    let parsed = parse_allowlist(&content);
    let rejected = parsed.rejected.len();

    print_rejects(&parsed);
    let desired = parsed.into_desired()?;

    println!();
    print_list("Desired addresses", &desired);
    println!();
    if rejected > 0 {
        println!("[WARN] {} line(s) will be ignored", rejected);
    } else {
        println!("[OK] {} is valid", file.display());
    }
    Ok(())
}
