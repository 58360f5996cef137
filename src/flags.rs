//! Boolean deployment flags.
//!
//! Flags live in the `flags` map of the YAML configuration. Shell-style
//! variable files (`NAME="true"`) are also supported so existing deployment
//! scripts can be switched without editing them by hand.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::error::AllowsyncError;

/// Flip a flag in the configuration and return its new value.
pub fn toggle_flag(config: &mut Config, name: &str) -> Result<bool, AllowsyncError> {
    let value = config
        .flags
        .get_mut(name)
        .ok_or_else(|| AllowsyncError::ConfigFlagNotFound(name.to_string()))?;
    *value = !*value;
    Ok(*value)
}

/// Flip `NAME="true"` / `NAME="false"` in a variable file's text.
///
/// Only the first assignment to `name` is rewritten; every other byte of
/// the input, line endings included, is preserved. Returns the new text and
/// the new value.
pub fn toggle_assignment(content: &str, name: &str) -> Result<(String, bool), AllowsyncError> {
    let prefix = format!("{}=", name);
    let mut out = String::with_capacity(content.len() + 1);
    let mut new_value = None;

    for line in content.split_inclusive('\n') {
        if new_value.is_none() {
            let body = line.trim_end_matches(['\r', '\n']);
            let ending = &line[body.len()..];
            let indent_len = body.len() - body.trim_start().len();
            let (indent, stmt) = body.split_at(indent_len);

            if let Some(literal) = stmt.strip_prefix(&prefix) {
                let flipped = match literal {
                    "\"true\"" => Some(false),
                    "\"false\"" => Some(true),
                    _ => None,
                };
                if let Some(value) = flipped {
                    out.push_str(indent);
                    out.push_str(&prefix);
                    out.push_str(if value { "\"true\"" } else { "\"false\"" });
                    out.push_str(ending);
                    new_value = Some(value);
                    continue;
                }
            }
        }
        out.push_str(line);
    }

    match new_value {
        Some(value) => Ok((out, value)),
        None => Err(AllowsyncError::ConfigFlagNotFound(name.to_string())),
    }
}

/// Toggle an assignment in a variable file on disk, replacing the file
/// atomically. Returns the new value.
pub fn toggle_assignment_file(path: &Path, name: &str) -> Result<bool> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let (updated, value) = toggle_assignment(&content, name)?;

    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp_file =
        NamedTempFile::new_in(parent_dir).context("Failed to create temporary file")?;
    temp_file.write_all(updated.as_bytes())?;
    temp_file.as_file().sync_all()?;
    temp_file
        .persist(path)
        .with_context(|| format!("Failed to replace {:?}", path))?;

    Ok(value)
}
