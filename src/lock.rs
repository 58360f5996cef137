//! Advisory lock for configuration rewrites.
//!
//! Guards read-modify-write cycles on a local file (flag toggling) against
//! a second allowsync process doing the same. It does not serialize
//! changes to the remote firewall.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Holds an exclusive lock until dropped.
#[derive(Debug)]
pub struct LockGuard {
    _file: File,
    path: PathBuf,
}

/// `<file>.lock` next to the file being protected
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("allowsync"));
    name.push(".lock");
    path.with_file_name(name)
}

impl LockGuard {
    /// Take the lock for `path`, failing at once if another process holds it.
    pub fn acquire_for(path: &Path) -> Result<Self> {
        let lock_path = lock_path_for(path);

        // create+read+write without truncate: no race between create and lock
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "Another allowsync process is modifying {}.\n\
                 If you believe this is an error, remove the lock file: {}",
                path.display(),
                lock_path.display()
            )
        })?;

        Ok(Self {
            _file: file,
            path: lock_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// Lock is released when the file is closed on drop
