//! Per-worker Chrome profile directories
//!
//! Every worker browser gets its own UUID-named profile so that two browsers
//! never share a SingletonLock or a cookie jar.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::worker::WorkerId;

/// RAII wrapper for a Chrome profile directory
///
/// The directory is removed when the profile is dropped.
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
}

impl BrowserProfile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.path.exists() {
            debug!("Removing profile directory {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!(
                    "Failed to cleanup profile directory {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

/// Create a fresh profile directory for `worker` under `base`
pub fn create_worker_profile_in(base: &Path, worker: WorkerId) -> Result<BrowserProfile> {
    let path = base.join(format!("catalog_scan_{worker}_{}", Uuid::new_v4()));

    // create_dir fails if the path exists, so a collision never reuses a profile
    std::fs::create_dir(&path)
        .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;

    debug!(worker = %worker, "Created Chrome profile directory: {}", path.display());
    Ok(BrowserProfile { path })
}

/// Create a fresh profile directory for `worker` in the system temp dir
pub fn create_worker_profile(worker: WorkerId) -> Result<BrowserProfile> {
    create_worker_profile_in(&std::env::temp_dir(), worker)
}
