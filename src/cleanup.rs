//! Tracking of in-flight paths so an interrupted install leaves nothing behind.
//!
//! Staged files (the downloaded archive, the temporary binary) are registered
//! here and removed by the Ctrl-C handler. The previously installed binary is
//! never registered, so cancellation before the final rename leaves it intact.

use log::debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Paths to delete if the install is interrupted.
#[derive(Default)]
pub struct CleanupContext {
    #[cfg(test)]
    pub paths: Vec<PathBuf>,
    #[cfg(not(test))]
    paths: Vec<PathBuf>,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path for removal on interruption.
    pub fn add(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Unregister a path (the stage that created it completed or consumed it).
    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    /// Remove every registered path.
    pub fn cleanup(&self) {
        for path in &self.paths {
            debug!("Cleaning up: {:?}", path);
            if path.is_dir() {
                let _ = std::fs::remove_dir_all(path);
            } else {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

/// Shared handle passed down the pipeline stages.
pub type SharedCleanupContext = Arc<Mutex<CleanupContext>>;

pub fn new_shared() -> SharedCleanupContext {
    Arc::new(Mutex::new(CleanupContext::new()))
}

/// RAII registration: the path stays registered until `success()`.
pub struct CleanupGuard {
    ctx: SharedCleanupContext,
    path: PathBuf,
}

impl CleanupGuard {
    pub fn new(ctx: SharedCleanupContext, path: PathBuf) -> Self {
        {
            let mut guard = ctx.lock().unwrap();
            guard.add(path.clone());
        }
        Self { ctx, path }
    }

    /// The path reached its final state; stop tracking it.
    pub fn success(self) {
        {
            let mut guard = self.ctx.lock().unwrap();
            guard.remove(&self.path);
        }
        // Drop would leave the path registered; skip it.
        std::mem::forget(self);
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        // Path remains registered if not explicitly marked as success
    }
}
