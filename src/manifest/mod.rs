//! The per-release checksum manifest.
//!
//! Release automation publishes, alongside each tagged release, a JSON map
//! from platform tag to the SHA-256 of that platform's archive:
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "artifacts": {
//!     "darwin-arm64": "3f9a...",
//!     "linux-arm64": "c01d..."
//!   }
//! }
//! ```
//!
//! Until automation runs, entries hold a placeholder instead of a digest.
//! Lookup treats anything that is not a well-formed digest as missing, so a
//! placeholder can never be "verified" against.

mod digest;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::InstallError;
use crate::platform::Platform;
use crate::runtime::Runtime;

pub use digest::Sha256Digest;

/// Environment variable overriding the manifest location.
pub const MANIFEST_ENV: &str = "VITALS_MANIFEST";

/// Filename of the manifest in the config directory.
const MANIFEST_FILE: &str = "checksums.json";

/// Checksums for one release, keyed by platform tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksumManifest {
    /// The release the digests belong to, without `v` prefix.
    pub version: String,
    /// Platform tag -> hex digest (or a placeholder awaiting automation).
    pub artifacts: BTreeMap<String, String>,
}

impl ChecksumManifest {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse checksum manifest")
    }

    /// Load the manifest from `path` through the runtime.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        debug!("Loading checksum manifest from {:?}", path);
        let json = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read checksum manifest at {:?}", path))?;
        Self::parse(&json)
    }

    /// The digest recorded for `platform` in release `version`.
    ///
    /// Fails with `MissingChecksum` when the manifest belongs to a different
    /// release, has no entry for the platform, or the entry is not a valid
    /// digest (the placeholder state). All three are configuration errors,
    /// detected before any network access.
    pub fn lookup(&self, version: &str, platform: &Platform) -> Result<Sha256Digest> {
        if self.version != version {
            return Err(InstallError::MissingChecksum(format!(
                "manifest is for version {}, requested {}",
                self.version, version
            ))
            .into());
        }

        let tag = platform.tag();
        let raw = self.artifacts.get(tag).ok_or_else(|| {
            InstallError::MissingChecksum(format!("manifest has no entry for {}", tag))
        })?;

        Sha256Digest::try_from(raw.as_str()).map_err(|e| {
            InstallError::MissingChecksum(format!(
                "entry for {} is not a SHA-256 digest ({})",
                tag, e
            ))
            .into()
        })
    }
}

/// Resolve the manifest path: explicit flag, then `VITALS_MANIFEST`, then
/// the user config directory.
pub fn manifest_path<R: Runtime>(runtime: &R, flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Ok(path) = runtime.env_var(MANIFEST_ENV) {
        return Ok(PathBuf::from(path));
    }
    let config_dir = runtime
        .config_dir()
        .context("Could not determine config directory for the checksum manifest")?;
    Ok(config_dir.join("vitals-install").join(MANIFEST_FILE))
}
