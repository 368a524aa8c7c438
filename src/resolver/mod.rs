//! Resolve a (version, platform) pair to a concrete release artifact.
//!
//! Resolution is pure: the same version, platform, and manifest always
//! produce the same descriptor, and nothing here touches the network.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use semver::Version;

use crate::manifest::{ChecksumManifest, Sha256Digest};
use crate::platform::Platform;

/// Release host serving the artifact archives.
pub const DEFAULT_BASE_URL: &str = "https://github.com/onuroluc/vitals";

/// Name of the executable inside each release archive.
pub const BINARY_NAME: &str = "vitals";

/// A validated release version.
///
/// Accepts an optional `v` prefix on input; renders without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion(Version);

impl ReleaseVersion {
    pub fn as_version(&self) -> &Version {
        &self.0
    }
}

impl FromStr for ReleaseVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            anyhow::bail!("release version must not be empty");
        }
        let normalized = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let version = Version::parse(normalized)
            .with_context(|| format!("'{}' is not a well-formed semantic version", s))?;
        Ok(Self(version))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to fetch and verify one release artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// Full download URL for the archive.
    pub url: String,
    /// Digest the downloaded bytes must hash to.
    pub checksum: Sha256Digest,
    /// Archive filename, e.g. `vitals-linux-arm64.tar.gz`.
    pub filename: String,
}

/// Build the descriptor for `version` on `platform`.
///
/// The URL follows the release host's layout:
/// `<base>/releases/download/v<version>/vitals-<tag>.tar.gz`.
/// Fails with `UnsupportedPlatform` upstream (platform construction) or
/// `MissingChecksum` (manifest lookup) before any network activity.
#[tracing::instrument(skip(manifest))]
pub fn resolve(
    base_url: &str,
    version: &ReleaseVersion,
    platform: &Platform,
    manifest: &ChecksumManifest,
) -> Result<ArtifactDescriptor> {
    let checksum = manifest.lookup(&version.to_string(), platform)?;
    let filename = format!("{}-{}.tar.gz", BINARY_NAME, platform.tag());
    let url = format!(
        "{}/releases/download/v{}/{}",
        base_url.trim_end_matches('/'),
        version,
        filename
    );
    Ok(ArtifactDescriptor {
        url,
        checksum,
        filename,
    })
}
