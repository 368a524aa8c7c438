//! Platform tags for artifact selection.
//!
//! A release artifact exists for each supported (OS, architecture) pair.
//! The pair maps to the filename suffix used by the release host, e.g.
//! `darwin-arm64` or `linux-amd64`. The mapping is a finite table: adding a
//! platform means adding a row, not another conditional.

use std::fmt;
use std::str::FromStr;

use crate::error::InstallError;

/// Operating systems with published release artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    MacOs,
    Linux,
}

/// CPU architectures with published release artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Arm64,
    Amd64,
}

/// A supported (OS, architecture) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

/// Every platform with a published artifact.
pub const SUPPORTED: [Platform; 4] = [
    Platform {
        os: Os::MacOs,
        arch: Arch::Arm64,
    },
    Platform {
        os: Os::MacOs,
        arch: Arch::Amd64,
    },
    Platform {
        os: Os::Linux,
        arch: Arch::Arm64,
    },
    Platform {
        os: Os::Linux,
        arch: Arch::Amd64,
    },
];

impl Platform {
    /// Detect the current platform from compile-time target information.
    ///
    /// Hosts without a release artifact (Windows, 32-bit, ...) are an
    /// `UnsupportedPlatform` error, not a fallback.
    pub fn detect() -> anyhow::Result<Self> {
        match (Self::detect_os(), Self::detect_arch()) {
            (Some(os), Some(arch)) => Ok(Self { os, arch }),
            _ => Err(InstallError::UnsupportedPlatform(format!(
                "{}/{} has no release artifact",
                std::env::consts::OS,
                std::env::consts::ARCH
            ))
            .into()),
        }
    }

    /// The release filename suffix for this platform.
    ///
    /// The match is exhaustive: every constructible pair has exactly one tag.
    pub fn tag(&self) -> &'static str {
        match (self.os, self.arch) {
            (Os::MacOs, Arch::Arm64) => "darwin-arm64",
            (Os::MacOs, Arch::Amd64) => "darwin-amd64",
            (Os::Linux, Arch::Arm64) => "linux-arm64",
            (Os::Linux, Arch::Amd64) => "linux-amd64",
        }
    }

    fn detect_os() -> Option<Os> {
        #[cfg(target_os = "macos")]
        {
            Some(Os::MacOs)
        }
        #[cfg(target_os = "linux")]
        {
            Some(Os::Linux)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }

    fn detect_arch() -> Option<Arch> {
        #[cfg(target_arch = "aarch64")]
        {
            Some(Arch::Arm64)
        }
        #[cfg(target_arch = "x86_64")]
        {
            Some(Arch::Amd64)
        }
        #[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
        {
            None
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Platform {
    type Err = InstallError;

    /// Parse a platform from its release tag, e.g. `linux-arm64`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SUPPORTED
            .iter()
            .find(|p| p.tag() == s)
            .copied()
            .ok_or_else(|| {
                InstallError::UnsupportedPlatform(format!(
                    "unknown platform tag '{}' (expected one of: {})",
                    s,
                    SUPPORTED
                        .iter()
                        .map(|p| p.tag())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}
