//! Validated SHA-256 digest strings.

use std::fmt;
use std::io::Read;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Hex length of a SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A 64-character lowercase hex SHA-256 digest.
///
/// Construction validates the format, so a placeholder value (the release
/// automation writes `"PLACEHOLDER"` until it fills in real sums) can never
/// become a digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compute the digest of everything `reader` yields.
    pub fn of_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader
                .read(&mut buf)
                .context("Failed to read bytes for digest")?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        // sha2 emits 64 lowercase hex chars, which always validates.
        Self::parse(&format!("{:x}", hasher.finalize()))
    }

    /// Compute the digest of a byte slice.
    pub fn of_bytes(bytes: &[u8]) -> Result<Self> {
        Self::of_reader(bytes)
    }

    fn parse(value: &str) -> Result<Self> {
        if value.len() != DIGEST_HEX_LEN {
            anyhow::bail!(
                "expected {} hex characters, got {}",
                DIGEST_HEX_LEN,
                value.len()
            );
        }
        if let Some(bad) = value
            .chars()
            .find(|c| !c.is_ascii_hexdigit() || c.is_ascii_uppercase())
        {
            anyhow::bail!("invalid digest character '{}'", bad);
        }
        Ok(Self(value.to_string()))
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
