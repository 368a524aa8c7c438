//! Resolution of the binary install directory.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Environment variable overriding the install directory.
pub const BIN_DIR_ENV: &str = "VITALS_BIN_DIR";

/// Where the binary goes: explicit flag, then `VITALS_BIN_DIR`, then
/// `~/.local/bin`.
pub fn resolve_bin_dir<R: Runtime>(runtime: &R, flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Ok(dir) = runtime.env_var(BIN_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = runtime
        .home_dir()
        .context("Could not determine home directory for the install location")?;
    Ok(home.join(".local").join("bin"))
}
