//! Post-install smoke test.
//!
//! The install contract with the binary: `vitals --help` must print
//! something containing the tool's own name. Failure here means
//! "installed but possibly broken" — the install itself already
//! succeeded and is never rolled back.

use std::path::Path;

use log::debug;

use crate::error::InstallError;
use crate::resolver::BINARY_NAME;
use crate::runtime::Runtime;

/// Invoke the installed binary and check it identifies itself.
#[tracing::instrument(skip(runtime))]
pub fn smoke_test<R: Runtime>(runtime: &R, binary: &Path) -> Result<(), InstallError> {
    let output = runtime
        .command_output(binary, &["--help".to_string()])
        .map_err(|e| InstallError::SmokeTestFailed(format!("could not execute {:?}: {:#}", binary, e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(
        "Smoke test output ({} bytes stdout, {} bytes stderr)",
        output.stdout.len(),
        output.stderr.len()
    );

    if stdout.contains(BINARY_NAME) || stderr.contains(BINARY_NAME) {
        return Ok(());
    }

    Err(InstallError::SmokeTestFailed(format!(
        "'{} --help' did not mention '{}'",
        binary.display(),
        BINARY_NAME
    )))
}
