//! Error taxonomy for the install pipeline.
//!
//! Every failure the pipeline can surface maps to exactly one variant here.
//! Values are carried through `anyhow::Error` and downcast where a caller
//! needs to branch on the kind (e.g. the CLI exit path).

/// Terminal failures of an install invocation.
///
/// None of these are retried by the pipeline itself; transient network
/// retries happen inside the HTTP client before a `DownloadFailed` is raised.
#[derive(Debug)]
pub enum InstallError {
    /// The host (or requested) OS/architecture pair has no release artifact.
    UnsupportedPlatform(String),
    /// The checksum manifest has no usable digest for this version/platform.
    MissingChecksum(String),
    /// Network or HTTP failure while downloading the artifact.
    DownloadFailed(String),
    /// Downloaded bytes disagree with the expected digest.
    IntegrityMismatch { expected: String, actual: String },
    /// The archive is malformed or lacks the expected binary entry.
    ExtractionError(String),
    /// The bin directory is not writable.
    InstallPermissionDenied(String),
    /// The installed binary did not identify itself when invoked.
    SmokeTestFailed(String),
}

impl std::fmt::Display for InstallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallError::UnsupportedPlatform(msg) => {
                write!(f, "Unsupported platform: {}", msg)
            }
            InstallError::MissingChecksum(msg) => {
                write!(
                    f,
                    "No usable checksum: {}. The manifest is regenerated by release automation; \
                     make sure it matches the requested version.",
                    msg
                )
            }
            InstallError::DownloadFailed(msg) => {
                write!(f, "Download failed: {}", msg)
            }
            InstallError::IntegrityMismatch { expected, actual } => {
                write!(
                    f,
                    "Checksum mismatch: expected {}, got {}. The downloaded artifact was discarded.",
                    expected, actual
                )
            }
            InstallError::ExtractionError(msg) => {
                write!(f, "Failed to extract archive: {}", msg)
            }
            InstallError::InstallPermissionDenied(msg) => {
                write!(f, "Cannot write to install directory: {}", msg)
            }
            InstallError::SmokeTestFailed(msg) => {
                write!(f, "Installed binary failed its smoke test: {}", msg)
            }
        }
    }
}

impl std::error::Error for InstallError {}
