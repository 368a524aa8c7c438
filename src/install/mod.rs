//! The install pipeline: resolve, fetch and verify, extract, place, smoke-test.
//!
//! A linear sequence with no internal retries. The only shared state across
//! invocations is the installed binary itself, which is always written via
//! temp-file-plus-rename: two racing installs cannot interleave into a
//! corrupt executable, the last rename simply wins.

use anyhow::Result;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    archive::Extractor,
    cleanup::{self, CleanupGuard, SharedCleanupContext},
    error::InstallError,
    fetch::fetch_and_verify,
    http::HttpClient,
    manifest::{self, ChecksumManifest},
    platform::Platform,
    resolver::{ArtifactDescriptor, BINARY_NAME, ReleaseVersion},
    runtime::Runtime,
    smoke,
};

pub mod config;
mod paths;

use config::Config;
pub use paths::{BIN_DIR_ENV, resolve_bin_dir};

/// Mode bits for the installed executable.
const BINARY_MODE: u32 = 0o755;

/// What the user asked for, as parsed by the CLI.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Requested release version, e.g. `0.1.0` or `v0.1.0`.
    pub version: String,
    /// Platform override; detected from the host when absent.
    pub platform: Option<Platform>,
    /// Install directory override.
    pub bin_dir: Option<PathBuf>,
    /// Checksum manifest override.
    pub manifest: Option<PathBuf>,
    /// Release host base URL.
    pub base_url: String,
    /// Skip the post-install smoke test.
    pub skip_smoke: bool,
}

/// The installed executable on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    pub path: PathBuf,
}

/// Outcome of a completed install.
///
/// `smoke` is `None` when skipped; an `Err` value means "installed but
/// possibly broken" and does not fail the invocation.
#[derive(Debug)]
pub struct InstallReport {
    pub binary: InstalledBinary,
    pub smoke: Option<Result<(), InstallError>>,
}

/// Entry point for the `install` command.
#[tracing::instrument(skip(runtime, request))]
pub async fn install<R: Runtime + 'static>(
    runtime: R,
    request: InstallRequest,
    timeout_secs: u64,
) -> Result<InstallReport> {
    let config = Config::new(timeout_secs)?;
    let installer = Installer::new(runtime, config.client, config.extractor);
    installer.install(&request).await
}

/// Entry point for the `resolve` command: print the descriptor, touch
/// nothing, fetch nothing.
#[tracing::instrument(skip(runtime, request))]
pub fn resolve_artifact<R: Runtime>(runtime: R, request: &InstallRequest) -> Result<()> {
    let (version, platform, descriptor) = resolve_descriptor(&runtime, request)?;
    println!("version   {}", version);
    println!("platform  {}", platform);
    println!("url       {}", descriptor.url);
    println!("sha256    {}", descriptor.checksum);
    Ok(())
}

/// Resolve the request to a concrete descriptor.
///
/// Everything here is configuration: version syntax, platform support, and
/// the checksum manifest are all validated before any network access.
fn resolve_descriptor<R: Runtime>(
    runtime: &R,
    request: &InstallRequest,
) -> Result<(ReleaseVersion, Platform, ArtifactDescriptor)> {
    let version: ReleaseVersion = request.version.parse()?;
    let platform = match request.platform {
        Some(platform) => platform,
        None => Platform::detect()?,
    };

    let manifest_path = manifest::manifest_path(runtime, request.manifest.clone())?;
    let checksums = ChecksumManifest::load(runtime, &manifest_path)?;
    let descriptor = crate::resolver::resolve(&request.base_url, &version, &platform, &checksums)?;

    Ok((version, platform, descriptor))
}

pub struct Installer<R: Runtime, E: Extractor> {
    pub runtime: R,
    pub client: HttpClient,
    pub extractor: E,
}

impl<R: Runtime + 'static, E: Extractor> Installer<R, E> {
    pub fn new(runtime: R, client: HttpClient, extractor: E) -> Self {
        Self {
            runtime,
            client,
            extractor,
        }
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn install(&self, request: &InstallRequest) -> Result<InstallReport> {
        let (version, platform, descriptor) = resolve_descriptor(&self.runtime, request)?;
        println!("   resolving {} {} for {}", BINARY_NAME, version, platform);

        let bin_dir = resolve_bin_dir(&self.runtime, request.bin_dir.clone())?;

        // Interruption at any stage removes staged files only; a previously
        // installed binary is never registered for cleanup.
        let cleanup_ctx = cleanup::new_shared();
        let cleanup_ctx_clone = Arc::clone(&cleanup_ctx);
        let ctrl_c_handler = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted, cleaning up...");
                cleanup_ctx_clone.lock().unwrap().cleanup();
                std::process::exit(130); // Standard exit code for Ctrl-C
            }
        });

        let result = self
            .run_pipeline(&descriptor, &bin_dir, Arc::clone(&cleanup_ctx))
            .await;

        ctrl_c_handler.abort();

        let binary = result?;
        println!(
            "   installed {} {} {}",
            BINARY_NAME,
            version,
            binary.path.display()
        );

        let smoke = if request.skip_smoke {
            None
        } else {
            let outcome = smoke::smoke_test(&self.runtime, &binary.path);
            match &outcome {
                Ok(()) => println!("      tested {} responds to --help", BINARY_NAME),
                Err(e) => warn!("{}", e),
            }
            Some(outcome)
        };

        Ok(InstallReport { binary, smoke })
    }

    /// Fetch, verify, extract, and atomically place the binary.
    async fn run_pipeline(
        &self,
        descriptor: &ArtifactDescriptor,
        bin_dir: &Path,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<InstalledBinary> {
        println!(" downloading {}", descriptor.url);
        let archive_path = fetch_and_verify(
            &self.runtime,
            &self.client,
            descriptor,
            Arc::clone(&cleanup_ctx),
        )
        .await?;

        println!("  installing {}", descriptor.filename);
        let result = self.extract_and_place(&archive_path, bin_dir, &cleanup_ctx);

        // The verified archive is consumed either way.
        {
            let mut ctx = cleanup_ctx.lock().unwrap();
            ctx.remove(&archive_path);
        }
        if self.runtime.exists(&archive_path)
            && let Err(e) = self.runtime.remove_file(&archive_path)
        {
            warn!("Failed to clean up archive at {:?}: {:#}", archive_path, e);
        }

        result
    }

    fn extract_and_place(
        &self,
        archive_path: &Path,
        bin_dir: &Path,
        cleanup_ctx: &SharedCleanupContext,
    ) -> Result<InstalledBinary> {
        if !self.runtime.exists(bin_dir) {
            debug!("Creating install directory {:?}", bin_dir);
            self.runtime
                .create_dir_all(bin_dir)
                .map_err(|e| self.permission_error(e, bin_dir))?;
        }

        let final_path = bin_dir.join(BINARY_NAME);
        let staging = bin_dir.join(format!(".{}.tmp-{}", BINARY_NAME, std::process::id()));
        let guard = CleanupGuard::new(Arc::clone(cleanup_ctx), staging.clone());

        // Probe writability up front so a read-only bin dir reports as a
        // permission problem, not an extraction failure.
        self.runtime
            .create_file(&staging)
            .map(drop)
            .map_err(|e| self.permission_error(e, bin_dir))?;

        if let Err(e) = self.extractor.extract_binary(
            &self.runtime,
            archive_path,
            BINARY_NAME,
            &staging,
        ) {
            let _ = self.runtime.remove_file(&staging);
            return Err(e);
        }

        if let Err(e) = self.runtime.set_permissions(&staging, BINARY_MODE) {
            let _ = self.runtime.remove_file(&staging);
            return Err(e);
        }

        // The atomic step: everything before this is invisible at the final
        // path; after it the new binary is complete. Concurrent installs race
        // benignly — last rename wins.
        if let Err(e) = self.runtime.rename(&staging, &final_path) {
            let _ = self.runtime.remove_file(&staging);
            return Err(self.permission_error(e, bin_dir));
        }
        guard.success();

        info!("Placed {:?}", final_path);
        Ok(InstalledBinary { path: final_path })
    }

    /// Rewrap filesystem errors caused by a read-only target directory.
    fn permission_error(&self, err: anyhow::Error, bin_dir: &Path) -> anyhow::Error {
        let denied = err.chain().any(|cause| {
            cause
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io| io.kind() == std::io::ErrorKind::PermissionDenied)
        });
        if !denied {
            return err;
        }

        let hint = if self.runtime.is_privileged() {
            String::new()
        } else {
            " (choose a writable --bin-dir, or rerun with sufficient privileges)".to_string()
        };
        anyhow::Error::from(InstallError::InstallPermissionDenied(format!(
            "{}{}",
            bin_dir.display(),
            hint
        )))
    }
}
