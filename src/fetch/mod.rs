//! Download and integrity verification of a resolved artifact.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::cleanup::SharedCleanupContext;
use crate::error::InstallError;
use crate::http::HttpClient;
use crate::manifest::Sha256Digest;
use crate::resolver::ArtifactDescriptor;
use crate::runtime::Runtime;

/// Download the artifact and verify its digest.
///
/// Returns the path of the verified archive in the temp directory. The path
/// stays registered in the cleanup context; the caller unregisters and
/// removes it once extraction is done.
///
/// On any failure nothing verified is left behind: a partial or corrupt
/// download is deleted before the error propagates.
#[tracing::instrument(skip(runtime, http_client, cleanup_ctx))]
pub async fn fetch_and_verify<R: Runtime>(
    runtime: &R,
    http_client: &HttpClient,
    descriptor: &ArtifactDescriptor,
    cleanup_ctx: SharedCleanupContext,
) -> Result<PathBuf> {
    // pid plus a sequence number keeps concurrent invocations apart
    static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let temp_path = runtime.temp_dir().join(format!(
        "{}.{}.{}",
        descriptor.filename,
        std::process::id(),
        seq
    ));

    {
        let mut ctx = cleanup_ctx.lock().unwrap();
        ctx.add(temp_path.clone());
    }

    info!("Downloading {}...", descriptor.url);
    let download = {
        let temp_path = temp_path.clone();
        http_client
            .download_file(&descriptor.url, || {
                runtime.create_file(&temp_path).with_context(|| {
                    format!("Failed to create temporary file at {:?}", temp_path)
                })
            })
            .await
    };

    if let Err(e) = download {
        discard(runtime, &cleanup_ctx, &temp_path);
        return Err(anyhow::Error::from(InstallError::DownloadFailed(format!("{:#}", e))));
    }

    debug!("Verifying digest of {:?}", temp_path);
    let actual = match compute_digest(runtime, &temp_path) {
        Ok(digest) => digest,
        Err(e) => {
            discard(runtime, &cleanup_ctx, &temp_path);
            return Err(e);
        }
    };

    if actual != descriptor.checksum {
        discard(runtime, &cleanup_ctx, &temp_path);
        return Err(InstallError::IntegrityMismatch {
            expected: descriptor.checksum.as_str().to_string(),
            actual: actual.as_str().to_string(),
        }
        .into());
    }

    info!("Digest verified: {}", actual);
    Ok(temp_path)
}

fn compute_digest<R: Runtime>(runtime: &R, path: &std::path::Path) -> Result<Sha256Digest> {
    let reader = runtime
        .open(path)
        .with_context(|| format!("Failed to reopen downloaded archive at {:?}", path))?;
    Sha256Digest::of_reader(reader)
}

/// Delete a failed download and unregister it.
fn discard<R: Runtime>(
    runtime: &R,
    cleanup_ctx: &SharedCleanupContext,
    path: &std::path::Path,
) {
    if runtime.exists(path) {
        let _ = runtime.remove_file(path);
    }
    let mut ctx = cleanup_ctx.lock().unwrap();
    ctx.remove(path);
}
