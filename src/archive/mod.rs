//! Extraction of the release binary from its tar.gz archive.
//!
//! Release archives contain a single executable entry named `vitals`,
//! sometimes under a leading directory. Extraction streams exactly that
//! entry to a staging path; the archive is never unpacked wholesale.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::Result;
use flate2::read::GzDecoder;
use log::debug;
use tar::Archive;

use crate::error::InstallError;
use crate::runtime::Runtime;

/// Trait for pulling the expected binary out of a downloaded archive.
#[cfg_attr(test, mockall::automock)]
pub trait Extractor: Send + Sync {
    /// Extract the entry named `binary_name` from `archive_path` to `dest`.
    fn extract_binary<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        binary_name: &str,
        dest: &Path,
    ) -> Result<()>;
}

/// Extractor for gzip-compressed tarballs, the only format the release ships.
pub struct TarGzExtractor;

impl Extractor for TarGzExtractor {
    #[tracing::instrument(skip(self, runtime))]
    fn extract_binary<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        binary_name: &str,
        dest: &Path,
    ) -> Result<()> {
        let reader = runtime.open(archive_path)?;
        let decoder = GzDecoder::new(reader);
        let mut archive = Archive::new(decoder);

        let entries = archive.entries().map_err(|e| {
            InstallError::ExtractionError(format!("not a valid tar.gz archive: {}", e))
        })?;

        for entry in entries {
            let mut entry = entry.map_err(|e| {
                InstallError::ExtractionError(format!("corrupt archive entry: {}", e))
            })?;

            if entry.header().entry_type() != tar::EntryType::Regular {
                continue;
            }

            let is_binary = {
                let path = entry.path().map_err(|e| {
                    InstallError::ExtractionError(format!("unreadable entry path: {}", e))
                })?;
                path.file_name()
                    .is_some_and(|name| name == std::ffi::OsStr::new(binary_name))
            };
            if !is_binary {
                continue;
            }

            debug!("Extracting '{}' to {:?}", binary_name, dest);
            let mut writer = runtime.create_file(dest)?;
            let mut buf = [0u8; 64 * 1024];
            loop {
                let n = entry.read(&mut buf).map_err(|e| {
                    InstallError::ExtractionError(format!("truncated archive entry: {}", e))
                })?;
                if n == 0 {
                    break;
                }
                writer.write_all(&buf[..n]).map_err(|e| {
                    InstallError::ExtractionError(format!("failed to write binary: {}", e))
                })?;
            }
            return Ok(());
        }

        Err(InstallError::ExtractionError(format!(
            "archive has no entry named '{}'",
            binary_name
        ))
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::fs::{self, File};
    use std::io::Write;
    use tar::Builder;
    use tempfile::tempdir;

    fn create_test_archive(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let enc = GzEncoder::new(file, Compression::default());
        let mut tar = Builder::new(enc);

        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            tar.append(&header, content.as_bytes()).unwrap();
        }

        tar.finish().unwrap();
    }

    fn expect_extraction_error(result: Result<()>) {
        let err = result.unwrap_err();
        assert!(
            err.downcast_ref::<InstallError>()
                .is_some_and(|e| matches!(e, InstallError::ExtractionError(_))),
            "expected ExtractionError, got: {:#}",
            err
        );
    }

    #[test]
    fn test_extracts_top_level_binary() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("vitals-linux-arm64.tar.gz");
        let dest = dir.path().join("staged");

        create_test_archive(&archive_path, &[("vitals", "binary bytes")]);

        TarGzExtractor
            .extract_binary(&RealRuntime, &archive_path, "vitals", &dest)
            .unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "binary bytes");
    }

    #[test]
    fn test_extracts_binary_under_leading_directory() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("vitals-darwin-arm64.tar.gz");
        let dest = dir.path().join("staged");

        create_test_archive(
            &archive_path,
            &[
                ("vitals-0.1.0/README.md", "docs"),
                ("vitals-0.1.0/vitals", "the binary"),
            ],
        );

        TarGzExtractor
            .extract_binary(&RealRuntime, &archive_path, "vitals", &dest)
            .unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "the binary");
    }

    #[test]
    fn test_missing_entry_is_extraction_error() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("empty.tar.gz");
        let dest = dir.path().join("staged");

        create_test_archive(&archive_path, &[("README.md", "no binary here")]);

        let result =
            TarGzExtractor.extract_binary(&RealRuntime, &archive_path, "vitals", &dest);
        expect_extraction_error(result);
        assert!(!dest.exists());
    }

    #[test]
    fn test_malformed_archive_is_extraction_error() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("garbage.tar.gz");
        let dest = dir.path().join("staged");

        let mut file = File::create(&archive_path).unwrap();
        file.write_all(b"this is not a gzip stream").unwrap();

        let result =
            TarGzExtractor.extract_binary(&RealRuntime, &archive_path, "vitals", &dest);
        expect_extraction_error(result);
    }

    #[test]
    fn test_directory_entry_named_like_binary_is_skipped() {
        let dir = tempdir().unwrap();
        let archive_path = dir.path().join("dir.tar.gz");
        let dest = dir.path().join("staged");

        // A directory entry named "vitals" must not satisfy the lookup.
        let file = File::create(&archive_path).unwrap();
        let enc = GzEncoder::new(file, Compression::default());
        let mut tar = Builder::new(enc);
        let mut header = tar::Header::new_gnu();
        header.set_path("vitals/").unwrap();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        header.set_cksum();
        tar.append(&header, std::io::empty()).unwrap();
        tar.finish().unwrap();

        let result =
            TarGzExtractor.extract_binary(&RealRuntime, &archive_path, "vitals", &dest);
        expect_extraction_error(result);
    }
}
