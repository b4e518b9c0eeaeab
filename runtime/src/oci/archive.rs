//! Intermediate image archive.
//!
//! A pulled image layout is packed into a gzip tarball before it is pushed,
//! and unpacked into a fresh directory to be reloaded. The tarball is the
//! only thing that crosses from the pull side to the push side.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use dockerless_core::error::{DockerlessError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Pack the directory `src_dir` into a gzip tarball at `archive_path`.
///
/// Returns the archive size in bytes.
pub fn pack(src_dir: &Path, archive_path: &Path) -> Result<u64> {
    let file = File::create(archive_path).map_err(|e| {
        DockerlessError::ArchiveError(format!(
            "Failed to create {}: {}",
            archive_path.display(),
            e
        ))
    })?;

    // Layers are already compressed, favour speed.
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::fast());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(".", src_dir)
        .map_err(|e| DockerlessError::ArchiveError(format!("Failed to archive image: {}", e)))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| DockerlessError::ArchiveError(format!("Failed to finalize archive: {}", e)))?;
    let mut writer = encoder
        .finish()
        .map_err(|e| DockerlessError::ArchiveError(format!("Failed to finalize archive: {}", e)))?;
    std::io::Write::flush(&mut writer)
        .map_err(|e| DockerlessError::ArchiveError(format!("Failed to flush archive: {}", e)))?;

    let size = std::fs::metadata(archive_path).map(|m| m.len())?;
    Ok(size)
}

/// Unpack the gzip tarball at `archive_path` into `dest_dir`.
pub fn unpack(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    if !archive_path.is_file() {
        return Err(DockerlessError::ArchiveError(format!(
            "Archive not found: {}",
            archive_path.display()
        )));
    }
    let file = File::open(archive_path).map_err(|e| {
        DockerlessError::ArchiveError(format!(
            "Failed to open {}: {}",
            archive_path.display(),
            e
        ))
    })?;
    std::fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .unpack(dest_dir)
        .map_err(|e| DockerlessError::ArchiveError(format!("Failed to extract archive: {}", e)))?;
    Ok(())
}
