//! Image forwarding: copy an image from one registry reference to another
//! without a container daemon.
//!
//! The source is pulled into an OCI layout, packed into a gzip tarball,
//! unpacked into a fresh layout and pushed from there. Every step runs inside
//! a `tmp_remote_image_*` directory that is removed when forwarding ends,
//! whether it succeeded or not.

use dockerless_core::error::{DockerlessError, Result};

use crate::oci::archive;
use crate::oci::layout::ImageLayout;
use crate::oci::registry::{registry_error, ForwardResult, RegistryClient};

/// Prefix of the per-forward working directory.
pub const WORK_DIR_PREFIX: &str = "tmp_remote_image_";

/// Forward `source` to `target`, returning the digest of the pushed manifest.
pub async fn forward_image(
    client: &RegistryClient,
    source: &str,
    target: &str,
) -> Result<ForwardResult> {
    let src = client.resolve(source).map_err(|e| e.context("source"))?;
    let dst = client.resolve(target).map_err(|e| e.context("target"))?;

    tracing::info!(
        source = %src.reference,
        target = %dst.reference,
        "Forwarding image"
    );

    // Source metadata, resolving multi-arch indexes to the configured platform
    let (manifest, source_digest) = client
        .client
        .pull_image_manifest(&src.oci, &src.auth.to_oci_auth())
        .await
        .map_err(|e| {
            registry_error(
                &src.reference,
                format!("error retrieving metadata for source image: {}", e),
            )
        })?;

    tracing::debug!(
        source = %src.reference,
        digest = %source_digest,
        layers = manifest.layers.len(),
        "Retrieved source manifest"
    );

    std::fs::create_dir_all(&client.work_dir)?;
    let work_dir = tempfile::Builder::new()
        .prefix(WORK_DIR_PREFIX)
        .tempdir_in(&client.work_dir)
        .map_err(|e| {
            DockerlessError::OciImageError(format!(
                "error creating temporary file for source image: {}",
                e
            ))
        })?;
    let archive_path = work_dir.path().join("image.tgz");

    // Pull into a layout and pack it
    let pulled = ImageLayout::create(&work_dir.path().join("pull"))
        .map_err(|e| e.context("error pulling source image"))?;
    client
        .pull_to_layout(&src, &manifest, &source_digest, &pulled)
        .await
        .map_err(|e| e.context("error pulling source image"))?;
    let archive_size = archive::pack(pulled.root(), &archive_path)
        .map_err(|e| e.context("error pulling source image"))?;
    if let Err(e) = std::fs::remove_dir_all(pulled.root()) {
        tracing::debug!(error = %e, "Failed to remove pulled layout");
    }

    tracing::debug!(
        archive = %archive_path.display(),
        size = archive_size,
        "Saved source image archive"
    );

    // Reload from the archive
    let reload_dir = work_dir.path().join("push");
    let image = archive::unpack(&archive_path, &reload_dir)
        .and_then(|_| ImageLayout::open(&reload_dir))
        .and_then(|layout| layout.load_image())
        .map_err(|e| e.context(format!("loading {} as tarball", archive_path.display())))?;
    let size_bytes = image.size_bytes();

    // Push and read back the digest the registry assigned
    client
        .push_image(&dst, image)
        .await
        .map_err(|e| e.context("error pushing image"))?;
    let digest = client
        .target_digest(&dst)
        .await
        .map_err(|e| e.context("error resolving pushed image digest"))?;

    tracing::trace!(digest = %digest, "Pushed Image");

    Ok(ForwardResult {
        source_digest,
        reference: dst.reference.with_digest(&digest),
        digest,
        size_bytes,
    })
}
