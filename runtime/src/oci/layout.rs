//! OCI image layout on disk.
//!
//! The intermediate form of a forwarded image:
//!
//! ```text
//! image/
//! ├── oci-layout           {"imageLayoutVersion":"1.0.0"}
//! ├── index.json           single manifest entry, ref.name annotated
//! └── blobs/
//!     └── sha256/
//!         ├── <manifest>
//!         ├── <config>
//!         └── <layers>
//! ```

use std::path::{Path, PathBuf};

use dockerless_core::error::{DockerlessError, Result};
use oci_distribution::client::{Config, ImageLayer};
use oci_distribution::manifest::{OciImageManifest, OCI_IMAGE_MEDIA_TYPE};
use sha2::{Digest, Sha256};

/// Annotation carrying the reference the image was pulled from.
pub const REF_NAME_ANNOTATION: &str = "org.opencontainers.image.ref.name";

const OCI_LAYOUT_CONTENT: &str = r#"{"imageLayoutVersion":"1.0.0"}"#;

/// An OCI image layout rooted at a directory.
#[derive(Debug, Clone)]
pub struct ImageLayout {
    root: PathBuf,
}

/// Manifest entry read back from `index.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub digest: String,
    pub media_type: String,
    pub ref_name: Option<String>,
}

/// Image content loaded from a layout, ready to push.
pub struct LoadedImage {
    pub manifest: OciImageManifest,
    /// Manifest exactly as pulled; pushed verbatim so the digest is preserved
    pub manifest_bytes: Vec<u8>,
    pub config: Config,
    pub layers: Vec<ImageLayer>,
    pub entry: IndexEntry,
}

impl LoadedImage {
    /// Total size of config and layer blobs in bytes.
    pub fn size_bytes(&self) -> u64 {
        let layers: usize = self.layers.iter().map(|l| l.data.len()).sum();
        (layers + self.config.data.len()) as u64
    }
}

impl ImageLayout {
    /// Create an empty layout at `root`.
    pub fn create(root: &Path) -> Result<Self> {
        let blobs_dir = root.join("blobs").join("sha256");
        std::fs::create_dir_all(&blobs_dir).map_err(|e| {
            DockerlessError::OciImageError(format!(
                "Failed to create blobs directory {}: {}",
                blobs_dir.display(),
                e
            ))
        })?;
        std::fs::write(root.join("oci-layout"), OCI_LAYOUT_CONTENT).map_err(|e| {
            DockerlessError::OciImageError(format!("Failed to write oci-layout: {}", e))
        })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Open an existing layout, checking the required entries exist.
    pub fn open(root: &Path) -> Result<Self> {
        for entry in ["oci-layout", "index.json", "blobs"] {
            if !root.join(entry).exists() {
                return Err(DockerlessError::OciImageError(format!(
                    "Not a valid OCI layout: missing {} in {}",
                    entry,
                    root.display()
                )));
            }
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Root directory of the layout.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the blob with `digest` (`algorithm:hex`).
    pub fn blob_path(&self, digest: &str) -> Result<PathBuf> {
        let (algorithm, hex) = digest.split_once(':').ok_or_else(|| {
            DockerlessError::OciImageError(format!("Invalid digest '{}'", digest))
        })?;
        let valid_algorithm = !algorithm.is_empty()
            && algorithm
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c))
            && !algorithm.starts_with('.');
        let valid_hex = !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
        if !valid_algorithm || !valid_hex {
            return Err(DockerlessError::OciImageError(format!(
                "Invalid digest '{}'",
                digest
            )));
        }
        Ok(self.root.join("blobs").join(algorithm).join(hex))
    }

    /// Write a blob, verifying it hashes to `digest`.
    pub fn write_blob(&self, digest: &str, data: &[u8]) -> Result<()> {
        verify_digest(digest, data)?;
        let path = self.blob_path(digest)?;
        std::fs::write(&path, data).map_err(|e| {
            DockerlessError::OciImageError(format!("Failed to write blob {}: {}", digest, e))
        })
    }

    /// Read a blob, verifying it hashes to `digest`.
    pub fn read_blob(&self, digest: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(digest)?;
        let data = std::fs::read(&path).map_err(|e| {
            DockerlessError::OciImageError(format!("Failed to read blob {}: {}", digest, e))
        })?;
        verify_digest(digest, &data)?;
        Ok(data)
    }

    /// Store the source manifest bytes unchanged and point `index.json` at
    /// them. Returns the manifest digest.
    pub fn write_manifest(&self, manifest: &[u8], media_type: &str, ref_name: &str) -> Result<String> {
        let digest = sha256_digest(manifest);
        self.write_blob(&digest, manifest)?;

        let index = serde_json::json!({
            "schemaVersion": 2,
            "manifests": [{
                "mediaType": media_type,
                "digest": digest,
                "size": manifest.len(),
                "annotations": {
                    REF_NAME_ANNOTATION: ref_name,
                }
            }]
        });
        std::fs::write(
            self.root.join("index.json"),
            serde_json::to_string_pretty(&index)?,
        )
        .map_err(|e| DockerlessError::OciImageError(format!("Failed to write index.json: {}", e)))?;

        Ok(digest)
    }

    /// Read the single manifest entry from `index.json`.
    pub fn read_index_entry(&self) -> Result<IndexEntry> {
        let index_path = self.root.join("index.json");
        let index_data = std::fs::read_to_string(&index_path).map_err(|e| {
            DockerlessError::OciImageError(format!("Failed to read index.json: {}", e))
        })?;
        let index: serde_json::Value = serde_json::from_str(&index_data)?;

        let entry = &index["manifests"][0];
        let digest = entry["digest"].as_str().ok_or_else(|| {
            DockerlessError::OciImageError("No manifest digest in index.json".to_string())
        })?;
        let annotation = |key: &str| entry["annotations"][key].as_str().map(str::to_string);

        Ok(IndexEntry {
            digest: digest.to_string(),
            media_type: entry["mediaType"]
                .as_str()
                .unwrap_or(OCI_IMAGE_MEDIA_TYPE)
                .to_string(),
            ref_name: annotation(REF_NAME_ANNOTATION),
        })
    }

    /// Load manifest, config and layers, verifying every blob digest.
    pub fn load_image(&self) -> Result<LoadedImage> {
        let entry = self.read_index_entry()?;
        let manifest_data = self.read_blob(&entry.digest)?;
        let manifest: OciImageManifest = serde_json::from_slice(&manifest_data)?;

        let config_data = self.read_blob(&manifest.config.digest)?;
        let config = Config::new(config_data, manifest.config.media_type.clone(), None);

        let mut layers = Vec::with_capacity(manifest.layers.len());
        for layer_desc in &manifest.layers {
            let layer_data = self.read_blob(&layer_desc.digest)?;

            tracing::debug!(
                digest = %layer_desc.digest,
                size = layer_data.len(),
                "Read layer for push"
            );

            layers.push(ImageLayer::new(
                layer_data,
                layer_desc.media_type.clone(),
                None,
            ));
        }

        Ok(LoadedImage {
            manifest,
            manifest_bytes: manifest_data,
            config,
            layers,
            entry,
        })
    }
}

/// `sha256:<hex>` digest of `data`.
pub fn sha256_digest(data: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(data)))
}

/// Check `data` against `digest`. Only sha256 content can be verified.
pub fn verify_digest(digest: &str, data: &[u8]) -> Result<()> {
    if !digest.starts_with("sha256:") {
        return Err(DockerlessError::OciImageError(format!(
            "Unsupported digest algorithm in '{}'",
            digest
        )));
    }
    let actual = sha256_digest(data);
    if actual != digest {
        return Err(DockerlessError::OciImageError(format!(
            "Digest mismatch: expected {}, got {}",
            digest, actual
        )));
    }
    Ok(())
}
