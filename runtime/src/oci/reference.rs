//! Registry reference parsing.
//!
//! Parses image references like `nullstone/tf-provider-test:v1` or
//! `123456789.dkr.ecr.us-east-1.amazonaws.com/app@sha256:...` into structured
//! components.

use dockerless_core::error::{DockerlessError, Result};
use oci_distribution::Reference;

/// Default registry when none is specified.
const DEFAULT_REGISTRY: &str = "docker.io";

/// Default tag when none is specified.
const DEFAULT_TAG: &str = "latest";

/// Canonical key for Docker Hub in credential maps.
pub const DOCKER_HUB_KEY: &str = "index.docker.io";

/// Parsed registry reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry hostname (e.g., "ghcr.io", "docker.io")
    pub registry: String,
    /// Repository path (e.g., "library/nginx", "nullstone/tf-provider-test")
    pub repository: String,
    /// Tag (e.g., "latest", "v1")
    pub tag: Option<String>,
    /// Digest (e.g., "sha256:abc123...")
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse an image reference string.
    ///
    /// Supports formats:
    /// - `nginx` → docker.io/library/nginx:latest
    /// - `nginx:1.25` → docker.io/library/nginx:1.25
    /// - `myuser/myimage` → docker.io/myuser/myimage:latest
    /// - `ghcr.io/org/image:tag` → ghcr.io/org/image:tag
    /// - `ghcr.io/org/image@sha256:abc...` → ghcr.io/org/image@sha256:abc...
    /// - `localhost:5000/image` → localhost:5000/image:latest
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |message: String| DockerlessError::InvalidReference {
            reference: reference.to_string(),
            message,
        };

        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(invalid("Empty image reference".to_string()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid("Reference contains whitespace".to_string()));
        }

        // Digest first (@ separator)
        let (name_tag, digest) = match trimmed.rfind('@') {
            Some(at_pos) => {
                let digest_part = &trimmed[at_pos + 1..];
                match digest_part.split_once(':') {
                    Some((algo, hex)) if !algo.is_empty() && !hex.is_empty() => {}
                    _ => {
                        return Err(invalid(
                            "Invalid digest format: expected algorithm:hex".to_string(),
                        ))
                    }
                }
                (&trimmed[..at_pos], Some(digest_part.to_string()))
            }
            None => (trimmed, None),
        };

        // Tag: last colon after the last slash, so a registry port is never a tag
        let last_segment_start = name_tag.rfind('/').map(|p| p + 1).unwrap_or(0);
        let (name, tag) = match name_tag[last_segment_start..].rfind(':') {
            Some(colon) => {
                let colon = last_segment_start + colon;
                (&name_tag[..colon], Some(name_tag[colon + 1..].to_string()))
            }
            None => (name_tag, None),
        };

        if let Some(ref t) = tag {
            if t.is_empty() {
                return Err(invalid("Empty tag".to_string()));
            }
        }

        let (registry, repository) = Self::split_registry_repository(name)
            .map_err(invalid)?;

        // Apply default tag if no tag and no digest
        let tag = if tag.is_none() && digest.is_none() {
            Some(DEFAULT_TAG.to_string())
        } else {
            tag
        };

        Ok(ImageReference {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Split a name into registry and repository components.
    fn split_registry_repository(name: &str) -> std::result::Result<(String, String), String> {
        if name.is_empty() {
            return Err("Empty repository".to_string());
        }

        // The first component is a registry hostname if it contains a dot or
        // colon, or is "localhost"
        if let Some(slash_pos) = name.find('/') {
            let first = &name[..slash_pos];
            if first.contains('.') || first.contains(':') || first == "localhost" {
                let repo = &name[slash_pos + 1..];
                if repo.is_empty() {
                    return Err(format!("Empty repository in '{}'", name));
                }
                return Ok((first.to_string(), repo.to_string()));
            }
        }

        if name.split('/').any(str::is_empty) {
            return Err(format!("Empty path component in '{}'", name));
        }
        if name.chars().any(|c| c.is_ascii_uppercase()) {
            return Err("Repository name must be lowercase".to_string());
        }

        let repository = if name.contains('/') {
            name.to_string()
        } else {
            // Single name like "nginx" → "library/nginx" for Docker Hub
            format!("library/{}", name)
        };

        Ok((DEFAULT_REGISTRY.to_string(), repository))
    }

    /// Registry key used for credential lookup.
    ///
    /// Docker Hub aliases collapse to `index.docker.io`, the same name
    /// other registry tooling reports for Hub references.
    pub fn registry_key(&self) -> String {
        normalize_registry(&self.registry)
    }

    /// Tag or digest to address the manifest with.
    ///
    /// The digest wins when both are present.
    pub fn manifest_reference(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or(DEFAULT_TAG)
    }

    /// Reference to the same repository pinned at `digest`.
    pub fn with_digest(&self, digest: &str) -> String {
        format!("{}/{}@{}", self.registry, self.repository, digest)
    }

    /// Get the full reference string.
    pub fn full_reference(&self) -> String {
        let mut s = format!("{}/{}", self.registry, self.repository);
        if let Some(ref tag) = self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(ref digest) = self.digest {
            s.push('@');
            s.push_str(digest);
        }
        s
    }

    /// Convert to an oci-distribution Reference.
    ///
    /// A digest takes precedence over a tag, matching how the registry
    /// resolves `name:tag@digest`.
    pub fn to_oci_reference(&self) -> Result<Reference> {
        let ref_str = match (&self.digest, &self.tag) {
            (Some(digest), _) => format!("{}/{}@{}", self.registry, self.repository, digest),
            (None, Some(tag)) => format!("{}/{}:{}", self.registry, self.repository, tag),
            (None, None) => format!("{}/{}:{}", self.registry, self.repository, DEFAULT_TAG),
        };

        ref_str
            .parse::<Reference>()
            .map_err(|e| DockerlessError::InvalidReference {
                reference: self.full_reference(),
                message: e.to_string(),
            })
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_reference())
    }
}

impl std::str::FromStr for ImageReference {
    type Err = DockerlessError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Normalize registry names (e.g., "docker.io" and "registry-1.docker.io" → "index.docker.io").
pub fn normalize_registry(registry: &str) -> String {
    let r = registry.trim().to_lowercase();
    if r == "docker.io" || r == "registry-1.docker.io" {
        DOCKER_HUB_KEY.to_string()
    } else {
        r
    }
}
