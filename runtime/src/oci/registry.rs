//! Registry client for forwarding images between registries.
//!
//! Uses the `oci-distribution` crate for manifest and blob transfer. Manifest
//! deletion, which that crate does not offer, goes through `reqwest` with the
//! registry's token challenge.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dockerless_core::config::{Platform, ProviderConfig};
use dockerless_core::error::{DockerlessError, Result};
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::manifest::{
    ImageIndexEntry, OciDescriptor, OciImageManifest, IMAGE_MANIFEST_MEDIA_TYPE, OCI_IMAGE_MEDIA_TYPE,
};
use oci_distribution::{Client, Reference, RegistryOperation};
use reqwest::header::{HeaderValue, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use super::auth::{RegistryAuth, RegistryAuthMap};
use super::challenge::{AuthChallenge, TokenResponse};
use super::layout::{verify_digest, ImageLayout, LoadedImage};
use super::reference::ImageReference;

/// Metadata returned by a manifest HEAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageDescriptor {
    /// Fully qualified reference that was inspected
    pub reference: String,
    /// Manifest digest (e.g., "sha256:abc123...")
    pub digest: String,
}

/// Outcome of forwarding an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardResult {
    /// Registry digest of the source manifest
    pub source_digest: String,
    /// Registry digest of the pushed target manifest
    pub digest: String,
    /// Target repository pinned at `digest`
    pub reference: String,
    /// Bytes of config and layer blobs pushed
    pub size_bytes: u64,
}

/// Registry operations the remote image resource is built on.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Fetch the manifest digest of `reference`.
    async fn head(&self, reference: &str) -> Result<ImageDescriptor>;

    /// Delete the manifest `reference` points at, exactly as referenced.
    async fn delete(&self, reference: &str) -> Result<()>;

    /// Copy `source` to `target`, returning the pushed digest.
    async fn forward_image(&self, source: &str, target: &str) -> Result<ForwardResult>;
}

/// A reference parsed and paired with the credentials for its registry.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    pub reference: ImageReference,
    pub oci: Reference,
    pub auth: RegistryAuth,
}

/// Registry client configured from the provider block.
pub struct RegistryClient {
    pub(crate) client: Client,
    pub(crate) http: reqwest::Client,
    pub(crate) registries: RegistryAuthMap,
    pub(crate) insecure_registries: Vec<String>,
    pub(crate) work_dir: PathBuf,
}

impl RegistryClient {
    /// Create a client from provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let protocol = if config.insecure_registries.is_empty() {
            ClientProtocol::Https
        } else {
            ClientProtocol::HttpsExcept(config.insecure_registries.clone())
        };
        let platform = config.platform.clone();
        let client_config = ClientConfig {
            protocol,
            platform_resolver: Some(Box::new(move |manifests: &[ImageIndexEntry]| {
                select_platform(&platform, manifests)
            })),
            ..Default::default()
        };

        let http = reqwest::Client::builder()
            .user_agent(concat!("dockerless/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DockerlessError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: Client::new(client_config),
            http,
            registries: RegistryAuthMap::from_config(&config.registry_auth),
            insecure_registries: config.insecure_registries.clone(),
            work_dir: config.work_dir(),
        })
    }

    /// Credentials known to this client.
    pub fn registries(&self) -> &RegistryAuthMap {
        &self.registries
    }

    /// Directory the intermediate archive is created in.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Parse `name` and attach the credentials configured for its registry.
    pub fn resolve(&self, name: &str) -> Result<ResolvedReference> {
        let reference = ImageReference::parse(name)?;
        let oci = reference.to_oci_reference()?;
        let auth = self.registries.auth_for(&reference.registry_key());
        tracing::debug!(
            reference = %reference,
            registry = %reference.registry_key(),
            authenticated = !auth.is_anonymous(),
            "Resolved reference"
        );
        Ok(ResolvedReference {
            reference,
            oci,
            auth,
        })
    }

    /// Fetch the manifest digest of `name` without pulling it.
    pub async fn head_manifest(&self, name: &str) -> Result<ImageDescriptor> {
        let resolved = self.resolve(name)?;
        let digest = self
            .client
            .fetch_manifest_digest(&resolved.oci, &resolved.auth.to_oci_auth())
            .await
            .map_err(|e| {
                registry_error(
                    &resolved.reference,
                    format!("unable to retrieve image metadata: {}", e),
                )
            })?;

        Ok(ImageDescriptor {
            reference: resolved.reference.full_reference(),
            digest,
        })
    }

    /// Delete the manifest addressed by `name`.
    ///
    /// A tag reference deletes only that tag's manifest entry as the registry
    /// implements it; the reference is never widened to its digest.
    pub async fn delete_manifest(&self, name: &str) -> Result<()> {
        let resolved = self.resolve(name)?;
        let url = format!(
            "{}://{}/v2/{}/manifests/{}",
            self.scheme(resolved.oci.registry()),
            resolved.oci.resolve_registry(),
            resolved.oci.repository(),
            resolved.reference.manifest_reference()
        );

        tracing::info!(reference = %resolved.reference, "Deleting remote image");

        let send_error = |e: reqwest::Error| {
            registry_error(
                &resolved.reference,
                format!("unable to delete remote image: {}", e),
            )
        };

        let mut response = self.http.delete(&url).send().await.map_err(send_error)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .and_then(AuthChallenge::parse)
                .ok_or_else(|| {
                    registry_error(
                        &resolved.reference,
                        "unable to delete remote image: unauthorized without a usable challenge"
                            .to_string(),
                    )
                })?;

            let request = self.http.delete(&url);
            let request = match challenge {
                AuthChallenge::Basic { .. } => {
                    let (username, password) =
                        resolved.auth.basic_credentials().ok_or_else(|| {
                            registry_error(
                                &resolved.reference,
                                "unable to delete remote image: registry requires credentials"
                                    .to_string(),
                            )
                        })?;
                    request.basic_auth(username, Some(password))
                }
                AuthChallenge::Bearer {
                    realm,
                    service,
                    scope,
                } => {
                    let scope = scope.unwrap_or_else(|| {
                        format!("repository:{}:delete", resolved.oci.repository())
                    });
                    let token = self
                        .fetch_token(&resolved, &realm, service.as_deref(), &scope)
                        .await?;
                    request.bearer_auth(token)
                }
            };
            response = request.send().await.map_err(send_error)?;
        }

        let status = response.status();
        if status.is_success() {
            tracing::info!(reference = %resolved.reference, "Remote image deleted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(registry_error(
            &resolved.reference,
            format!(
                "unable to delete remote image: {} {}",
                status,
                body.trim()
            ),
        ))
    }

    /// Exchange credentials for a bearer token at `realm`.
    async fn fetch_token(
        &self,
        resolved: &ResolvedReference,
        realm: &str,
        service: Option<&str>,
        scope: &str,
    ) -> Result<String> {
        let mut query: Vec<(&str, &str)> = vec![("scope", scope)];
        if let Some(service) = service {
            query.push(("service", service));
        }

        let mut request = self.http.get(realm).query(&query);
        if let Some((username, password)) = resolved.auth.basic_credentials() {
            request = request.basic_auth(username, Some(password));
        }

        let token_error = |message: String| {
            registry_error(
                &resolved.reference,
                format!("unable to delete remote image: token request failed: {}", message),
            )
        };

        let response = request.send().await.map_err(|e| token_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(token_error(response.status().to_string()));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| token_error(e.to_string()))?;
        token
            .into_token()
            .ok_or_else(|| token_error("no token in response".to_string()))
    }

    /// Pull the manifest bytes, config and layer blobs into `layout`.
    ///
    /// The manifest is fetched raw by `digest` so the pushed copy is
    /// byte-identical to the source.
    pub(crate) async fn pull_to_layout(
        &self,
        source: &ResolvedReference,
        manifest: &OciImageManifest,
        digest: &str,
        layout: &ImageLayout,
    ) -> Result<()> {
        let pinned = Reference::with_digest(
            source.oci.registry().to_string(),
            source.oci.repository().to_string(),
            digest.to_string(),
        );
        let (manifest_bytes, _) = self
            .client
            .pull_manifest_raw(
                &pinned,
                &source.auth.to_oci_auth(),
                &[OCI_IMAGE_MEDIA_TYPE, IMAGE_MANIFEST_MEDIA_TYPE],
            )
            .await
            .map_err(|e| {
                registry_error(
                    &source.reference,
                    format!("Failed to pull manifest {}: {}", digest, e),
                )
            })?;

        self.pull_blob_to_file(source, &manifest.config, layout)
            .await?;

        for layer in &manifest.layers {
            tracing::debug!(
                digest = %layer.digest,
                size = layer.size,
                "Pulling layer"
            );
            self.pull_blob_to_file(source, layer, layout).await?;
        }

        let media_type = manifest
            .media_type
            .clone()
            .unwrap_or_else(|| OCI_IMAGE_MEDIA_TYPE.to_string());
        let written = layout.write_manifest(
            &manifest_bytes,
            &media_type,
            &source.reference.full_reference(),
        )?;
        if written != digest {
            return Err(DockerlessError::OciImageError(format!(
                "Manifest digest mismatch: registry reported {}, content is {}",
                digest, written
            )));
        }
        Ok(())
    }

    async fn pull_blob_to_file(
        &self,
        source: &ResolvedReference,
        descriptor: &OciDescriptor,
        layout: &ImageLayout,
    ) -> Result<()> {
        let path = layout.blob_path(&descriptor.digest)?;
        let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
            DockerlessError::OciImageError(format!(
                "Failed to create blob {}: {}",
                descriptor.digest, e
            ))
        })?;

        self.client
            .pull_blob(&source.oci, descriptor, &mut file)
            .await
            .map_err(|e| {
                registry_error(
                    &source.reference,
                    format!("Failed to pull blob {}: {}", descriptor.digest, e),
                )
            })?;

        file.flush().await?;

        let data = tokio::fs::read(&path).await?;
        verify_digest(&descriptor.digest, &data).map_err(|e| {
            registry_error(
                &source.reference,
                format!("Failed to pull blob {}: {}", descriptor.digest, e),
            )
        })
    }

    /// Push layers, config and the verbatim manifest of a reloaded image.
    pub(crate) async fn push_image(
        &self,
        target: &ResolvedReference,
        image: LoadedImage,
    ) -> Result<String> {
        tracing::info!(
            reference = %target.reference,
            layers = image.layers.len(),
            size = image.size_bytes(),
            "Pushing image to registry"
        );

        let push_error = |e: oci_distribution::errors::OciDistributionError| {
            registry_error(&target.reference, e.to_string())
        };

        let auth = target.auth.to_oci_auth();
        self.client
            .auth(&target.oci, &auth, RegistryOperation::Push)
            .await
            .map_err(push_error)?;

        for (descriptor, layer) in image.manifest.layers.iter().zip(&image.layers) {
            tracing::debug!(digest = %descriptor.digest, size = layer.data.len(), "Pushing layer");
            self.client
                .push_blob(&target.oci, &layer.data, &descriptor.digest)
                .await
                .map_err(push_error)?;
        }
        self.client
            .push_blob(&target.oci, &image.config.data, &image.manifest.config.digest)
            .await
            .map_err(push_error)?;

        let content_type = HeaderValue::from_str(&image.entry.media_type).map_err(|e| {
            DockerlessError::OciImageError(format!(
                "Invalid manifest media type '{}': {}",
                image.entry.media_type, e
            ))
        })?;
        let manifest_url = self
            .client
            .push_manifest_raw(&target.oci, image.manifest_bytes, content_type)
            .await
            .map_err(push_error)?;

        tracing::info!(
            reference = %target.reference,
            manifest_url = %manifest_url,
            "Image pushed successfully"
        );
        Ok(manifest_url)
    }

    /// Registry digest of the manifest at `target`.
    pub(crate) async fn target_digest(&self, target: &ResolvedReference) -> Result<String> {
        self.client
            .fetch_manifest_digest(&target.oci, &target.auth.to_oci_auth())
            .await
            .map_err(|e| registry_error(&target.reference, e.to_string()))
    }

    fn scheme(&self, registry: &str) -> &'static str {
        if self.insecure_registries.iter().any(|r| r == registry) {
            "http"
        } else {
            "https"
        }
    }
}

#[async_trait]
impl ImageRegistry for RegistryClient {
    async fn head(&self, reference: &str) -> Result<ImageDescriptor> {
        self.head_manifest(reference).await
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        self.delete_manifest(reference).await
    }

    async fn forward_image(&self, source: &str, target: &str) -> Result<ForwardResult> {
        crate::forward::forward_image(self, source, target).await
    }
}

pub(crate) fn registry_error(reference: &ImageReference, message: String) -> DockerlessError {
    DockerlessError::RegistryError {
        registry: reference.registry.clone(),
        message,
    }
}

/// Pick the index entry matching `platform`.
///
/// A configured variant must match exactly; without one, the first entry
/// for the os/architecture wins.
pub fn select_platform(platform: &Platform, manifests: &[ImageIndexEntry]) -> Option<String> {
    manifests
        .iter()
        .find(|entry| {
            entry.platform.as_ref().map_or(false, |p| {
                p.os == platform.os
                    && p.architecture == platform.architecture
                    && platform
                        .variant
                        .as_ref()
                        .map_or(true, |v| p.variant.as_ref() == Some(v))
            })
        })
        .map(|entry| entry.digest.clone())
}
