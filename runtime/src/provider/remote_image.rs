//! `dockerless_remote_image` resource.
//!
//! Ensures the image at `target` is a copy of the image at `source` and
//! records the digest the target registry reports for it.

use std::sync::Arc;

use dockerless_core::config::RemoteImageDeclaration;
use serde::{Deserialize, Serialize};

use super::diagnostics::{
    Diagnostic, Diagnostics, DOCKER_REGISTRY_ERROR, INVALID_CONFIGURATION, INVALID_IMPORT_ID,
    INVALID_TARGET,
};
use super::schema::{Attribute, AttributeType, Schema};
use crate::oci::registry::ImageRegistry;
use dockerless_core::error::DockerlessError;

/// Resource type name.
pub const RESOURCE_TYPE_NAME: &str = "dockerless_remote_image";

/// Resource attributes as stored in state.
///
/// `source` and `target` are required in configuration but optional here:
/// a freshly imported resource only knows its digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteImageModel {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
}

impl RemoteImageModel {
    /// Planned values for a declaration; the digest is unknown until applied.
    pub fn from_declaration(declaration: &RemoteImageDeclaration) -> Self {
        Self {
            source: Some(declaration.source.clone()),
            target: Some(declaration.target.clone()),
            digest: None,
        }
    }

    /// Whether source and target equal the declared values.
    pub fn matches(&self, declaration: &RemoteImageDeclaration) -> bool {
        self.source.as_deref() == Some(declaration.source.as_str())
            && self.target.as_deref() == Some(declaration.target.as_str())
    }
}

/// Refreshed state plus any warnings raised while reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    pub state: RemoteImageModel,
    pub diagnostics: Diagnostics,
}

pub struct RemoteImageResource {
    registry: Arc<dyn ImageRegistry>,
}

impl RemoteImageResource {
    pub fn new(registry: Arc<dyn ImageRegistry>) -> Self {
        Self { registry }
    }

    pub fn schema() -> Schema {
        Schema {
            description: "This resource pushes an image to a target docker image repository \
                from a remote repository without using the docker daemon."
                .to_string(),
            attributes: vec![
                Attribute::required(
                    "source",
                    AttributeType::String,
                    "The docker image name and tag to source for pushing to the target image \
                     repository. The image must be public or accessible with the credentials \
                     configured for its registry.",
                ),
                Attribute::required(
                    "target",
                    AttributeType::String,
                    "The docker image name and tag to ensure exists in an image repository.",
                ),
                Attribute::computed(
                    "digest",
                    AttributeType::String,
                    "The digest of the target docker image.",
                ),
            ],
        }
    }

    /// Forward `source` to `target` and record the pushed digest.
    pub async fn create(&self, plan: &RemoteImageModel) -> Result<RemoteImageModel, Diagnostic> {
        self.forward(plan).await
    }

    /// Refresh the digest from the target registry.
    ///
    /// State without a target (a fresh import) is returned unchanged with a
    /// warning.
    pub async fn read(&self, state: &RemoteImageModel) -> Result<ReadResponse, Diagnostic> {
        let mut diagnostics = Diagnostics::new();
        let target = match state.target.as_deref() {
            Some(target) => target,
            None => {
                tracing::warn!(
                    digest = ?state.digest,
                    "Remote image has no target yet, keeping imported state"
                );
                diagnostics.push(Diagnostic::warning(
                    INVALID_TARGET,
                    "resource has no target yet; state is kept until source and target are applied",
                ));
                return Ok(ReadResponse {
                    state: state.clone(),
                    diagnostics,
                });
            }
        };

        let descriptor = self
            .registry
            .head(target)
            .await
            .map_err(|e| target_diagnostic(&e))?;

        if state.digest.as_deref() != Some(descriptor.digest.as_str()) {
            tracing::info!(
                target = %target,
                previous = ?state.digest,
                digest = %descriptor.digest,
                "Remote image digest changed"
            );
        }

        Ok(ReadResponse {
            state: RemoteImageModel {
                digest: Some(descriptor.digest),
                ..state.clone()
            },
            diagnostics,
        })
    }

    /// Forward the planned source to the planned target.
    ///
    /// A changed target is pushed to; the image at the previous target is
    /// left in place.
    pub async fn update(
        &self,
        plan: &RemoteImageModel,
        prior: &RemoteImageModel,
    ) -> Result<RemoteImageModel, Diagnostic> {
        if prior.target.is_some() && prior.target != plan.target {
            tracing::warn!(
                previous = ?prior.target,
                target = ?plan.target,
                "Target changed, previous target image is not removed"
            );
        }
        self.forward(plan).await
    }

    /// Delete the target reference.
    pub async fn delete(&self, state: &RemoteImageModel) -> Result<(), Diagnostic> {
        let target = state.target.as_deref().ok_or_else(|| {
            Diagnostic::error(INVALID_TARGET, "resource has no target to delete")
        })?;
        self.registry
            .delete(target)
            .await
            .map_err(|e| target_diagnostic(&e))
    }

    /// Import by ID: the ID is taken as the digest.
    pub fn import_state(&self, id: &str) -> Result<RemoteImageModel, Diagnostic> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Diagnostic::error(INVALID_IMPORT_ID, "import ID must not be empty"));
        }
        Ok(RemoteImageModel {
            digest: Some(id.to_string()),
            ..Default::default()
        })
    }

    async fn forward(&self, plan: &RemoteImageModel) -> Result<RemoteImageModel, Diagnostic> {
        let source = required(&plan.source, "source")?;
        let target = required(&plan.target, "target")?;

        let result = self
            .registry
            .forward_image(source, target)
            .await
            .map_err(|e| {
                tracing::debug!(registry = ?e.registry(), error = %e, "Forward failed");
                Diagnostic::from_error(DOCKER_REGISTRY_ERROR, &e)
            })?;

        tracing::trace!(digest = %result.digest, "Pushed Image: digest => {}", result.digest);

        Ok(RemoteImageModel {
            source: Some(source.to_string()),
            target: Some(target.to_string()),
            digest: Some(result.digest),
        })
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, Diagnostic> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Diagnostic::error(INVALID_CONFIGURATION, format!("{} is required", name)))
}

fn target_diagnostic(err: &DockerlessError) -> Diagnostic {
    match err {
        DockerlessError::InvalidReference { .. } => Diagnostic::from_error(INVALID_TARGET, err),
        _ => Diagnostic::from_error(DOCKER_REGISTRY_ERROR, err),
    }
}
