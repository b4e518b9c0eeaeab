//! The `dockerless` provider.
//!
//! The provider is configured once with registry credentials and hands out
//! resource handles that share a single registry client.

pub mod diagnostics;
pub mod plan;
pub mod remote_image;
pub mod schema;

use std::sync::Arc;

use dockerless_core::config::ProviderConfig;
use serde::Serialize;

use crate::oci::registry::{ImageRegistry, RegistryClient};
use diagnostics::{Diagnostic, INVALID_CONFIGURATION};
use remote_image::{RemoteImageResource, RESOURCE_TYPE_NAME};
use schema::{Attribute, AttributeType, Schema};

pub use diagnostics::{Diagnostics, Severity};
pub use plan::{Action, Plan, PlannedChange};
pub use remote_image::{ReadResponse, RemoteImageModel};

/// Provider type name.
pub const PROVIDER_TYPE_NAME: &str = "dockerless";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMetadata {
    pub type_name: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct DockerlessProvider {
    version: String,
}

impl DockerlessProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    pub fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            version: self.version.clone(),
        }
    }

    pub fn schema(&self) -> Schema {
        let credentials = vec![
            Attribute::optional("username", AttributeType::String, "Username for the registry."),
            Attribute::optional("password", AttributeType::String, "Password for the registry.")
                .sensitive(),
            Attribute::optional(
                "username_env",
                AttributeType::String,
                "Environment variable to read the username from when username is unset.",
            ),
            Attribute::optional(
                "password_env",
                AttributeType::String,
                "Environment variable to read the password from when password is unset.",
            ),
        ];

        Schema {
            description: "Pushes docker images between registries without a docker daemon."
                .to_string(),
            attributes: vec![
                Attribute::optional(
                    "registry_auth",
                    AttributeType::MapNested {
                        attributes: credentials,
                    },
                    "Credentials keyed by registry endpoint, for example an ECR proxy endpoint.",
                ),
                Attribute::optional(
                    "platform",
                    AttributeType::String,
                    "Platform picked from multi-arch source images, as os/arch[/variant]. \
                     Defaults to linux/amd64.",
                ),
                Attribute::optional(
                    "insecure_registries",
                    AttributeType::List,
                    "Registries reached over plain HTTP.",
                ),
                Attribute::optional(
                    "work_dir",
                    AttributeType::String,
                    "Directory for intermediate image archives. Defaults to the system temp dir.",
                ),
            ],
        }
    }

    /// Build the registry client shared by all resources.
    pub fn configure(&self, config: &ProviderConfig) -> Result<ConfiguredProvider, Diagnostic> {
        let client = RegistryClient::new(config)
            .map_err(|e| Diagnostic::from_error(INVALID_CONFIGURATION, &e))?;

        tracing::debug!(
            registries = client.registries().len(),
            platform = %config.platform,
            work_dir = %client.work_dir().display(),
            "Configured provider"
        );

        Ok(ConfiguredProvider {
            registry: Arc::new(client),
        })
    }

    pub fn resources(&self) -> Vec<&'static str> {
        vec![RESOURCE_TYPE_NAME]
    }
}

/// Provider after `configure`: owns the registry all resources share.
#[derive(Clone)]
pub struct ConfiguredProvider {
    registry: Arc<dyn ImageRegistry>,
}

impl ConfiguredProvider {
    /// Use an arbitrary registry implementation.
    pub fn with_registry(registry: Arc<dyn ImageRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> Arc<dyn ImageRegistry> {
        self.registry.clone()
    }

    pub fn remote_image(&self) -> RemoteImageResource {
        RemoteImageResource::new(self.registry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockerless_core::config::RegistryCredentials;

    #[test]
    fn test_metadata() {
        let provider = DockerlessProvider::new("1.2.3");
        let metadata = provider.metadata();
        assert_eq!(metadata.type_name, "dockerless");
        assert_eq!(metadata.version, "1.2.3");
        assert_eq!(provider.resources(), vec!["dockerless_remote_image"]);
    }

    #[test]
    fn test_schema_password_is_sensitive() {
        let schema = DockerlessProvider::new("dev").schema();
        let auth = schema.attribute("registry_auth").unwrap();
        assert!(auth.optional);
        match &auth.kind {
            AttributeType::MapNested { attributes } => {
                let password = attributes.iter().find(|a| a.name == "password").unwrap();
                assert!(password.sensitive);
                let username = attributes.iter().find(|a| a.name == "username").unwrap();
                assert!(!username.sensitive);
            }
            other => panic!("unexpected type {:?}", other),
        }
    }

    #[test]
    fn test_configure_with_credentials() {
        let mut config = ProviderConfig::default();
        config.registry_auth.insert(
            "ghcr.io".to_string(),
            RegistryCredentials::basic("robot", "secret"),
        );
        let provider = DockerlessProvider::new("dev");
        assert!(provider.configure(&config).is_ok());
    }
}
