//! Provider configuration and resource declarations.
//!
//! A declaration file is YAML with a `provider` block (registry credentials,
//! platform selection, insecure registries) and a `resources` map of
//! `dockerless_remote_image` resources keyed by name.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{DockerlessError, Result};

/// Default declaration file name.
pub const DEFAULT_CONFIG_FILE: &str = "dockerless.yaml";

/// Credentials for one registry endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCredentials {
    /// Username for the registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password for the registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable holding the username, read when `username` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_env: Option<String>,

    /// Environment variable holding the password, read when `password` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl RegistryCredentials {
    /// Basic credentials with literal values.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    /// Resolve to a `(username, password)` pair, reading `*_env` variables
    /// for fields without a literal value.
    ///
    /// Returns `None` for either half that is still missing.
    pub fn resolve(&self) -> (Option<String>, Option<String>) {
        let read_env = |name: &Option<String>| {
            name.as_ref()
                .and_then(|n| std::env::var(n).ok())
                .filter(|v| !v.is_empty())
        };
        let username = self.username.clone().or_else(|| read_env(&self.username_env));
        let password = self.password.clone().or_else(|| read_env(&self.password_env));
        (username, password)
    }
}

/// Target platform used to pick one image out of a multi-arch index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    pub variant: Option<String>,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            os: "linux".to_string(),
            architecture: "amd64".to_string(),
            variant: None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(ref variant) = self.variant {
            write!(f, "/{}", variant)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(format!(
                "invalid platform '{}' (expected os/arch[/variant])",
                s
            ));
        }
        match parts.as_slice() {
            [os, arch] => Ok(Self {
                os: os.to_string(),
                architecture: arch.to_string(),
                variant: None,
            }),
            [os, arch, variant] => Ok(Self {
                os: os.to_string(),
                architecture: arch.to_string(),
                variant: Some(variant.to_string()),
            }),
            _ => Err(format!(
                "invalid platform '{}' (expected os/arch[/variant])",
                s
            )),
        }
    }
}

impl Serialize for Platform {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Provider-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Registry endpoints (e.g. an ECR proxy endpoint) and their credentials
    #[serde(default)]
    pub registry_auth: HashMap<String, RegistryCredentials>,

    /// Platform selected from multi-arch sources
    #[serde(default)]
    pub platform: Platform,

    /// Registries reached over plain HTTP
    #[serde(default)]
    pub insecure_registries: Vec<String>,

    /// Directory for the intermediate image archive (system temp dir if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
}

impl ProviderConfig {
    /// Directory the intermediate archive is written to.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// A declared `dockerless_remote_image` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteImageDeclaration {
    /// Image name and tag to copy from
    pub source: String,
    /// Image name and tag to ensure exists
    pub target: String,
}

/// Contents of a declaration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Declarations {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub resources: BTreeMap<String, RemoteImageDeclaration>,
}

impl Declarations {
    /// Parse declarations from YAML text and validate them.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let declarations: Declarations = serde_yaml::from_str(content)?;
        declarations.validate()?;
        Ok(declarations)
    }

    /// Load declarations from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DockerlessError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let declarations = Self::from_yaml(&content)?;
        tracing::debug!(
            path = %path.display(),
            resources = declarations.resources.len(),
            registries = declarations.provider.registry_auth.len(),
            "Loaded declarations"
        );
        Ok(declarations)
    }

    /// Load declarations if the file exists, otherwise return empty ones.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check resource names and required attributes.
    pub fn validate(&self) -> Result<()> {
        for (name, resource) in &self.resources {
            if !is_valid_resource_name(name) {
                return Err(DockerlessError::ConfigError(format!(
                    "invalid resource name '{}': use letters, digits, '_' or '-'",
                    name
                )));
            }
            if resource.source.trim().is_empty() {
                return Err(DockerlessError::ConfigError(format!(
                    "resource '{}': source is required",
                    name
                )));
            }
            if resource.target.trim().is_empty() {
                return Err(DockerlessError::ConfigError(format!(
                    "resource '{}': target is required",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Resource names are limited to `[A-Za-z0-9_-]+`.
pub fn is_valid_resource_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
provider:
  registry_auth:
    index.docker.io:
      username: robot
      password: hunter2
    123456789.dkr.ecr.us-east-1.amazonaws.com:
      username: AWS
      password_env: DOCKERLESS_TEST_ECR_PASSWORD
  platform: linux/arm64/v8
  insecure_registries:
    - localhost:5000
resources:
  app:
    source: nullstone/tf-provider-test:v1
    target: nullstone/tf-provider-test:v2
"#;

    #[test]
    fn test_parse_declarations() {
        let d = Declarations::from_yaml(SAMPLE).unwrap();
        assert_eq!(d.provider.registry_auth.len(), 2);
        assert_eq!(
            d.provider.registry_auth["index.docker.io"],
            RegistryCredentials::basic("robot", "hunter2")
        );
        assert_eq!(d.provider.platform.architecture, "arm64");
        assert_eq!(d.provider.platform.variant.as_deref(), Some("v8"));
        assert_eq!(d.provider.insecure_registries, vec!["localhost:5000"]);
        assert_eq!(d.resources["app"].source, "nullstone/tf-provider-test:v1");
        assert_eq!(d.resources["app"].target, "nullstone/tf-provider-test:v2");
    }

    #[test]
    fn test_empty_document_defaults() {
        let d = Declarations::from_yaml("{}").unwrap();
        assert!(d.resources.is_empty());
        assert!(d.provider.registry_auth.is_empty());
        assert_eq!(d.provider.platform, Platform::default());
        assert!(d.provider.work_dir.is_none());
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let yaml = "resources:\n  app:\n    source: nginx\n    target: ''\n";
        let err = Declarations::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("target is required"));
    }

    #[test]
    fn test_missing_field_is_serialization_error() {
        let yaml = "resources:\n  app:\n    source: nginx\n";
        let err = Declarations::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, DockerlessError::SerializationError(_)));
    }

    #[test]
    fn test_invalid_resource_name() {
        let yaml = "resources:\n  'my app':\n    source: a\n    target: b\n";
        assert!(Declarations::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_resource_name_rules() {
        assert!(is_valid_resource_name("test"));
        assert!(is_valid_resource_name("app-v2_mirror"));
        assert!(!is_valid_resource_name(""));
        assert!(!is_valid_resource_name("a.b"));
    }

    #[test]
    fn test_platform_parse() {
        let p: Platform = "linux/amd64".parse().unwrap();
        assert_eq!(p, Platform::default());
        assert_eq!(p.to_string(), "linux/amd64");

        let p: Platform = "linux/arm/v7".parse().unwrap();
        assert_eq!(p.variant.as_deref(), Some("v7"));
        assert_eq!(p.to_string(), "linux/arm/v7");

        assert!("linux".parse::<Platform>().is_err());
        assert!("linux//".parse::<Platform>().is_err());
        assert!("a/b/c/d".parse::<Platform>().is_err());
    }

    #[test]
    fn test_credentials_resolve_env() {
        std::env::set_var("DOCKERLESS_TEST_RESOLVE_PW", "from-env");
        let creds = RegistryCredentials {
            username: Some("AWS".to_string()),
            password_env: Some("DOCKERLESS_TEST_RESOLVE_PW".to_string()),
            ..Default::default()
        };
        assert_eq!(
            creds.resolve(),
            (Some("AWS".to_string()), Some("from-env".to_string()))
        );
    }

    #[test]
    fn test_credentials_literal_wins_over_env() {
        std::env::set_var("DOCKERLESS_TEST_LITERAL_PW", "from-env");
        let creds = RegistryCredentials {
            password: Some("literal".to_string()),
            password_env: Some("DOCKERLESS_TEST_LITERAL_PW".to_string()),
            ..Default::default()
        };
        assert_eq!(creds.resolve().1, Some("literal".to_string()));
    }

    #[test]
    fn test_credentials_missing_env() {
        let creds = RegistryCredentials {
            username_env: Some("DOCKERLESS_TEST_DEFINITELY_UNSET".to_string()),
            ..Default::default()
        };
        assert_eq!(creds.resolve(), (None, None));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let d = Declarations::load_or_default(&dir.path().join("nope.yaml")).unwrap();
        assert!(d.resources.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, SAMPLE).unwrap();
        let d = Declarations::load(&path).unwrap();
        assert_eq!(d.resources.len(), 1);
    }

    #[test]
    fn test_work_dir_default() {
        let config = ProviderConfig::default();
        assert_eq!(config.work_dir(), std::env::temp_dir());
    }
}
