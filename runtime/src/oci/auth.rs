//! Per-registry authentication.
//!
//! Credentials are configured per registry endpoint in the provider block.
//! References to registries without an entry are pulled and pushed
//! anonymously.

use std::collections::HashMap;

use dockerless_core::config::RegistryCredentials;
use oci_distribution::secrets::RegistryAuth as OciRegistryAuth;

use super::reference::normalize_registry;

/// Authentication credentials for a container registry.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegistryAuth {
    username: Option<String>,
    password: Option<String>,
}

impl RegistryAuth {
    /// Create anonymous authentication (no credentials).
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Create basic authentication with username and password.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Build from configured credentials.
    ///
    /// Falls back to anonymous unless both username and password resolve.
    pub fn from_credentials(credentials: &RegistryCredentials) -> Self {
        match credentials.resolve() {
            (Some(username), Some(password)) => Self::basic(username, password),
            _ => Self::anonymous(),
        }
    }

    /// Whether any credentials are attached.
    pub fn is_anonymous(&self) -> bool {
        self.basic_credentials().is_none()
    }

    /// `(username, password)` when both are set.
    pub fn basic_credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }

    /// Convert to oci-distribution auth type.
    pub fn to_oci_auth(&self) -> OciRegistryAuth {
        match self.basic_credentials() {
            Some((u, p)) => OciRegistryAuth::Basic(u.to_string(), p.to_string()),
            None => OciRegistryAuth::Anonymous,
        }
    }
}

impl std::fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Registry endpoint → credentials.
#[derive(Debug, Clone, Default)]
pub struct RegistryAuthMap {
    registries: HashMap<String, RegistryAuth>,
}

impl RegistryAuthMap {
    /// Build from the provider's `registry_auth` block.
    pub fn from_config(config: &HashMap<String, RegistryCredentials>) -> Self {
        let registries = config
            .iter()
            .map(|(address, creds)| {
                let auth = RegistryAuth::from_credentials(creds);
                if auth.is_anonymous() {
                    tracing::warn!(
                        registry = %address,
                        "Registry credentials incomplete, using anonymous access"
                    );
                }
                (normalize_registry(address), auth)
            })
            .collect();
        Self { registries }
    }

    /// Add or replace credentials for a registry.
    pub fn insert(&mut self, address: &str, auth: RegistryAuth) {
        self.registries.insert(normalize_registry(address), auth);
    }

    /// Find credentials for a registry address.
    pub fn find(&self, address: &str) -> Option<&RegistryAuth> {
        self.registries.get(&normalize_registry(address))
    }

    /// Credentials for a registry address, anonymous when not configured.
    pub fn auth_for(&self, address: &str) -> RegistryAuth {
        self.find(address).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}
