//! Dockerless Core - shared error and configuration types.
//!
//! This crate holds the pieces used by both the runtime and the CLI:
//! the error type and the provider/resource declaration model.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{Declarations, Platform, ProviderConfig, RegistryCredentials, RemoteImageDeclaration};
pub use error::{DockerlessError, Result};

/// Dockerless version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
