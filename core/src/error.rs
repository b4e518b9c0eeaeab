use thiserror::Error;

/// Dockerless error types
#[derive(Error, Debug)]
pub enum DockerlessError {
    /// Image reference could not be parsed
    #[error("{reference:?} is an invalid docker reference: {message}")]
    InvalidReference { reference: String, message: String },

    /// Container registry error. Displays the message alone so step
    /// prefixes lead; the registry is kept for structured logging.
    #[error("{message}")]
    RegistryError { registry: String, message: String },

    /// OCI image error
    #[error("OCI image error: {0}")]
    OciImageError(String),

    /// Intermediate archive error
    #[error("Archive error: {0}")]
    ArchiveError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// State file error
    #[error("State error: {0}")]
    StateError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl DockerlessError {
    /// Registry a registry error came from.
    pub fn registry(&self) -> Option<&str> {
        match self {
            DockerlessError::RegistryError { registry, .. } => Some(registry),
            _ => None,
        }
    }

    /// Prefix the error message with context.
    ///
    /// The result always displays starting with `prefix`. Registry errors keep
    /// their kind. An invalid reference is prefixed without a separator so
    /// that `context("source")` reads `source "x" is an invalid docker reference: ...`.
    pub fn context(self, prefix: impl std::fmt::Display) -> Self {
        match self {
            err @ DockerlessError::InvalidReference { .. } => {
                DockerlessError::Other(format!("{} {}", prefix, err))
            }
            DockerlessError::RegistryError { registry, message } => {
                DockerlessError::RegistryError {
                    registry,
                    message: format!("{}: {}", prefix, message),
                }
            }
            other => DockerlessError::Other(format!("{}: {}", prefix, other)),
        }
    }
}

impl From<serde_json::Error> for DockerlessError {
    fn from(err: serde_json::Error) -> Self {
        DockerlessError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for DockerlessError {
    fn from(err: serde_yaml::Error) -> Self {
        DockerlessError::SerializationError(err.to_string())
    }
}

/// Result type alias for dockerless operations
pub type Result<T> = std::result::Result<T, DockerlessError>;
