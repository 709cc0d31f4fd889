//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or reading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("malformed credentials: {0}")]
    Credentials(#[from] serde_json::Error),

    #[error("missing setting: {0}")]
    Missing(String),

    #[error("setting {key} has the wrong type, expected {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}
