//! Daemon error types.

use thiserror::Error;

use relic_compute::ComputeError;
use relic_core::ConfigError;
use relic_state::StateError;

/// Unrecoverable setup failure. Returned to `main`, which logs it and
/// stops the process.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("error getting config file: {0}")]
    Config(#[source] ConfigError),

    #[error("error reading database credentials: {0}")]
    Credentials(#[source] ConfigError),

    #[error("error connecting to the database: {0}")]
    Database(#[source] StateError),

    #[error("error connecting to digital ocean: {0}")]
    Compute(#[source] ComputeError),
}

/// Failure connecting an optional collaborator (analytics, chat bot).
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("missing setting: {0}")]
    MissingSetting(String),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

pub type IntegrationResult<T> = Result<T, IntegrationError>;
