//! Compute gateway error types.

use thiserror::Error;

/// Result type alias for compute operations.
pub type ComputeResult<T> = Result<T, ComputeError>;

/// Errors returned by a compute provider.
#[derive(Debug, Error)]
pub enum ComputeError {
    /// The instance does not exist (already destroyed, or never created).
    #[error("droplet {0} not found")]
    NotFound(u64),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("provider returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        transient: bool,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ComputeError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ComputeError::Transport(_) => true,
            ComputeError::Api { transient, .. } => *transient,
            ComputeError::NotFound(_) | ComputeError::Unauthorized(_) | ComputeError::Config(_) => {
                false
            }
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(id: u64, status: u16, message: String) -> Self {
        match status {
            404 => ComputeError::NotFound(id),
            401 | 403 => ComputeError::Unauthorized(message),
            _ => ComputeError::Api {
                status,
                message,
                transient: status == 429 || (500..600).contains(&status),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(ComputeError::from_status(1, 404, String::new()), ComputeError::NotFound(1)));
        assert!(matches!(
            ComputeError::from_status(1, 401, String::new()),
            ComputeError::Unauthorized(_)
        ));
        assert!(ComputeError::from_status(1, 503, String::new()).is_transient());
        assert!(ComputeError::from_status(1, 429, String::new()).is_transient());
        assert!(!ComputeError::from_status(1, 422, String::new()).is_transient());
        assert!(ComputeError::Transport("reset".into()).is_transient());
        assert!(!ComputeError::NotFound(9).is_transient());
    }
}
