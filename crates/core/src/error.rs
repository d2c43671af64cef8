// Central Error Type for the Application

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::ProcessId;
use crate::port::{FetchError, LaunchError, RegistryError};

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A required external capability (download tool, feature) is not available.
    /// The remediation text is part of the message on purpose.
    #[error("Missing capability '{capability}': {remediation}")]
    MissingCapability {
        capability: String,
        remediation: String,
    },

    #[error("Model artifact not found: {0}")]
    MissingArtifact(PathBuf),

    #[error(
        "State file {0} already exists, a server is possibly already running \
         (run `modelhost stop` first to force a restart)"
    )]
    AlreadyTracked(PathBuf),

    #[error("Server started with PID {pid} but could not be recorded: {source}")]
    Untracked {
        pid: ProcessId,
        #[source]
        source: RegistryError,
    },

    #[error("Fetch error: {0}")]
    Fetch(FetchError),

    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Missing capability is promoted to its own category so callers can match on it
impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Unavailable {
                capability,
                remediation,
            } => AppError::MissingCapability {
                capability,
                remediation,
            },
            other => AppError::Fetch(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_fetcher_maps_to_missing_capability() {
        let err: AppError = FetchError::Unavailable {
            capability: "modelscope".to_string(),
            remediation: "pip install modelscope".to_string(),
        }
        .into();

        assert!(matches!(err, AppError::MissingCapability { .. }));
        assert!(err.to_string().contains("pip install modelscope"));
    }

    #[test]
    fn test_transfer_failure_stays_fetch_error() {
        let err: AppError = FetchError::Transfer("connection reset".to_string()).into();
        assert!(matches!(err, AppError::Fetch(FetchError::Transfer(_))));
    }
}
