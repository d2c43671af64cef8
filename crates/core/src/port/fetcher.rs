// Artifact Fetcher Port
// The download transport is opaque: fetch(record) -> authoritative local path
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::ArtifactRecord;

/// Fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// The mechanism itself is missing (tool not installed, feature not compiled in)
    #[error("{capability} is not available: {remediation}")]
    Unavailable {
        capability: String,
        remediation: String,
    },

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Fetcher trait
///
/// Implementations:
/// - ModelScopeCliFetcher: shells out to the `modelscope` CLI
/// - HubFetcher: Hugging Face Hub (feature `hf-hub`)
/// - UnavailableFetcher: placeholder for a source that was not compiled in
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Download the artifact into `record.target_dir`
    ///
    /// # Returns
    /// The directory the mechanism reports as authoritative. It may be nested
    /// below the target directory (e.g. per-revision snapshot).
    ///
    /// # Errors
    /// - FetchError::Unavailable before any transfer is attempted
    /// - FetchError::Transfer / Storage on failure, with no cleanup
    async fn fetch(&self, record: &ArtifactRecord) -> Result<PathBuf, FetchError>;
}

/// Stands in for a fetch source this build cannot provide
#[derive(Debug, Clone)]
pub struct UnavailableFetcher {
    capability: String,
    remediation: String,
}

impl UnavailableFetcher {
    pub fn new(capability: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            remediation: remediation.into(),
        }
    }
}

#[async_trait]
impl Fetcher for UnavailableFetcher {
    fn name(&self) -> &str {
        &self.capability
    }

    async fn fetch(&self, _record: &ArtifactRecord) -> Result<PathBuf, FetchError> {
        Err(FetchError::Unavailable {
            capability: self.capability.clone(),
            remediation: self.remediation.clone(),
        })
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock fetcher behavior
    #[derive(Debug, Clone)]
    pub enum MockFetchBehavior {
        /// Create `<target>/<org>/<name>/<marker>` and return that directory
        Materialize,
        /// Fail with a transfer error, writing nothing
        Fail(String),
        /// Write a partial file but no marker, then fail
        FailPartial(String),
        /// Write the marker, then fail before the rest arrives
        FailAfterMarker(String),
        /// Create the directory and report success without writing the marker
        SucceedEmpty,
    }

    /// Mock Fetcher for testing
    pub struct MockFetcher {
        behavior: Arc<Mutex<MockFetchBehavior>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockFetcher {
        pub fn new(behavior: MockFetchBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                call_count: Arc::new(Mutex::new(0)),
            }
        }
        pub fn new_materialize() -> Self {
            Self::new(MockFetchBehavior::Materialize)
        }
        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockFetchBehavior::Fail(message.into()))
        }
        pub fn set_behavior(&self, behavior: MockFetchBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }
        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        fn name(&self) -> &str {
            "mock"
        }

        async fn fetch(&self, record: &ArtifactRecord) -> Result<PathBuf, FetchError> {
            *self.call_count.lock().unwrap() += 1;

            let behavior = self.behavior.lock().unwrap().clone();
            let local = record.expected_local_path();

            match behavior {
                MockFetchBehavior::Materialize => {
                    std::fs::create_dir_all(&local)
                        .map_err(|e| FetchError::Storage(e.to_string()))?;
                    std::fs::write(local.join(&record.marker), "{}")
                        .map_err(|e| FetchError::Storage(e.to_string()))?;
                    Ok(local)
                }
                MockFetchBehavior::Fail(msg) => Err(FetchError::Transfer(msg)),
                MockFetchBehavior::FailPartial(msg) => {
                    std::fs::create_dir_all(&local)
                        .map_err(|e| FetchError::Storage(e.to_string()))?;
                    std::fs::write(local.join("model.safetensors.part"), "partial")
                        .map_err(|e| FetchError::Storage(e.to_string()))?;
                    Err(FetchError::Transfer(msg))
                }
                MockFetchBehavior::FailAfterMarker(msg) => {
                    std::fs::create_dir_all(&local)
                        .map_err(|e| FetchError::Storage(e.to_string()))?;
                    std::fs::write(local.join(&record.marker), "{}")
                        .map_err(|e| FetchError::Storage(e.to_string()))?;
                    Err(FetchError::Transfer(msg))
                }
                MockFetchBehavior::SucceedEmpty => {
                    std::fs::create_dir_all(&local)
                        .map_err(|e| FetchError::Storage(e.to_string()))?;
                    Ok(local)
                }
            }
        }
    }
}
