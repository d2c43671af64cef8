// Process Registry Port
// Owns the single state file recording which pid the supervisor stands behind

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use crate::domain::ProcessId;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("State file {path} is unreadable or unwritable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file {path} holds an invalid pid: {content:?}")]
    Corrupt { path: PathBuf, content: String },
}

/// Process registry trait
///
/// There is no locking across invocations: `try_acquire` is an exclusive
/// create, but a caller that checks `is_present` first and acquires later can
/// still race with another invocation.
pub trait ProcessRegistry: Send + Sync {
    /// Location of the state file
    fn path(&self) -> &Path;

    fn is_present(&self) -> Result<bool, RegistryError>;

    /// Reserve the state file. `false` means another record already exists.
    fn try_acquire(&self) -> Result<bool, RegistryError>;

    /// Write `pid` as the whole content of the state file
    fn record(&self, pid: ProcessId) -> Result<(), RegistryError>;

    /// Delete the state file; absent is not an error
    fn release(&self) -> Result<(), RegistryError>;

    /// `Ok(None)` when absent, `Err(Corrupt)` when the content is not a pid
    fn read_recorded(&self) -> Result<Option<ProcessId>, RegistryError>;

    /// When the current record was written; `None` when absent or unknown
    fn recorded_at(&self) -> Option<SystemTime>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// In-memory registry; `None` content means no state file
    pub struct InMemoryProcessRegistry {
        path: PathBuf,
        content: Arc<Mutex<Option<String>>>,
        written_at: Arc<Mutex<Option<SystemTime>>>,
        fail_record: Arc<Mutex<bool>>,
    }

    impl InMemoryProcessRegistry {
        pub fn new() -> Self {
            Self {
                path: PathBuf::from("memory://vllm_server.pid"),
                content: Arc::new(Mutex::new(None)),
                written_at: Arc::new(Mutex::new(None)),
                fail_record: Arc::new(Mutex::new(false)),
            }
        }
        pub fn with_content(content: impl Into<String>) -> Self {
            let registry = Self::new();
            *registry.content.lock().unwrap() = Some(content.into());
            *registry.written_at.lock().unwrap() = Some(SystemTime::now());
            registry
        }
        pub fn content(&self) -> Option<String> {
            self.content.lock().unwrap().clone()
        }
        pub fn fail_record(&self) {
            *self.fail_record.lock().unwrap() = true;
        }
    }

    impl Default for InMemoryProcessRegistry {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ProcessRegistry for InMemoryProcessRegistry {
        fn path(&self) -> &Path {
            &self.path
        }

        fn is_present(&self) -> Result<bool, RegistryError> {
            Ok(self.content.lock().unwrap().is_some())
        }

        fn try_acquire(&self) -> Result<bool, RegistryError> {
            let mut content = self.content.lock().unwrap();
            if content.is_some() {
                return Ok(false);
            }
            *content = Some(String::new());
            Ok(true)
        }

        fn record(&self, pid: ProcessId) -> Result<(), RegistryError> {
            if *self.fail_record.lock().unwrap() {
                return Err(RegistryError::Io {
                    path: self.path.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            *self.content.lock().unwrap() = Some(pid.to_string());
            *self.written_at.lock().unwrap() = Some(SystemTime::now());
            Ok(())
        }

        fn release(&self) -> Result<(), RegistryError> {
            *self.content.lock().unwrap() = None;
            *self.written_at.lock().unwrap() = None;
            Ok(())
        }

        fn read_recorded(&self) -> Result<Option<ProcessId>, RegistryError> {
            match self.content.lock().unwrap().as_deref() {
                None => Ok(None),
                Some(text) => text.parse().map(Some).map_err(|_| RegistryError::Corrupt {
                    path: self.path.clone(),
                    content: text.to_string(),
                }),
            }
        }

        fn recorded_at(&self) -> Option<SystemTime> {
            *self.written_at.lock().unwrap()
        }
    }
}
