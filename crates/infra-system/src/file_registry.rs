// File-backed process registry
// The state file holds the decimal pid and nothing else
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use modelhost_core::domain::ProcessId;
use modelhost_core::port::{ProcessRegistry, RegistryError};

/// Process registry backed by a single state file
///
/// `try_acquire` creates an empty file with `O_EXCL`, so two invocations
/// cannot both reserve it. `record` replaces the content through a
/// temporary file + rename, so a reader never sees a half-written pid.
pub struct FileProcessRegistry {
    path: PathBuf,
}

impl FileProcessRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn ensure_parent(&self) -> Result<(), RegistryError> {
        match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => fs::create_dir_all(parent).map_err(|e| self.io_error(e)),
            None => Ok(()),
        }
    }
}

impl ProcessRegistry for FileProcessRegistry {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_present(&self) -> Result<bool, RegistryError> {
        self.path.try_exists().map_err(|e| self.io_error(e))
    }

    fn try_acquire(&self) -> Result<bool, RegistryError> {
        self.ensure_parent()?;

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(_) => {
                debug!(path = %self.path.display(), "State file reserved");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn record(&self, pid: ProcessId) -> Result<(), RegistryError> {
        self.ensure_parent()?;

        let tmp = self.temp_path();
        fs::write(&tmp, pid.to_string()).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            self.io_error(e)
        })?;

        debug!(path = %self.path.display(), pid = %pid, "PID recorded");
        Ok(())
    }

    fn release(&self) -> Result<(), RegistryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "State file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn read_recorded(&self) -> Result<Option<ProcessId>, RegistryError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        content
            .parse::<ProcessId>()
            .map(Some)
            .map_err(|_| RegistryError::Corrupt {
                path: self.path.clone(),
                content: content.trim().to_string(),
            })
    }

    fn recorded_at(&self) -> Option<SystemTime> {
        fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()
    }
}
