//! Path and launch settings resolved from flags, environment and defaults

use std::path::{Path, PathBuf};

use modelhost_core::domain::defaults::{
    DEFAULT_ARTIFACT_DIR, DEFAULT_MODEL_ID, SERVER_LOG_FILE_NAME, STATE_FILE_NAME,
};
use modelhost_core::domain::ArtifactRecord;

/// Every well-known location lives under the tool root
#[derive(Debug, Clone)]
pub struct ToolPaths {
    root: PathBuf,
}

impl ToolPaths {
    /// `~` is expanded; the path is otherwise used as given
    pub fn new(root: &str) -> Self {
        Self {
            root: PathBuf::from(shellexpand::tilde(root).into_owned()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join(STATE_FILE_NAME)
    }

    pub fn server_log(&self) -> PathBuf {
        self.root.join(SERVER_LOG_FILE_NAME)
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.root.join(DEFAULT_ARTIFACT_DIR)
    }

    /// Where the default artifact ends up after `fetch`
    pub fn default_model_path(&self) -> PathBuf {
        ArtifactRecord::new(DEFAULT_MODEL_ID, self.artifact_dir())
            .map(|record| record.expected_local_path())
            .unwrap_or_else(|_| self.artifact_dir())
    }
}
