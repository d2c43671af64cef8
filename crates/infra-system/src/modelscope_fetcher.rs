// ModelScope fetcher
// Shells out to the `modelscope` CLI, which owns the transfer protocol
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

use modelhost_core::domain::ArtifactRecord;
use modelhost_core::port::{FetchError, Fetcher};

const DEFAULT_PROGRAM: &str = "modelscope";
const REMEDIATION: &str = "install it with `pip install modelscope` (then make sure `modelscope` is on PATH) and run `modelhost fetch` again";

/// Downloads with `modelscope download --model <id> --cache_dir <target_dir>`
///
/// The CLI lays files out as `<target_dir>/<org>/<name>`, which is what
/// `fetch` reports as the local path.
pub struct ModelScopeCliFetcher {
    program: String,
}

impl ModelScopeCliFetcher {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Use a different executable (e.g. one inside a virtualenv)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(record: &ArtifactRecord) -> Vec<String> {
        let mut args = vec![
            "download".to_string(),
            "--model".to_string(),
            record.id.clone(),
            "--cache_dir".to_string(),
            record.target_dir.display().to_string(),
        ];
        if let Some(revision) = &record.revision {
            args.push("--revision".to_string());
            args.push(revision.clone());
        }
        args
    }

    fn resolve_local(record: &ArtifactRecord) -> Result<PathBuf, FetchError> {
        let expected = record.expected_local_path();
        if expected.is_dir() {
            return Ok(expected);
        }

        // Older/newer CLI versions nest differently; trust the marker
        record.locate_marker().ok_or_else(|| {
            FetchError::Storage(format!(
                "download finished but {} was not found under {}",
                record.marker,
                record.target_dir.display()
            ))
        })
    }
}

impl Default for ModelScopeCliFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for ModelScopeCliFetcher {
    fn name(&self) -> &str {
        "modelscope"
    }

    async fn fetch(&self, record: &ArtifactRecord) -> Result<PathBuf, FetchError> {
        let args = Self::args(record);
        debug!(program = %self.program, args = ?args, "Running ModelScope CLI");

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => FetchError::Unavailable {
                    capability: self.program.clone(),
                    remediation: REMEDIATION.to_string(),
                },
                _ => FetchError::Transfer(e.to_string()),
            })?;

        if !status.success() {
            return Err(FetchError::Transfer(format!(
                "{} exited with {}",
                self.program, status
            )));
        }

        let local = Self::resolve_local(record)?;
        info!(artifact = %record.id, path = %local.display(), "ModelScope download complete");
        Ok(local)
    }
}
