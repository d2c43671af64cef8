// Artifact Domain Model

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::defaults::{COMPLETION_SENTINEL, DEFAULT_COMPLETION_MARKER, MARKER_SEARCH_DEPTH};
use super::error::{DomainError, Result};

/// A named artifact and the local directory it lives in.
///
/// A fetch counts as done only when one directory holds both the marker and
/// the completion sentinel. The sentinel is written after the fetcher
/// returned successfully, so a marker left by an interrupted download does
/// not count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: String,
    pub revision: Option<String>,
    pub target_dir: PathBuf,
    pub marker: String,
}

impl ArtifactRecord {
    /// Create a record, rejecting identifiers that cannot name a repository.
    ///
    /// # Errors
    /// `DomainError::ValidationError` if the id is empty, absolute, or
    /// contains `.`/`..` segments.
    pub fn new(id: impl Into<String>, target_dir: impl Into<PathBuf>) -> Result<Self> {
        let id = id.into();
        validate_id(&id)?;

        Ok(Self {
            id,
            revision: None,
            target_dir: target_dir.into(),
            marker: DEFAULT_COMPLETION_MARKER.to_string(),
        })
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// `<target_dir>/<org>/<name>`: where a per-repository download lands
    pub fn expected_local_path(&self) -> PathBuf {
        self.id
            .split('/')
            .fold(self.target_dir.clone(), |path, segment| path.join(segment))
    }

    /// Directory holding the marker file, if any.
    ///
    /// Searches the target directory and its subdirectories (bounded depth);
    /// the shallowest match wins. Hidden directories are skipped, they hold
    /// staging copies of in-flight downloads.
    pub fn locate_marker(&self) -> Option<PathBuf> {
        find_dir_with(&self.target_dir, MARKER_SEARCH_DEPTH, |dir| {
            dir.join(&self.marker).exists()
        })
    }

    /// Directory holding both the marker and the completion sentinel
    pub fn locate_complete(&self) -> Option<PathBuf> {
        find_dir_with(&self.target_dir, MARKER_SEARCH_DEPTH, |dir| {
            dir.join(&self.marker).exists() && dir.join(COMPLETION_SENTINEL).is_file()
        })
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(DomainError::ValidationError(
            "artifact id cannot be empty".to_string(),
        ));
    }

    if id.starts_with('/') {
        return Err(DomainError::ValidationError(format!(
            "artifact id must be relative: {id}"
        )));
    }

    if id
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(DomainError::ValidationError(format!(
            "artifact id has an invalid path segment: {id}"
        )));
    }

    Ok(())
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Shallowest directory (the root included) satisfying `accept`.
/// Files are checked with `exists`, so hub snapshot symlinks count.
fn find_dir_with(
    root: &Path,
    max_depth: usize,
    accept: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    WalkDir::new(root)
        .max_depth(max_depth.saturating_sub(1))
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_type().is_dir() && !is_hidden(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| accept(entry.path()))
        .min_by_key(|entry| entry.depth())
        .map(|entry| entry.path().to_path_buf())
}
