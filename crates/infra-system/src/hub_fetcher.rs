// Hugging Face Hub fetcher (feature `hf-hub`)
use async_trait::async_trait;
use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Repo, RepoType};
use std::path::PathBuf;
use tracing::{debug, info};

use modelhost_core::domain::ArtifactRecord;
use modelhost_core::port::{FetchError, Fetcher};

/// Downloads every file of a model repository into the hub cache layout
/// rooted at the target directory:
/// `<target_dir>/models--<org>--<name>/snapshots/<sha>/...`
///
/// The completion marker is downloaded last so its presence implies the
/// rest of the snapshot is in place.
#[derive(Debug, Default)]
pub struct HubFetcher {
    progress: bool,
}

impl HubFetcher {
    pub fn new() -> Self {
        Self { progress: true }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

/// Marker goes last; everything else keeps repository order
fn download_order(mut files: Vec<String>, marker: &str) -> Vec<String> {
    files.sort_by_key(|name| name == marker);
    files
}

#[async_trait]
impl Fetcher for HubFetcher {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn fetch(&self, record: &ArtifactRecord) -> Result<PathBuf, FetchError> {
        let api = ApiBuilder::from_env()
            .with_cache_dir(record.target_dir.clone())
            .with_progress(self.progress)
            .build()
            .map_err(|e| FetchError::Transfer(e.to_string()))?;

        let repo = match &record.revision {
            Some(revision) => {
                Repo::with_revision(record.id.clone(), RepoType::Model, revision.clone())
            }
            None => Repo::model(record.id.clone()),
        };
        let folder = repo.folder_name();
        let api_repo = api.repo(repo);

        let info = api_repo
            .info()
            .await
            .map_err(|e| FetchError::Transfer(e.to_string()))?;

        let files = download_order(
            info.siblings.into_iter().map(|s| s.rfilename).collect(),
            &record.marker,
        );
        info!(artifact = %record.id, sha = %info.sha, files = files.len(), "Downloading from Hugging Face Hub");

        for file in &files {
            let path = api_repo
                .get(file)
                .await
                .map_err(|e| FetchError::Transfer(format!("{file}: {e}")))?;
            debug!(file = %file, path = %path.display(), "File downloaded");
        }

        Ok(record
            .target_dir
            .join(folder)
            .join("snapshots")
            .join(info.sha))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_downloaded_last() {
        let files = vec![
            "config.json".to_string(),
            "model-00001-of-00002.safetensors".to_string(),
            "tokenizer.json".to_string(),
        ];

        let ordered = download_order(files, "config.json");

        assert_eq!(ordered.last().map(String::as_str), Some("config.json"));
        assert_eq!(ordered[0], "model-00001-of-00002.safetensors");
    }

    #[test]
    fn test_order_without_marker_unchanged() {
        let files = vec!["b".to_string(), "a".to_string()];
        assert_eq!(download_order(files.clone(), "config.json"), files);
    }
}
