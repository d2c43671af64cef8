// Artifact Service - idempotent artifact acquisition

use crate::domain::defaults::COMPLETION_SENTINEL;
use crate::domain::ArtifactRecord;
use crate::error::Result;
use crate::port::{FetchError, Fetcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ensures an artifact exists locally, fetching it at most once
pub struct ArtifactService {
    fetcher: Arc<dyn Fetcher>,
}

impl ArtifactService {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Return the local artifact directory, fetching only if no completed
    /// fetch is on disk.
    ///
    /// A hit has no side effects: no directory creation, no fetcher call.
    /// A failed fetch leaves whatever was written in place; the next call
    /// fetches again because the completion sentinel was never written.
    pub async fn ensure_local(&self, record: &ArtifactRecord) -> Result<PathBuf> {
        if let Some(local) = record.locate_complete() {
            info!(
                artifact = %record.id,
                path = %local.display(),
                marker = %record.marker,
                "Artifact already present, skipping fetch"
            );
            return Ok(local);
        }

        if let Some(parent) = record
            .target_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }

        info!(
            artifact = %record.id,
            revision = ?record.revision,
            target_dir = %record.target_dir.display(),
            fetcher = %self.fetcher.name(),
            "Fetching artifact"
        );

        let local = self.fetcher.fetch(record).await?;

        if !local.join(&record.marker).exists() {
            warn!(
                artifact = %record.id,
                path = %local.display(),
                marker = %record.marker,
                "Fetch reported success but the marker is missing"
            );
            return Err(FetchError::Storage(format!(
                "{} not found in {}",
                record.marker,
                local.display()
            ))
            .into());
        }

        mark_complete(record, &local)?;

        info!(artifact = %record.id, path = %local.display(), "Artifact fetched");
        Ok(local)
    }
}

fn mark_complete(record: &ArtifactRecord, local: &Path) -> Result<()> {
    let content = match &record.revision {
        Some(revision) => format!("{}@{}\n", record.id, revision),
        None => format!("{}\n", record.id),
    };
    std::fs::write(local.join(COMPLETION_SENTINEL), content)?;
    debug!(path = %local.display(), "Completion sentinel written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::port::fetcher::mocks::{MockFetchBehavior, MockFetcher};
    use crate::port::UnavailableFetcher;

    fn record_in(dir: &std::path::Path) -> ArtifactRecord {
        ArtifactRecord::new("Qwen/Qwen3-8B", dir.join("models").join("Qwen3-8B")).unwrap()
    }

    #[tokio::test]
    async fn test_fetches_once_then_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let record = record_in(dir.path());
        let fetcher = Arc::new(MockFetcher::new_materialize());
        let service = ArtifactService::new(fetcher.clone());

        let first = tokio_test::assert_ok!(service.ensure_local(&record).await);
        let second = tokio_test::assert_ok!(service.ensure_local(&record).await);

        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(first, second);
        assert_eq!(first, record.expected_local_path());
    }

    #[tokio::test]
    async fn test_marker_present_issues_zero_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let record = record_in(dir.path());
        std::fs::create_dir_all(&record.target_dir).unwrap();
        std::fs::write(record.target_dir.join("config.json"), "{}").unwrap();
        std::fs::write(record.target_dir.join(COMPLETION_SENTINEL), "").unwrap();

        let fetcher = Arc::new(MockFetcher::new_fail("network must not be touched"));
        let service = ArtifactService::new(fetcher.clone());

        let local = service.ensure_local(&record).await.unwrap();

        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(local, record.target_dir);
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let record = record_in(dir.path());
        let service = ArtifactService::new(Arc::new(MockFetcher::new_materialize()));

        service.ensure_local(&record).await.unwrap();

        assert!(dir.path().join("models").is_dir());
        assert!(record.locate_complete().is_some());
    }

    #[tokio::test]
    async fn test_transfer_failure_propagates_and_retries_next_time() {
        let dir = tempfile::tempdir().unwrap();
        let record = record_in(dir.path());
        let fetcher = Arc::new(MockFetcher::new(MockFetchBehavior::FailPartial(
            "connection reset".to_string(),
        )));
        let service = ArtifactService::new(fetcher.clone());

        let result = service.ensure_local(&record).await;
        assert!(matches!(
            result,
            Err(AppError::Fetch(FetchError::Transfer(ref msg))) if msg == "connection reset"
        ));

        fetcher.set_behavior(MockFetchBehavior::Materialize);
        service.ensure_local(&record).await.unwrap();
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_fetcher_reports_remediation() {
        let dir = tempfile::tempdir().unwrap();
        let record = record_in(dir.path());
        let service = ArtifactService::new(Arc::new(UnavailableFetcher::new(
            "modelscope",
            "pip install modelscope",
        )));

        let err = service.ensure_local(&record).await.unwrap_err();

        assert!(matches!(err, AppError::MissingCapability { .. }));
        assert!(err.to_string().contains("pip install modelscope"));
        assert!(!record.target_dir.exists());
    }

    #[tokio::test]
    async fn test_marker_from_interrupted_fetch_is_not_trusted() {
        let dir = tempfile::tempdir().unwrap();
        let record = record_in(dir.path());
        let fetcher = Arc::new(MockFetcher::new(MockFetchBehavior::FailAfterMarker(
            "interrupted".to_string(),
        )));
        let service = ArtifactService::new(fetcher.clone());

        assert!(service.ensure_local(&record).await.is_err());
        assert!(record.locate_marker().is_some());
        assert_eq!(record.locate_complete(), None);

        fetcher.set_behavior(MockFetchBehavior::Materialize);
        let local = service.ensure_local(&record).await.unwrap();

        assert_eq!(fetcher.call_count(), 2);
        assert!(local.join(COMPLETION_SENTINEL).is_file());
    }

    #[tokio::test]
    async fn test_success_without_marker_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let record = record_in(dir.path());
        let service = ArtifactService::new(Arc::new(MockFetcher::new(
            MockFetchBehavior::SucceedEmpty,
        )));

        let err = service.ensure_local(&record).await.unwrap_err();

        assert!(matches!(err, AppError::Fetch(FetchError::Storage(_))));
        assert!(!record
            .expected_local_path()
            .join(COMPLETION_SENTINEL)
            .exists());
    }

    #[tokio::test]
    async fn test_sentinel_records_revision() {
        let dir = tempfile::tempdir().unwrap();
        let record = record_in(dir.path()).with_revision("v2");
        let service = ArtifactService::new(Arc::new(MockFetcher::new_materialize()));

        let local = service.ensure_local(&record).await.unwrap();

        let content = std::fs::read_to_string(local.join(COMPLETION_SENTINEL)).unwrap();
        assert_eq!(content, "Qwen/Qwen3-8B@v2\n");
    }
}
