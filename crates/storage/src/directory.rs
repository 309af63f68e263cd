//! History source backed by a directory of JSON documents.
//!
//! Every `*.json` file in the directory holds one
//! [`ExecutionHistoryRecord`]. Files are re-read on each request so that
//! exports dropped into the directory show up without a restart.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use statescope_interchange::PrimitiveEvent;

use crate::error::StorageError;
use crate::record::{select_run, ExecutionHistoryRecord, ExecutionRecord};
use crate::traits::HistorySource;

#[derive(Debug, Clone)]
pub struct DirectoryHistorySource {
    root: PathBuf,
}

impl DirectoryHistorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryHistorySource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a record as `<execution_id>.<run_id>.json`.
    pub async fn store(&self, record: &ExecutionHistoryRecord) -> Result<PathBuf, StorageError> {
        let file_name = format!(
            "{}.{}.json",
            encode_file_id(&record.execution.execution_id),
            encode_file_id(&record.execution.run_id)
        );
        let path = self.root.join(file_name);
        let body = serde_json::to_vec_pretty(record)
            .map_err(|e| StorageError::Backend(format!("serialize: {}", e)))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| StorageError::Backend(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }

    async fn load_all(&self) -> Result<Vec<ExecutionHistoryRecord>, StorageError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::Backend(format!("{}: {}", self.root.display(), e)))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| StorageError::Backend(format!("{}: {}", path.display(), e)))?;
            let record: ExecutionHistoryRecord =
                serde_json::from_slice(&bytes).map_err(|e| StorageError::InvalidRecord {
                    location: path.display().to_string(),
                    message: e.to_string(),
                })?;
            records.push(record);
        }
        tracing::debug!(dir = %self.root.display(), count = records.len(), "loaded history records");
        Ok(records)
    }

    async fn find(
        &self,
        execution_id: &str,
        run_id: Option<&str>,
    ) -> Result<ExecutionHistoryRecord, StorageError> {
        let records = self.load_all().await?;
        select_run(records.iter(), execution_id, run_id)
            .cloned()
            .ok_or_else(|| StorageError::ExecutionNotFound {
                execution_id: execution_id.to_string(),
                run_id: run_id.map(str::to_string),
            })
    }
}

/// Keep file names to a portable character set. Other bytes are
/// percent-encoded, so distinct ids never share a file.
fn encode_file_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

#[async_trait]
impl HistorySource for DirectoryHistorySource {
    async fn describe_execution(
        &self,
        execution_id: &str,
        run_id: Option<&str>,
    ) -> Result<ExecutionRecord, StorageError> {
        Ok(self.find(execution_id, run_id).await?.execution)
    }

    async fn fetch_history(
        &self,
        execution_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<PrimitiveEvent>, StorageError> {
        Ok(self.find(execution_id, run_id).await?.events)
    }

    async fn list_executions(&self) -> Result<Vec<ExecutionRecord>, StorageError> {
        let mut executions: Vec<ExecutionRecord> = self
            .load_all()
            .await?
            .into_iter()
            .map(|r| r.execution)
            .collect();
        executions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(executions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::{make_history, run_conformance_suite};

    #[tokio::test]
    async fn directory_source_passes_conformance() {
        // Each factory call gets its own directory; keep them alive for the run.
        let dirs = std::sync::Mutex::new(Vec::new());
        let report = run_conformance_suite(|records| {
            let dir = tempfile::tempdir().expect("tempdir");
            let source = DirectoryHistorySource::new(dir.path());
            dirs.lock().unwrap().push(dir);
            async move {
                for record in &records {
                    source.store(record).await.expect("store record");
                }
                source
            }
        })
        .await;
        assert!(report.failed == 0, "{report}");
    }

    #[tokio::test]
    async fn malformed_file_is_invalid_record() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let source = DirectoryHistorySource::new(dir.path());

        match source.list_executions().await {
            Err(StorageError::InvalidRecord { location, .. }) => {
                assert!(location.ends_with("broken.json"))
            }
            other => panic!("expected InvalidRecord, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_json_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.txt"), "notes").unwrap();
        let source = DirectoryHistorySource::new(dir.path());
        source.store(&make_history("wf-1", "run-a", 0)).await.unwrap();

        assert_eq!(source.list_executions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_directory_is_backend_error() {
        let source = DirectoryHistorySource::new("/nonexistent/statescope-history");
        assert!(matches!(
            source.list_executions().await,
            Err(StorageError::Backend(_))
        ));
    }

    #[test]
    fn file_names_are_encoded() {
        assert_eq!(encode_file_id("order/42:a"), "order%2F42%3Aa");
        assert_eq!(encode_file_id("order_1"), "order_1");
        assert_eq!(encode_file_id("a.b%"), "a%2Eb%25");
    }

    #[tokio::test]
    async fn ids_differing_only_in_punctuation_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryHistorySource::new(dir.path());
        let slashed = source.store(&make_history("order/1", "run-a", 0)).await.unwrap();
        let underscored = source.store(&make_history("order_1", "run-a", 10)).await.unwrap();
        assert_ne!(slashed, underscored);

        assert_eq!(source.list_executions().await.unwrap().len(), 2);
        let record = source.describe_execution("order/1", None).await.unwrap();
        assert_eq!(record.execution_id, "order/1");
    }
}
