//! In-process history source, used by tests and for serving fixtures
//! loaded once at startup.

use async_trait::async_trait;
use statescope_interchange::PrimitiveEvent;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{select_run, ExecutionHistoryRecord, ExecutionRecord};
use crate::traits::HistorySource;

#[derive(Debug, Default)]
pub struct MemoryHistorySource {
    records: RwLock<Vec<ExecutionHistoryRecord>>,
}

impl MemoryHistorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ExecutionHistoryRecord>) -> Self {
        MemoryHistorySource {
            records: RwLock::new(records),
        }
    }

    /// Add a run, replacing any stored run with the same ids.
    pub async fn insert(&self, record: ExecutionHistoryRecord) {
        let mut records = self.records.write().await;
        records.retain(|r| {
            !(r.execution.execution_id == record.execution.execution_id
                && r.execution.run_id == record.execution.run_id)
        });
        records.push(record);
    }
}

fn not_found(execution_id: &str, run_id: Option<&str>) -> StorageError {
    StorageError::ExecutionNotFound {
        execution_id: execution_id.to_string(),
        run_id: run_id.map(str::to_string),
    }
}

#[async_trait]
impl HistorySource for MemoryHistorySource {
    async fn describe_execution(
        &self,
        execution_id: &str,
        run_id: Option<&str>,
    ) -> Result<ExecutionRecord, StorageError> {
        let records = self.records.read().await;
        select_run(records.iter(), execution_id, run_id)
            .map(|r| r.execution.clone())
            .ok_or_else(|| not_found(execution_id, run_id))
    }

    async fn fetch_history(
        &self,
        execution_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<PrimitiveEvent>, StorageError> {
        let records = self.records.read().await;
        select_run(records.iter(), execution_id, run_id)
            .map(|r| r.events.clone())
            .ok_or_else(|| not_found(execution_id, run_id))
    }

    async fn list_executions(&self) -> Result<Vec<ExecutionRecord>, StorageError> {
        let records = self.records.read().await;
        let mut executions: Vec<ExecutionRecord> =
            records.iter().map(|r| r.execution.clone()).collect();
        executions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(executions)
    }
}
