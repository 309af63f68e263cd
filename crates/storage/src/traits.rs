use async_trait::async_trait;
use statescope_interchange::PrimitiveEvent;

use crate::error::StorageError;
use crate::record::ExecutionRecord;

/// Read access to the durable-execution runtime's execution records.
///
/// A `HistorySource` is the collaborator that fetches everything the
/// replay engine consumes. The engine itself never talks to a backend:
/// callers fetch the full log first, then reconstruct.
///
/// ## Run selection
///
/// Every lookup takes an optional run id. When it is `None`, the run of
/// the given execution that started most recently is used.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait HistorySource: Send + Sync + 'static {
    /// Describe one execution run.
    ///
    /// Returns `Err(StorageError::ExecutionNotFound)` if no run matches.
    async fn describe_execution(
        &self,
        execution_id: &str,
        run_id: Option<&str>,
    ) -> Result<ExecutionRecord, StorageError>;

    /// Fetch the complete, ordered primitive event log of one run.
    ///
    /// Returns `Err(StorageError::ExecutionNotFound)` if no run matches.
    async fn fetch_history(
        &self,
        execution_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<PrimitiveEvent>, StorageError>;

    /// All known runs, most recently started first.
    async fn list_executions(&self) -> Result<Vec<ExecutionRecord>, StorageError>;
}
