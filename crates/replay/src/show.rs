//! Show-workflow composition: fetch, map status, reconstruct, assemble.
//!
//! This is the one place the pure engine meets a [`HistorySource`]. The
//! order is fixed: describe the run, map its status (an unknown status
//! stops here), fetch the full log, then reconstruct. Nothing partial is
//! returned on failure.

use serde::Serialize;
use statescope_interchange::InitialInput;
use statescope_storage::{ExecutionRecord, HistorySource, StorageError};

use crate::error::ReconstructError;
use crate::event::{FailedTask, HistoryEvent, ResumeSnapshot};
use crate::reconstruct::{initial_input_from_log, reconstruct};
use crate::registry::PendingState;
use crate::status::{ExecutionStatus, StatusError};

/// Everything an operator sees for one execution run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowView {
    pub execution_id: String,
    pub run_id: String,
    pub status: ExecutionStatus,
    /// The logical iWF workflow type from the initial input.
    pub workflow_type: String,
    /// Unix seconds.
    pub workflow_started_timestamp: i64,
    pub input: InitialInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_as_new_snapshot: Option<ResumeSnapshot>,
    pub history_events: Vec<HistoryEvent>,
    pub pending_states: Vec<PendingState>,
    pub failed_tasks: Vec<FailedTask>,
}

/// One row of an execution listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub run_id: String,
    pub workflow_type: String,
    pub status: ExecutionStatus,
    pub workflow_started_timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_closed_timestamp: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ShowError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),
}

impl ShowError {
    /// Stable machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            ShowError::Storage(StorageError::ExecutionNotFound { .. }) => "ExecutionNotFound",
            ShowError::Storage(StorageError::InvalidRecord { .. }) => "InvalidRecord",
            ShowError::Storage(StorageError::Backend(_)) => "Backend",
            ShowError::Status(StatusError::UnknownStatus { .. }) => "UnknownStatus",
            ShowError::Reconstruct(ReconstructError::MalformedHistory { .. }) => {
                "MalformedHistory"
            }
            ShowError::Reconstruct(ReconstructError::UnsupportedExecution { .. }) => {
                "UnsupportedExecution"
            }
        }
    }
}

/// Build the full view of one execution run.
///
/// With no `run_id`, the most recently started run of `execution_id` is
/// shown.
pub async fn show_workflow<S: HistorySource + ?Sized>(
    source: &S,
    execution_id: &str,
    run_id: Option<&str>,
) -> Result<WorkflowView, ShowError> {
    let record = source.describe_execution(execution_id, run_id).await?;
    let status = ExecutionStatus::from_native(&record.status)?;

    // Pin the described run so a run started in between is not mixed in.
    let log = source
        .fetch_history(&record.execution_id, Some(&record.run_id))
        .await?;
    tracing::debug!(
        execution_id = %record.execution_id,
        run_id = %record.run_id,
        %status,
        primitive_events = log.len(),
        "fetched history"
    );

    let input = initial_input_from_log(&log)?;
    let reconstruction = reconstruct(&input, &log)?;

    let continue_as_new_snapshot = reconstruction.events.iter().find_map(|event| match event {
        HistoryEvent::ExecutionStarted(started) => started.resume_snapshot.clone(),
        _ => None,
    });

    Ok(WorkflowView {
        execution_id: record.execution_id,
        run_id: record.run_id,
        status,
        workflow_type: input.iwf_workflow_type.clone(),
        workflow_started_timestamp: record.start_time.unix_timestamp(),
        input,
        continue_as_new_snapshot,
        history_events: reconstruction.events,
        pending_states: reconstruction.pending.summary(),
        failed_tasks: reconstruction.failed_tasks,
    })
}

/// Every run the source knows about, latest first, with mapped status.
pub async fn list_workflows<S: HistorySource + ?Sized>(
    source: &S,
) -> Result<Vec<ExecutionSummary>, ShowError> {
    let records = source.list_executions().await?;
    records.into_iter().map(summarize).collect()
}

fn summarize(record: ExecutionRecord) -> Result<ExecutionSummary, ShowError> {
    let status = ExecutionStatus::from_native(&record.status)?;
    Ok(ExecutionSummary {
        execution_id: record.execution_id,
        run_id: record.run_id,
        workflow_type: record.workflow_type,
        status,
        workflow_started_timestamp: record.start_time.unix_timestamp(),
        workflow_closed_timestamp: record.close_time.map(|t| t.unix_timestamp()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use statescope_interchange::{ContinueAsNewInput, Payload, PrimitiveEvent, PrimitiveEventKind};
    use statescope_storage::{ExecutionHistoryRecord, MemoryHistorySource};
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    const T0: OffsetDateTime = datetime!(2024-05-01 10:00 UTC);

    fn event(event_id: i64, kind: PrimitiveEventKind) -> PrimitiveEvent {
        PrimitiveEvent {
            event_id,
            event_time: T0 + Duration::seconds(event_id),
            kind,
        }
    }

    fn started(initial: &InitialInput) -> PrimitiveEvent {
        event(
            1,
            PrimitiveEventKind::ExecutionStarted {
                workflow_type: "Interpreter".to_string(),
                input: Payload::json(&serde_json::to_value(initial).unwrap()),
            },
        )
    }

    fn wait_until(event_id: i64, state_id: &str) -> PrimitiveEvent {
        event(
            event_id,
            PrimitiveEventKind::TaskScheduled {
                schedule_id: event_id,
                task_id: format!("task-{}", event_id),
                task_type: "StateApiWaitUntil".to_string(),
                input: Payload::json(&json!({
                    "request": {
                        "context": {
                            "workflowId": "order-1",
                            "stateExecutionId": format!("{}-1", state_id)
                        },
                        "workflowType": "OrderWorkflow",
                        "workflowStateId": state_id
                    }
                })),
            },
        )
    }

    fn record(
        run_id: &str,
        status: &str,
        start_offset: i64,
        events: Vec<PrimitiveEvent>,
    ) -> ExecutionHistoryRecord {
        ExecutionHistoryRecord {
            execution: ExecutionRecord {
                execution_id: "order-1".to_string(),
                run_id: run_id.to_string(),
                workflow_type: "Interpreter".to_string(),
                status: status.to_string(),
                start_time: T0 + Duration::seconds(start_offset),
                close_time: None,
            },
            events,
        }
    }

    fn running_order() -> ExecutionHistoryRecord {
        let initial = InitialInput::new("OrderWorkflow", "init");
        record(
            "run-a",
            "WORKFLOW_EXECUTION_STATUS_RUNNING",
            0,
            vec![started(&initial), wait_until(2, "init")],
        )
    }

    #[tokio::test]
    async fn show_assembles_view_from_source() {
        let source = MemoryHistorySource::with_records(vec![running_order()]);

        let view = show_workflow(&source, "order-1", None).await.unwrap();

        assert_eq!(view.run_id, "run-a");
        assert_eq!(view.status, ExecutionStatus::Running);
        assert_eq!(view.workflow_type, "OrderWorkflow");
        assert_eq!(view.workflow_started_timestamp, T0.unix_timestamp());
        assert_eq!(view.history_events.len(), 2);
        assert_eq!(view.history_events[1].origin().map(|o| o.as_i64()), Some(-1));
        assert!(view.pending_states.is_empty());
        assert!(view.continue_as_new_snapshot.is_none());
    }

    #[tokio::test]
    async fn view_serializes_with_camel_case_fields() {
        let source = MemoryHistorySource::with_records(vec![running_order()]);
        let view = show_workflow(&source, "order-1", None).await.unwrap();

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "RUNNING");
        assert_eq!(json["historyEvents"][1]["eventType"], "WaitUntil");
        assert_eq!(json["historyEvents"][1]["fromEventId"], -1);
        assert_eq!(json["input"]["startStateId"], "init");
        assert!(json.get("continueAsNewSnapshot").is_none());
    }

    #[tokio::test]
    async fn show_selects_requested_run() {
        let mut resumed = InitialInput::new("OrderWorkflow", "charge");
        resumed.is_resume_from_continue_as_new = true;
        resumed.continue_as_new_input = Some(ContinueAsNewInput {
            previous_internal_run_id: "run-a".to_string(),
        });
        let second = record("run-b", "2", 60, vec![started(&resumed)]);
        let source = MemoryHistorySource::with_records(vec![running_order(), second]);

        let latest = show_workflow(&source, "order-1", None).await.unwrap();
        assert_eq!(latest.run_id, "run-b");
        assert_eq!(latest.status, ExecutionStatus::Completed);
        assert_eq!(
            latest.continue_as_new_snapshot.map(|s| s.previous_run_id),
            Some("run-a".to_string())
        );
        assert_eq!(latest.pending_states.len(), 1);
        assert_eq!(latest.pending_states[0].state_id, "charge");

        let first = show_workflow(&source, "order-1", Some("run-a")).await.unwrap();
        assert_eq!(first.run_id, "run-a");
    }

    #[tokio::test]
    async fn unknown_status_stops_before_reconstruction() {
        // The log is unusable, so reaching reconstruction would fail differently.
        let source = MemoryHistorySource::with_records(vec![record("run-a", "99", 0, vec![])]);

        let err = show_workflow(&source, "order-1", None).await.unwrap_err();
        assert!(matches!(err, ShowError::Status(_)), "got {:?}", err);
        assert_eq!(err.kind(), "UnknownStatus");
    }

    #[tokio::test]
    async fn missing_execution_is_storage_error() {
        let source = MemoryHistorySource::new();
        let err = show_workflow(&source, "nope", None).await.unwrap_err();
        assert_eq!(err.kind(), "ExecutionNotFound");
    }

    #[tokio::test]
    async fn foreign_execution_is_unsupported() {
        let foreign = event(
            1,
            PrimitiveEventKind::ExecutionStarted {
                workflow_type: "BillingCron".to_string(),
                input: Payload::json(&json!({ "cron": "0 * * * *" })),
            },
        );
        let source =
            MemoryHistorySource::with_records(vec![record("run-a", "RUNNING", 0, vec![foreign])]);

        let err = show_workflow(&source, "order-1", None).await.unwrap_err();
        assert_eq!(err.kind(), "UnsupportedExecution");
    }

    #[tokio::test]
    async fn malformed_log_is_reconstruct_error() {
        let initial = InitialInput::new("OrderWorkflow", "init");
        let broken = record(
            "run-a",
            "RUNNING",
            0,
            vec![started(&initial), wait_until(2, "elsewhere")],
        );
        let source = MemoryHistorySource::with_records(vec![broken]);

        let err = show_workflow(&source, "order-1", None).await.unwrap_err();
        assert_eq!(err.kind(), "MalformedHistory");
    }

    #[tokio::test]
    async fn list_maps_statuses_latest_first() {
        let mut closed = record("run-b", "WORKFLOW_EXECUTION_STATUS_TIMED_OUT", 60, vec![]);
        closed.execution.close_time = Some(T0 + Duration::seconds(120));
        let source = MemoryHistorySource::with_records(vec![running_order(), closed]);

        let rows = list_workflows(&source).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].run_id, "run-b");
        assert_eq!(rows[0].status, ExecutionStatus::Timeout);
        assert_eq!(
            rows[0].workflow_closed_timestamp,
            Some(T0.unix_timestamp() + 120)
        );
        assert_eq!(rows[1].status, ExecutionStatus::Running);
    }
}
