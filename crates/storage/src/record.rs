use serde::{Deserialize, Serialize};
use statescope_interchange::PrimitiveEvent;
use time::OffsetDateTime;

/// Runtime-level description of one execution run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub run_id: String,
    /// The runtime's workflow type (not the logical iWF type).
    pub workflow_type: String,
    /// Native status: a possibly prefixed string or a small integer code.
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub close_time: Option<OffsetDateTime>,
}

/// An execution run together with its full primitive event log.
///
/// This is also the on-disk document format of the directory backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionHistoryRecord {
    pub execution: ExecutionRecord,
    pub events: Vec<PrimitiveEvent>,
}

impl ExecutionHistoryRecord {
    pub(crate) fn matches(&self, execution_id: &str, run_id: Option<&str>) -> bool {
        self.execution.execution_id == execution_id
            && run_id.map_or(true, |r| self.execution.run_id == r)
    }
}

/// Pick the record for `(execution_id, run_id)`; with no run id, the run
/// that started last wins.
pub(crate) fn select_run<'a>(
    records: impl IntoIterator<Item = &'a ExecutionHistoryRecord>,
    execution_id: &str,
    run_id: Option<&str>,
) -> Option<&'a ExecutionHistoryRecord> {
    records
        .into_iter()
        .filter(|r| r.matches(execution_id, run_id))
        .max_by_key(|r| r.execution.start_time)
}
