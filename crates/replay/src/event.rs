//! Logical history events: the state-shaped view of a primitive log.

use serde::{Serialize, Serializer};
use statescope_interchange::{EncodedObject, ExecuteResponse, StateOptions};
use time::OffsetDateTime;

// ──────────────────────────────────────────────
// Causal origin
// ──────────────────────────────────────────────

/// What caused a logical event.
///
/// Serializes as the wire-level `fromEventId`: `-1` for the execution's
/// initial input, otherwise the index of the causing logical event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    InitialInput,
    Event(usize),
}

impl Origin {
    pub fn as_i64(self) -> i64 {
        match self {
            Origin::InitialInput => -1,
            Origin::Event(index) => index as i64,
        }
    }
}

impl Serialize for Origin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

// ──────────────────────────────────────────────
// Event variants
// ──────────────────────────────────────────────

/// A state's wait-until step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitUntilEvent {
    pub state_id: String,
    pub state_execution_id: String,
    pub input: Option<EncodedObject>,
    pub options: Option<StateOptions>,
    #[serde(rename = "fromEventId")]
    pub from: Origin,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub response: Option<serde_json::Value>,
}

/// A state's execute step, whose response decides the next states.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteEvent {
    pub state_id: String,
    pub state_execution_id: String,
    pub input: Option<EncodedObject>,
    pub state_locals: Option<serde_json::Value>,
    pub command_results: Option<serde_json::Value>,
    #[serde(rename = "fromEventId")]
    pub from: Origin,
    pub options: Option<StateOptions>,
    pub task_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub response: Option<ExecuteResponse>,
}

/// Marker shown when an execution resumed from a previous run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSnapshot {
    pub previous_run_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStartedEvent {
    /// The logical iWF workflow type.
    pub workflow_type: String,
    pub start_state_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    pub input: Option<EncodedObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_snapshot: Option<ResumeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionClosedEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub closed_at: OffsetDateTime,
    /// Native status string from the close event.
    pub status: String,
    pub output: Option<serde_json::Value>,
}

/// Informational only; signals are not linked into the causal graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalReceivedEvent {
    pub signal_name: String,
    pub value: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
}

/// Informational only; RPCs carry no `fromEventId`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcExecutedEvent {
    pub task_id: String,
    pub input: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub response: Option<serde_json::Value>,
}

/// One reconstructed unit of display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "eventType")]
pub enum HistoryEvent {
    WaitUntil(WaitUntilEvent),
    Execute(ExecuteEvent),
    ExecutionStarted(ExecutionStartedEvent),
    ExecutionClosed(ExecutionClosedEvent),
    SignalReceived(SignalReceivedEvent),
    RpcExecuted(RpcExecutedEvent),
}

impl HistoryEvent {
    /// The causal origin, for events that have one.
    pub fn origin(&self) -> Option<Origin> {
        match self {
            HistoryEvent::WaitUntil(e) => Some(e.from),
            HistoryEvent::Execute(e) => Some(e.from),
            HistoryEvent::ExecutionStarted(_) => Some(Origin::InitialInput),
            HistoryEvent::ExecutionClosed(_)
            | HistoryEvent::SignalReceived(_)
            | HistoryEvent::RpcExecuted(_) => None,
        }
    }

    /// The logical state this event belongs to, if any.
    pub fn state_id(&self) -> Option<&str> {
        match self {
            HistoryEvent::WaitUntil(e) => Some(&e.state_id),
            HistoryEvent::Execute(e) => Some(&e.state_id),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HistoryEvent::WaitUntil(_) => "WaitUntil",
            HistoryEvent::Execute(_) => "Execute",
            HistoryEvent::ExecutionStarted(_) => "ExecutionStarted",
            HistoryEvent::ExecutionClosed(_) => "ExecutionClosed",
            HistoryEvent::SignalReceived(_) => "SignalReceived",
            HistoryEvent::RpcExecuted(_) => "RpcExecuted",
        }
    }

    pub fn completed_at(&self) -> Option<OffsetDateTime> {
        match self {
            HistoryEvent::WaitUntil(e) => e.completed_at,
            HistoryEvent::Execute(e) => e.completed_at,
            HistoryEvent::RpcExecuted(e) => e.completed_at,
            _ => None,
        }
    }
}

/// A scheduled task that failed. Recorded only; no logical event changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTask {
    pub event_id: i64,
    pub schedule_id: i64,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub failed_at: OffsetDateTime,
}
