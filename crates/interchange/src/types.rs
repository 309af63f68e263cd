//! Typed structs for the primitive event log of one execution and the
//! iWF request/response shapes carried inside its task payloads.
//!
//! The durable-execution runtime knows nothing about logical states: it
//! records tasks, signals and the execution lifecycle. Everything
//! state-shaped lives inside the base64 payloads and is only typed after
//! [`crate::deserialize`] decodes it.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Payload encoding for base64-wrapped JSON documents.
pub const ENCODING_JSON_PLAIN: &str = "json/plain";

/// Payload encoding for an absent value.
pub const ENCODING_BINARY_NULL: &str = "binary/null";

// ── Encoded payloads ────────────────────────────────────────────────

/// A payload as stored by the runtime: an encoding tag plus base64 data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payload {
    pub encoding: String,
    #[serde(default)]
    pub data: String,
}

impl Payload {
    /// Wrap a JSON value as a `json/plain` payload.
    pub fn json(value: &serde_json::Value) -> Self {
        use base64::Engine as _;
        Payload {
            encoding: ENCODING_JSON_PLAIN.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(value.to_string()),
        }
    }

    /// A `binary/null` payload.
    pub fn null() -> Self {
        Payload {
            encoding: ENCODING_BINARY_NULL.to_string(),
            data: String::new(),
        }
    }
}

// ── Primitive events ────────────────────────────────────────────────

/// One entry of an execution's append-only log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveEvent {
    /// Strictly increasing within one log.
    pub event_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub event_time: OffsetDateTime,
    #[serde(flatten)]
    pub kind: PrimitiveEventKind,
}

/// Kind-specific payload of a primitive event, tagged by `eventType`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "eventType", rename_all_fields = "camelCase")]
pub enum PrimitiveEventKind {
    ExecutionStarted {
        /// The runtime's own workflow type, not the logical iWF type.
        workflow_type: String,
        input: Payload,
    },
    TaskScheduled {
        schedule_id: i64,
        #[serde(default)]
        task_id: String,
        task_type: String,
        input: Payload,
    },
    TaskCompleted {
        schedule_id: i64,
        #[serde(default)]
        result: Option<Payload>,
    },
    TaskFailed {
        schedule_id: i64,
        #[serde(default)]
        reason: String,
        #[serde(default)]
        details: Option<Payload>,
    },
    SignalReceived {
        signal_name: String,
        #[serde(default)]
        input: Option<Payload>,
    },
    ExecutionClosed {
        /// Native status string as reported by the runtime.
        status: String,
        #[serde(default)]
        result: Option<Payload>,
    },
}

impl PrimitiveEventKind {
    /// The `eventType` discriminant, for logging and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveEventKind::ExecutionStarted { .. } => "ExecutionStarted",
            PrimitiveEventKind::TaskScheduled { .. } => "TaskScheduled",
            PrimitiveEventKind::TaskCompleted { .. } => "TaskCompleted",
            PrimitiveEventKind::TaskFailed { .. } => "TaskFailed",
            PrimitiveEventKind::SignalReceived { .. } => "SignalReceived",
            PrimitiveEventKind::ExecutionClosed { .. } => "ExecutionClosed",
        }
    }
}

// ── Task classification ─────────────────────────────────────────────

/// What a scheduled task means to the state abstraction, keyed by the
/// runtime task-type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    WaitUntil,
    Execute,
    Rpc,
    Other(String),
}

impl TaskKind {
    pub fn classify(task_type: &str) -> Self {
        match task_type {
            "StateApiWaitUntil" | "StateStart" => TaskKind::WaitUntil,
            "StateApiExecute" | "StateDecide" => TaskKind::Execute,
            "InvokeWorkerRpc" => TaskKind::Rpc,
            other => TaskKind::Other(other.to_string()),
        }
    }
}

// ── iWF shapes ──────────────────────────────────────────────────────

/// iWF's own encoded value (state input, signal value, ...). Opaque to us.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncodedObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// Per-state options. Only the fields the history view cares about are
/// typed; the rest is carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_wait_until: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Previous-run marker carried when an execution resumes from continue-as-new.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContinueAsNewInput {
    pub previous_internal_run_id: String,
}

/// Decoded input of `ExecutionStarted` for an iWF workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitialInput {
    pub iwf_workflow_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iwf_worker_url: Option<String>,
    pub start_state_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_input: Option<EncodedObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_options: Option<StateOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub is_resume_from_continue_as_new: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_as_new_input: Option<ContinueAsNewInput>,
}

impl InitialInput {
    /// Minimal input naming a workflow type and its start state.
    pub fn new(workflow_type: &str, start_state_id: &str) -> Self {
        InitialInput {
            iwf_workflow_type: workflow_type.to_string(),
            iwf_worker_url: None,
            start_state_id: start_state_id.to_string(),
            state_input: None,
            state_options: None,
            config: None,
            is_resume_from_continue_as_new: false,
            continue_as_new_input: None,
        }
    }
}

/// Identity of one state activation, shared by its wait-until and execute tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateContext {
    pub workflow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_started_timestamp: Option<i64>,
    pub state_execution_id: String,
}

/// Request sent to the worker for a state's wait-until step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaitUntilRequest {
    pub context: StateContext,
    pub workflow_type: String,
    pub workflow_state_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_input: Option<EncodedObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_attributes: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_objects: Option<serde_json::Value>,
}

/// Request sent to the worker for a state's execute step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub context: StateContext,
    pub workflow_type: String,
    pub workflow_state_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_input: Option<EncodedObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_locals: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_results: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_attributes: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_objects: Option<serde_json::Value>,
}

/// Task input envelope: the worker URL plus the typed request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskEnvelope<R> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iwf_worker_url: Option<String>,
    pub request: R,
}

/// One next state declared by an execute decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateMovement {
    pub state_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_options: Option<StateOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_input: Option<EncodedObject>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateDecision {
    #[serde(default)]
    pub next_states: Vec<StateMovement>,
}

/// Worker response to an execute request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_decision: Option<StateDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upsert_state_locals: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ExecuteResponse {
    /// Next states in declaration order; empty when the decision is absent.
    pub fn next_states(&self) -> &[StateMovement] {
        self.state_decision
            .as_ref()
            .map(|d| d.next_states.as_slice())
            .unwrap_or(&[])
    }
}

/// A task input decoded according to its [`TaskKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum TaskInput {
    WaitUntil(TaskEnvelope<WaitUntilRequest>),
    Execute(TaskEnvelope<ExecuteRequest>),
    /// RPC inputs are shown as-is.
    Rpc(serde_json::Value),
    /// Not decoded: the payload belongs to runtime plumbing we don't model.
    Other { task_type: String },
}
