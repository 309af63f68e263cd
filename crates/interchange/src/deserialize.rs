//! Decoding of runtime payloads into typed iWF shapes.
//!
//! Payload decoding is keyed by task-type name: [`decode_task_input`]
//! classifies the task first and only then picks the request type, so a
//! payload is never accessed as an untyped document by the engine.

use base64::Engine as _;
use serde::de::DeserializeOwned;
use std::fmt;

use crate::types::*;

/// Errors while decoding a log or one of its payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterchangeError {
    /// The payload's encoding tag is not one we can decode.
    UnsupportedEncoding { encoding: String },
    /// Base64 or JSON decoding of a payload failed.
    InvalidPayload { message: String },
    /// The payload decoded, but not into the shape its task type requires.
    InvalidTaskPayload { task_type: String, message: String },
    /// The initial input lacks the markers of a state-based workflow.
    NotStateWorkflow { missing: String },
    /// The log document itself could not be parsed.
    InvalidLog(String),
}

impl fmt::Display for InterchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterchangeError::UnsupportedEncoding { encoding } => {
                write!(f, "unsupported payload encoding '{}'", encoding)
            }
            InterchangeError::InvalidPayload { message } => {
                write!(f, "invalid payload: {}", message)
            }
            InterchangeError::InvalidTaskPayload { task_type, message } => {
                write!(f, "invalid {} payload: {}", task_type, message)
            }
            InterchangeError::NotStateWorkflow { missing } => {
                write!(f, "not a state-based workflow input: missing '{}'", missing)
            }
            InterchangeError::InvalidLog(msg) => write!(f, "invalid event log: {}", msg),
        }
    }
}

impl std::error::Error for InterchangeError {}

/// Decode a payload into a JSON value. `binary/null` yields `Null`.
pub fn decode_json(payload: &Payload) -> Result<serde_json::Value, InterchangeError> {
    match payload.encoding.as_str() {
        ENCODING_BINARY_NULL => Ok(serde_json::Value::Null),
        ENCODING_JSON_PLAIN => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(payload.data.as_bytes())
                .map_err(|e| InterchangeError::InvalidPayload {
                    message: format!("base64: {}", e),
                })?;
            serde_json::from_slice(&bytes).map_err(|e| InterchangeError::InvalidPayload {
                message: format!("json: {}", e),
            })
        }
        other => Err(InterchangeError::UnsupportedEncoding {
            encoding: other.to_string(),
        }),
    }
}

/// Decode an optional payload; an absent payload is `Null`.
pub fn decode_optional(payload: Option<&Payload>) -> Result<serde_json::Value, InterchangeError> {
    match payload {
        Some(p) => decode_json(p),
        None => Ok(serde_json::Value::Null),
    }
}

fn decode_typed<T: DeserializeOwned>(
    payload: &Payload,
    task_type: &str,
) -> Result<T, InterchangeError> {
    let value = decode_json(payload)?;
    serde_json::from_value(value).map_err(|e| InterchangeError::InvalidTaskPayload {
        task_type: task_type.to_string(),
        message: e.to_string(),
    })
}

/// Decode a scheduled task's input according to its task type.
pub fn decode_task_input(task_type: &str, payload: &Payload) -> Result<TaskInput, InterchangeError> {
    match TaskKind::classify(task_type) {
        TaskKind::WaitUntil => Ok(TaskInput::WaitUntil(decode_typed(payload, task_type)?)),
        TaskKind::Execute => Ok(TaskInput::Execute(decode_typed(payload, task_type)?)),
        TaskKind::Rpc => Ok(TaskInput::Rpc(decode_json(payload)?)),
        TaskKind::Other(task_type) => Ok(TaskInput::Other { task_type }),
    }
}

/// Decode an execute task's result. An absent result is an empty response.
pub fn decode_execute_response(
    payload: Option<&Payload>,
) -> Result<ExecuteResponse, InterchangeError> {
    match payload {
        Some(p) => match decode_json(p)? {
            serde_json::Value::Null => Ok(ExecuteResponse::default()),
            value => serde_json::from_value(value).map_err(|e| {
                InterchangeError::InvalidTaskPayload {
                    task_type: "StateApiExecute".to_string(),
                    message: e.to_string(),
                }
            }),
        },
        None => Ok(ExecuteResponse::default()),
    }
}

/// Decode the initial input of an execution.
pub fn decode_initial_input(payload: &Payload) -> Result<InitialInput, InterchangeError> {
    decode_initial_input_value(decode_json(payload)?)
}

/// Decode an initial input that is already a JSON document.
///
/// The start-state marker is checked before typed decoding so that inputs
/// of unrelated workflow types report `NotStateWorkflow` rather than a
/// generic shape error.
pub fn decode_initial_input_value(
    value: serde_json::Value,
) -> Result<InitialInput, InterchangeError> {
    for marker in ["startStateId", "iwfWorkflowType"] {
        let present = value
            .get(marker)
            .and_then(|v| v.as_str())
            .is_some_and(|s| !s.is_empty());
        if !present {
            return Err(InterchangeError::NotStateWorkflow {
                missing: marker.to_string(),
            });
        }
    }
    serde_json::from_value(value).map_err(|e| InterchangeError::InvalidTaskPayload {
        task_type: "ExecutionStarted".to_string(),
        message: e.to_string(),
    })
}

/// Parse a JSON array of primitive events.
pub fn parse_history(json: &str) -> Result<Vec<PrimitiveEvent>, InterchangeError> {
    serde_json::from_str(json).map_err(|e| InterchangeError::InvalidLog(e.to_string()))
}
