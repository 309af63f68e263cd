//! statescope-interchange: wire types for durable-execution event logs.
//!
//! Provides typed structs for the primitive event log of one execution
//! (tasks, signals, lifecycle) and the iWF request/response documents
//! carried inside task payloads, plus the decoding entry points that turn
//! base64 payloads into those types.
//!
//! Both the storage backends and the replay engine depend on this crate,
//! so the log format is defined in exactly one place.

pub mod deserialize;
pub mod types;

pub use deserialize::{
    decode_execute_response, decode_initial_input, decode_initial_input_value, decode_json,
    decode_optional, decode_task_input, parse_history, InterchangeError,
};
pub use types::*;
