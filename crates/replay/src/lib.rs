//! statescope-replay: recover the state-level history of an iWF execution.
//!
//! The runtime records an execution as an ordered log of primitive task
//! events. [`reconstruct`] folds that log, in one pass, into logical
//! history events (`WaitUntil`, `Execute`, lifecycle, signals, RPCs), each
//! linked to the event that caused it. [`show_workflow`] composes the fold
//! with a [`statescope_storage::HistorySource`] and the status mapping to
//! produce the complete operator view.
//!
//! The fold is pure and synchronous. Every call owns its own bookkeeping,
//! so concurrent reconstructions never share state.

pub mod error;
pub mod event;
pub mod reconstruct;
pub mod registry;
pub mod show;
pub mod status;

pub use error::ReconstructError;
pub use event::{
    ExecuteEvent, ExecutionClosedEvent, ExecutionStartedEvent, FailedTask, HistoryEvent, Origin,
    ResumeSnapshot, RpcExecutedEvent, SignalReceivedEvent, WaitUntilEvent,
};
pub use reconstruct::{
    initial_input_from_log, initial_input_from_payload, reconstruct, reconstruct_log,
    Reconstruction,
};
pub use registry::PendingState;
pub use show::{list_workflows, show_workflow, ExecutionSummary, ShowError, WorkflowView};
pub use status::{ExecutionStatus, StatusError};
