//! History reconstruction: a single-pass fold over a primitive event log.
//!
//! The runtime log is task-shaped. A state activation shows up as a
//! wait-until task and/or an execute task, each scheduled and later
//! completed, interleaved with every other state's tasks. This module
//! recovers the state-shaped view: one logical event per step, each
//! pointing at the logical event that caused it.
//!
//! Causal attribution rules:
//! - A wait-until task consumes the oldest pending transition into its state.
//! - An execute task whose state execution id was seen on a wait-until task
//!   continues that activation and points at the wait-until event. Otherwise
//!   it consumes the oldest pending transition, like a wait-until task.
//! - An execute completion queues one pending transition per declared next
//!   state, in declaration order, originating at the execute event.
//!
//! Completions mutate the already-appended event in place, so no partial
//! result is meaningful before the whole log is folded.

use statescope_interchange::{
    decode_execute_response, decode_initial_input, decode_json, decode_optional, decode_task_input,
    InitialInput, InterchangeError, Payload, PrimitiveEvent, PrimitiveEventKind, TaskInput,
};
use time::OffsetDateTime;

use crate::error::ReconstructError;
use crate::event::{
    ExecuteEvent, ExecutionClosedEvent, ExecutionStartedEvent, FailedTask, HistoryEvent, Origin,
    ResumeSnapshot, RpcExecutedEvent, SignalReceivedEvent, WaitUntilEvent,
};
use crate::registry::{
    BridgeError, ExecutionBridge, PendingTransition, PendingTransitions, ScheduleError,
    ScheduleTable, ScheduleTarget,
};


// ──────────────────────────────────────────────
// Result
// ──────────────────────────────────────────────

/// Output of one reconstruction pass.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// Logical events in causal order.
    pub events: Vec<HistoryEvent>,
    /// Transitions decided but not yet consumed. Non-empty for running
    /// executions; not an error.
    pub pending: PendingTransitions,
    /// Task failures seen in the log, not linked to any logical event.
    pub failed_tasks: Vec<FailedTask>,
}

// ──────────────────────────────────────────────
// Entry points
// ──────────────────────────────────────────────

/// Reconstruct the logical history of one execution.
///
/// `initial` seeds the pending transition into the start state; `log` must
/// be the complete primitive log in order. An input without a start state
/// or workflow type is `UnsupportedExecution`.
pub fn reconstruct(
    initial: &InitialInput,
    log: &[PrimitiveEvent],
) -> Result<Reconstruction, ReconstructError> {
    check_start_marker(initial)?;

    let span = tracing::debug_span!(
        "reconstruct",
        workflow_type = %initial.iwf_workflow_type,
        primitive_events = log.len()
    );
    let _guard = span.enter();

    let mut pass = ReplayPass::new(initial);
    for event in log {
        pass.apply(event)?;
    }
    let result = pass.finish();
    tracing::debug!(
        logical_events = result.events.len(),
        pending_states = result.pending.summary().len(),
        "reconstruction finished"
    );
    Ok(result)
}

/// Reconstruct a log whose initial input lives in its `ExecutionStarted` event.
pub fn reconstruct_log(log: &[PrimitiveEvent]) -> Result<Reconstruction, ReconstructError> {
    let initial = initial_input_from_log(log)?;
    reconstruct(&initial, log)
}

/// Find and decode the initial input carried by the log's `ExecutionStarted`.
pub fn initial_input_from_log(log: &[PrimitiveEvent]) -> Result<InitialInput, ReconstructError> {
    let (event_id, payload) = log
        .iter()
        .find_map(|e| match &e.kind {
            PrimitiveEventKind::ExecutionStarted { input, .. } => Some((e.event_id, input)),
            _ => None,
        })
        .ok_or_else(|| ReconstructError::MalformedHistory {
            event_id: None,
            state_id: None,
            reason: "log has no ExecutionStarted event".to_string(),
        })?;
    initial_input_from_payload(event_id, payload)
}

/// Decode an initial input, separating foreign executions from broken ones.
pub fn initial_input_from_payload(
    event_id: i64,
    payload: &Payload,
) -> Result<InitialInput, ReconstructError> {
    decode_initial_input(payload).map_err(|e| match e {
        InterchangeError::NotStateWorkflow { missing } => ReconstructError::UnsupportedExecution {
            reason: format!("initial input carries no '{}' marker", missing),
        },
        other => ReconstructError::malformed(event_id, other.to_string()),
    })
}

fn check_start_marker(initial: &InitialInput) -> Result<(), ReconstructError> {
    let missing = if initial.start_state_id.is_empty() {
        "startStateId"
    } else if initial.iwf_workflow_type.is_empty() {
        "iwfWorkflowType"
    } else {
        return Ok(());
    };
    Err(ReconstructError::UnsupportedExecution {
        reason: format!("initial input carries no '{}' marker", missing),
    })
}

// ──────────────────────────────────────────────
// The pass
// ──────────────────────────────────────────────

struct ReplayPass<'a> {
    initial: &'a InitialInput,
    events: Vec<HistoryEvent>,
    pending: PendingTransitions,
    schedules: ScheduleTable,
    bridge: ExecutionBridge,
    failed_tasks: Vec<FailedTask>,
    last_event_id: Option<i64>,
}

impl<'a> ReplayPass<'a> {
    fn new(initial: &'a InitialInput) -> Self {
        let mut pending = PendingTransitions::new();
        pending.push(
            &initial.start_state_id,
            PendingTransition {
                origin: Origin::InitialInput,
                options: initial.state_options.clone(),
                input: initial.state_input.clone(),
            },
        );
        ReplayPass {
            initial,
            events: Vec::new(),
            pending,
            schedules: ScheduleTable::new(),
            bridge: ExecutionBridge::new(),
            failed_tasks: Vec::new(),
            last_event_id: None,
        }
    }

    fn finish(self) -> Reconstruction {
        Reconstruction {
            events: self.events,
            pending: self.pending,
            failed_tasks: self.failed_tasks,
        }
    }

    fn apply(&mut self, event: &PrimitiveEvent) -> Result<(), ReconstructError> {
        if let Some(last) = self.last_event_id {
            if event.event_id <= last {
                return Err(ReconstructError::malformed(
                    event.event_id,
                    format!("event id does not increase (previous was {})", last),
                ));
            }
        }
        self.last_event_id = Some(event.event_id);

        tracing::trace!(event_id = event.event_id, kind = event.kind.name(), "apply");

        match &event.kind {
            PrimitiveEventKind::ExecutionStarted { .. } => {
                self.on_execution_started(event.event_time);
                Ok(())
            }
            PrimitiveEventKind::TaskScheduled {
                schedule_id,
                task_id,
                task_type,
                input,
            } => {
                let decoded = decode_task_input(task_type, input)
                    .map_err(|e| ReconstructError::malformed(event.event_id, e.to_string()))?;
                self.on_task_scheduled(event, *schedule_id, task_id, decoded)
            }
            PrimitiveEventKind::TaskCompleted {
                schedule_id,
                result,
            } => self.on_task_completed(event, *schedule_id, result.as_ref()),
            PrimitiveEventKind::TaskFailed {
                schedule_id,
                reason,
                ..
            } => {
                tracing::debug!(
                    event_id = event.event_id,
                    schedule_id,
                    "task failure recorded without linking"
                );
                self.failed_tasks.push(FailedTask {
                    event_id: event.event_id,
                    schedule_id: *schedule_id,
                    reason: reason.clone(),
                    failed_at: event.event_time,
                });
                Ok(())
            }
            PrimitiveEventKind::SignalReceived { signal_name, input } => {
                let value = decode_optional(input.as_ref())
                    .map_err(|e| ReconstructError::malformed(event.event_id, e.to_string()))?;
                self.events.push(HistoryEvent::SignalReceived(SignalReceivedEvent {
                    signal_name: signal_name.clone(),
                    value,
                    received_at: event.event_time,
                }));
                Ok(())
            }
            PrimitiveEventKind::ExecutionClosed { status, result } => {
                let output = result
                    .as_ref()
                    .map(decode_json)
                    .transpose()
                    .map_err(|e| ReconstructError::malformed(event.event_id, e.to_string()))?;
                self.events.push(HistoryEvent::ExecutionClosed(ExecutionClosedEvent {
                    closed_at: event.event_time,
                    status: status.clone(),
                    output,
                }));
                Ok(())
            }
        }
    }

    fn on_execution_started(&mut self, started_at: OffsetDateTime) {
        let resume_snapshot = self
            .initial
            .continue_as_new_input
            .as_ref()
            .filter(|_| self.initial.is_resume_from_continue_as_new)
            .map(|c| ResumeSnapshot {
                previous_run_id: c.previous_internal_run_id.clone(),
            });
        self.events
            .push(HistoryEvent::ExecutionStarted(ExecutionStartedEvent {
                workflow_type: self.initial.iwf_workflow_type.clone(),
                start_state_id: self.initial.start_state_id.clone(),
                started_at,
                input: self.initial.state_input.clone(),
                resume_snapshot,
            }));
    }

    fn on_task_scheduled(
        &mut self,
        event: &PrimitiveEvent,
        schedule_id: i64,
        task_id: &str,
        input: TaskInput,
    ) -> Result<(), ReconstructError> {
        let index = self.events.len();
        match input {
            TaskInput::WaitUntil(envelope) => {
                let request = envelope.request;
                let state_id = request.workflow_state_id;
                let transition = self.take_pending(event.event_id, &state_id)?;
                let state_execution_id = request.context.state_execution_id;

                if !self.bridge.insert(&state_execution_id, index) {
                    return Err(ReconstructError::malformed_for_state(
                        event.event_id,
                        &state_id,
                        format!(
                            "state execution id '{}' already has a wait-until step",
                            state_execution_id
                        ),
                    ));
                }
                self.register_schedule(event.event_id, schedule_id, ScheduleTarget::Event(index))?;

                tracing::debug!(
                    event_id = event.event_id,
                    index,
                    state_id = %state_id,
                    from = transition.origin.as_i64(),
                    "wait-until"
                );
                self.events.push(HistoryEvent::WaitUntil(WaitUntilEvent {
                    state_id,
                    state_execution_id,
                    input: transition.input,
                    options: transition.options,
                    from: transition.origin,
                    started_at: event.event_time,
                    completed_at: None,
                    response: None,
                }));
            }
            TaskInput::Execute(envelope) => {
                let request = envelope.request;
                let state_id = request.workflow_state_id;
                let state_execution_id = request.context.state_execution_id;

                let transition = match self.bridge.take(&state_execution_id) {
                    Ok(Some(wait_index)) => {
                        self.continue_from_wait(event.event_id, &state_id, wait_index)?
                    }
                    Ok(None) => self.take_pending(event.event_id, &state_id)?,
                    Err(BridgeError::AlreadyContinued) => {
                        return Err(ReconstructError::malformed_for_state(
                            event.event_id,
                            &state_id,
                            format!(
                                "state execution id '{}' already has an execute step",
                                state_execution_id
                            ),
                        ))
                    }
                };
                self.register_schedule(event.event_id, schedule_id, ScheduleTarget::Event(index))?;

                tracing::debug!(
                    event_id = event.event_id,
                    index,
                    state_id = %state_id,
                    from = transition.origin.as_i64(),
                    "execute"
                );
                self.events.push(HistoryEvent::Execute(ExecuteEvent {
                    state_id,
                    state_execution_id,
                    input: transition.input,
                    state_locals: request.state_locals,
                    command_results: request.command_results,
                    from: transition.origin,
                    options: transition.options,
                    task_id: task_id.to_string(),
                    started_at: event.event_time,
                    completed_at: None,
                    response: None,
                }));
            }
            TaskInput::Rpc(input) => {
                self.register_schedule(event.event_id, schedule_id, ScheduleTarget::Event(index))?;
                self.events.push(HistoryEvent::RpcExecuted(RpcExecutedEvent {
                    task_id: task_id.to_string(),
                    input,
                    started_at: event.event_time,
                    completed_at: None,
                    response: None,
                }));
            }
            TaskInput::Other { task_type } => {
                tracing::debug!(
                    event_id = event.event_id,
                    task_type = %task_type,
                    "task not linked into history"
                );
                self.register_schedule(event.event_id, schedule_id, ScheduleTarget::Untracked)?;
            }
        }
        Ok(())
    }

    fn on_task_completed(
        &mut self,
        event: &PrimitiveEvent,
        schedule_id: i64,
        result: Option<&Payload>,
    ) -> Result<(), ReconstructError> {
        let index = match self.schedules.complete(schedule_id) {
            Ok(ScheduleTarget::Event(index)) => index,
            Ok(ScheduleTarget::Untracked) => return Ok(()),
            Err(ScheduleError::AlreadyCompleted) => {
                return Err(ReconstructError::malformed(
                    event.event_id,
                    format!("schedule id {} completed twice", schedule_id),
                ))
            }
            Err(_) => {
                return Err(ReconstructError::malformed(
                    event.event_id,
                    format!("completion references unknown schedule id {}", schedule_id),
                ))
            }
        };
        let completed_at = event.event_time;
        let decode_error =
            |e: InterchangeError| ReconstructError::malformed(event.event_id, e.to_string());

        // Decided next states are queued after the event is updated, in the
        // order the response declares them.
        let mut next_states = Vec::new();
        match &mut self.events[index] {
            HistoryEvent::WaitUntil(wait) => {
                wait.response = Some(decode_optional(result).map_err(decode_error)?);
                wait.completed_at = Some(completed_at);
            }
            HistoryEvent::Execute(execute) => {
                let response = decode_execute_response(result).map_err(decode_error)?;
                next_states = response.next_states().to_vec();
                execute.response = Some(response);
                execute.completed_at = Some(completed_at);
            }
            HistoryEvent::RpcExecuted(rpc) => {
                rpc.response = Some(decode_optional(result).map_err(decode_error)?);
                rpc.completed_at = Some(completed_at);
            }
            other => {
                return Err(ReconstructError::malformed(
                    event.event_id,
                    format!("schedule id {} resolves to a {} event", schedule_id, other.kind()),
                ))
            }
        }

        for movement in next_states {
            tracing::debug!(from = index, state_id = %movement.state_id, "queue transition");
            self.pending.push(
                &movement.state_id,
                PendingTransition {
                    origin: Origin::Event(index),
                    options: movement.state_options,
                    input: movement.state_input,
                },
            );
        }
        Ok(())
    }

    /// Pop the oldest pending transition into `state_id`.
    fn take_pending(
        &mut self,
        event_id: i64,
        state_id: &str,
    ) -> Result<PendingTransition, ReconstructError> {
        self.pending.pop(state_id).ok_or_else(|| {
            ReconstructError::malformed_for_state(
                event_id,
                state_id,
                "task scheduled with no pending transition into this state",
            )
        })
    }

    /// Inherit input and options from the bridged wait-until event, which
    /// must belong to the same state.
    fn continue_from_wait(
        &self,
        event_id: i64,
        state_id: &str,
        wait_index: usize,
    ) -> Result<PendingTransition, ReconstructError> {
        match &self.events[wait_index] {
            HistoryEvent::WaitUntil(wait) if wait.state_id != state_id => {
                Err(ReconstructError::malformed_for_state(
                    event_id,
                    state_id,
                    format!(
                        "state execution id '{}' began as a wait-until step of state '{}'",
                        wait.state_execution_id, wait.state_id
                    ),
                ))
            }
            HistoryEvent::WaitUntil(wait) => Ok(PendingTransition {
                origin: Origin::Event(wait_index),
                options: wait.options.clone(),
                input: wait.input.clone(),
            }),
            other => Err(ReconstructError::malformed(
                event_id,
                format!("bridged event {} is a {} event", wait_index, other.kind()),
            )),
        }
    }

    fn register_schedule(
        &mut self,
        event_id: i64,
        schedule_id: i64,
        target: ScheduleTarget,
    ) -> Result<(), ReconstructError> {
        self.schedules.insert(schedule_id, target).map_err(|_| {
            ReconstructError::malformed(event_id, format!("schedule id {} reused", schedule_id))
        })
    }
}
