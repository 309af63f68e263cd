//! Fixture histories shared by the CLI and HTTP integration tests.
//!
//! Records are written as the directory backend stores them:
//! one `ExecutionHistoryRecord` per `<execution>.<run>.json` file.

#![allow(dead_code)]

use std::path::Path;

use serde_json::json;
use statescope_interchange::{InitialInput, Payload, PrimitiveEvent, PrimitiveEventKind};
use statescope_storage::{ExecutionHistoryRecord, ExecutionRecord};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

pub const T0: OffsetDateTime = datetime!(2024-05-01 10:00 UTC);

/// Builds a primitive log whose schedule ids equal the scheduling event ids.
pub struct Log {
    events: Vec<PrimitiveEvent>,
}

impl Log {
    pub fn new() -> Self {
        Log { events: Vec::new() }
    }

    fn push(&mut self, kind: PrimitiveEventKind) -> i64 {
        let id = self.events.len() as i64 + 1;
        self.events.push(PrimitiveEvent {
            event_id: id,
            event_time: T0 + Duration::seconds(id),
            kind,
        });
        id
    }

    pub fn started(&mut self, input: serde_json::Value) -> i64 {
        self.push(PrimitiveEventKind::ExecutionStarted {
            workflow_type: "Interpreter".to_string(),
            input: Payload::json(&input),
        })
    }

    fn task(&mut self, task_type: &str, state_id: &str, exec_id: &str) -> i64 {
        let schedule_id = self.events.len() as i64 + 1;
        self.push(PrimitiveEventKind::TaskScheduled {
            schedule_id,
            task_id: format!("task-{}", schedule_id),
            task_type: task_type.to_string(),
            input: Payload::json(&json!({
                "iwfWorkerUrl": "http://worker:8803",
                "request": {
                    "context": { "workflowId": "order-1", "stateExecutionId": exec_id },
                    "workflowType": "OrderWorkflow",
                    "workflowStateId": state_id
                }
            })),
        })
    }

    pub fn wait_until(&mut self, state_id: &str, exec_id: &str) -> i64 {
        self.task("StateApiWaitUntil", state_id, exec_id)
    }

    pub fn execute(&mut self, state_id: &str, exec_id: &str) -> i64 {
        self.task("StateApiExecute", state_id, exec_id)
    }

    pub fn complete(&mut self, schedule_id: i64, next: &[&str]) -> i64 {
        let next_states: Vec<serde_json::Value> =
            next.iter().map(|s| json!({ "stateId": s })).collect();
        self.push(PrimitiveEventKind::TaskCompleted {
            schedule_id,
            result: Some(Payload::json(
                &json!({ "stateDecision": { "nextStates": next_states } }),
            )),
        })
    }

    pub fn signal(&mut self, name: &str) -> i64 {
        self.push(PrimitiveEventKind::SignalReceived {
            signal_name: name.to_string(),
            input: None,
        })
    }

    pub fn events(self) -> Vec<PrimitiveEvent> {
        self.events
    }
}

pub fn order_input() -> serde_json::Value {
    serde_json::to_value(InitialInput::new("OrderWorkflow", "init")).unwrap()
}

/// init waits then executes, fanning out to charge and notify; charge runs
/// and finishes, notify is still pending.
pub fn order_log() -> Vec<PrimitiveEvent> {
    let mut log = Log::new();
    log.started(order_input());
    let wait = log.wait_until("init", "init-1");
    log.complete(wait, &[]);
    let exec = log.execute("init", "init-1");
    log.complete(exec, &["charge", "notify"]);
    let charge = log.execute("charge", "charge-1");
    log.signal("approve");
    log.complete(charge, &[]);
    log.events()
}

/// A completion for a schedule id that was never scheduled.
pub fn malformed_log() -> Vec<PrimitiveEvent> {
    let mut log = Log::new();
    log.started(order_input());
    log.complete(42, &[]);
    log.events()
}

/// An execution of some other workflow type on the same runtime.
pub fn foreign_log() -> Vec<PrimitiveEvent> {
    let mut log = Log::new();
    log.started(json!({ "cron": "0 * * * *" }));
    log.events()
}

pub fn write_record(
    dir: &Path,
    execution_id: &str,
    run_id: &str,
    status: &str,
    start_offset_secs: i64,
    events: Vec<PrimitiveEvent>,
) {
    let record = ExecutionHistoryRecord {
        execution: ExecutionRecord {
            execution_id: execution_id.to_string(),
            run_id: run_id.to_string(),
            workflow_type: "Interpreter".to_string(),
            status: status.to_string(),
            start_time: T0 + Duration::seconds(start_offset_secs),
            close_time: None,
        },
        events,
    };
    let path = dir.join(format!("{}.{}.json", execution_id, run_id));
    std::fs::write(path, serde_json::to_string_pretty(&record).unwrap()).unwrap();
}

/// A history directory with one healthy, one malformed and one foreign
/// execution. Every status maps, so listing succeeds.
pub fn seed_histories(dir: &Path) {
    write_record(
        dir,
        "order-1",
        "run-a",
        "WORKFLOW_EXECUTION_STATUS_RUNNING",
        0,
        order_log(),
    );
    write_record(dir, "broken-1", "run-a", "3", 10, malformed_log());
    write_record(dir, "cron-1", "run-a", "Completed", 20, foreign_log());
}
