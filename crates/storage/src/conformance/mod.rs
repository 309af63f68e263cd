//! Conformance test suite for `HistorySource` implementations.
//!
//! A backend-agnostic suite that any `HistorySource` can run to verify
//! that it selects runs, orders logs and reports missing executions the
//! way the replay engine and the HTTP layer expect. The suite covers:
//!
//! - **Describe**: run lookup by id, latest-run selection, not-found errors
//! - **History**: log ordering, per-run logs, listing
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory that builds
//! a fresh source seeded with the given records:
//!
//! ```ignore
//! use statescope_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn my_backend_conformance() {
//!     let report = run_conformance_suite(|records| async move {
//!         MyBackend::seeded(records).await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod describe;
mod history;

use std::fmt;
use std::future::Future;

use statescope_interchange::{Payload, PrimitiveEvent, PrimitiveEventKind};
use time::macros::datetime;
use time::Duration;

use crate::record::{ExecutionHistoryRecord, ExecutionRecord};
use crate::HistorySource;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "describe", "history").
    pub category: String,
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a history source.
///
/// The `factory` is called once per test with the records that test needs,
/// and must return a source containing exactly those records.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(describe::run_describe_tests(&factory).await);
    results.extend(history::run_history_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

/// A run of `execution_id` started `start_offset_secs` after a fixed epoch,
/// with a short two-event log whose event ids encode the offset.
pub fn make_history(execution_id: &str, run_id: &str, start_offset_secs: i64) -> ExecutionHistoryRecord {
    let start_time = datetime!(2024-05-01 10:00 UTC) + Duration::seconds(start_offset_secs);
    let base_id = start_offset_secs * 10;
    ExecutionHistoryRecord {
        execution: ExecutionRecord {
            execution_id: execution_id.to_string(),
            run_id: run_id.to_string(),
            workflow_type: "Interpreter".to_string(),
            status: "WORKFLOW_EXECUTION_STATUS_RUNNING".to_string(),
            start_time,
            close_time: None,
        },
        events: vec![
            PrimitiveEvent {
                event_id: base_id + 1,
                event_time: start_time,
                kind: PrimitiveEventKind::ExecutionStarted {
                    workflow_type: "Interpreter".to_string(),
                    input: Payload::null(),
                },
            },
            PrimitiveEvent {
                event_id: base_id + 2,
                event_time: start_time + Duration::seconds(1),
                kind: PrimitiveEventKind::SignalReceived {
                    signal_name: format!("signal-{}", run_id),
                    input: None,
                },
            },
        ],
    }
}
