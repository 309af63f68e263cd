use std::future::Future;

use statescope_interchange::PrimitiveEventKind;

use super::{make_history, TestResult};
use crate::record::ExecutionHistoryRecord;
use crate::{HistorySource, StorageError};

pub(super) async fn run_history_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "history",
            "fetch_history_preserves_log_order",
            fetch_history_preserves_log_order(factory).await,
        ),
        TestResult::from_result(
            "history",
            "fetch_history_of_selected_run",
            fetch_history_of_selected_run(factory).await,
        ),
        TestResult::from_result(
            "history",
            "fetch_history_unknown_not_found",
            fetch_history_unknown_not_found(factory).await,
        ),
        TestResult::from_result(
            "history",
            "list_returns_all_runs_latest_first",
            list_returns_all_runs_latest_first(factory).await,
        ),
        TestResult::from_result(
            "history",
            "list_empty_source",
            list_empty_source(factory).await,
        ),
    ]
}

// ── 1. events come back in log order ──────────────────────────────────────────

async fn fetch_history_preserves_log_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(vec![make_history("order-1", "run-a", 3)]).await;
    let events = s
        .fetch_history("order-1", None)
        .await
        .map_err(|e| format!("fetch failed: {}", e))?;
    let ids: Vec<i64> = events.iter().map(|e| e.event_id).collect();
    if ids != vec![31, 32] {
        return Err(format!("expected event ids [31, 32], got {:?}", ids));
    }
    if !matches!(events[0].kind, PrimitiveEventKind::ExecutionStarted { .. }) {
        return Err(format!("first event is {}", events[0].kind.name()));
    }
    Ok(())
}

// ── 2. the log belongs to the selected run ────────────────────────────────────

async fn fetch_history_of_selected_run<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(vec![
        make_history("order-1", "run-old", 1),
        make_history("order-1", "run-new", 2),
    ])
    .await;
    let latest = s
        .fetch_history("order-1", None)
        .await
        .map_err(|e| format!("fetch failed: {}", e))?;
    let older = s
        .fetch_history("order-1", Some("run-old"))
        .await
        .map_err(|e| format!("fetch failed: {}", e))?;
    if latest.first().map(|e| e.event_id) != Some(21) {
        return Err("latest run log not returned without run id".to_string());
    }
    if older.first().map(|e| e.event_id) != Some(11) {
        return Err("explicit run id returned another run's log".to_string());
    }
    Ok(())
}

// ── 3. unknown execution ──────────────────────────────────────────────────────

async fn fetch_history_unknown_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(vec![]).await;
    match s.fetch_history("order-404", None).await {
        Err(StorageError::ExecutionNotFound { execution_id, .. }) if execution_id == "order-404" => {
            Ok(())
        }
        other => Err(format!("expected ExecutionNotFound, got {:?}", other.map(|e| e.len()))),
    }
}

// ── 4. listing ────────────────────────────────────────────────────────────────

async fn list_returns_all_runs_latest_first<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(vec![
        make_history("order-1", "run-a", 0),
        make_history("order-2", "run-b", 30),
        make_history("order-1", "run-c", 10),
    ])
    .await;
    let all = s
        .list_executions()
        .await
        .map_err(|e| format!("list failed: {}", e))?;
    let runs: Vec<&str> = all.iter().map(|r| r.run_id.as_str()).collect();
    if runs != vec!["run-b", "run-c", "run-a"] {
        return Err(format!("unexpected order: {:?}", runs));
    }
    Ok(())
}

async fn list_empty_source<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(vec![]).await;
    let all = s
        .list_executions()
        .await
        .map_err(|e| format!("list failed: {}", e))?;
    if !all.is_empty() {
        return Err(format!("expected empty list, got {} runs", all.len()));
    }
    Ok(())
}
