use std::future::Future;

use super::{make_history, TestResult};
use crate::record::ExecutionHistoryRecord;
use crate::{HistorySource, StorageError};

pub(super) async fn run_describe_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "describe",
            "describe_returns_matching_execution",
            describe_returns_matching_execution(factory).await,
        ),
        TestResult::from_result(
            "describe",
            "describe_without_run_id_picks_latest_run",
            describe_without_run_id_picks_latest_run(factory).await,
        ),
        TestResult::from_result(
            "describe",
            "describe_with_run_id_picks_that_run",
            describe_with_run_id_picks_that_run(factory).await,
        ),
        TestResult::from_result(
            "describe",
            "describe_unknown_execution_not_found",
            describe_unknown_execution_not_found(factory).await,
        ),
        TestResult::from_result(
            "describe",
            "describe_unknown_run_not_found_has_run_id",
            describe_unknown_run_not_found_has_run_id(factory).await,
        ),
    ]
}

// ── 1. describe finds the only run of an execution ────────────────────────────

async fn describe_returns_matching_execution<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(vec![
        make_history("order-1", "run-a", 0),
        make_history("order-2", "run-b", 5),
    ])
    .await;
    let rec = s
        .describe_execution("order-1", None)
        .await
        .map_err(|e| format!("describe failed: {}", e))?;
    if rec.execution_id != "order-1" || rec.run_id != "run-a" {
        return Err(format!("wrong record: {}/{}", rec.execution_id, rec.run_id));
    }
    Ok(())
}

// ── 2. no run id → most recently started run ──────────────────────────────────

async fn describe_without_run_id_picks_latest_run<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(vec![
        make_history("order-1", "run-new", 60),
        make_history("order-1", "run-old", 0),
    ])
    .await;
    let rec = s
        .describe_execution("order-1", None)
        .await
        .map_err(|e| format!("describe failed: {}", e))?;
    if rec.run_id != "run-new" {
        return Err(format!("expected run-new, got {}", rec.run_id));
    }
    Ok(())
}

// ── 3. explicit run id wins over recency ──────────────────────────────────────

async fn describe_with_run_id_picks_that_run<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(vec![
        make_history("order-1", "run-old", 0),
        make_history("order-1", "run-new", 60),
    ])
    .await;
    let rec = s
        .describe_execution("order-1", Some("run-old"))
        .await
        .map_err(|e| format!("describe failed: {}", e))?;
    if rec.run_id != "run-old" {
        return Err(format!("expected run-old, got {}", rec.run_id));
    }
    Ok(())
}

// ── 4. unknown execution ──────────────────────────────────────────────────────

async fn describe_unknown_execution_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(vec![make_history("order-1", "run-a", 0)]).await;
    match s.describe_execution("order-999", None).await {
        Err(StorageError::ExecutionNotFound {
            execution_id,
            run_id: None,
        }) if execution_id == "order-999" => Ok(()),
        other => Err(format!("expected ExecutionNotFound, got {:?}", other)),
    }
}

// ── 5. known execution, unknown run ───────────────────────────────────────────

async fn describe_unknown_run_not_found_has_run_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: HistorySource,
    F: Fn(Vec<ExecutionHistoryRecord>) -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory(vec![make_history("order-1", "run-a", 0)]).await;
    match s.describe_execution("order-1", Some("run-z")).await {
        Err(StorageError::ExecutionNotFound {
            execution_id,
            run_id: Some(run_id),
        }) if execution_id == "order-1" && run_id == "run-z" => Ok(()),
        other => Err(format!("expected ExecutionNotFound with run id, got {:?}", other)),
    }
}
