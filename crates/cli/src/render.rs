//! Plain-text rendering for `--output text`.

use std::fmt::Write;

use statescope_replay::{
    ExecutionSummary, FailedTask, HistoryEvent, Origin, PendingState, WorkflowView,
};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

fn timestamp(t: OffsetDateTime) -> String {
    t.format(&Rfc3339).unwrap_or_else(|_| t.to_string())
}

fn unix(secs: i64) -> String {
    OffsetDateTime::from_unix_timestamp(secs)
        .map(timestamp)
        .unwrap_or_else(|_| secs.to_string())
}

fn progress(completed_at: Option<OffsetDateTime>) -> String {
    match completed_at {
        Some(t) => format!("completed {}", timestamp(t)),
        None => "in progress".to_string(),
    }
}

fn describe_event(event: &HistoryEvent) -> String {
    match event {
        HistoryEvent::ExecutionStarted(e) => {
            let mut line = format!("start={} at {}", e.start_state_id, timestamp(e.started_at));
            if let Some(snapshot) = &e.resume_snapshot {
                let _ = write!(line, " resumed from {}", snapshot.previous_run_id);
            }
            line
        }
        HistoryEvent::WaitUntil(e) => format!(
            "{} ({}) from={} {}",
            e.state_id,
            e.state_execution_id,
            e.from.as_i64(),
            progress(e.completed_at)
        ),
        HistoryEvent::Execute(e) => {
            let mut line = format!(
                "{} ({}) from={} {}",
                e.state_id,
                e.state_execution_id,
                e.from.as_i64(),
                progress(e.completed_at)
            );
            if let Some(response) = &e.response {
                let next: Vec<&str> = response
                    .next_states()
                    .iter()
                    .map(|m| m.state_id.as_str())
                    .collect();
                if !next.is_empty() {
                    let _ = write!(line, " -> {}", next.join(", "));
                }
            }
            line
        }
        HistoryEvent::SignalReceived(e) => {
            format!("{} at {}", e.signal_name, timestamp(e.received_at))
        }
        HistoryEvent::RpcExecuted(e) => format!("{} {}", e.task_id, progress(e.completed_at)),
        HistoryEvent::ExecutionClosed(e) => {
            format!("{} at {}", e.status, timestamp(e.closed_at))
        }
    }
}

fn origins(from: &[Origin]) -> String {
    from.iter()
        .map(|o| o.as_i64().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Events, pending states and failures, as printed by `replay` and `show`.
pub(crate) fn render_history(
    events: &[HistoryEvent],
    pending: &[PendingState],
    failed: &[FailedTask],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "History ({} events):", events.len());
    for (index, event) in events.iter().enumerate() {
        let _ = writeln!(
            out,
            "  [{:>3}] {:<17} {}",
            index,
            event.kind(),
            describe_event(event)
        );
    }

    if !pending.is_empty() {
        let _ = writeln!(out, "Pending states:");
        for state in pending {
            let _ = writeln!(
                out,
                "  {} <- [{}]",
                state.state_id,
                origins(&state.from_event_ids)
            );
        }
    }

    if !failed.is_empty() {
        let _ = writeln!(out, "Failed tasks:");
        for task in failed {
            let _ = writeln!(
                out,
                "  event {} (schedule {}) at {}: {}",
                task.event_id,
                task.schedule_id,
                timestamp(task.failed_at),
                task.reason
            );
        }
    }
    out
}

pub(crate) fn render_view(view: &WorkflowView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Execution {} (run {})", view.execution_id, view.run_id);
    let _ = writeln!(out, "  Workflow: {}", view.workflow_type);
    let _ = writeln!(out, "  Status:   {}", view.status);
    let _ = writeln!(
        out,
        "  Started:  {}",
        unix(view.workflow_started_timestamp)
    );
    if let Some(snapshot) = &view.continue_as_new_snapshot {
        let _ = writeln!(out, "  Resumed from run {}", snapshot.previous_run_id);
    }
    out.push('\n');
    out.push_str(&render_history(
        &view.history_events,
        &view.pending_states,
        &view.failed_tasks,
    ));
    out
}

pub(crate) fn render_summaries(rows: &[ExecutionSummary]) -> String {
    if rows.is_empty() {
        return "No executions found.\n".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(
            out,
            "{}  {}  {:<16} {}  {}",
            row.execution_id,
            row.run_id,
            row.status.as_str(),
            row.workflow_type,
            unix(row.workflow_started_timestamp)
        );
    }
    out
}
