//! Route handlers: health, execution listing, execution view, status mapping.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use statescope_replay::{
    list_workflows, show_workflow, ExecutionStatus, ReconstructError, ShowError,
};
use statescope_storage::StorageError;

use super::state::AppState;
use super::{json_error, json_error_kind};

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// HTTP status for a failed view or listing.
fn error_status(err: &ShowError) -> StatusCode {
    match err {
        ShowError::Storage(StorageError::ExecutionNotFound { .. }) => StatusCode::NOT_FOUND,
        ShowError::Reconstruct(ReconstructError::UnsupportedExecution { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ShowError::Reconstruct(ReconstructError::MalformedHistory { .. })
        | ShowError::Status(_)
        | ShowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn show_error_response(err: &ShowError) -> Response {
    let status = error_status(err);
    if status.is_server_error() {
        tracing::error!(kind = err.kind(), error = %err, "request failed");
    } else {
        tracing::debug!(kind = err.kind(), error = %err, "request rejected");
    }
    json_error_kind(status, &err.to_string(), err.kind()).into_response()
}

/// GET /executions
pub(crate) async fn handle_list_executions(State(state): State<Arc<AppState>>) -> Response {
    match list_workflows(state.source.as_ref()).await {
        Ok(rows) => {
            let response = serde_json::json!({ "executions": rows });
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => show_error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShowQuery {
    #[serde(rename = "runId")]
    run_id: Option<String>,
}

/// GET /executions/{id}?runId=
pub(crate) async fn handle_show_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ShowQuery>,
) -> Response {
    match show_workflow(state.source.as_ref(), &id, query.run_id.as_deref()).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => show_error_response(&e),
    }
}

/// GET /status/{code}
///
/// The code comes from the client, so an unknown one is a bad request here
/// rather than a server fault.
pub(crate) async fn handle_status(Path(code): Path<String>) -> Response {
    match ExecutionStatus::from_native(&code) {
        Ok(status) => {
            let response = serde_json::json!({
                "raw": code,
                "status": status,
                "closed": status.is_closed(),
            });
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            json_error_kind(StatusCode::BAD_REQUEST, &e.to_string(), "UnknownStatus")
                .into_response()
        }
    }
}
