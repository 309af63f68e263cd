//! `statescope serve` -- HTTP JSON API over a history directory.
//!
//! Every request re-reads the source and re-runs reconstruction; nothing is
//! cached between requests.
//!
//! Security features:
//! - CORS headers on all responses (permissive for local dev)
//! - Per-IP rate limiting (default: 60 req/min, configurable)
//! - Optional API key authentication (`[server] api_key` or STATESCOPE_API_KEY)
//!
//! Endpoints:
//! - GET /health                  - Server status (exempt from auth)
//! - GET /executions              - All known runs, latest first
//! - GET /executions/{id}         - Reconstructed view (`?runId=` selects a run)
//! - GET /status/{code}           - Map a native status code
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware as axum_middleware, Json, Router};
use statescope_storage::HistorySource;
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_health, handle_list_executions, handle_not_found, handle_show_execution,
    handle_status,
};
use self::middleware::{auth_middleware, rate_limit_middleware};
use self::state::{AppState, RateLimiter};

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Settings resolved from flags, environment and `statescope.toml`.
#[derive(Debug, Clone)]
pub(crate) struct ServeOptions {
    pub bind: String,
    pub port: u16,
    pub rate_limit: u64,
    pub api_key: Option<String>,
}

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({ "error": message })))
}

/// Like [`json_error`], with the machine-readable failure kind.
fn json_error_kind(status: StatusCode, message: &str, kind: &str) -> impl IntoResponse {
    (
        status,
        Json(serde_json::json!({ "error": message, "kind": kind })),
    )
}

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    // CORS: permissive for local dev
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/executions", get(handle_list_executions))
        .route("/executions/{id}", get(handle_show_execution))
        .route("/status/{code}", get(handle_status))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .with_state(state)
}

/// Serve `source` until Ctrl+C.
pub(crate) async fn start_server(
    source: Arc<dyn HistorySource>,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if options.api_key.is_some() {
        tracing::info!("API key authentication enabled");
    }
    tracing::info!(
        rate_limit = options.rate_limit,
        "rate limit: requests per minute per IP"
    );

    let state = Arc::new(AppState {
        source,
        rate_limiter: RateLimiter::new(options.rate_limit),
        api_key: options.api_key,
    });
    let app = build_router(state);

    let addr = format!("{}:{}", options.bind, options.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "statescope listening on http://{}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}
