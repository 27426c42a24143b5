//! HTTP server for health, status, and metrics endpoints

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use eyre::Result;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use tracing::info;

use crate::ledger::TransactionLedger;
use crate::metrics;

/// Shared server state
pub struct AppState {
    pub ledger: TransactionLedger,
    pub started: Instant,
}

/// Status response
#[derive(Serialize)]
struct StatusResponse {
    status: String,
    uptime_seconds: u64,
    transfers: Vec<StatusCount>,
}

#[derive(Serialize)]
struct StatusCount {
    status: String,
    count: i64,
}

/// Serve /health, /status, and /metrics until the listener dies.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    metrics::UP.set(1.0);

    let app = Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/metrics", get(metrics_text))
        .with_state(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Status server started");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn status(State(state): State<Arc<AppState>>) -> Response {
    let counts = match state.ledger.count_by_status().await {
        Ok(counts) => counts,
        Err(e) => {
            tracing::error!(error = %e, "Status query failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "ledger unavailable").into_response();
        }
    };

    Json(StatusResponse {
        status: "ok".to_string(),
        uptime_seconds: state.started.elapsed().as_secs(),
        transfers: counts
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
    })
    .into_response()
}

async fn metrics_text() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Metrics encoding failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, "encoding error").into_response();
    }

    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}
