// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HTTP request handlers for the capture control API.

use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use linevault::{BufferStrategy, CaptureError};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_LOG: &str = "capture.log";

/// Query parameters for `/capture/start`.
#[derive(Debug, Deserialize)]
pub struct StartParams {
    log: Option<String>,
    strategy: Option<String>,
}

/// GET /capture/start?log=<path>&strategy=fifo|red
pub async fn capture_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StartParams>,
) -> Response {
    let log = params.log.unwrap_or_else(|| DEFAULT_LOG.to_string());

    let strategy = match params.strategy.as_deref() {
        Some(raw) => match raw.parse::<BufferStrategy>() {
            Ok(strategy) => strategy,
            Err(err) => return (StatusCode::BAD_REQUEST, format!("{err}\n")).into_response(),
        },
        None => BufferStrategy::default(),
    };

    match state.manager.start(&log, strategy).await {
        Ok(()) => (StatusCode::OK, format!("Capture started from {log}\n")).into_response(),
        Err(err @ CaptureError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            format!("Failed to start capture: {err}\n"),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to start capture: {err}\n"),
        )
            .into_response(),
    }
}

/// GET /capture/stop
pub async fn capture_stop(State(state): State<Arc<AppState>>) -> Response {
    state.manager.stop().await;
    (StatusCode::OK, "Capture stopped\n").into_response()
}

/// GET /capture/status
pub async fn capture_status(State(state): State<Arc<AppState>>) -> Response {
    let s = state.manager.status();
    let body = format!(
        "BufferLen: {}\nDiskBufferBytes: {}\nIngesting: {}\nStopped: {}\nIngested: {}\nLastError: {}\nLastUpdated: {}\nIngestRateEPS: {:.2}\nErrorCount: {}\nDropped: {}\n",
        s.buffer_len,
        s.disk_buffer_bytes,
        s.ingesting,
        s.stopped,
        s.ingested,
        s.last_error,
        s.last_updated.to_rfc3339(),
        s.ingest_rate_eps,
        s.error_count,
        s.dropped,
    );
    (StatusCode::OK, body).into_response()
}

/// GET /api/v1/health
pub async fn health() -> Response {
    let info = serde_json::json!({
        "status": "ok",
        "name": "linevault-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(info)).into_response()
}
