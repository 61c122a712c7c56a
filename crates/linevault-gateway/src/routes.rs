// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Route definitions for the capture control API.

use crate::handlers;
use crate::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Capture control routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/capture/start", get(handlers::capture_start))
        .route("/capture/stop", get(handlers::capture_stop))
        .route("/capture/status", get(handlers::capture_status))
        .route("/api/v1/health", get(handlers::health))
}
