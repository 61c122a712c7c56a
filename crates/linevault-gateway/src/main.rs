// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! linevault-gateway - HTTP control surface for the capture pipeline.
//!
//! # Usage
//!
//! ```bash
//! # Start the gateway on default port 8080
//! linevault-gateway --db events.db
//!
//! # Custom port and buffer path
//! linevault-gateway --port 9000 --buffer /var/spool/capture_buffer.dat
//! ```
//!
//! # Endpoints
//!
//! - `GET /capture/start?log=<path>&strategy=fifo|red` - start a capture
//! - `GET /capture/stop` - stop the capture (idempotent)
//! - `GET /capture/status` - plain-text status key/value lines
//! - `GET /api/v1/health` - health check

mod handlers;
mod routes;

use axum::Router;
use clap::Parser;
use linevault::{CaptureConfig, CaptureManager, SqliteEventStore};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// linevault HTTP gateway
#[derive(Parser, Debug)]
#[command(name = "linevault-gateway")]
#[command(about = "HTTP control surface for the linevault capture pipeline")]
#[command(version)]
struct Args {
    /// HTTP server port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Database path (SQLite file)
    #[arg(short, long, default_value = "linevault.db")]
    db: String,

    /// Overflow buffer file path
    #[arg(long, default_value = "capture_buffer.dat")]
    buffer: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Shared application state
pub struct AppState {
    manager: CaptureManager,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging
    let filter = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .init();

    let store = Arc::new(SqliteEventStore::new(&args.db)?);
    let config = CaptureConfig::builder()
        .buffer_path(args.buffer.clone())
        .build();
    let state = Arc::new(AppState {
        manager: CaptureManager::new(store, config),
    });

    let app = build_router(state);

    let addr = format!("{}:{}", args.bind, args.port);
    info!("linevault gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("HTTP server: http://{}", addr);
    info!("Database: {}", args.db);
    info!("Buffer: {}", args.buffer.display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    routes::api_routes()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
