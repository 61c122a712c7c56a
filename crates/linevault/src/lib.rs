// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! linevault -- durable capture-and-ingest for line-oriented event streams.
//!
//! Replays a (optionally timestamped) log through a disk-backed overflow
//! buffer into a relational event store, preserving the original inter-line
//! timing and absorbing bursts between the producer and the consumer.
//!
//! # Architecture
//!
//! ```text
//! log file -> CaptureReader -> CaptureBuffer (FIFO | RED) -> BatchIngester -> EventStore
//!                 |                                               |
//!                 +--------- CaptureManager (start/stop/status) --+
//! ```
//!
//! # Example
//!
//! ```ignore
//! use linevault::{BufferStrategy, CaptureConfig, CaptureManager, SqliteEventStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteEventStore::new("events.db")?);
//! let manager = CaptureManager::new(store, CaptureConfig::default());
//! manager.start("capture.log", BufferStrategy::Fifo).await?;
//! // ... observe manager.status() ...
//! manager.stop().await;
//! ```

pub mod buffer;
pub mod config;
pub mod frame;
mod ingest;
pub mod manager;
pub mod reader;
pub mod sqlite;
pub mod store;

pub use buffer::{
    BufferError, BufferStrategy, CaptureBuffer, FifoBuffer, RedBuffer, RedConfig,
};
pub use config::CaptureConfig;
pub use frame::{FrameError, MAX_RECORD};
pub use manager::{CaptureError, CaptureManager, CaptureStatus};
pub use sqlite::SqliteEventStore;
pub use store::{BatchReport, EventStore, TimeseriesEvent};
