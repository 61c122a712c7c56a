// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Event store abstraction.
//!
//! Defines the contract the ingester commits batches against; backends are
//! swappable (SQLite by default).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A single stored event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeseriesEvent {
    /// Store-assigned identifier (dense, increasing). Zero until inserted.
    pub id: i64,

    /// Ingest wall-clock timestamp (Unix nanoseconds, UTC).
    pub timestamp_ns: u64,

    /// Source tag, e.g. "capture" or "strace".
    pub source: String,

    /// Event type tag, e.g. "stream" or "read". Stored in the `type` column.
    #[serde(rename = "type")]
    pub kind: String,

    /// Opaque payload, stored as UTF-8 text.
    pub payload: String,
}

/// Outcome of one committed ingest batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchReport {
    /// Records inserted by the committed transaction.
    pub inserted: usize,

    /// Records skipped by per-record execution failures.
    pub failed: usize,
}

/// Contract for the timeseries event sink.
///
/// `ingest_batch` owns the whole begin / prepare / exec-per-record / commit
/// sequence: per-record failures are skipped and counted in the report, a
/// begin or commit failure surfaces as `Err` and acknowledges nothing.
pub trait EventStore: Send + Sync {
    /// Insert a single event, returning the assigned identifier.
    fn insert(&self, event: &TimeseriesEvent) -> Result<i64>;

    /// Events with matching source and type in `start_ns..=end_ns`,
    /// ascending by timestamp.
    fn query(
        &self,
        source: &str,
        kind: &str,
        start_ns: u64,
        end_ns: u64,
    ) -> Result<Vec<TimeseriesEvent>>;

    /// Commit `records` in one transaction, stamped with the current wall
    /// clock and tagged `source`/`kind`.
    fn ingest_batch(&self, records: &[Vec<u8>], source: &str, kind: &str) -> Result<BatchReport>;

    /// Total stored events.
    fn count(&self) -> Result<usize>;

    /// Delete all events (for tests and maintenance).
    fn clear(&self) -> Result<()>;
}

/// Current wall clock as Unix nanoseconds.
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
