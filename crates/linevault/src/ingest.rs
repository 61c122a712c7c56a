// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Batched transactional ingester.
//!
//! Pulls batches from the overflow buffer, commits each one as a single
//! transaction against the event store and only then acknowledges removal.
//! A failed commit leaves the batch in the buffer for the next tick, so the
//! hand-off is at-least-once: duplicates are possible, ghost acks are not.

use crate::manager::{SharedBuffer, SharedStatus};
use crate::store::EventStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

pub(crate) struct IngesterParams {
    pub(crate) max_batch: usize,
    pub(crate) poll_idle: Duration,
    pub(crate) source: String,
    pub(crate) kind: String,
}

/// Ingest loop, repeated until the stop signal. The stop check sits between
/// batches; an in-flight transaction always runs to its natural end.
pub(crate) async fn run_ingester(
    buffer: SharedBuffer,
    store: Arc<dyn EventStore>,
    status: SharedStatus,
    mut stop: watch::Receiver<bool>,
    params: IngesterParams,
) {
    let mut rate_ingested: u64 = 0;
    let mut rate_at = Instant::now();

    loop {
        if *stop.borrow() {
            break;
        }

        let read_result = buffer.lock().unwrap().read_batch(params.max_batch);
        let batch = match read_result {
            Ok(batch) => batch,
            Err(err) => {
                status.lock().unwrap().record_error(&err);
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = tokio::time::sleep(params.poll_idle) => {}
                }
                continue;
            }
        };

        if batch.is_empty() {
            tokio::select! {
                _ = stop.changed() => break,
                _ = tokio::time::sleep(params.poll_idle) => {}
            }
            continue;
        }

        let report = match store.ingest_batch(&batch, &params.source, &params.kind) {
            Ok(report) => report,
            Err(err) => {
                // Nothing is removed: the same records are re-read on the
                // next tick.
                tracing::warn!(%err, "ingest transaction failed, will retry");
                status.lock().unwrap().record_error(&err);
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = tokio::time::sleep(params.poll_idle) => {}
                }
                continue;
            }
        };

        if let Err(err) = buffer.lock().unwrap().remove_batch(batch.len()) {
            // The committed records will be re-read and re-inserted;
            // duplicates are the accepted consequence.
            tracing::warn!(%err, "failed to remove committed batch from buffer");
            status.lock().unwrap().record_error(&err);
        }

        let mut st = status.lock().unwrap();
        st.ingested += report.inserted as u64;
        st.error_count += report.failed as u64;
        if report.failed > 0 {
            st.last_error = format!("{} ingestion errors", report.failed);
        }
        let elapsed = rate_at.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            st.ingest_rate_eps = (st.ingested - rate_ingested) as f64 / elapsed;
            rate_ingested = st.ingested;
            rate_at = Instant::now();
        }
        st.last_updated = Utc::now();
        drop(st);

        tracing::trace!(
            batch = batch.len(),
            inserted = report.inserted,
            failed = report.failed,
            "batch committed"
        );
    }

    tracing::debug!("batch ingester exited");
}
