// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capture lifecycle management.
//!
//! The manager owns the reader and ingester tasks of an active capture, the
//! shared status they report into, and the stop protocol that winds both
//! down. States: Idle -> Running -> Stopped; a Stopped manager can be
//! re-armed by a fresh `start`, draining any residue left on the buffer path.

use crate::buffer::{open_buffer, BufferError, BufferStrategy, CaptureBuffer};
use crate::config::CaptureConfig;
use crate::ingest::{run_ingester, IngesterParams};
use crate::reader::run_reader;
use crate::store::EventStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Capture lifecycle errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture already running")]
    AlreadyRunning,

    #[error("failed to open source log: {0}")]
    OpenSource(#[source] std::io::Error),

    #[error("failed to open buffer: {0}")]
    OpenBuffer(#[from] BufferError),
}

/// Point-in-time view of a capture, returned by value.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureStatus {
    /// Records currently sitting in the overflow buffer (best-effort).
    pub buffer_len: usize,

    /// Overflow buffer backing size in bytes (best-effort).
    pub disk_buffer_bytes: u64,

    /// Whether an ingester is active.
    pub ingesting: bool,

    /// Whether a stop has been requested.
    pub stopped: bool,

    /// Most recent error, empty when none.
    pub last_error: String,

    /// Records committed to the event store.
    pub ingested: u64,

    /// Whether the source file has been fully read.
    pub source_done: bool,

    /// Timestamp of the last status change.
    pub last_updated: DateTime<Utc>,

    /// Rolling ingestion rate in events per second.
    pub ingest_rate_eps: f64,

    /// Cumulative per-record ingestion failures.
    pub error_count: u64,

    /// Records dropped by buffer admission control.
    pub dropped: u64,
}

/// Mutable status fields shared by the reader and the ingester.
///
/// The lock around this struct is only ever held for field access, never
/// across I/O.
#[derive(Debug)]
pub(crate) struct StatusInner {
    pub(crate) ingesting: bool,
    pub(crate) stopped: bool,
    pub(crate) last_error: String,
    pub(crate) ingested: u64,
    pub(crate) source_done: bool,
    pub(crate) last_updated: DateTime<Utc>,
    pub(crate) ingest_rate_eps: f64,
    pub(crate) error_count: u64,
}

impl StatusInner {
    fn idle() -> Self {
        Self {
            ingesting: false,
            stopped: false,
            last_error: String::new(),
            ingested: 0,
            source_done: false,
            last_updated: Utc::now(),
            ingest_rate_eps: 0.0,
            error_count: 0,
        }
    }

    fn running() -> Self {
        Self {
            ingesting: true,
            ..Self::idle()
        }
    }

    pub(crate) fn record_error(&mut self, err: impl fmt::Display) {
        self.last_error = err.to_string();
        self.last_updated = Utc::now();
    }
}

pub(crate) type SharedBuffer = Arc<Mutex<Box<dyn CaptureBuffer>>>;
pub(crate) type SharedStatus = Arc<Mutex<StatusInner>>;

struct Lifecycle {
    running: bool,
    stop_tx: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

/// Coordinates the timed reader and the batch ingester of a capture.
///
/// The event store is injected at construction; while a capture is active,
/// exactly one reader and one ingester operate on the buffer.
pub struct CaptureManager {
    store: Arc<dyn EventStore>,
    config: CaptureConfig,
    status: SharedStatus,
    buffer: Mutex<Option<SharedBuffer>>,
    lifecycle: tokio::sync::Mutex<Lifecycle>,
}

impl CaptureManager {
    /// Create an idle manager over `store`.
    pub fn new(store: Arc<dyn EventStore>, config: CaptureConfig) -> Self {
        Self {
            store,
            config,
            status: Arc::new(Mutex::new(StatusInner::idle())),
            buffer: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(Lifecycle {
                running: false,
                stop_tx: None,
                tasks: Vec::new(),
            }),
        }
    }

    /// Start capturing from `log_path`, buffering with `strategy`.
    ///
    /// Rejected with [`CaptureError::AlreadyRunning`] while a capture is
    /// active. An open failure leaves the manager Idle with partial
    /// resources released.
    pub async fn start(
        &self,
        log_path: impl AsRef<Path>,
        strategy: BufferStrategy,
    ) -> Result<(), CaptureError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.running {
            return Err(CaptureError::AlreadyRunning);
        }

        let log_path = log_path.as_ref();
        let source = tokio::fs::File::open(log_path)
            .await
            .map_err(CaptureError::OpenSource)?;

        let buffer: SharedBuffer = Arc::new(Mutex::new(open_buffer(
            strategy,
            &self.config.buffer_path,
            self.config.max_record,
            self.config.red,
        )?));

        *self.status.lock().unwrap() = StatusInner::running();
        *self.buffer.lock().unwrap() = Some(Arc::clone(&buffer));

        let (stop_tx, stop_rx) = watch::channel(false);

        lifecycle.tasks.push(tokio::spawn(run_reader(
            source,
            Arc::clone(&buffer),
            Arc::clone(&self.status),
            stop_rx.clone(),
            self.config.delta_cap,
        )));
        lifecycle.tasks.push(tokio::spawn(run_ingester(
            buffer,
            Arc::clone(&self.store),
            Arc::clone(&self.status),
            stop_rx,
            IngesterParams {
                max_batch: self.config.max_batch,
                poll_idle: self.config.poll_idle,
                source: self.config.source.clone(),
                kind: self.config.kind.clone(),
            },
        )));

        lifecycle.stop_tx = Some(stop_tx);
        lifecycle.running = true;

        tracing::info!(
            log = %log_path.display(),
            buffer = %self.config.buffer_path.display(),
            %strategy,
            "capture started"
        );
        Ok(())
    }

    /// Stop the active capture. Idempotent; a second call is a no-op.
    ///
    /// Signals both tasks, waits for them to wind down (an in-flight
    /// transaction runs to its natural end) and only then closes the buffer,
    /// so neither task can touch it after the close.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;

        if let Some(stop_tx) = lifecycle.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        for task in lifecycle.tasks.drain(..) {
            let _ = task.await;
        }

        let was_running = lifecycle.running;
        lifecycle.running = false;

        if let Some(buffer) = self.buffer.lock().unwrap().take() {
            if let Err(err) = buffer.lock().unwrap().close() {
                self.status.lock().unwrap().record_error(&err);
            }
        }

        {
            let mut status = self.status.lock().unwrap();
            status.ingesting = false;
            status.stopped = true;
            status.last_updated = Utc::now();
        }

        if was_running {
            tracing::info!("capture stopped");
        }
    }

    /// Snapshot of the current status.
    ///
    /// Safe to call concurrently with the reader, the ingester and other
    /// observers; the returned value does not alias any live state.
    pub fn status(&self) -> CaptureStatus {
        let (buffer_len, disk_buffer_bytes, dropped) = {
            let slot = self.buffer.lock().unwrap();
            match slot.as_ref() {
                Some(buffer) => {
                    let buffer = buffer.lock().unwrap();
                    (buffer.len_records(), buffer.size_bytes(), buffer.dropped())
                }
                None => (0, 0, 0),
            }
        };

        let status = self.status.lock().unwrap();
        CaptureStatus {
            buffer_len,
            disk_buffer_bytes,
            ingesting: status.ingesting,
            stopped: status.stopped,
            last_error: status.last_error.clone(),
            ingested: status.ingested,
            source_done: status.source_done,
            last_updated: status.last_updated,
            ingest_rate_eps: status.ingest_rate_eps,
            error_count: status.error_count,
            dropped,
        }
    }
}
