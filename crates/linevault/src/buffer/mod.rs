// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pluggable overflow buffer between the capture reader and the ingester.
//!
//! The buffer is a durable bounded queue of opaque records backed by a single
//! append-only file of length-prefixed frames. Two variants satisfy the same
//! contract:
//!
//! - [`FifoBuffer`] -- unbounded (bounded only by disk), admits everything
//! - [`RedBuffer`] -- Random Early Detection admission over FIFO

pub mod fifo;
pub mod red;

pub use fifo::FifoBuffer;
pub use red::{RedBuffer, RedConfig};

use crate::frame::FrameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Buffer errors.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("record of {len} bytes exceeds the {max} byte record limit")]
    RecordTooLarge { len: usize, max: usize },

    #[error("buffer is closed")]
    Closed,
}

impl From<FrameError> for BufferError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(e) => Self::Io(e),
            FrameError::RecordTooLarge { len, max } => Self::RecordTooLarge { len, max },
            FrameError::Truncated => Self::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "buffer file truncated mid-frame",
            )),
        }
    }
}

/// Buffering strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferStrategy {
    #[default]
    Fifo,
    Red,
}

impl FromStr for BufferStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "red" => Ok(Self::Red),
            other => Err(format!("unknown buffer strategy: {other}")),
        }
    }
}

impl fmt::Display for BufferStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => f.write_str("fifo"),
            Self::Red => f.write_str("red"),
        }
    }
}

/// Contract shared by the buffer variants.
///
/// One mutating owner (the reader) and one mutating consumer (the ingester)
/// coexist; callers serialize access through a mutex around the boxed buffer.
pub trait CaptureBuffer: Send {
    /// Append one record to the tail. Durable once this returns for the FIFO
    /// variant; the RED variant may silently drop under pressure (counted in
    /// [`CaptureBuffer::dropped`]).
    fn append(&mut self, record: &[u8]) -> Result<(), BufferError>;

    /// Non-destructive read of up to `max` of the oldest records. Reading
    /// does not advance the head.
    fn read_batch(&self, max: usize) -> Result<Vec<Vec<u8>>, BufferError>;

    /// Remove exactly the `n` oldest records. Must only be called with `n`
    /// no larger than the count returned by the matching `read_batch`.
    fn remove_batch(&mut self, n: usize) -> Result<(), BufferError>;

    /// Best-effort record count.
    fn len_records(&self) -> usize;

    /// Best-effort backing size in bytes.
    fn size_bytes(&self) -> u64;

    /// Records dropped by admission control.
    fn dropped(&self) -> u64;

    /// Flush and release the backing file.
    fn close(&mut self) -> Result<(), BufferError>;
}

/// Open a buffer of the requested strategy bound to `path`.
pub fn open_buffer(
    strategy: BufferStrategy,
    path: &Path,
    max_record: usize,
    red: RedConfig,
) -> Result<Box<dyn CaptureBuffer>, BufferError> {
    match strategy {
        BufferStrategy::Fifo => Ok(Box::new(FifoBuffer::open(path, max_record)?)),
        BufferStrategy::Red => Ok(Box::new(RedBuffer::open(path, max_record, red)?)),
    }
}
