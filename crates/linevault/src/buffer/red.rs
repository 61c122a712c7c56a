// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Random Early Detection admission over the FIFO buffer.
//!
//! Below `min_th` bytes of backing file this is plain FIFO. Between the
//! marks the drop probability rises linearly from 0 to `max_p`; at or above
//! `max_th` every record is dropped. Drops are producer-side backpressure:
//! they are counted, never surfaced as errors.

use super::fifo::FifoBuffer;
use super::{BufferError, CaptureBuffer};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// RED admission thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedConfig {
    /// Backing size below which everything is admitted.
    pub min_th: u64,

    /// Backing size at which everything is dropped.
    pub max_th: u64,

    /// Drop probability as the backing size approaches `max_th`.
    pub max_p: f64,
}

impl Default for RedConfig {
    fn default() -> Self {
        Self {
            min_th: 64 * 1024 * 1024,
            max_th: 256 * 1024 * 1024,
            max_p: 0.1,
        }
    }
}

impl RedConfig {
    /// Drop probability for a backing file of `size` bytes.
    pub fn drop_probability(&self, size: u64) -> f64 {
        if size >= self.max_th {
            1.0
        } else if size <= self.min_th {
            0.0
        } else {
            let span = (self.max_th - self.min_th) as f64;
            self.max_p * (size - self.min_th) as f64 / span
        }
    }
}

/// FIFO buffer with probabilistic admission.
pub struct RedBuffer {
    inner: FifoBuffer,
    config: RedConfig,
    dropped: u64,
}

impl RedBuffer {
    /// Open (creating if absent) the buffer file at `path`.
    pub fn open(path: &Path, max_record: usize, config: RedConfig) -> Result<Self, BufferError> {
        Ok(Self {
            inner: FifoBuffer::open(path, max_record)?,
            config,
            dropped: 0,
        })
    }
}

impl CaptureBuffer for RedBuffer {
    fn append(&mut self, record: &[u8]) -> Result<(), BufferError> {
        let p = self.config.drop_probability(self.inner.size_bytes());
        if p >= 1.0 || (p > 0.0 && rand::rng().random::<f64>() < p) {
            self.dropped += 1;
            tracing::trace!(dropped = self.dropped, "record dropped by RED admission");
            return Ok(());
        }
        self.inner.append(record)
    }

    fn read_batch(&self, max: usize) -> Result<Vec<Vec<u8>>, BufferError> {
        self.inner.read_batch(max)
    }

    fn remove_batch(&mut self, n: usize) -> Result<(), BufferError> {
        self.inner.remove_batch(n)
    }

    fn len_records(&self) -> usize {
        self.inner.len_records()
    }

    fn size_bytes(&self) -> u64 {
        self.inner.size_bytes()
    }

    fn dropped(&self) -> u64 {
        self.dropped
    }

    fn close(&mut self) -> Result<(), BufferError> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_drop_probability_curve() {
        let config = RedConfig {
            min_th: 100,
            max_th: 200,
            max_p: 0.1,
        };

        assert_eq!(config.drop_probability(0), 0.0);
        assert_eq!(config.drop_probability(100), 0.0);
        assert!((config.drop_probability(150) - 0.05).abs() < 1e-9);
        assert_eq!(config.drop_probability(200), 1.0);
        assert_eq!(config.drop_probability(5000), 1.0);
    }

    #[test]
    fn test_below_min_threshold_is_fifo() {
        let dir = tempdir().expect("tempdir");
        let mut buffer = RedBuffer::open(
            &dir.path().join("buf.dat"),
            crate::frame::MAX_RECORD,
            RedConfig::default(),
        )
        .expect("open");

        for i in 0..100u8 {
            buffer.append(&[i]).expect("append");
        }

        assert_eq!(buffer.dropped(), 0);
        assert_eq!(buffer.len_records(), 100);
    }

    #[test]
    fn test_drops_above_max_threshold() {
        let dir = tempdir().expect("tempdir");
        let config = RedConfig {
            min_th: 0,
            max_th: 1,
            max_p: 1.0,
        };
        let mut buffer =
            RedBuffer::open(&dir.path().join("buf.dat"), crate::frame::MAX_RECORD, config)
                .expect("open");

        // Empty file: size 0 < max_th, first record admitted.
        buffer.append(b"first").expect("append");
        assert_eq!(buffer.dropped(), 0);

        // Backing size is now past max_th: everything else is dropped
        // without an error to the producer.
        for _ in 0..10 {
            buffer.append(b"pressure").expect("drop is not an error");
        }

        assert_eq!(buffer.dropped(), 10);
        assert_eq!(buffer.len_records(), 1);
    }
}
