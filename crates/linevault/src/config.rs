// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capture pipeline configuration.

use crate::buffer::RedConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Capture pipeline configuration.
///
/// The buffering strategy itself is chosen per capture at `start`; everything
/// here is fixed for the lifetime of the manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// On-disk overflow buffer file path.
    pub buffer_path: PathBuf,

    /// Maximum records per ingest batch.
    pub max_batch: usize,

    /// Ingester idle poll interval.
    pub poll_idle: Duration,

    /// Upper bound on a single record.
    pub max_record: usize,

    /// Cap on the inter-line replay wait, bounding the effect of a corrupt
    /// timestamp.
    pub delta_cap: Duration,

    /// Source tag stamped on ingested events.
    pub source: String,

    /// Type tag stamped on ingested events.
    pub kind: String,

    /// RED admission thresholds.
    pub red: RedConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            buffer_path: PathBuf::from("capture_buffer.dat"),
            max_batch: 256,
            poll_idle: Duration::from_millis(10),
            max_record: crate::frame::MAX_RECORD,
            delta_cap: Duration::from_secs(10),
            source: "capture".to_string(),
            kind: "stream".to_string(),
            red: RedConfig::default(),
        }
    }
}

impl CaptureConfig {
    /// Create a new config builder.
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }
}

/// Config builder for fluent API.
#[derive(Debug, Default)]
pub struct CaptureConfigBuilder {
    buffer_path: Option<PathBuf>,
    max_batch: Option<usize>,
    poll_idle: Option<Duration>,
    max_record: Option<usize>,
    delta_cap: Option<Duration>,
    source: Option<String>,
    kind: Option<String>,
    red: Option<RedConfig>,
}

impl CaptureConfigBuilder {
    /// Set the overflow buffer file path.
    pub fn buffer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.buffer_path = Some(path.into());
        self
    }

    /// Set the maximum records per ingest batch.
    pub fn max_batch(mut self, max: usize) -> Self {
        self.max_batch = Some(max);
        self
    }

    /// Set the ingester idle poll interval.
    pub fn poll_idle(mut self, interval: Duration) -> Self {
        self.poll_idle = Some(interval);
        self
    }

    /// Set the upper bound on a single record.
    pub fn max_record(mut self, max: usize) -> Self {
        self.max_record = Some(max);
        self
    }

    /// Set the cap on the inter-line replay wait.
    pub fn delta_cap(mut self, cap: Duration) -> Self {
        self.delta_cap = Some(cap);
        self
    }

    /// Set the source tag stamped on ingested events.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the type tag stamped on ingested events.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Set the RED admission thresholds.
    pub fn red(mut self, red: RedConfig) -> Self {
        self.red = Some(red);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CaptureConfig {
        let defaults = CaptureConfig::default();

        CaptureConfig {
            buffer_path: self.buffer_path.unwrap_or(defaults.buffer_path),
            max_batch: self.max_batch.unwrap_or(defaults.max_batch),
            poll_idle: self.poll_idle.unwrap_or(defaults.poll_idle),
            max_record: self.max_record.unwrap_or(defaults.max_record),
            delta_cap: self.delta_cap.unwrap_or(defaults.delta_cap),
            source: self.source.unwrap_or(defaults.source),
            kind: self.kind.unwrap_or(defaults.kind),
            red: self.red.unwrap_or(defaults.red),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CaptureConfig::default();

        assert_eq!(config.buffer_path, PathBuf::from("capture_buffer.dat"));
        assert_eq!(config.max_batch, 256);
        assert_eq!(config.poll_idle, Duration::from_millis(10));
        assert_eq!(config.delta_cap, Duration::from_secs(10));
        assert_eq!(config.source, "capture");
        assert_eq!(config.kind, "stream");
    }

    #[test]
    fn test_config_builder() {
        let config = CaptureConfig::builder()
            .buffer_path("/tmp/burst.dat")
            .max_batch(64)
            .delta_cap(Duration::from_secs(2))
            .source("strace")
            .kind("read")
            .build();

        assert_eq!(config.buffer_path, PathBuf::from("/tmp/burst.dat"));
        assert_eq!(config.max_batch, 64);
        assert_eq!(config.delta_cap, Duration::from_secs(2));
        assert_eq!(config.source, "strace");
        assert_eq!(config.kind, "read");
        // Unset fields fall back to defaults.
        assert_eq!(config.poll_idle, Duration::from_millis(10));
    }
}
