// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timed source reader.
//!
//! Replays a line-oriented log into the overflow buffer, reproducing the
//! original inter-line gaps from optional leading timestamps. Lines without
//! a parseable prefix are forwarded immediately.

use crate::buffer::BufferError;
use crate::manager::{SharedBuffer, SharedStatus};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

/// Parse the optional leading timestamp `^[0-9]+(\.[0-9]+)?[ \t]`,
/// interpreted as seconds since an arbitrary base.
pub fn parse_leading_timestamp(line: &str) -> Option<f64> {
    let end = line.find([' ', '\t'])?;
    let prefix = &line[..end];

    let bytes = prefix.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == 0 {
        return None;
    }
    if idx < bytes.len() {
        if bytes[idx] != b'.' {
            return None;
        }
        let frac = &bytes[idx + 1..];
        if frac.is_empty() || !frac.iter().all(u8::is_ascii_digit) {
            return None;
        }
    }

    prefix.parse::<f64>().ok()
}

/// Wall-clock wait for a timestamp delta, clamped to `cap`.
///
/// Non-positive deltas wait nothing; the cap bounds the effect of a corrupt
/// timestamp.
pub fn replay_wait(delta_secs: f64, cap: Duration) -> Option<Duration> {
    if delta_secs.is_nan() || delta_secs <= 0.0 {
        return None;
    }
    if delta_secs >= cap.as_secs_f64() {
        return Some(cap);
    }
    Some(Duration::from_secs_f64(delta_secs))
}

/// Read `source` line by line and push each line into the buffer, sleeping
/// out the timestamp deltas in between.
///
/// Exits on end-of-stream, on the stop signal (checked between lines and
/// inside the replay wait), or on the first read or append I/O error.
pub(crate) async fn run_reader(
    source: File,
    buffer: SharedBuffer,
    status: SharedStatus,
    mut stop: watch::Receiver<bool>,
    delta_cap: Duration,
) {
    let mut lines = BufReader::new(source).lines();
    let mut last_ts: Option<f64> = None;

    loop {
        if *stop.borrow() {
            break;
        }

        let line = tokio::select! {
            _ = stop.changed() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(%err, "source read failed, stopping capture reader");
                status.lock().unwrap().record_error(&err);
                break;
            }
        };

        if let Some(ts) = parse_leading_timestamp(&line) {
            if let Some(prev) = last_ts {
                if let Some(wait) = replay_wait(ts - prev, delta_cap) {
                    tokio::select! {
                        _ = stop.changed() => break,
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
            }
            last_ts = Some(ts);
        }

        let appended = buffer.lock().unwrap().append(line.as_bytes());
        match appended {
            Ok(()) => {}
            Err(BufferError::RecordTooLarge { len, max }) => {
                tracing::warn!(len, max, "dropping oversized line");
            }
            Err(err) => {
                tracing::warn!(%err, "buffer append failed, stopping capture reader");
                status.lock().unwrap().record_error(&err);
                break;
            }
        }
    }

    status.lock().unwrap().source_done = true;
    tracing::debug!("capture reader exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_leading_timestamp() {
        assert_eq!(
            parse_leading_timestamp("1655141234.123456 read(3)"),
            Some(1655141234.123456)
        );
        assert_eq!(parse_leading_timestamp("42 payload"), Some(42.0));
        assert_eq!(parse_leading_timestamp("0.050\ttab separated"), Some(0.05));
        assert_eq!(parse_leading_timestamp("7 "), Some(7.0));
    }

    #[test]
    fn test_parse_rejects_non_timestamps() {
        assert_eq!(parse_leading_timestamp("no prefix here"), None);
        assert_eq!(parse_leading_timestamp("12x34 partial digits"), None);
        // The grammar is digits with an optional fraction, nothing else.
        assert_eq!(parse_leading_timestamp("1e5 scientific"), None);
        assert_eq!(parse_leading_timestamp("-3.0 signed"), None);
        assert_eq!(parse_leading_timestamp(".5 bare fraction"), None);
        assert_eq!(parse_leading_timestamp("5. trailing dot"), None);
        assert_eq!(parse_leading_timestamp("1.2.3 double dot"), None);
        // No whitespace means no prefix.
        assert_eq!(parse_leading_timestamp("12345"), None);
        assert_eq!(parse_leading_timestamp(""), None);
    }

    #[test]
    fn test_replay_wait_clamps() {
        let cap = Duration::from_secs(10);

        assert_eq!(replay_wait(0.05, cap), Some(Duration::from_millis(50)));
        assert_eq!(replay_wait(10.0, cap), Some(cap));
        assert_eq!(replay_wait(100.0, cap), Some(cap));
        assert_eq!(replay_wait(f64::INFINITY, cap), Some(cap));
    }

    #[test]
    fn test_replay_wait_ignores_non_positive() {
        let cap = Duration::from_secs(10);

        assert_eq!(replay_wait(0.0, cap), None);
        assert_eq!(replay_wait(-5.0, cap), None);
        assert_eq!(replay_wait(f64::NAN, cap), None);
    }
}
