// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-prefixed frame codec for the overflow buffer file.
//!
//! A frame is a 4-byte big-endian unsigned length followed by exactly that
//! many payload bytes. No checksum, no type byte, no versioning: the buffer
//! file is single-process and single-writer, written append-only and read
//! sequentially from a known offset.

use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Default upper bound on a single record's payload.
pub const MAX_RECORD: usize = 1024 * 1024;

/// Size of the length prefix in bytes.
pub const LEN_PREFIX: usize = 4;

/// Frame codec errors.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("record of {len} bytes exceeds the {max} byte frame limit")]
    RecordTooLarge { len: usize, max: usize },

    #[error("buffer file truncated mid-frame")]
    Truncated,
}

/// Write one frame. Rejects payloads larger than `max` before writing
/// anything.
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8], max: usize) -> Result<(), FrameError> {
    if payload.len() > max {
        return Err(FrameError::RecordTooLarge {
            len: payload.len(),
            max,
        });
    }

    w.write_u32::<BigEndian>(payload.len() as u32)?;
    w.write_all(payload)?;
    Ok(())
}

/// Read the next frame.
///
/// Returns `Ok(None)` at a clean end-of-stream on a frame boundary. An EOF
/// inside the length prefix or the payload is [`FrameError::Truncated`]; a
/// length beyond `max` means the file is corrupt and is reported the same way
/// a too-large write would be.
pub fn read_frame<R: Read>(r: &mut R, max: usize) -> Result<Option<Vec<u8>>, FrameError> {
    let mut prefix = [0u8; LEN_PREFIX];
    let mut filled = 0;
    while filled < LEN_PREFIX {
        let n = r.read(&mut prefix[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(FrameError::Truncated);
        }
        filled += n;
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > max {
        return Err(FrameError::RecordTooLarge { len, max });
    }

    let mut payload = vec![0u8; len];
    match r.read_exact(&mut payload) {
        Ok(()) => Ok(Some(payload)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(FrameError::Truncated),
        Err(e) => Err(e.into()),
    }
}
