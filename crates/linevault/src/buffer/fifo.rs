// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! File-backed FIFO buffer.
//!
//! Appends write frames to the tail of the backing file; `remove_batch`
//! rewrites the file to contain only the suffix after the removed prefix.
//! The rewrite is O(size) per call, which is acceptable because removal
//! happens once per ingest batch.

use super::{BufferError, CaptureBuffer};
use crate::frame;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Unbounded file-backed FIFO queue of length-prefixed records.
pub struct FifoBuffer {
    path: PathBuf,
    tmp_path: PathBuf,
    file: Option<File>,
    max_record: usize,
}

impl FifoBuffer {
    /// Open (creating if absent) the buffer file at `path`. Residue from a
    /// previous run is preserved and will be read first.
    pub fn open(path: &Path, max_record: usize) -> Result<Self, BufferError> {
        let file = Self::open_append(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            tmp_path: tmp_sibling(path),
            file: Some(file),
            max_record,
        })
    }

    fn open_append(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn handle(&mut self) -> Result<&mut File, BufferError> {
        self.file.as_mut().ok_or(BufferError::Closed)
    }

    /// Byte offset of the frame boundary after the first `n` frames.
    fn head_offset(&self, n: usize) -> Result<u64, BufferError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        let mut offset = 0u64;
        for _ in 0..n {
            match frame::read_frame(&mut reader, self.max_record) {
                Ok(Some(record)) => offset += (frame::LEN_PREFIX + record.len()) as u64,
                // Fewer than n intact frames: everything readable is removed.
                Ok(None) | Err(_) => break,
            }
        }
        Ok(offset)
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

impl CaptureBuffer for FifoBuffer {
    fn append(&mut self, record: &[u8]) -> Result<(), BufferError> {
        let max = self.max_record;
        let file = self.handle()?;
        frame::write_frame(file, record, max)?;
        Ok(())
    }

    fn read_batch(&self, max: usize) -> Result<Vec<Vec<u8>>, BufferError> {
        if self.file.is_none() {
            return Err(BufferError::Closed);
        }

        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);
        let mut batch = Vec::new();
        while batch.len() < max {
            match frame::read_frame(&mut reader, self.max_record) {
                Ok(Some(record)) => batch.push(record),
                Ok(None) => break,
                Err(err) => {
                    // A cut-off tail loses the records behind it, but the
                    // ones already decoded remain usable.
                    tracing::debug!(%err, decoded = batch.len(), "stopping batch read early");
                    break;
                }
            }
        }
        Ok(batch)
    }

    fn remove_batch(&mut self, n: usize) -> Result<(), BufferError> {
        if self.file.is_none() {
            return Err(BufferError::Closed);
        }
        if n == 0 {
            return Ok(());
        }

        let offset = self.head_offset(n)?;
        let total = fs::metadata(&self.path)?.len();
        if offset >= total {
            // All frames consumed.
            self.handle()?.set_len(0)?;
            return Ok(());
        }

        let mut src = File::open(&self.path)?;
        src.seek(SeekFrom::Start(offset))?;
        let mut tmp = File::create(&self.tmp_path)?;
        io::copy(&mut src, &mut tmp)?;
        drop(tmp);
        drop(src);
        fs::rename(&self.tmp_path, &self.path)?;

        // The append handle still points at the renamed-over inode.
        self.file = Some(Self::open_append(&self.path)?);
        Ok(())
    }

    fn len_records(&self) -> usize {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(_) => return 0,
        };
        let mut reader = BufReader::new(file);
        let mut count = 0;
        while let Ok(Some(_)) = frame::read_frame(&mut reader, self.max_record) {
            count += 1;
        }
        count
    }

    fn size_bytes(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    fn dropped(&self) -> u64 {
        0
    }

    fn close(&mut self) -> Result<(), BufferError> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MAX_RECORD;
    use tempfile::tempdir;

    fn records(buffer: &FifoBuffer) -> Vec<Vec<u8>> {
        buffer.read_batch(usize::MAX).expect("read")
    }

    #[test]
    fn test_append_read_order() {
        let dir = tempdir().expect("tempdir");
        let mut buffer = FifoBuffer::open(&dir.path().join("buf.dat"), MAX_RECORD).expect("open");

        for i in 0..10u8 {
            buffer.append(&[i, i, i]).expect("append");
        }

        let batch = buffer.read_batch(4).expect("read");
        assert_eq!(batch.len(), 4);
        assert_eq!(batch[0], vec![0, 0, 0]);
        assert_eq!(batch[3], vec![3, 3, 3]);

        // Reading does not advance the head.
        assert_eq!(buffer.len_records(), 10);
    }

    #[test]
    fn test_remove_is_head_only() {
        let dir = tempdir().expect("tempdir");
        let mut buffer = FifoBuffer::open(&dir.path().join("buf.dat"), MAX_RECORD).expect("open");

        let input: Vec<&[u8]> = vec![b"a", b"bb", b"ccc", b"dddd", b"eeeee"];
        for record in &input {
            buffer.append(record).expect("append");
        }

        buffer.remove_batch(2).expect("remove");

        // Frame-for-frame identical to the original minus its first 2 frames.
        let remaining = records(&buffer);
        assert_eq!(remaining.len(), 3);
        assert_eq!(remaining[0], b"ccc");
        assert_eq!(remaining[1], b"dddd");
        assert_eq!(remaining[2], b"eeeee");
    }

    #[test]
    fn test_remove_all_truncates() {
        let dir = tempdir().expect("tempdir");
        let mut buffer = FifoBuffer::open(&dir.path().join("buf.dat"), MAX_RECORD).expect("open");

        for _ in 0..5 {
            buffer.append(b"record").expect("append");
        }
        buffer.remove_batch(5).expect("remove");

        assert_eq!(buffer.size_bytes(), 0);
        assert_eq!(buffer.len_records(), 0);
    }

    #[test]
    fn test_append_after_remove() {
        let dir = tempdir().expect("tempdir");
        let mut buffer = FifoBuffer::open(&dir.path().join("buf.dat"), MAX_RECORD).expect("open");

        buffer.append(b"one").expect("append");
        buffer.append(b"two").expect("append");
        buffer.remove_batch(1).expect("remove");
        // The rewrite replaced the backing file; later appends must land in
        // the new one, not the unlinked inode.
        buffer.append(b"three").expect("append");

        let remaining = records(&buffer);
        assert_eq!(remaining, vec![b"two".to_vec(), b"three".to_vec()]);
    }

    #[test]
    fn test_residue_survives_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("buf.dat");

        {
            let mut buffer = FifoBuffer::open(&path, MAX_RECORD).expect("open");
            buffer.append(b"survivor").expect("append");
            // Dropped without close or drain, as a killed process would
            // leave it.
        }

        let buffer = FifoBuffer::open(&path, MAX_RECORD).expect("reopen");
        let batch = buffer.read_batch(16).expect("read");
        assert_eq!(batch, vec![b"survivor".to_vec()]);
    }

    #[test]
    fn test_truncated_tail_keeps_earlier_records() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("buf.dat");
        let mut buffer = FifoBuffer::open(&path, MAX_RECORD).expect("open");

        buffer.append(b"intact").expect("append");
        buffer.append(b"doomed").expect("append");
        buffer.close().expect("close");

        // Cut the file mid-way through the second frame.
        let len = fs::metadata(&path).expect("stat").len();
        let file = OpenOptions::new().write(true).open(&path).expect("open rw");
        file.set_len(len - 3).expect("truncate");

        let buffer = FifoBuffer::open(&path, MAX_RECORD).expect("reopen");
        let batch = buffer.read_batch(16).expect("read");
        assert_eq!(batch, vec![b"intact".to_vec()]);
    }

    #[test]
    fn test_oversized_record_rejected() {
        let dir = tempdir().expect("tempdir");
        let mut buffer = FifoBuffer::open(&dir.path().join("buf.dat"), 8).expect("open");

        let err = buffer.append(&[0u8; 64]).expect_err("must reject");
        assert!(matches!(err, BufferError::RecordTooLarge { len: 64, max: 8 }));
        assert_eq!(buffer.size_bytes(), 0);
    }

    #[test]
    fn test_closed_buffer_errors() {
        let dir = tempdir().expect("tempdir");
        let mut buffer = FifoBuffer::open(&dir.path().join("buf.dat"), MAX_RECORD).expect("open");

        buffer.close().expect("close");
        assert!(matches!(buffer.append(b"x"), Err(BufferError::Closed)));
        assert!(matches!(buffer.read_batch(1), Err(BufferError::Closed)));
        assert!(matches!(buffer.remove_batch(1), Err(BufferError::Closed)));
        // A second close is a no-op.
        buffer.close().expect("close again");
    }
}
