//! `ReadAt` wrappers for error-path and I/O accounting tests.

use std::{
    ops::Range,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use cfile_bytes::Bytes;
use cfile_io::ReadAt;

/// How a [`FailingReader`] misbehaves on reads touching the armed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The read returns an I/O error.
    Error,
    /// The read returns fewer bytes than requested.
    Truncate,
}

/// An in-memory file whose reads fail once they overlap a chosen byte range.
///
/// The failure can be armed and disarmed between reads, e.g. after a reader is opened.
pub struct FailingReader {
    data: Bytes,
    armed: Mutex<Option<(Range<u64>, Failure)>>,
}

impl FailingReader {
    pub fn new(data: impl Into<Bytes>) -> FailingReader {
        FailingReader {
            data: data.into(),
            armed: Mutex::new(None),
        }
    }

    /// Makes every read overlapping `range` fail as described by `failure`.
    pub fn arm(&self, range: Range<u64>, failure: Failure) {
        *self.armed.lock().expect("lock") = Some((range, failure));
    }

    pub fn disarm(&self) {
        *self.armed.lock().expect("lock") = None;
    }
}

impl ReadAt for FailingReader {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        let armed = self.armed.lock().expect("lock").clone();
        if let Some((failing, failure)) = armed {
            if range.start < failing.end && failing.start < range.end {
                match failure {
                    Failure::Error => {
                        return Err(std::io::Error::other(format!(
                            "injected read failure at {}..{}",
                            range.start, range.end
                        )));
                    }
                    Failure::Truncate => {
                        let end = range.start + (range.end - range.start) / 2;
                        return self.data.read_at(range.start..end);
                    }
                }
            }
        }
        self.data.read_at(range)
    }
}

/// Counts the reads issued against the wrapped file.
pub struct CountingReader<R> {
    inner: R,
    reads: AtomicUsize,
}

impl<R: ReadAt> CountingReader<R> {
    pub fn new(inner: R) -> CountingReader<R> {
        CountingReader {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl<R: ReadAt> ReadAt for CountingReader<R> {
    fn size(&self) -> std::io::Result<u64> {
        self.inner.size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.inner.read_at(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failing_reader() {
        let reader = FailingReader::new(b"0123456789".to_vec());
        assert_eq!(reader.read_at(0..4).unwrap().as_ref(), b"0123");

        reader.arm(5..6, Failure::Error);
        assert!(reader.read_at(0..4).is_ok());
        assert!(reader.read_at(4..8).is_err());

        reader.arm(5..6, Failure::Truncate);
        assert_eq!(reader.read_at(4..8).unwrap().as_ref(), b"45");

        reader.disarm();
        assert_eq!(reader.read_at(4..8).unwrap().as_ref(), b"4567");
    }

    #[test]
    fn test_counting_reader() {
        let reader = CountingReader::new(b"abc".to_vec());
        reader.read_at(0..1).unwrap();
        reader.read_at(1..3).unwrap();
        assert_eq!(reader.reads(), 2);
        assert_eq!(reader.size().unwrap(), 3);
    }
}
