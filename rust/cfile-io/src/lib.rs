//! Positioned reads over CFile storage.
//!
//! [`ReadAt`] is the only contract the CFile reader has with its storage: a known size
//! and independent range reads that may run concurrently. In-memory buffers and local
//! files implement it here; tests wrap it to inject failures.

use std::{ops::Range, sync::Arc};

use cfile_bytes::Bytes;

pub mod file;
pub mod memory;
pub mod utils;

pub use utils::read_exact_at;

/// Random-access, read-only view of a file or blob.
///
/// Reads go through a shared reference and keep no cursor, so one instance serves
/// any number of concurrent callers.
pub trait ReadAt: Send + Sync + 'static {
    /// Total size in bytes.
    fn size(&self) -> std::io::Result<u64>;

    /// Returns the bytes in `range`.
    ///
    /// The result is shorter than requested only when `range` runs past the end of
    /// the object; a range starting at or past the end yields no bytes. Callers that
    /// need the whole range use [`read_exact_at`].
    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes>;
}

impl<T> ReadAt for Arc<T>
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        T::size(self)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        T::read_at(self, range)
    }
}
