//! `ReadAt` over in-memory buffers.

use std::ops::Range;

use cfile_bytes::Bytes;

use crate::{ReadAt, verify};

/// Clips `range` to a buffer of `len` bytes.
fn clip(range: Range<u64>, len: usize) -> std::io::Result<Range<usize>> {
    verify!(range.end >= range.start);
    let len = len as u64;
    let start = range.start.min(len);
    let end = range.end.min(len);
    Ok(start as usize..end as usize)
}

/// Shares the buffer; the returned bytes are a view, not a copy.
impl ReadAt for Bytes {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        let range = clip(range, self.len())?;
        Ok(self.slice(range))
    }
}

impl ReadAt for Vec<u8> {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        let range = clip(range, self.len())?;
        Ok(Bytes::copy_from_slice(&self[range]))
    }
}
