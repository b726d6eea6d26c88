//! Byte buffers for use by the CFile infrastructure: a mutable builder and a shared,
//! immutable, cheaply sliceable view.

use std::{
    ops::{Bound, Range, RangeBounds},
    sync::Arc,
};

/// Growable buffer that is filled once and then frozen into [`Bytes`].
#[derive(Debug, Default)]
pub struct BytesMut(Vec<u8>);

impl BytesMut {
    pub fn new() -> BytesMut {
        BytesMut(Vec::new())
    }

    /// A buffer of `len` zero bytes, ready to be read into.
    pub fn zeroed(len: usize) -> BytesMut {
        BytesMut(vec![0u8; len])
    }

    #[inline]
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.0.extend_from_slice(data);
    }

    /// Freezes the buffer. The allocation is moved, not copied.
    pub fn freeze(self) -> Bytes {
        Bytes::from_vec(self.0)
    }
}

impl std::ops::Deref for BytesMut {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl std::ops::DerefMut for BytesMut {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Immutable, reference-counted view into a byte allocation.
///
/// Clones and slices share the allocation, which lives until the last view is dropped.
#[derive(Clone)]
pub struct Bytes {
    buf: Arc<Vec<u8>>,
    range: Range<usize>,
}

impl Bytes {
    #[inline]
    pub fn new() -> Self {
        Bytes::from_vec(Vec::new())
    }

    fn from_vec(vec: Vec<u8>) -> Bytes {
        let len = vec.len();
        Bytes {
            buf: Arc::new(vec),
            range: 0..len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn copy_from_slice(data: &[u8]) -> Bytes {
        Bytes::from_vec(data.to_vec())
    }

    /// Sub-view of `range`, relative to this view. No data is copied.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Bytes {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.len(),
        };
        assert!(
            start <= end && end <= self.len(),
            "slice {start}..{end} out of bounds for length {}",
            self.len()
        );
        Bytes {
            buf: self.buf.clone(),
            range: self.range.start + start..self.range.start + end,
        }
    }

    /// Returns `true` if both instances are views into the same allocation.
    pub fn shares_buffer_with(&self, other: &Bytes) -> bool {
        Arc::ptr_eq(&self.buf, &other.buf)
    }

    /// Returns the number of live `Bytes` instances referencing the backing allocation.
    pub fn owner_count(&self) -> usize {
        Arc::strong_count(&self.buf)
    }
}

impl std::ops::Deref for Bytes {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.buf[self.range.clone()]
    }
}

impl AsRef<[u8]> for Bytes {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl Default for Bytes {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bytes")
            .field("len", &self.len())
            .field("range", &self.range)
            .finish()
    }
}

impl PartialEq for Bytes {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref() == other.as_ref()
    }
}

impl Eq for Bytes {}

impl From<BytesMut> for Bytes {
    fn from(buf: BytesMut) -> Self {
        buf.freeze()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(vec: Vec<u8>) -> Self {
        Bytes::from_vec(vec)
    }
}

impl From<&[u8]> for Bytes {
    fn from(data: &[u8]) -> Self {
        Bytes::copy_from_slice(data)
    }
}
