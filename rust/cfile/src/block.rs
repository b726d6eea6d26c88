//! Block location descriptors and shared block buffers.

use std::ops::Range;

use cfile_bytes::Bytes;
use cfile_format::defs::BlockPointerPb;

/// Location of a block within the file: its byte offset and its size.
///
/// A pure value type. The reader checks that `size > 0` and that the block lies within
/// the file before reading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockPointer {
    offset: u64,
    size: u32,
}

impl BlockPointer {
    /// Size of the encoded pointer inside an index entry: `[offset: u64][size: u32]`.
    pub const ENCODED_SIZE: usize = 12;

    pub fn new(offset: u64, size: u32) -> BlockPointer {
        BlockPointer { offset, size }
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// End offset of the block, `None` if it overflows the address space.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size as u64)
    }

    /// Byte range of the block.
    ///
    /// # Panics
    ///
    /// Panics if the end offset overflows `u64`.
    pub fn range(&self) -> Range<u64> {
        self.offset..self.end().expect("block pointer end")
    }

    /// Decodes the little-endian `[offset][size]` pair. `buf` must hold at least
    /// [`Self::ENCODED_SIZE`] bytes.
    pub fn decode_le(buf: &[u8]) -> BlockPointer {
        BlockPointer {
            offset: u64::from_le_bytes(buf[0..8].try_into().expect("offset bytes")),
            size: u32::from_le_bytes(buf[8..12].try_into().expect("size bytes")),
        }
    }

    pub fn to_pb(&self) -> BlockPointerPb {
        BlockPointerPb {
            offset: self.offset,
            size: self.size,
        }
    }
}

impl From<BlockPointerPb> for BlockPointer {
    fn from(pb: BlockPointerPb) -> Self {
        BlockPointer::new(pb.offset, pb.size)
    }
}

impl std::fmt::Display for BlockPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, +{}]", self.offset, self.size)
    }
}

/// The bytes of one block read from a CFile.
///
/// The underlying buffer is reference counted: `BlockData` can be cloned freely, clones
/// never copy bytes, and the buffer is released when the last clone is dropped. The
/// content is never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct BlockData {
    data: Bytes,
}

impl BlockData {
    pub fn new(data: Bytes) -> BlockData {
        BlockData { data }
    }

    #[inline]
    pub fn slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_pointer_ordering_and_range() {
        let a = BlockPointer::new(100, 20);
        let b = BlockPointer::new(120, 8);
        assert!(a < b);
        assert_eq!(a, BlockPointer::from(a.to_pb()));
        assert_eq!(a.range(), 100..120);
        assert_eq!(a.to_string(), "[100, +20]");
        assert_eq!(BlockPointer::new(u64::MAX, 1).end(), None);
    }

    #[test]
    fn test_block_pointer_decode() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&4096u64.to_le_bytes());
        buf.extend_from_slice(&77u32.to_le_bytes());
        assert_eq!(BlockPointer::decode_le(&buf), BlockPointer::new(4096, 77));
    }

    #[test]
    fn test_block_data_copies_share_buffer() {
        let block = BlockData::new(Bytes::from(b"block payload".to_vec()));
        let copy = block.clone();
        assert!(copy.bytes().shares_buffer_with(block.bytes()));
        assert_eq!(copy.slice(), block.slice());

        drop(block);
        assert_eq!(copy.slice(), b"block payload");
        assert_eq!(copy.bytes().owner_count(), 1);
    }

    #[test]
    fn test_block_data_sub_slice_outlives_parent() {
        let parent = Bytes::from(b"0123456789".to_vec());
        let block = BlockData::new(parent.slice(2..8));
        drop(parent);
        assert_eq!(block.slice(), b"234567");
        assert_eq!(block.len(), 6);
        assert!(!block.is_empty());
        assert!(BlockData::default().is_empty());
    }
}
