//! Fixed-size headers that open every data block and index block.
//!
//! ```text
//! data block:  [encoding: u8][reserved: 3][first_ordinal: u64][count: u32][payload...]
//! index block: [is_leaf: u8][reserved: 3][entry_count: u32][entries...]
//! ```
//!
//! All integers are little-endian.

use cfile_common::{Result, verify_data};

/// Header of a data block: the encoding of its payload and the ordinal range it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlockHeader {
    /// Raw encoding tag, see [`EncodingTypePb`](crate::defs::EncodingTypePb).
    pub encoding: u8,
    /// Absolute ordinal of the first value in the block.
    pub first_ordinal: u64,
    /// Number of values in the block.
    pub count: u32,
}

impl DataBlockHeader {
    pub const SIZE: usize = 16;

    pub fn encode(&self, target: &mut Vec<u8>) {
        target.push(self.encoding);
        target.extend_from_slice(&[0u8; 3]);
        target.extend_from_slice(&self.first_ordinal.to_le_bytes());
        target.extend_from_slice(&self.count.to_le_bytes());
    }

    /// Decodes the header, returning it along with the remaining payload.
    pub fn decode(block: &[u8]) -> Result<(DataBlockHeader, &[u8])> {
        verify_data!(data_block_header, block.len() >= Self::SIZE);
        let header = DataBlockHeader {
            encoding: block[0],
            first_ordinal: u64::from_le_bytes(block[4..12].try_into().expect("ordinal bytes")),
            count: u32::from_le_bytes(block[12..16].try_into().expect("count bytes")),
        };
        Ok((header, &block[Self::SIZE..]))
    }
}

/// Header of an index block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBlockHeader {
    /// Leaf entries point at data blocks, internal entries at child index blocks.
    pub is_leaf: bool,
    pub entry_count: u32,
}

impl IndexBlockHeader {
    pub const SIZE: usize = 8;

    pub fn encode(&self, target: &mut Vec<u8>) {
        target.push(self.is_leaf as u8);
        target.extend_from_slice(&[0u8; 3]);
        target.extend_from_slice(&self.entry_count.to_le_bytes());
    }

    /// Decodes the header, returning it along with the encoded entries that follow.
    pub fn decode(block: &[u8]) -> Result<(IndexBlockHeader, &[u8])> {
        verify_data!(index_block_header, block.len() >= Self::SIZE);
        verify_data!(index_block_is_leaf, block[0] <= 1);
        let header = IndexBlockHeader {
            is_leaf: block[0] == 1,
            entry_count: u32::from_le_bytes(block[4..8].try_into().expect("count bytes")),
        };
        Ok((header, &block[Self::SIZE..]))
    }
}
