//! Decoding of data blocks.
//!
//! A [`BlockDecoder`] parses the block header and the index structures of the payload
//! (offset tables, run boundaries, dictionary entries) once, then serves cells straight
//! out of the shared [`BlockData`] buffer. Values are materialized only when copied
//! into a [`ColumnBlock`].

use cfile_common::{Result, error::Error, verify_data};
use cfile_format::{block_header::DataBlockHeader, defs::EncodingTypePb};

use crate::{block::BlockData, column_block::ColumnBlock, types::TypeInfo};

mod dictionary;
mod plain;
mod run_length;

use dictionary::DictionaryCells;
use plain::PlainCells;
use run_length::RunLengthCells;

/// Encoding of a data block payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingKind {
    Plain,
    RunLength,
    Dictionary,
}

impl EncodingKind {
    /// Resolves the encoding tag stored in the data block header.
    pub fn from_tag(tag: u8) -> Result<EncodingKind> {
        match EncodingTypePb::try_from(tag as i32) {
            Ok(EncodingTypePb::Plain) => Ok(EncodingKind::Plain),
            Ok(EncodingTypePb::RunLength) => Ok(EncodingKind::RunLength),
            Ok(EncodingTypePb::Dictionary) => Ok(EncodingKind::Dictionary),
            _ => Err(Error::not_supported(format!("block encoding tag {tag}"))),
        }
    }

    pub fn to_pb(self) -> EncodingTypePb {
        match self {
            EncodingKind::Plain => EncodingTypePb::Plain,
            EncodingKind::RunLength => EncodingTypePb::RunLength,
            EncodingKind::Dictionary => EncodingTypePb::Dictionary,
        }
    }

    /// Whether a decoder exists for this encoding over values of `type_info`.
    pub fn supports(self, type_info: &TypeInfo) -> bool {
        match self {
            EncodingKind::Plain => true,
            EncodingKind::RunLength => !type_info.is_variable_length(),
            EncodingKind::Dictionary => type_info.is_variable_length(),
        }
    }
}

enum EncodedCells {
    Plain(PlainCells),
    RunLength(RunLengthCells),
    Dictionary(DictionaryCells),
}

/// Cursor over the values of a single data block.
///
/// Covers the ordinal range `[first_ordinal, first_ordinal + count)`. The in-block
/// position starts at `0` and can be moved anywhere in `0..=count`; `count` means the
/// block is exhausted.
pub struct BlockDecoder {
    data: BlockData,
    type_info: &'static TypeInfo,
    encoding: EncodingKind,
    first_ordinal: u64,
    count: usize,
    cur_idx: usize,
    cells: EncodedCells,
}

impl BlockDecoder {
    /// Parses the block and prepares the decoder for values of `type_info`.
    ///
    /// Fails with `NotSupported` for an unknown encoding tag or an encoding that does
    /// not apply to the type, and with a corruption error if the payload is
    /// inconsistent with the header.
    pub fn new(data: BlockData, type_info: &'static TypeInfo) -> Result<BlockDecoder> {
        let (header, payload) = DataBlockHeader::decode(data.slice())?;
        let encoding = EncodingKind::from_tag(header.encoding)?;
        if !encoding.supports(type_info) {
            return Err(Error::not_supported(format!(
                "{encoding:?} encoding of {} values",
                type_info.name()
            )));
        }
        verify_data!(data_block_count, header.count > 0);
        verify_data!(
            data_block_ordinals,
            header.first_ordinal.checked_add(header.count as u64).is_some()
        );

        let count = header.count as usize;
        let cells = match encoding {
            EncodingKind::Plain => EncodedCells::Plain(PlainCells::parse(
                payload,
                DataBlockHeader::SIZE,
                count,
                type_info,
            )?),
            EncodingKind::RunLength => EncodedCells::RunLength(RunLengthCells::parse(
                payload,
                DataBlockHeader::SIZE,
                count,
                type_info,
            )?),
            EncodingKind::Dictionary => EncodedCells::Dictionary(DictionaryCells::parse(
                payload,
                DataBlockHeader::SIZE,
                count,
            )?),
        };

        Ok(BlockDecoder {
            data,
            type_info,
            encoding,
            first_ordinal: header.first_ordinal,
            count,
            cur_idx: 0,
            cells,
        })
    }

    #[inline]
    pub fn encoding(&self) -> EncodingKind {
        self.encoding
    }

    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        self.type_info
    }

    /// Absolute ordinal of the first value in the block.
    #[inline]
    pub fn first_ordinal(&self) -> u64 {
        self.first_ordinal
    }

    /// Number of values in the block.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Current position within the block, in `0..=count()`.
    #[inline]
    pub fn current_index(&self) -> usize {
        self.cur_idx
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.count - self.cur_idx
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.cur_idx < self.count
    }

    /// Moves the cursor to `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos > count()`.
    pub fn seek_to_position_in_block(&mut self, pos: usize) {
        assert!(
            pos <= self.count,
            "position {pos} is past the end of a block of {} values",
            self.count
        );
        self.cur_idx = pos;
    }

    /// Locates the first value that is `>= key`, assuming the block is sorted.
    ///
    /// Returns the position and whether the value there equals `key`, or `None` if every
    /// value in the block is smaller than `key`. The cursor is not moved.
    pub fn find_at_or_after_value(&self, key: &[u8]) -> Option<(usize, bool)> {
        let mut lo = 0;
        let mut hi = self.count;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.type_info.compare(self.cell(mid), key).is_lt() {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo == self.count {
            return None;
        }
        let exact = self.type_info.compare(self.cell(lo), key).is_eq();
        Some((lo, exact))
    }

    /// Moves the cursor to the first value that is `>= key`.
    ///
    /// Returns whether that value equals `key`, or `None` (leaving the cursor in place)
    /// if every value in the block is smaller.
    pub fn seek_at_or_after_value(&mut self, key: &[u8]) -> Option<bool> {
        let (pos, exact) = self.find_at_or_after_value(key)?;
        self.cur_idx = pos;
        Some(exact)
    }

    /// Copies up to `n` values from the cursor into `dst`, bounded by the values left in
    /// the block and by the free capacity of `dst`. Advances the cursor past the copied
    /// values and returns their number.
    pub fn copy_next_values(&mut self, n: usize, dst: &mut ColumnBlock) -> usize {
        debug_assert_eq!(dst.data_type(), self.type_info.data_type());
        let n = n.min(self.remaining()).min(dst.remaining());
        for idx in self.cur_idx..self.cur_idx + n {
            let cell = self.cell(idx);
            dst.push_cell(cell);
        }
        self.cur_idx += n;
        n
    }

    /// Returns the encoded cell at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= count()`.
    pub fn cell(&self, idx: usize) -> &[u8] {
        assert!(idx < self.count, "cell {idx} out of bounds ({})", self.count);
        let block = self.data.slice();
        match &self.cells {
            EncodedCells::Plain(cells) => cells.cell(block, idx),
            EncodedCells::RunLength(cells) => cells.cell(block, idx),
            EncodedCells::Dictionary(cells) => cells.cell(block, idx),
        }
    }
}

impl std::fmt::Debug for BlockDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockDecoder")
            .field("encoding", &self.encoding)
            .field("type", &self.type_info.name())
            .field("first_ordinal", &self.first_ordinal)
            .field("count", &self.count)
            .field("cur_idx", &self.cur_idx)
            .finish()
    }
}

/// Reads a little-endian `u32` at `pos`, failing if the buffer is too short.
fn read_u32(buf: &[u8], pos: usize, element: &str) -> Result<u32> {
    let bytes = pos
        .checked_add(4)
        .and_then(|end| buf.get(pos..end))
        .ok_or_else(|| Error::invalid_format(element, format!("truncated at offset {pos}")))?;
    Ok(u32::from_le_bytes(bytes.try_into().expect("u32 bytes")))
}

#[cfg(test)]
mod tests {
    use cfile_bytes::Bytes;
    use cfile_format::block_header::DataBlockHeader;

    use super::*;
    use crate::types::{DataType, Datum, get_type_info};

    fn plain_i32_block(first_ordinal: u64, values: &[i32]) -> BlockData {
        let mut buf = Vec::new();
        DataBlockHeader {
            encoding: EncodingTypePb::Plain as u8,
            first_ordinal,
            count: values.len() as u32,
        }
        .encode(&mut buf);
        for v in values {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        BlockData::new(Bytes::from(buf))
    }

    fn int32() -> &'static TypeInfo {
        get_type_info(DataType::Int32)
    }

    #[test]
    fn test_cursor_and_copy() {
        let mut decoder = BlockDecoder::new(plain_i32_block(10, &[1, 3, 5, 7]), int32()).unwrap();
        assert_eq!(decoder.encoding(), EncodingKind::Plain);
        assert_eq!(decoder.first_ordinal(), 10);
        assert_eq!(decoder.count(), 4);
        assert!(decoder.has_next());

        decoder.seek_to_position_in_block(1);
        let mut dst = ColumnBlock::new(DataType::Int32, 2);
        assert_eq!(decoder.copy_next_values(10, &mut dst), 2);
        assert_eq!(dst.values().unwrap(), vec![Datum::Int32(3), Datum::Int32(5)]);
        assert_eq!(decoder.current_index(), 3);

        dst.clear();
        assert_eq!(decoder.copy_next_values(10, &mut dst), 1);
        assert!(!decoder.has_next());
        assert_eq!(decoder.copy_next_values(10, &mut dst), 0);
    }

    #[test]
    fn test_seek_at_or_after_value() {
        let mut decoder =
            BlockDecoder::new(plain_i32_block(0, &[-4, 2, 2, 2, 9]), int32()).unwrap();
        assert_eq!(decoder.seek_at_or_after_value(&Datum::Int32(2).encode()), Some(true));
        assert_eq!(decoder.current_index(), 1);
        assert_eq!(decoder.seek_at_or_after_value(&Datum::Int32(3).encode()), Some(false));
        assert_eq!(decoder.current_index(), 4);
        assert_eq!(decoder.seek_at_or_after_value(&Datum::Int32(-100).encode()), Some(false));
        assert_eq!(decoder.current_index(), 0);

        decoder.seek_to_position_in_block(2);
        assert_eq!(decoder.seek_at_or_after_value(&Datum::Int32(10).encode()), None);
        assert_eq!(decoder.current_index(), 2);
    }

    #[test]
    #[should_panic]
    fn test_seek_past_end_panics() {
        let mut decoder = BlockDecoder::new(plain_i32_block(0, &[1]), int32()).unwrap();
        decoder.seek_to_position_in_block(2);
    }

    #[test]
    fn test_empty_block_is_corrupt() {
        let err = BlockDecoder::new(plain_i32_block(0, &[]), int32()).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_unknown_encoding_not_supported() {
        let block = plain_i32_block(0, &[1, 2]);
        let mut buf = block.slice().to_vec();
        buf[0] = 42;
        let err = BlockDecoder::new(BlockData::new(Bytes::from(buf)), int32()).unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    fn test_encoding_support_matrix() {
        let string = get_type_info(DataType::String);
        assert!(EncodingKind::Plain.supports(int32()));
        assert!(EncodingKind::Plain.supports(string));
        assert!(EncodingKind::RunLength.supports(int32()));
        assert!(!EncodingKind::RunLength.supports(string));
        assert!(EncodingKind::Dictionary.supports(string));
        assert!(!EncodingKind::Dictionary.supports(int32()));

        let mut buf = plain_i32_block(0, &[1]).slice().to_vec();
        buf[0] = EncodingTypePb::Dictionary as u8;
        let err = BlockDecoder::new(BlockData::new(Bytes::from(buf)), int32()).unwrap_err();
        assert!(err.is_not_supported());
    }

    #[test]
    fn test_read_u32() {
        let buf = [1u8, 0, 0, 0, 2];
        assert_eq!(read_u32(&buf, 0, "x").unwrap(), 1);
        assert!(read_u32(&buf, 2, "x").unwrap_err().is_corruption());
        assert!(read_u32(&buf, usize::MAX, "x").unwrap_err().is_corruption());
    }
}
