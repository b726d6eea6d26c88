//! Disk-resident B-tree indexes.
//!
//! Each entry of an index block maps the first key of a child to the child's location.
//! Leaf entries point at data blocks, internal entries at index blocks one level down.
//! The positional index is keyed by the first ordinal of each data block (`u64` cells),
//! the value index by the first value of each data block.

use std::{ops::Range, sync::Arc};

use cfile_common::{Result, error::Error, verify_data};
use cfile_format::block_header::IndexBlockHeader;
use log::trace;

use crate::{
    block::{BlockData, BlockPointer},
    reader::CFileReader,
    types::TypeInfo,
};

/// Deepest index tree accepted before the file is deemed corrupt.
const MAX_INDEX_DEPTH: usize = 32;

#[derive(Debug, Clone)]
struct IndexEntry {
    key: Range<usize>,
    pointer: BlockPointer,
}

/// A parsed index block. Keys are served out of the block buffer.
#[derive(Debug)]
pub struct IndexBlock {
    data: BlockData,
    is_leaf: bool,
    entries: Vec<IndexEntry>,
}

impl IndexBlock {
    /// Parses an index block whose keys are cells of `key_type`.
    ///
    /// The block must hold at least one entry and its entries must consume it exactly.
    pub fn parse(data: BlockData, key_type: &TypeInfo) -> Result<IndexBlock> {
        let block = data.slice();
        let (header, _) = IndexBlockHeader::decode(block)?;
        verify_data!(index_block_entry_count, header.entry_count > 0);

        let key_size = (!key_type.is_variable_length()).then(|| key_type.size());
        let mut entries = Vec::with_capacity((header.entry_count as usize).min(block.len() / 16));
        let mut pos = IndexBlockHeader::SIZE;
        for _ in 0..header.entry_count {
            let key_len = read_u32_at(block, pos)? as usize;
            if let Some(size) = key_size {
                if key_len != size {
                    return Err(Error::invalid_format(
                        "index key",
                        format!("{} key of {key_len} bytes", key_type.name()),
                    ));
                }
            }
            let key_start = pos + 4;
            let pointer_start = key_start
                .checked_add(key_len)
                .filter(|&start| start + BlockPointer::ENCODED_SIZE <= block.len())
                .ok_or_else(|| {
                    Error::invalid_format("index entry", format!("entry at {pos} is truncated"))
                })?;
            let pointer = BlockPointer::decode_le(&block[pointer_start..]);
            entries.push(IndexEntry {
                key: key_start..pointer_start,
                pointer,
            });
            pos = pointer_start + BlockPointer::ENCODED_SIZE;
        }
        verify_data!(index_block_size, pos == block.len());

        Ok(IndexBlock {
            data,
            is_leaf: header.is_leaf,
            entries,
        })
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn key(&self, idx: usize) -> &[u8] {
        &self.data.slice()[self.entries[idx].key.clone()]
    }

    pub fn pointer(&self, idx: usize) -> BlockPointer {
        self.entries[idx].pointer
    }

    /// Index of the last entry whose key is `<= key`, `None` if every key is greater.
    pub fn find_at_or_before(&self, key: &[u8], key_type: &TypeInfo) -> Option<usize> {
        let pos = self.partition(|entry_key| key_type.compare(entry_key, key).is_le());
        pos.checked_sub(1)
    }

    /// Index of the last entry whose key is `< key`, or `0` if there is none.
    ///
    /// Among duplicate keys this selects the child preceding the first duplicate, where
    /// the first occurrence of `key` may begin.
    pub fn find_before(&self, key: &[u8], key_type: &TypeInfo) -> usize {
        let pos = self.partition(|entry_key| key_type.compare(entry_key, key).is_lt());
        pos.saturating_sub(1)
    }

    fn partition(&self, pred: impl Fn(&[u8]) -> bool) -> usize {
        let block = self.data.slice();
        self.entries
            .partition_point(|entry| pred(&block[entry.key.clone()]))
    }
}

fn read_u32_at(block: &[u8], pos: usize) -> Result<u32> {
    let bytes = block
        .get(pos..pos + 4)
        .ok_or_else(|| Error::invalid_format("index entry", format!("entry at {pos} is truncated")))?;
    Ok(u32::from_le_bytes(bytes.try_into().expect("u32 bytes")))
}

#[derive(Debug, Clone)]
struct SeekedLevel {
    block: Arc<IndexBlock>,
    idx: usize,
}

/// Cursor over the leaf entries of an index tree.
///
/// Holds the path from the root to the current leaf entry. Cloning is cheap: the
/// loaded index blocks are shared.
#[derive(Debug, Clone)]
pub struct IndexTreeIterator {
    reader: Arc<CFileReader>,
    root: BlockPointer,
    key_type: &'static TypeInfo,
    seeked: Vec<SeekedLevel>,
}

impl IndexTreeIterator {
    pub fn new(
        reader: Arc<CFileReader>,
        root: BlockPointer,
        key_type: &'static TypeInfo,
    ) -> IndexTreeIterator {
        IndexTreeIterator {
            reader,
            root,
            key_type,
            seeked: Vec::new(),
        }
    }

    pub fn root(&self) -> BlockPointer {
        self.root
    }

    pub fn key_type(&self) -> &'static TypeInfo {
        self.key_type
    }

    /// Whether the cursor rests on a leaf entry.
    pub fn is_seeked(&self) -> bool {
        self.seeked.last().is_some_and(|level| level.block.is_leaf())
    }

    /// Positions the cursor on the last leaf entry whose key is `<= key`.
    ///
    /// Fails with `NotFound` if `key` is smaller than the first key of the index.
    pub fn seek_at_or_before(&mut self, key: &[u8]) -> Result<()> {
        let key_type = self.key_type;
        self.descend(|block| {
            block.find_at_or_before(key, key_type).ok_or_else(|| {
                Error::not_found("key precedes the first entry of the index")
            })
        })
    }

    /// Positions the cursor on the leaf entry where the first value `>= key` may start:
    /// the last entry whose key is `< key`, or the first entry.
    pub fn seek_for_lower_bound(&mut self, key: &[u8]) -> Result<()> {
        let key_type = self.key_type;
        self.descend(|block| Ok(block.find_before(key, key_type)))
    }

    /// Positions the cursor on the first leaf entry.
    pub fn seek_to_first(&mut self) -> Result<()> {
        self.descend(|_| Ok(0))
    }

    /// Whether a leaf entry follows the current one.
    pub fn has_next(&self) -> bool {
        self.is_seeked()
            && self
                .seeked
                .iter()
                .any(|level| level.idx + 1 < level.block.len())
    }

    /// Advances to the next leaf entry, descending into the next subtree when the
    /// current leaf block is exhausted.
    ///
    /// Fails with `NotFound` past the last entry. The cursor is left in an unspecified
    /// position on error.
    pub fn next(&mut self) -> Result<()> {
        assert!(self.is_seeked(), "index iterator is not seeked");
        let Some(depth) = self
            .seeked
            .iter()
            .rposition(|level| level.idx + 1 < level.block.len())
        else {
            return Err(Error::not_found("no index entries past the current one"));
        };
        self.seeked.truncate(depth + 1);
        self.seeked[depth].idx += 1;
        self.descend_from_current(|_| Ok(0))
    }

    /// Key of the current leaf entry.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is not seeked.
    pub fn current_key(&self) -> &[u8] {
        let level = self.current_leaf();
        level.block.key(level.idx)
    }

    /// Data block pointed to by the current leaf entry.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is not seeked.
    pub fn current_block_pointer(&self) -> BlockPointer {
        let level = self.current_leaf();
        level.block.pointer(level.idx)
    }

    fn current_leaf(&self) -> &SeekedLevel {
        assert!(self.is_seeked(), "index iterator is not seeked");
        self.seeked.last().expect("seeked leaf")
    }

    /// Walks down from the root, choosing an entry at every level with `choose`.
    fn descend(&mut self, choose: impl Fn(&IndexBlock) -> Result<usize>) -> Result<()> {
        self.seeked.clear();
        let root = self.load_block(self.root)?;
        let idx = choose(&root)?;
        self.seeked.push(SeekedLevel { block: root, idx });
        self.descend_from_current(choose).inspect_err(|_| self.seeked.clear())
    }

    /// Extends the path below the last seeked level until a leaf is reached.
    fn descend_from_current(&mut self, choose: impl Fn(&IndexBlock) -> Result<usize>) -> Result<()> {
        loop {
            let level = self.seeked.last().expect("seeked level");
            if level.block.is_leaf() {
                return Ok(());
            }
            if self.seeked.len() >= MAX_INDEX_DEPTH {
                return Err(Error::invalid_format(
                    "index tree",
                    format!("depth exceeds {MAX_INDEX_DEPTH}"),
                ));
            }
            let child = self.load_block(level.block.pointer(level.idx))?;
            let idx = choose(&child).map_err(|e| {
                if e.is_not_found() {
                    Error::invalid_format(
                        "index tree",
                        "child keys are inconsistent with the parent entry",
                    )
                } else {
                    e
                }
            })?;
            self.seeked.push(SeekedLevel { block: child, idx });
        }
    }

    fn load_block(&self, pointer: BlockPointer) -> Result<Arc<IndexBlock>> {
        trace!("reading index block {pointer}");
        let data = self.reader.read_block(pointer)?;
        Ok(Arc::new(IndexBlock::parse(data, self.key_type)?))
    }
}
