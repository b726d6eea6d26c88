//! Output buffer filled by [`CFileIterator::copy_next_values`](crate::CFileIterator::copy_next_values).

use std::ops::Range;

use cfile_common::Result;

use crate::types::{DataType, Datum, TypeInfo, get_type_info};

/// Bump storage for variable-length values copied out of data blocks.
///
/// Copies are appended and never moved relative to each other; the whole arena is
/// released at once by [`Arena::reset`] or on drop.
#[derive(Debug, Default)]
pub struct Arena {
    buf: Vec<u8>,
}

impl Arena {
    pub fn new() -> Arena {
        Arena::default()
    }

    pub fn with_capacity(capacity: usize) -> Arena {
        Arena {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Copies `data` into the arena and returns its location.
    pub fn copy_from_slice(&mut self, data: &[u8]) -> Range<usize> {
        let start = self.buf.len();
        self.buf.extend_from_slice(data);
        start..self.buf.len()
    }

    /// Returns previously copied bytes.
    ///
    /// # Panics
    ///
    /// Panics if `range` was not produced by this arena since the last reset.
    pub fn get(&self, range: Range<usize>) -> &[u8] {
        &self.buf[range]
    }

    /// Total number of bytes held.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Releases all copies, keeping the allocation for reuse.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

/// A fixed-capacity batch of cells of a single type.
///
/// Fixed-width cells are stored inline, back to back. Variable-length cells are copied
/// into the block's [`Arena`] and referenced by range.
#[derive(Debug)]
pub struct ColumnBlock {
    type_info: &'static TypeInfo,
    capacity: usize,
    len: usize,
    cells: Vec<u8>,
    views: Vec<Range<usize>>,
    arena: Arena,
}

impl ColumnBlock {
    /// Creates an empty block able to hold `capacity` cells of `data_type`.
    pub fn new(data_type: DataType, capacity: usize) -> ColumnBlock {
        let type_info = get_type_info(data_type);
        let (cells, views) = if type_info.is_variable_length() {
            (Vec::new(), Vec::with_capacity(capacity))
        } else {
            (Vec::with_capacity(capacity * type_info.size()), Vec::new())
        };
        ColumnBlock {
            type_info,
            capacity,
            len: 0,
            cells,
            views,
            arena: Arena::new(),
        }
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.type_info.data_type()
    }

    #[inline]
    pub fn type_info(&self) -> &'static TypeInfo {
        self.type_info
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cells that can still be appended.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Returns the encoded cell at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= len()`.
    pub fn cell(&self, idx: usize) -> &[u8] {
        assert!(idx < self.len, "cell {idx} out of bounds ({})", self.len);
        if self.type_info.is_variable_length() {
            self.arena.get(self.views[idx].clone())
        } else {
            let size = self.type_info.size();
            &self.cells[idx * size..(idx + 1) * size]
        }
    }

    /// Returns the value at `idx`.
    pub fn value(&self, idx: usize) -> Result<Datum<'_>> {
        Datum::decode(self.data_type(), self.cell(idx))
    }

    /// Returns all values held by the block.
    pub fn values(&self) -> Result<Vec<Datum<'_>>> {
        (0..self.len).map(|idx| self.value(idx)).collect()
    }

    /// Empties the block, keeping its capacity and allocations.
    pub fn clear(&mut self) {
        self.len = 0;
        self.cells.clear();
        self.views.clear();
        self.arena.reset();
    }

    /// Appends a well-formed cell of this block's type.
    pub(crate) fn push_cell(&mut self, cell: &[u8]) {
        debug_assert!(self.len < self.capacity);
        if self.type_info.is_variable_length() {
            let range = self.arena.copy_from_slice(cell);
            self.views.push(range);
        } else {
            debug_assert_eq!(cell.len(), self.type_info.size());
            self.cells.extend_from_slice(cell);
        }
        self.len += 1;
    }
}
