//! Seeking and scanning over the values of a CFile.

use std::sync::Arc;

use cfile_common::{Result, error::Error, verify_arg};
use log::trace;

use crate::{
    block::BlockPointer,
    column_block::ColumnBlock,
    decoder::BlockDecoder,
    index_btree::IndexTreeIterator,
    reader::CFileReader,
    types::{DataType, Datum, get_type_info},
};

/// The index cursor that located the current block.
#[derive(Debug, Clone)]
enum ActiveCursor {
    Positional(IndexTreeIterator),
    ByValue(IndexTreeIterator),
}

impl ActiveCursor {
    fn get(&self) -> &IndexTreeIterator {
        match self {
            ActiveCursor::Positional(cursor) | ActiveCursor::ByValue(cursor) => cursor,
        }
    }

    fn get_mut(&mut self) -> &mut IndexTreeIterator {
        match self {
            ActiveCursor::Positional(cursor) | ActiveCursor::ByValue(cursor) => cursor,
        }
    }
}

/// A data block together with its decoder.
#[derive(Debug)]
struct LoadedBlock {
    pointer: BlockPointer,
    decoder: BlockDecoder,
}

/// Position established by the last successful seek.
#[derive(Debug)]
struct Seeked {
    cursor: ActiveCursor,
    block: LoadedBlock,
}

/// Cursor over the values of a CFile.
///
/// Created by [`CFileReader::new_iterator`]. The iterator must be positioned with one of
/// the seek methods before values can be read; subsequent seeks reposition it. A failed
/// seek or block load leaves the previous position intact.
#[derive(Debug)]
pub struct CFileIterator {
    reader: Arc<CFileReader>,
    posidx_iter: Option<IndexTreeIterator>,
    validx_iter: Option<IndexTreeIterator>,
    seeked: Option<Seeked>,
}

impl CFileIterator {
    pub(crate) fn new(reader: Arc<CFileReader>) -> CFileIterator {
        let posidx_iter = reader.has_posidx().then(|| {
            IndexTreeIterator::new(
                reader.clone(),
                reader.posidx_root(),
                get_type_info(DataType::Uint64),
            )
        });
        let validx_iter = reader.has_validx().then(|| {
            IndexTreeIterator::new(reader.clone(), reader.validx_root(), reader.type_info())
        });
        CFileIterator {
            reader,
            posidx_iter,
            validx_iter,
            seeked: None,
        }
    }

    pub fn reader(&self) -> &Arc<CFileReader> {
        &self.reader
    }

    /// Whether the iterator has been positioned by a successful seek.
    pub fn is_seeked(&self) -> bool {
        self.seeked.is_some()
    }

    /// Positions the iterator at the value with ordinal `ord`.
    ///
    /// Fails with `NotFound` if `ord` is past the last row and with `NotSupported` if the
    /// file has no positional index.
    pub fn seek_to_ordinal(&mut self, ord: u64) -> Result<()> {
        let rows = self.reader.count_rows();
        if ord >= rows {
            return Err(Error::not_found(format!(
                "ordinal {ord} is past the end of {rows} rows"
            )));
        }
        let Some(posidx) = &self.posidx_iter else {
            return Err(Error::not_supported(
                "seek by ordinal in a file without a positional index",
            ));
        };

        let mut cursor = posidx.clone();
        cursor.seek_at_or_before(&ord.to_le_bytes()).map_err(|e| {
            if e.is_not_found() {
                Error::invalid_format(
                    "positional index",
                    format!("no block starts at or before ordinal {ord}"),
                )
            } else {
                e
            }
        })?;

        let fresh = self.load_unless_current(&cursor)?;
        let decoder = self.decoder_for(&fresh);
        let first = decoder.first_ordinal();
        let end = first + decoder.count() as u64;
        if ord < first || ord >= end {
            return Err(Error::invalid_format(
                "positional index",
                format!(
                    "block {} with ordinals {first}..{end} does not cover ordinal {ord}",
                    cursor.current_block_pointer(),
                ),
            ));
        }
        let pos = (ord - first) as usize;
        self.commit(ActiveCursor::Positional(cursor), fresh, pos);
        Ok(())
    }

    /// Positions the iterator at the first value that is `>= key`, in ordinal order.
    ///
    /// Among equal values the first occurrence is selected. Returns whether the value
    /// found equals `key`. Fails with `NotSupported` if the file has no value index, with
    /// `InvalidArgument` if `key` is not of the column type and with `NotFound` if every
    /// value is smaller than `key`.
    pub fn seek_at_or_after(&mut self, key: &Datum) -> Result<bool> {
        let Some(validx) = &self.validx_iter else {
            return Err(Error::not_supported(
                "seek by value in a file without a value index",
            ));
        };
        verify_arg!(key, key.data_type() == self.reader.data_type());

        let key = key.encode();
        let mut cursor = validx.clone();
        cursor.seek_for_lower_bound(&key)?;
        loop {
            let fresh = self.load_unless_current(&cursor)?;
            let found = self.decoder_for(&fresh).find_at_or_after_value(&key);
            if let Some((pos, exact)) = found {
                self.commit(ActiveCursor::ByValue(cursor), fresh, pos);
                return Ok(exact);
            }
            if !cursor.has_next() {
                return Err(Error::not_found("key is past the last value of the file"));
            }
            cursor.next()?;
        }
    }

    /// Positions the iterator at the first value of the file.
    ///
    /// Uses the positional index when present, the value index otherwise. Fails with
    /// `NotFound` for an empty file.
    pub fn seek_to_first(&mut self) -> Result<()> {
        if self.reader.count_rows() == 0 {
            return Err(Error::not_found("file has no rows"));
        }
        let mut cursor = match (&self.posidx_iter, &self.validx_iter) {
            (Some(posidx), _) => ActiveCursor::Positional(posidx.clone()),
            (None, Some(validx)) => ActiveCursor::ByValue(validx.clone()),
            (None, None) => return Err(Error::not_supported("file has no index")),
        };
        cursor.get_mut().seek_to_first()?;
        let fresh = self.load_unless_current(cursor.get())?;
        self.commit(cursor, fresh, 0);
        Ok(())
    }

    /// Ordinal of the value the iterator is positioned at.
    ///
    /// Equals the row count once the iterator is exhausted.
    ///
    /// # Panics
    ///
    /// Panics if the iterator has not been seeked.
    pub fn current_ordinal(&self) -> u64 {
        let decoder = &self.seeked().block.decoder;
        decoder.first_ordinal() + decoder.current_index() as u64
    }

    /// Whether values remain past the current position. `false` before any seek.
    pub fn has_next(&self) -> bool {
        self.seeked.as_ref().is_some_and(|seeked| {
            seeked.block.decoder.has_next() || seeked.cursor.get().has_next()
        })
    }

    /// Copies up to `n` values into `dst`, advancing across data blocks as needed.
    ///
    /// Returns the number of values copied, which is smaller than `n` only when the end of
    /// the file is reached. `n` must not exceed the free capacity of `dst`. On error the
    /// values copied so far remain in `dst` and the iterator stays after the last of them.
    ///
    /// # Panics
    ///
    /// Panics if the iterator has not been seeked.
    pub fn copy_next_values(&mut self, n: usize, dst: &mut ColumnBlock) -> Result<usize> {
        assert!(self.is_seeked(), "CFileIterator is not seeked");
        verify_arg!(n, n <= dst.remaining());
        verify_arg!(dst, dst.data_type() == self.reader.data_type());

        let mut copied = 0;
        while copied < n {
            let seeked = self.seeked.as_mut().expect("seeked");
            let decoder = &mut seeked.block.decoder;
            if decoder.has_next() {
                copied += decoder.copy_next_values(n - copied, dst);
                continue;
            }
            if !seeked.cursor.get().has_next() {
                break;
            }
            let expected_ordinal = decoder.first_ordinal() + decoder.count() as u64;
            let mut cursor = seeked.cursor.clone();
            cursor.get_mut().next()?;
            let block = self.read_current_data_block(cursor.get())?;
            if block.decoder.first_ordinal() != expected_ordinal {
                return Err(Error::invalid_format(
                    "data block",
                    format!(
                        "block {} starts at ordinal {}, expected {expected_ordinal}",
                        block.pointer,
                        block.decoder.first_ordinal()
                    ),
                ));
            }
            self.commit(cursor, Some(block), 0);
        }
        Ok(copied)
    }
}

impl CFileIterator {
    /// Reads the data block under the leaf entry of `cursor` and builds its decoder.
    fn read_current_data_block(&self, cursor: &IndexTreeIterator) -> Result<LoadedBlock> {
        let pointer = cursor.current_block_pointer();
        let data = self.reader.read_block(pointer)?;
        let decoder = self.reader.create_block_decoder(data)?;
        trace!(
            "loaded data block {pointer}: {:?}, ordinals {}..{}",
            decoder.encoding(),
            decoder.first_ordinal(),
            decoder.first_ordinal() + decoder.count() as u64
        );
        Ok(LoadedBlock { pointer, decoder })
    }

    /// Loads the block under `cursor`, or returns `None` if it is the current block.
    fn load_unless_current(&self, cursor: &IndexTreeIterator) -> Result<Option<LoadedBlock>> {
        let pointer = cursor.current_block_pointer();
        let is_current = self
            .seeked
            .as_ref()
            .is_some_and(|seeked| seeked.block.pointer == pointer);
        if is_current {
            return Ok(None);
        }
        self.read_current_data_block(cursor).map(Some)
    }

    /// The decoder of `fresh` if a block was loaded, of the current block otherwise.
    fn decoder_for<'a>(&'a self, fresh: &'a Option<LoadedBlock>) -> &'a BlockDecoder {
        let block = match fresh {
            Some(block) => block,
            None => &self.seeked().block,
        };
        &block.decoder
    }

    /// Installs the new position. `fresh` replaces the current block when present.
    fn commit(&mut self, cursor: ActiveCursor, fresh: Option<LoadedBlock>, pos: usize) {
        let mut block = match fresh {
            Some(block) => {
                if let Some(previous) = &self.seeked {
                    trace!(
                        "replacing data block {} with {}",
                        previous.block.pointer, block.pointer
                    );
                }
                block
            }
            None => self.seeked.take().expect("seeked").block,
        };
        block.decoder.seek_to_position_in_block(pos);
        self.seeked = Some(Seeked { cursor, block });
    }

    fn seeked(&self) -> &Seeked {
        self.seeked.as_ref().expect("CFileIterator is not seeked")
    }
}
