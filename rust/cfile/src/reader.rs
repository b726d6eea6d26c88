//! Opening a CFile: structure validation, metadata and block access.

use std::{ops::Range, sync::Arc};

use cfile_bytes::Bytes;
use cfile_common::{
    Result,
    error::{Error, ErrorKind},
    verify_data,
};
use cfile_format::{
    checksum,
    defs::{
        CFILE_MAGIC, CFILE_MIN_SIZE, CFILE_VERSION_MAJOR, CFileFooterPb, CFileHeaderPb,
        MAGIC_AND_LENGTH_SIZE,
    },
};
use cfile_io::{ReadAt, read_exact_at};
use log::{debug, trace};

use crate::{
    block::{BlockData, BlockPointer},
    decoder::BlockDecoder,
    iterator::CFileIterator,
    options::ReaderOptions,
    types::{DataType, TypeInfo, get_type_info},
};

/// Metadata resolved by a successful [`CFileReader::init`].
struct Metadata {
    header: CFileHeaderPb,
    footer: CFileFooterPb,
    type_info: &'static TypeInfo,
    posidx_root: Option<BlockPointer>,
    validx_root: Option<BlockPointer>,
}

enum ReaderState {
    Uninitialized,
    Initialized(Box<Metadata>),
    Failed,
}

/// Reader of a single CFile.
///
/// A reader is created uninitialized; [`init`](Self::init) validates the file structure
/// and parses its header and footer. Once initialized, the reader is immutable and is
/// shared between any number of [`CFileIterator`]s, possibly on different threads.
///
/// Metadata accessors are only meaningful after a successful `init()` and panic
/// otherwise.
pub struct CFileReader {
    options: ReaderOptions,
    file: Arc<dyn ReadAt>,
    file_size: u64,
    state: ReaderState,
}

impl CFileReader {
    /// Creates an uninitialized reader over the first `file_size` bytes of `file`.
    pub fn new(options: ReaderOptions, file: Arc<dyn ReadAt>, file_size: u64) -> CFileReader {
        CFileReader {
            options,
            file,
            file_size,
            state: ReaderState::Uninitialized,
        }
    }

    /// Creates a reader over the whole of `file` and initializes it.
    pub fn open(options: ReaderOptions, file: Arc<dyn ReadAt>) -> Result<Arc<CFileReader>> {
        let file_size = file
            .size()
            .map_err(|e| Error::io("cfile size", e))?;
        let mut reader = CFileReader::new(options, file, file_size);
        reader.init()?;
        Ok(Arc::new(reader))
    }

    /// Validates the file and loads its header and footer.
    ///
    /// On failure the reader becomes permanently unusable. Calling `init()` again, after
    /// either outcome, fails with `InvalidOperation`.
    pub fn init(&mut self) -> Result<()> {
        if !matches!(self.state, ReaderState::Uninitialized) {
            return Err(Error::invalid_operation("CFileReader::init called twice"));
        }
        match self.load_metadata() {
            Ok(metadata) => {
                debug!(
                    "opened cfile: {} bytes, type {}, {} rows, posidx: {}, validx: {}",
                    self.file_size,
                    metadata.type_info.name(),
                    metadata.footer.num_values,
                    metadata.posidx_root.is_some(),
                    metadata.validx_root.is_some(),
                );
                self.state = ReaderState::Initialized(Box::new(metadata));
                Ok(())
            }
            Err(e) => {
                debug!("failed to open cfile of {} bytes: {e}", self.file_size);
                self.state = ReaderState::Failed;
                Err(e)
            }
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, ReaderState::Initialized(_))
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn data_type(&self) -> DataType {
        self.metadata_ref().type_info.data_type()
    }

    pub fn type_info(&self) -> &'static TypeInfo {
        self.metadata_ref().type_info
    }

    /// Number of values stored in the file.
    pub fn count_rows(&self) -> u64 {
        self.metadata_ref().footer.num_values
    }

    pub fn has_posidx(&self) -> bool {
        self.metadata_ref().posidx_root.is_some()
    }

    /// Root block of the positional index.
    ///
    /// # Panics
    ///
    /// Panics if the file has no positional index.
    pub fn posidx_root(&self) -> BlockPointer {
        self.metadata_ref()
            .posidx_root
            .expect("file has no positional index")
    }

    pub fn has_validx(&self) -> bool {
        self.metadata_ref().validx_root.is_some()
    }

    /// Root block of the value index.
    ///
    /// # Panics
    ///
    /// Panics if the file has no value index.
    pub fn validx_root(&self) -> BlockPointer {
        self.metadata_ref()
            .validx_root
            .expect("file has no value index")
    }

    pub fn header(&self) -> &CFileHeaderPb {
        &self.metadata_ref().header
    }

    pub fn footer(&self) -> &CFileFooterPb {
        &self.metadata_ref().footer
    }

    /// Looks up a user metadata entry, preferring the footer over the header.
    pub fn metadata(&self, key: &str) -> Option<&[u8]> {
        let metadata = self.metadata_ref();
        metadata
            .footer
            .find_metadata(key)
            .or_else(|| metadata.header.find_metadata(key))
    }

    /// Creates an unpositioned iterator over the file.
    pub fn new_iterator(self: &Arc<Self>) -> Result<CFileIterator> {
        if !self.is_initialized() {
            return Err(Error::invalid_operation(
                "CFileReader::new_iterator on an uninitialized reader",
            ));
        }
        Ok(CFileIterator::new(self.clone()))
    }

    /// Reads the block at `pointer`.
    ///
    /// When the file carries block checksums, the checksum is verified (unless disabled
    /// in the options) and stripped from the returned data.
    pub fn read_block(&self, pointer: BlockPointer) -> Result<BlockData> {
        let metadata = self.metadata_ref();
        self.verify_block_pointer(pointer)?;
        trace!("reading block {pointer}");
        let bytes = self.read_range(pointer.range(), "block")?;
        if !metadata.footer.checksummed_blocks {
            return Ok(BlockData::new(bytes));
        }
        let (payload, expected) = checksum::split_checksum(&bytes)?;
        if self.options.verify_checksums {
            checksum::verify(payload, expected, &format!("block {pointer}"))?;
        }
        let len = payload.len();
        Ok(BlockData::new(bytes.slice(..len)))
    }

    /// Creates a decoder over a data block of this file.
    ///
    /// Fails with `NotSupported` when the block's encoding does not apply to the column
    /// type.
    pub fn create_block_decoder(&self, data: BlockData) -> Result<BlockDecoder> {
        BlockDecoder::new(data, self.type_info())
    }
}

impl CFileReader {
    fn metadata_ref(&self) -> &Metadata {
        match &self.state {
            ReaderState::Initialized(metadata) => metadata,
            ReaderState::Uninitialized => panic!("CFileReader is not initialized"),
            ReaderState::Failed => panic!("CFileReader failed to initialize"),
        }
    }

    fn load_metadata(&self) -> Result<Metadata> {
        verify_data!(cfile_size, self.file_size >= CFILE_MIN_SIZE as u64);
        let marker_size = MAGIC_AND_LENGTH_SIZE as u64;

        let tail_start = self.file_size - marker_size;
        let tail = self.read_range(tail_start..self.file_size, "footer marker")?;
        verify_data!(footer_magic, tail[4..] == CFILE_MAGIC);
        let footer_len = read_u32_le(&tail[..4]) as u64;
        let Some(footer_start) = tail_start
            .checked_sub(footer_len)
            .filter(|&start| start >= marker_size)
        else {
            return Err(Error::invalid_format(
                "footer length",
                format!("{footer_len} bytes in a file of {} bytes", self.file_size),
            ));
        };

        let head = self.read_range(0..marker_size, "header marker")?;
        verify_data!(header_magic, head[..8] == CFILE_MAGIC);
        let header_len = read_u32_le(&head[8..]) as u64;
        verify_data!(header_length, marker_size + header_len <= footer_start);

        let footer: CFileFooterPb =
            self.read_message(footer_start..tail_start, "footer")?;
        let header: CFileHeaderPb =
            self.read_message(marker_size..marker_size + header_len, "header")?;
        if header.major_version != CFILE_VERSION_MAJOR {
            return Err(Error::invalid_format(
                "header version",
                format!(
                    "cfile major version {} (supported {CFILE_VERSION_MAJOR})",
                    header.major_version
                ),
            ));
        }

        let type_info = get_type_info(DataType::from_pb(footer.data_type)?);
        let posidx_root = footer
            .posidx_info
            .as_ref()
            .map(|info| info.root("positional index"))
            .transpose()?
            .map(BlockPointer::from);
        let validx_root = footer
            .validx_info
            .as_ref()
            .map(|info| info.root("value index"))
            .transpose()?
            .map(BlockPointer::from);
        for root in posidx_root.iter().chain(validx_root.iter()) {
            self.verify_block_pointer(*root)?;
        }

        Ok(Metadata {
            header,
            footer,
            type_info,
            posidx_root,
            validx_root,
        })
    }

    fn verify_block_pointer(&self, pointer: BlockPointer) -> Result<()> {
        if pointer.size() == 0 || pointer.end().is_none_or(|end| end > self.file_size) {
            return Err(Error::invalid_format(
                "block pointer",
                format!("{pointer} outside of a file of {} bytes", self.file_size),
            ));
        }
        Ok(())
    }

    fn read_range(&self, range: Range<u64>, element: &str) -> Result<Bytes> {
        read_exact_at(self.file.as_ref(), range.clone())
            .map_err(|e| Error::io(format!("{element} at {}..{}", range.start, range.end), e))
    }

    fn read_message<M>(&self, range: Range<u64>, element: &str) -> Result<M>
    where
        M: prost::Message + Default,
    {
        let bytes = self.read_range(range, element)?;
        M::decode(bytes.as_ref()).map_err(|source| {
            ErrorKind::InvalidProtobuf {
                element: element.to_string(),
                source,
            }
            .into()
        })
    }
}

impl std::fmt::Debug for CFileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            ReaderState::Uninitialized => "uninitialized",
            ReaderState::Initialized(_) => "initialized",
            ReaderState::Failed => "failed",
        };
        f.debug_struct("CFileReader")
            .field("file_size", &self.file_size)
            .field("state", &state)
            .finish()
    }
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(bytes.try_into().expect("u32 bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(len: u32) -> Vec<u8> {
        let mut buf = CFILE_MAGIC.to_vec();
        buf.extend_from_slice(&len.to_le_bytes());
        buf
    }

    #[test]
    fn test_too_small_file() {
        let file: Arc<dyn ReadAt> = Arc::new(marker(0));
        let mut reader = CFileReader::new(ReaderOptions::default(), file, 12);
        assert!(reader.init().unwrap_err().is_corruption());
        assert!(!reader.is_initialized());
        assert!(matches!(
            reader.init().unwrap_err().kind(),
            ErrorKind::InvalidOperation { .. }
        ));
    }

    #[test]
    fn test_footer_length_out_of_bounds() {
        let mut file = marker(0);
        file.extend_from_slice(&1000u32.to_le_bytes());
        file.extend_from_slice(&CFILE_MAGIC);
        let size = file.len() as u64;
        let mut reader = CFileReader::new(ReaderOptions::default(), Arc::new(file), size);
        let err = reader.init().unwrap_err();
        assert!(err.is_corruption(), "{err}");
    }

    #[test]
    fn test_declared_size_beyond_file_is_io_error() {
        let file: Arc<dyn ReadAt> = Arc::new(vec![0u8; 30]);
        let mut reader = CFileReader::new(ReaderOptions::default(), file, 100);
        assert!(reader.init().unwrap_err().is_io());
    }

    #[test]
    #[should_panic(expected = "not initialized")]
    fn test_accessor_before_init_panics() {
        let reader = CFileReader::new(ReaderOptions::default(), Arc::new(Vec::<u8>::new()), 0);
        reader.count_rows();
    }
}
