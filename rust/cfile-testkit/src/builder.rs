//! In-memory CFile layout for tests.

use cfile_format::{
    block_header::{DataBlockHeader, IndexBlockHeader},
    checksum,
    defs::{
        BTreeInfoPb, BlockPointerPb, CFILE_MAGIC, CFILE_VERSION_MAJOR, CFILE_VERSION_MINOR,
        CFileFooterPb, CFileHeaderPb, DataTypePb, EncodingTypePb, FileMetadataPairPb,
    },
};
use prost::Message;

/// Location and ordinal range of a data block written by [`CFileBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    pub pointer: BlockPointerPb,
    pub first_ordinal: u64,
    pub count: u32,
}

/// Where [`CFileBuilder`] placed the parts of a file.
#[derive(Debug, Clone, Default)]
pub struct FileLayout {
    pub data_blocks: Vec<BlockLayout>,
    pub posidx_root: Option<BlockPointerPb>,
    pub validx_root: Option<BlockPointerPb>,
    /// Number of index block levels, identical for both indexes.
    pub index_levels: usize,
    /// Start of the serialized footer.
    pub footer_offset: u64,
}

/// Builds a complete CFile image from a list of cells.
///
/// Cells are the canonical encoding of values: little-endian for fixed-width types,
/// raw bytes for strings and binaries. Any encoding can be requested for any type,
/// including combinations a reader does not support.
#[derive(Debug, Clone)]
pub struct CFileBuilder {
    data_type: DataTypePb,
    encoding: EncodingTypePb,
    rows_per_block: usize,
    index_fanout: usize,
    positional_index: bool,
    value_index: bool,
    checksums: bool,
    major_version: u32,
    header_metadata: Vec<FileMetadataPairPb>,
    footer_metadata: Vec<FileMetadataPairPb>,
    cells: Vec<Vec<u8>>,
}

impl CFileBuilder {
    pub fn new(data_type: DataTypePb) -> CFileBuilder {
        CFileBuilder {
            data_type,
            encoding: EncodingTypePb::Plain,
            rows_per_block: 64,
            index_fanout: 16,
            positional_index: true,
            value_index: false,
            checksums: false,
            major_version: CFILE_VERSION_MAJOR,
            header_metadata: Vec::new(),
            footer_metadata: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn with_encoding(mut self, encoding: EncodingTypePb) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn rows_per_block(mut self, rows: usize) -> Self {
        assert!(rows > 0);
        self.rows_per_block = rows;
        self
    }

    /// Maximum number of entries in an index block.
    pub fn index_fanout(mut self, fanout: usize) -> Self {
        assert!(fanout >= 2);
        self.index_fanout = fanout;
        self
    }

    pub fn positional_index(mut self, enabled: bool) -> Self {
        self.positional_index = enabled;
        self
    }

    /// Enables the value index. The cells must be sorted for it to be meaningful.
    pub fn value_index(mut self, enabled: bool) -> Self {
        self.value_index = enabled;
        self
    }

    pub fn checksums(mut self, enabled: bool) -> Self {
        self.checksums = enabled;
        self
    }

    pub fn major_version(mut self, version: u32) -> Self {
        self.major_version = version;
        self
    }

    pub fn header_metadata(mut self, key: &str, value: &[u8]) -> Self {
        self.header_metadata.push(FileMetadataPairPb {
            key: key.to_string(),
            value: value.to_vec(),
        });
        self
    }

    pub fn footer_metadata(mut self, key: &str, value: &[u8]) -> Self {
        self.footer_metadata.push(FileMetadataPairPb {
            key: key.to_string(),
            value: value.to_vec(),
        });
        self
    }

    pub fn push_cell(&mut self, cell: &[u8]) -> &mut Self {
        if let Some(width) = cell_width(self.data_type) {
            assert_eq!(cell.len(), width, "cell width of {:?}", self.data_type);
        }
        self.cells.push(cell.to_vec());
        self
    }

    pub fn extend_cells<I>(mut self, cells: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        for cell in cells {
            self.push_cell(cell.as_ref());
        }
        self
    }

    pub fn extend_i32(self, values: impl IntoIterator<Item = i32>) -> Self {
        self.extend_cells(values.into_iter().map(i32::to_le_bytes))
    }

    pub fn extend_i64(self, values: impl IntoIterator<Item = i64>) -> Self {
        self.extend_cells(values.into_iter().map(i64::to_le_bytes))
    }

    pub fn extend_u32(self, values: impl IntoIterator<Item = u32>) -> Self {
        self.extend_cells(values.into_iter().map(u32::to_le_bytes))
    }

    pub fn extend_u64(self, values: impl IntoIterator<Item = u64>) -> Self {
        self.extend_cells(values.into_iter().map(u64::to_le_bytes))
    }

    pub fn extend_f64(self, values: impl IntoIterator<Item = f64>) -> Self {
        self.extend_cells(values.into_iter().map(f64::to_le_bytes))
    }

    pub fn extend_str<'a>(self, values: impl IntoIterator<Item = &'a str>) -> Self {
        self.extend_cells(values.into_iter().map(str::as_bytes))
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_with_layout().0
    }

    pub fn build_with_layout(&self) -> (Vec<u8>, FileLayout) {
        let mut layout = FileLayout::default();
        let mut buf = Vec::new();

        let header = CFileHeaderPb {
            major_version: self.major_version,
            minor_version: CFILE_VERSION_MINOR,
            metadata: self.header_metadata.clone(),
        };
        let header = header.encode_to_vec();
        buf.extend_from_slice(&CFILE_MAGIC);
        buf.extend_from_slice(&(header.len() as u32).to_le_bytes());
        buf.extend_from_slice(&header);

        for (i, chunk) in self.cells.chunks(self.rows_per_block).enumerate() {
            let first_ordinal = (i * self.rows_per_block) as u64;
            let mut block = Vec::new();
            DataBlockHeader {
                encoding: self.encoding as u8,
                first_ordinal,
                count: chunk.len() as u32,
            }
            .encode(&mut block);
            self.encode_payload(chunk, &mut block);
            let pointer = self.write_block(&mut buf, block);
            layout.data_blocks.push(BlockLayout {
                pointer,
                first_ordinal,
                count: chunk.len() as u32,
            });
        }

        if self.positional_index && !layout.data_blocks.is_empty() {
            let entries = layout
                .data_blocks
                .iter()
                .map(|block| (block.first_ordinal.to_le_bytes().to_vec(), block.pointer))
                .collect();
            let (root, levels) = self.write_index(&mut buf, entries);
            layout.posidx_root = Some(root);
            layout.index_levels = levels;
        }
        if self.value_index && !layout.data_blocks.is_empty() {
            let entries = layout
                .data_blocks
                .iter()
                .map(|block| {
                    (
                        self.cells[block.first_ordinal as usize].clone(),
                        block.pointer,
                    )
                })
                .collect();
            let (root, levels) = self.write_index(&mut buf, entries);
            layout.validx_root = Some(root);
            layout.index_levels = levels;
        }

        let footer = CFileFooterPb {
            data_type: self.data_type as i32,
            num_values: self.cells.len() as u64,
            posidx_info: layout.posidx_root.map(|root| BTreeInfoPb {
                root_block: Some(root),
            }),
            validx_info: layout.validx_root.map(|root| BTreeInfoPb {
                root_block: Some(root),
            }),
            checksummed_blocks: self.checksums,
            metadata: self.footer_metadata.clone(),
        };
        let footer = footer.encode_to_vec();
        layout.footer_offset = buf.len() as u64;
        buf.extend_from_slice(&footer);
        buf.extend_from_slice(&(footer.len() as u32).to_le_bytes());
        buf.extend_from_slice(&CFILE_MAGIC);

        (buf, layout)
    }

    fn encode_payload(&self, cells: &[Vec<u8>], target: &mut Vec<u8>) {
        let variable_length = cell_width(self.data_type).is_none();
        match self.encoding {
            EncodingTypePb::RunLength => {
                let mut runs: Vec<(u32, &[u8])> = Vec::new();
                for cell in cells {
                    match runs.last_mut() {
                        Some((len, value)) if *value == cell.as_slice() => *len += 1,
                        _ => runs.push((1, cell.as_slice())),
                    }
                }
                target.extend_from_slice(&(runs.len() as u32).to_le_bytes());
                for (len, value) in runs {
                    target.extend_from_slice(&len.to_le_bytes());
                    target.extend_from_slice(value);
                }
            }
            EncodingTypePb::Dictionary => {
                let mut entries: Vec<&[u8]> = Vec::new();
                let mut codes = Vec::with_capacity(cells.len());
                for cell in cells {
                    let code = match entries.iter().position(|entry| *entry == cell.as_slice()) {
                        Some(code) => code,
                        None => {
                            entries.push(cell.as_slice());
                            entries.len() - 1
                        }
                    };
                    codes.push(code as u32);
                }
                target.extend_from_slice(&(entries.len() as u32).to_le_bytes());
                for entry in entries {
                    target.extend_from_slice(&(entry.len() as u32).to_le_bytes());
                    target.extend_from_slice(entry);
                }
                for code in codes {
                    target.extend_from_slice(&code.to_le_bytes());
                }
            }
            _ if variable_length => {
                let mut offset = 0u32;
                target.extend_from_slice(&offset.to_le_bytes());
                for cell in cells {
                    offset += cell.len() as u32;
                    target.extend_from_slice(&offset.to_le_bytes());
                }
                for cell in cells {
                    target.extend_from_slice(cell);
                }
            }
            _ => {
                for cell in cells {
                    target.extend_from_slice(cell);
                }
            }
        }
    }

    /// Writes the index over `entries` bottom-up, returning its root and level count.
    fn write_index(
        &self,
        buf: &mut Vec<u8>,
        mut entries: Vec<(Vec<u8>, BlockPointerPb)>,
    ) -> (BlockPointerPb, usize) {
        let mut is_leaf = true;
        let mut levels = 0;
        loop {
            levels += 1;
            let mut parents = Vec::new();
            for chunk in entries.chunks(self.index_fanout) {
                let mut block = Vec::new();
                IndexBlockHeader {
                    is_leaf,
                    entry_count: chunk.len() as u32,
                }
                .encode(&mut block);
                for (key, pointer) in chunk {
                    block.extend_from_slice(&(key.len() as u32).to_le_bytes());
                    block.extend_from_slice(key);
                    block.extend_from_slice(&pointer.offset.to_le_bytes());
                    block.extend_from_slice(&pointer.size.to_le_bytes());
                }
                let pointer = self.write_block(buf, block);
                parents.push((chunk[0].0.clone(), pointer));
            }
            if parents.len() == 1 {
                return (parents[0].1, levels);
            }
            entries = parents;
            is_leaf = false;
        }
    }

    fn write_block(&self, buf: &mut Vec<u8>, mut block: Vec<u8>) -> BlockPointerPb {
        if self.checksums {
            let payload = block.clone();
            checksum::append_checksum(&payload, &mut block);
        }
        let pointer = BlockPointerPb {
            offset: buf.len() as u64,
            size: block.len() as u32,
        };
        buf.extend_from_slice(&block);
        pointer
    }
}

/// Cell width of fixed-width types, `None` for variable-length ones.
pub fn cell_width(data_type: DataTypePb) -> Option<usize> {
    match data_type {
        DataTypePb::Uint8 | DataTypePb::Int8 | DataTypePb::Bool => Some(1),
        DataTypePb::Uint16 | DataTypePb::Int16 => Some(2),
        DataTypePb::Uint32 | DataTypePb::Int32 | DataTypePb::Float => Some(4),
        DataTypePb::Uint64 | DataTypePb::Int64 | DataTypePb::Double => Some(8),
        DataTypePb::String | DataTypePb::Binary | DataTypePb::UnknownType => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let (file, layout) = CFileBuilder::new(DataTypePb::Int32)
            .rows_per_block(4)
            .index_fanout(2)
            .value_index(true)
            .extend_i32(0..10)
            .build_with_layout();
        assert_eq!(&file[..8], &CFILE_MAGIC);
        assert_eq!(&file[file.len() - 8..], &CFILE_MAGIC);
        assert_eq!(layout.data_blocks.len(), 3);
        assert_eq!(layout.data_blocks[2].first_ordinal, 8);
        assert_eq!(layout.data_blocks[2].count, 2);
        // 3 leaf entries with fan-out 2: two leaves and a root.
        assert_eq!(layout.index_levels, 2);
        assert!(layout.posidx_root.is_some());
        assert!(layout.validx_root.is_some());

        let footer_len = u32::from_le_bytes(file[file.len() - 12..file.len() - 8].try_into().unwrap());
        let footer = CFileFooterPb::decode(
            &file[layout.footer_offset as usize..layout.footer_offset as usize + footer_len as usize],
        )
        .unwrap();
        assert_eq!(footer.num_values, 10);
        assert_eq!(footer.data_type, DataTypePb::Int32 as i32);
    }

    #[test]
    fn test_checksummed_blocks() {
        let (file, layout) = CFileBuilder::new(DataTypePb::String)
            .checksums(true)
            .extend_str(["a", "bb"])
            .build_with_layout();
        let pointer = layout.data_blocks[0].pointer;
        let block = &file[pointer.offset as usize..(pointer.offset + pointer.size as u64) as usize];
        let (payload, expected) = checksum::split_checksum(block).unwrap();
        checksum::verify(payload, expected, "block").unwrap();
    }

    #[test]
    fn test_empty_file_has_no_index() {
        let (_, layout) = CFileBuilder::new(DataTypePb::Int64)
            .value_index(true)
            .build_with_layout();
        assert!(layout.data_blocks.is_empty());
        assert!(layout.posidx_root.is_none());
        assert!(layout.validx_root.is_none());
    }
}
