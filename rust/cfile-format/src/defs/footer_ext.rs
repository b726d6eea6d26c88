use cfile_common::{Result, error::Error};

use super::{BTreeInfoPb, BlockPointerPb, CFileFooterPb, CFileHeaderPb, FileMetadataPairPb};

impl BTreeInfoPb {
    /// Returns the root block of the index tree.
    ///
    /// An index descriptor without a root is malformed: presence of the descriptor is the
    /// sole signal that the index exists.
    pub fn root(&self, element: &str) -> Result<BlockPointerPb> {
        self.root_block
            .ok_or_else(|| Error::invalid_format(element, "index info without a root block"))
    }
}

impl CFileFooterPb {
    /// Looks up a metadata value by key.
    pub fn find_metadata(&self, key: &str) -> Option<&[u8]> {
        find_pair(&self.metadata, key)
    }
}

impl CFileHeaderPb {
    /// Looks up a metadata value by key.
    pub fn find_metadata(&self, key: &str) -> Option<&[u8]> {
        find_pair(&self.metadata, key)
    }
}

fn find_pair<'a>(pairs: &'a [FileMetadataPairPb], key: &str) -> Option<&'a [u8]> {
    pairs
        .iter()
        .find(|pair| pair.key == key)
        .map(|pair| pair.value.as_slice())
}
