/// Options controlling how a [`CFileReader`](crate::CFileReader) reads its file.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Verify the checksum of every data and index block when the file carries them.
    ///
    /// Files written without block checksums are read unverified regardless of this flag.
    pub verify_checksums: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            verify_checksums: true,
        }
    }
}
