//! `ReadAt` over a local file.

use std::{
    fmt,
    fs::File,
    ops::Range,
    path::{Path, PathBuf},
};

use cfile_bytes::{Bytes, BytesMut};

use crate::{ReadAt, verify};

/// A local file opened for positioned reads.
///
/// The size is captured when the file is opened; CFiles are immutable once written.
pub struct FileReader {
    file: File,
    path: PathBuf,
    size: u64,
}

impl FileReader {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<FileReader> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(FileReader {
            file,
            path: path.to_path_buf(),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadAt for FileReader {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.size)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.end >= range.start);
        let end = range.end.min(self.size);
        if range.start >= end {
            return Ok(Bytes::new());
        }
        let mut buf = BytesMut::zeroed((end - range.start) as usize);
        read_exact_at_pos(&self.file, range.start, &mut buf)?;
        Ok(buf.into())
    }
}

impl fmt::Debug for FileReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileReader")
            .field("path", &self.path)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(unix)]
fn read_exact_at_pos(file: &File, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;

    file.read_exact_at(buf, pos)
}

#[cfg(windows)]
fn read_exact_at_pos(file: &File, mut pos: u64, mut buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        let n = file.seek_read(buf, pos)?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf = &mut buf[n..];
        pos += n as u64;
    }
    Ok(())
}
