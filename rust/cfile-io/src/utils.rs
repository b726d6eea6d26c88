use std::ops::Range;

use cfile_bytes::Bytes;

use crate::ReadAt;

#[macro_export]
macro_rules! verify {
    ($expr:expr) => {{
        let result = $expr;
        $crate::utils::verify(result, stringify!($expr))?;
    }};
}

pub fn verify(predicate: bool, condition: &str) -> std::io::Result<()> {
    if predicate {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            condition,
        ))
    }
}

/// Reads the whole `range` from `reader`, failing with `UnexpectedEof` on a short read.
pub fn read_exact_at<R>(reader: &R, range: Range<u64>) -> std::io::Result<Bytes>
where
    R: ReadAt + ?Sized,
{
    verify!(range.end >= range.start);
    let expected = range.end - range.start;
    let bytes = reader.read_at(range.clone())?;
    if bytes.len() as u64 != expected {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "short read at {}..{}: got {} of {expected} bytes",
                range.start,
                range.end,
                bytes.len()
            ),
        ));
    }
    Ok(bytes)
}
