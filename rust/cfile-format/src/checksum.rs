use cfile_common::{error::ErrorKind, verify_data};

use crate::defs::CHECKSUM_SIZE;

/// Block checksum: xxh3-64 folded to 32 bits.
pub fn compute(buf: &[u8]) -> u32 {
    let h = xxhash_rust::xxh3::xxh3_64(buf);
    (h as u32) ^ ((h >> 32) as u32)
}

/// Fails with `ChecksumMismatch` unless `payload` hashes to `expected`.
pub fn verify(payload: &[u8], expected: u32, element: &str) -> cfile_common::Result<()> {
    if compute(payload) != expected {
        return Err(ErrorKind::ChecksumMismatch {
            element: element.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Splits a checksummed block into its payload and the trailing checksum.
///
/// The layout is `[payload][checksum: u32 LE]`.
pub fn split_checksum(block: &[u8]) -> cfile_common::Result<(&[u8], u32)> {
    verify_data!(block, block.len() >= CHECKSUM_SIZE);
    let (payload, checksum) = block.split_at(block.len() - CHECKSUM_SIZE);
    let checksum = u32::from_le_bytes(checksum.try_into().expect("checksum bytes"));
    Ok((payload, checksum))
}

/// Appends the checksum of `payload` to `target`, producing a checksummed block.
pub fn append_checksum(payload: &[u8], target: &mut Vec<u8>) {
    target.extend_from_slice(&compute(payload).to_le_bytes());
}
