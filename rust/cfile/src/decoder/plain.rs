//! Plain encoding.
//!
//! Fixed-width values are stored back to back, `count * size` bytes. Variable-length
//! values are preceded by `count + 1` little-endian `u32` offsets into the value data
//! that follows them.

use cfile_common::{Result, error::Error, verify_data};

use super::read_u32;
use crate::types::TypeInfo;

#[derive(Debug)]
pub(super) enum PlainCells {
    Fixed {
        start: usize,
        width: usize,
    },
    Variable {
        data_start: usize,
        offsets: Vec<u32>,
    },
}

impl PlainCells {
    /// `payload` starts at `payload_start` within the block.
    pub fn parse(
        payload: &[u8],
        payload_start: usize,
        count: usize,
        type_info: &TypeInfo,
    ) -> Result<PlainCells> {
        if !type_info.is_variable_length() {
            let width = type_info.size();
            verify_data!(plain_payload_size, Some(payload.len()) == count.checked_mul(width));
            return Ok(PlainCells::Fixed {
                start: payload_start,
                width,
            });
        }

        let Some(offsets_size) = count
            .checked_add(1)
            .and_then(|n| n.checked_mul(4))
            .filter(|&size| size <= payload.len())
        else {
            return Err(Error::invalid_format(
                "plain offsets",
                format!("{count} values do not fit into {} bytes", payload.len()),
            ));
        };

        let offsets = (0..=count)
            .map(|i| read_u32(payload, i * 4, "plain offsets"))
            .collect::<Result<Vec<_>>>()?;
        let data_len = payload.len() - offsets_size;
        verify_data!(plain_first_offset, offsets[0] == 0);
        verify_data!(
            plain_offsets_monotonic,
            offsets.windows(2).all(|w| w[0] <= w[1])
        );
        verify_data!(plain_data_size, offsets[count] as usize == data_len);

        Ok(PlainCells::Variable {
            data_start: payload_start + offsets_size,
            offsets,
        })
    }

    pub fn cell<'a>(&self, block: &'a [u8], idx: usize) -> &'a [u8] {
        match self {
            PlainCells::Fixed { start, width } => {
                let pos = start + idx * width;
                &block[pos..pos + width]
            }
            PlainCells::Variable {
                data_start,
                offsets,
            } => {
                let begin = data_start + offsets[idx] as usize;
                let end = data_start + offsets[idx + 1] as usize;
                &block[begin..end]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataType, get_type_info};

    fn variable_payload(values: &[&[u8]]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut offset = 0u32;
        buf.extend_from_slice(&offset.to_le_bytes());
        for v in values {
            offset += v.len() as u32;
            buf.extend_from_slice(&offset.to_le_bytes());
        }
        for v in values {
            buf.extend_from_slice(v);
        }
        buf
    }

    #[test]
    fn test_fixed_width() {
        let info = get_type_info(DataType::Uint16);
        let payload = [1u8, 0, 2, 0, 3, 0];
        let cells = PlainCells::parse(&payload, 0, 3, info).unwrap();
        assert_eq!(cells.cell(&payload, 2), &[3, 0]);
        assert!(PlainCells::parse(&payload[..5], 0, 3, info).unwrap_err().is_corruption());
    }

    #[test]
    fn test_variable_length() {
        let info = get_type_info(DataType::Binary);
        let payload = variable_payload(&[&b"ab"[..], &b""[..], &b"cde"[..]]);
        let mut block = vec![0xEEu8; 3];
        block.extend_from_slice(&payload);
        let cells = PlainCells::parse(&payload, 3, 3, info).unwrap();
        assert_eq!(cells.cell(&block, 0), b"ab");
        assert_eq!(cells.cell(&block, 1), b"");
        assert_eq!(cells.cell(&block, 2), b"cde");
    }

    #[test]
    fn test_variable_length_corruption() {
        let info = get_type_info(DataType::String);
        let payload = variable_payload(&[&b"ab"[..], &b"cd"[..]]);

        // Truncated offsets table.
        assert!(PlainCells::parse(&payload[..8], 0, 2, info).unwrap_err().is_corruption());
        // Data shorter than the last offset.
        let short = &payload[..payload.len() - 1];
        assert!(PlainCells::parse(short, 0, 2, info).unwrap_err().is_corruption());
        // Decreasing offsets.
        let mut bad = payload.clone();
        bad[4..8].copy_from_slice(&3u32.to_le_bytes());
        bad[8..12].copy_from_slice(&1u32.to_le_bytes());
        bad.truncate(bad.len() - 3);
        assert!(PlainCells::parse(&bad, 0, 2, info).unwrap_err().is_corruption());
    }
}
