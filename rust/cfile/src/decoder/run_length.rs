//! Run-length encoding of fixed-width values.
//!
//! ```text
//! [run_count: u32] { [run_len: u32][cell: size bytes] } * run_count
//! ```
//!
//! Run lengths are positive and sum up to the block's value count.

use cfile_common::{Result, error::Error, verify_data};

use super::read_u32;
use crate::types::TypeInfo;

#[derive(Debug)]
pub(super) struct RunLengthCells {
    runs_start: usize,
    width: usize,
    /// Exclusive end position of each run within the block.
    run_ends: Vec<u32>,
}

impl RunLengthCells {
    pub fn parse(
        payload: &[u8],
        payload_start: usize,
        count: usize,
        type_info: &TypeInfo,
    ) -> Result<RunLengthCells> {
        let width = type_info.size();
        let run_count = read_u32(payload, 0, "run count")? as usize;
        let stride = 4 + width;
        verify_data!(
            run_length_payload_size,
            run_count
                .checked_mul(stride)
                .and_then(|size| size.checked_add(4))
                == Some(payload.len())
        );

        let mut run_ends = Vec::with_capacity(run_count);
        let mut end = 0usize;
        for run in 0..run_count {
            let run_len = read_u32(payload, 4 + run * stride, "run length")?;
            verify_data!(run_length_positive, run_len > 0);
            end += run_len as usize;
            if end > count {
                return Err(Error::invalid_format(
                    "run lengths",
                    format!("runs exceed the block value count {count}"),
                ));
            }
            run_ends.push(end as u32);
        }
        verify_data!(run_length_total, end == count);

        Ok(RunLengthCells {
            runs_start: payload_start + 4,
            width,
            run_ends,
        })
    }

    pub fn cell<'a>(&self, block: &'a [u8], idx: usize) -> &'a [u8] {
        let run = self.run_ends.partition_point(|&end| end as usize <= idx);
        let pos = self.runs_start + run * (4 + self.width) + 4;
        &block[pos..pos + self.width]
    }
}
