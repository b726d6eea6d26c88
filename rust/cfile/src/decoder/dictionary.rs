//! Dictionary encoding of variable-length values.
//!
//! ```text
//! [dict_count: u32] { [len: u32][bytes] } * dict_count [code: u32] * count
//! ```

use std::ops::Range;

use cfile_common::{Result, error::Error, verify_data};

use super::read_u32;

#[derive(Debug)]
pub(super) struct DictionaryCells {
    /// Location of each dictionary entry within the block.
    entries: Vec<Range<usize>>,
    codes: Vec<u32>,
}

impl DictionaryCells {
    pub fn parse(payload: &[u8], payload_start: usize, count: usize) -> Result<DictionaryCells> {
        let dict_count = read_u32(payload, 0, "dictionary size")? as usize;
        let mut entries = Vec::with_capacity(dict_count.min(payload.len() / 4));
        let mut pos = 4usize;
        for _ in 0..dict_count {
            let len = read_u32(payload, pos, "dictionary entry length")? as usize;
            let start = pos + 4;
            let Some(end) = start.checked_add(len).filter(|&end| end <= payload.len()) else {
                return Err(Error::invalid_format(
                    "dictionary entry",
                    format!("entry at {pos} exceeds the payload"),
                ));
            };
            entries.push(payload_start + start..payload_start + end);
            pos = end;
        }

        verify_data!(
            dictionary_codes_size,
            count.checked_mul(4).and_then(|size| size.checked_add(pos)) == Some(payload.len())
        );
        let codes = (0..count)
            .map(|i| read_u32(payload, pos + i * 4, "dictionary codes"))
            .collect::<Result<Vec<_>>>()?;
        if let Some(code) = codes.iter().find(|&&code| code as usize >= dict_count) {
            return Err(Error::invalid_format(
                "dictionary codes",
                format!("code {code} out of range of {dict_count} entries"),
            ));
        }

        Ok(DictionaryCells { entries, codes })
    }

    pub fn cell<'a>(&self, block: &'a [u8], idx: usize) -> &'a [u8] {
        let entry = &self.entries[self.codes[idx] as usize];
        &block[entry.clone()]
    }
}
