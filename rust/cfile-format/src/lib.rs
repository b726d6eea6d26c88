//! On-disk definitions of the CFile format: protobuf metadata records, fixed
//! file markers, block headers and checksums.

pub mod block_header;
pub mod checksum;
pub mod defs;
