#[path = "./cfile.rs"]
pub mod cfile;

pub mod footer_ext;

pub use cfile::{
    BTreeInfoPb, BlockPointerPb, CFileFooterPb, CFileHeaderPb, DataTypePb, EncodingTypePb,
    FileMetadataPairPb,
};

/// Marker written at the start of the file (before the header length) and at the very
/// end of the file (after the footer length).
pub const CFILE_MAGIC: [u8; 8] = *b"kcfile01";
pub const CFILE_VERSION_MAJOR: u32 = 1;
pub const CFILE_VERSION_MINOR: u32 = 0;

/// Size of the serialized protobuf message length field.
pub const MESSAGE_LEN_SIZE: usize = 4;

/// Size of the magic marker plus the message length that accompanies it:
/// `[magic][header_len]` at the head, `[footer_len][magic]` at the tail.
pub const MAGIC_AND_LENGTH_SIZE: usize = CFILE_MAGIC.len() + MESSAGE_LEN_SIZE;

/// Minimum possible size of a CFile: both markers with empty header and footer.
pub const CFILE_MIN_SIZE: usize = MAGIC_AND_LENGTH_SIZE * 2;

/// Size of the block checksum suffix.
pub const CHECKSUM_SIZE: usize = 4;

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn test_footer_proto_serialization() {
        let footer = CFileFooterPb {
            data_type: DataTypePb::Int32 as i32,
            num_values: 1000,
            posidx_info: Some(BTreeInfoPb {
                root_block: Some(BlockPointerPb {
                    offset: 4096,
                    size: 128,
                }),
            }),
            validx_info: None,
            checksummed_blocks: true,
            metadata: vec![FileMetadataPairPb {
                key: "writer".into(),
                value: b"testkit".to_vec(),
            }],
        };

        let buf = footer.encode_to_vec();
        let decoded = CFileFooterPb::decode(buf.as_slice()).unwrap();
        assert_eq!(decoded, footer);
        assert_eq!(DataTypePb::try_from(decoded.data_type), Ok(DataTypePb::Int32));
        assert!(decoded.validx_info.is_none());
    }

    #[test]
    fn test_unknown_enum_value_is_preserved() {
        let footer = CFileFooterPb {
            data_type: 77,
            ..Default::default()
        };
        let decoded = CFileFooterPb::decode(footer.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.data_type, 77);
        assert!(DataTypePb::try_from(decoded.data_type).is_err());
    }

    #[test]
    fn test_garbage_footer_fails_to_decode() {
        assert!(CFileFooterPb::decode(&[0xff, 0xff, 0xff][..]).is_err());
    }
}
