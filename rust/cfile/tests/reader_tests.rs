use std::sync::Arc;

use cfile::{BlockPointer, CFileReader, DataType, ReaderOptions};
use cfile_common::error::ErrorKind;
use cfile_format::defs::{CFILE_MAGIC, DataTypePb, EncodingTypePb};
use cfile_io::{ReadAt, file::FileReader};
use cfile_testkit::{
    CFileBuilder,
    io::{Failure, FailingReader},
};

fn open(file: Vec<u8>) -> Arc<CFileReader> {
    CFileReader::open(ReaderOptions::default(), Arc::new(file)).unwrap()
}

fn init_error(file: Vec<u8>) -> cfile_common::error::Error {
    let size = file.len() as u64;
    let mut reader = CFileReader::new(ReaderOptions::default(), Arc::new(file), size);
    reader.init().unwrap_err()
}

#[test]
fn test_open_reports_metadata() {
    let reader = open(
        CFileBuilder::new(DataTypePb::Int32)
            .rows_per_block(100)
            .header_metadata("writer", b"testkit")
            .header_metadata("codec", b"none")
            .footer_metadata("codec", b"plain")
            .extend_i32(0..1000)
            .build(),
    );
    assert!(reader.is_initialized());
    assert_eq!(reader.data_type(), DataType::Int32);
    assert_eq!(reader.type_info().size(), 4);
    assert_eq!(reader.count_rows(), 1000);
    assert!(reader.has_posidx());
    assert!(!reader.has_validx());
    assert_eq!(reader.header().major_version, 1);
    assert!(!reader.footer().checksummed_blocks);

    assert_eq!(reader.metadata("writer"), Some(&b"testkit"[..]));
    assert_eq!(reader.metadata("codec"), Some(&b"plain"[..]));
    assert_eq!(reader.metadata("missing"), None);
}

#[test]
fn test_empty_file() {
    let reader = open(CFileBuilder::new(DataTypePb::String).build());
    assert_eq!(reader.count_rows(), 0);
    assert!(!reader.has_posidx());

    let mut iter = reader.new_iterator().unwrap();
    assert!(iter.seek_to_ordinal(0).unwrap_err().is_not_found());
    assert!(iter.seek_to_first().unwrap_err().is_not_found());
    assert!(!iter.has_next());
}

#[test]
fn test_bad_trailing_magic() {
    let mut file = CFileBuilder::new(DataTypePb::Int64).extend_i64(0..5).build();
    let len = file.len();
    file[len - 1] ^= 0xff;
    assert!(init_error(file).is_corruption());
}

#[test]
fn test_bad_leading_magic() {
    let mut file = CFileBuilder::new(DataTypePb::Int64).extend_i64(0..5).build();
    file[0] = b'X';
    assert!(init_error(file).is_corruption());
}

#[test]
#[should_panic(expected = "CFileReader failed to initialize")]
fn test_accessor_after_failed_init_panics() {
    let mut file = CFileBuilder::new(DataTypePb::Int32).extend_i32(0..5).build();
    let len = file.len();
    file[len - 8..].copy_from_slice(b"notcfile");
    let mut reader = CFileReader::new(ReaderOptions::default(), Arc::new(file), len as u64);
    assert!(reader.init().unwrap_err().is_corruption());
    reader.count_rows();
}

#[test]
fn test_init_twice() {
    let file = CFileBuilder::new(DataTypePb::Int32).extend_i32(0..5).build();
    let size = file.len() as u64;
    let mut reader = CFileReader::new(ReaderOptions::default(), Arc::new(file), size);
    reader.init().unwrap();
    let err = reader.init().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
    assert!(reader.is_initialized());
}

#[test]
fn test_new_iterator_before_init() {
    let file = CFileBuilder::new(DataTypePb::Int32).extend_i32(0..5).build();
    let size = file.len() as u64;
    let reader = Arc::new(CFileReader::new(
        ReaderOptions::default(),
        Arc::new(file),
        size,
    ));
    let err = reader.new_iterator().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidOperation { .. }));
}

#[test]
fn test_unsupported_major_version() {
    let file = CFileBuilder::new(DataTypePb::Int32)
        .major_version(7)
        .extend_i32(0..5)
        .build();
    let err = init_error(file);
    assert!(err.is_corruption());
    assert!(err.to_string().contains("major version 7"));
}

#[test]
fn test_unrecognized_data_type() {
    let file = CFileBuilder::new(DataTypePb::UnknownType).build();
    assert!(init_error(file).is_corruption());
}

#[test]
fn test_garbage_footer() {
    let (mut file, layout) = CFileBuilder::new(DataTypePb::Int32)
        .extend_i32(0..5)
        .build_with_layout();
    let footer_start = layout.footer_offset as usize;
    for byte in &mut file[footer_start..footer_start + 4] {
        *byte = 0xff;
    }
    assert!(init_error(file).is_corruption());
}

#[test]
fn test_footer_length_past_file_start() {
    let mut file = CFileBuilder::new(DataTypePb::Int32).extend_i32(0..5).build();
    let len = file.len();
    file[len - 12..len - 8].copy_from_slice(&(len as u32).to_le_bytes());
    assert!(init_error(file).is_corruption());
}

#[test]
fn test_io_error_during_init() {
    let file = CFileBuilder::new(DataTypePb::Int32).extend_i32(0..5).build();
    let size = file.len() as u64;

    let reader = FailingReader::new(file.clone());
    reader.arm(size - 4..size, Failure::Error);
    let err = CFileReader::open(ReaderOptions::default(), Arc::new(reader)).unwrap_err();
    assert!(err.is_io());

    let reader = FailingReader::new(file);
    reader.arm(0..1, Failure::Truncate);
    let err = CFileReader::open(ReaderOptions::default(), Arc::new(reader)).unwrap_err();
    assert!(err.is_io());
}

#[test]
fn test_declared_size_larger_than_file() {
    let file = CFileBuilder::new(DataTypePb::Int32).extend_i32(0..5).build();
    let size = file.len() as u64;
    let mut reader = CFileReader::new(ReaderOptions::default(), Arc::new(file), size + 100);
    assert!(reader.init().unwrap_err().is_io());
}

#[test]
fn test_read_block_bounds() {
    let file = CFileBuilder::new(DataTypePb::Int32).extend_i32(0..5).build();
    let size = file.len() as u64;
    let reader = open(file);

    assert!(reader.read_block(BlockPointer::new(8, 0)).unwrap_err().is_corruption());
    assert!(
        reader
            .read_block(BlockPointer::new(size - 4, 8))
            .unwrap_err()
            .is_corruption()
    );
    assert!(
        reader
            .read_block(BlockPointer::new(u64::MAX - 2, 8))
            .unwrap_err()
            .is_corruption()
    );
    assert_eq!(reader.read_block(BlockPointer::new(0, 8)).unwrap().slice(), &CFILE_MAGIC);
}

#[test]
fn test_read_block_strips_checksum() {
    let (file, layout) = CFileBuilder::new(DataTypePb::Int32)
        .checksums(true)
        .extend_i32(0..5)
        .build_with_layout();
    let reader = open(file);
    assert!(reader.footer().checksummed_blocks);
    let pointer = BlockPointer::from(layout.data_blocks[0].pointer);
    let data = reader.read_block(pointer).unwrap();
    assert_eq!(data.len(), pointer.size() as usize - 4);

    let decoder = reader.create_block_decoder(data).unwrap();
    assert_eq!(decoder.count(), 5);
}

#[test]
fn test_checksum_mismatch() {
    let (mut file, layout) = CFileBuilder::new(DataTypePb::Int32)
        .checksums(true)
        .extend_i32(0..5)
        .build_with_layout();
    let pointer = layout.data_blocks[0].pointer;
    // Turn the low byte of the last value (4) into 5.
    file[(pointer.offset + pointer.size as u64) as usize - 8] ^= 0x01;

    let reader = open(file.clone());
    let err = reader.read_block(pointer.into()).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ChecksumMismatch { .. }));
    assert!(err.is_corruption());
    let mut iter = reader.new_iterator().unwrap();
    assert!(iter.seek_to_first().unwrap_err().is_corruption());

    let unverified = CFileReader::open(
        ReaderOptions {
            verify_checksums: false,
        },
        Arc::new(file),
    )
    .unwrap();
    let data = unverified.read_block(pointer.into()).unwrap();
    let decoder = unverified.create_block_decoder(data).unwrap();
    assert_eq!(decoder.cell(4), &5i32.to_le_bytes());
}

#[test]
fn test_unsupported_encoding_for_type() {
    let (file, layout) = CFileBuilder::new(DataTypePb::Int32)
        .with_encoding(EncodingTypePb::Dictionary)
        .extend_i32([1, 1, 2])
        .build_with_layout();
    let reader = open(file);
    let data = reader.read_block(layout.data_blocks[0].pointer.into()).unwrap();
    assert!(reader.create_block_decoder(data).unwrap_err().is_not_supported());

    let mut iter = reader.new_iterator().unwrap();
    assert!(iter.seek_to_ordinal(1).unwrap_err().is_not_supported());
    assert!(!iter.is_seeked());
}

#[test]
fn test_index_roots() {
    let (file, layout) = CFileBuilder::new(DataTypePb::Int32)
        .rows_per_block(3)
        .positional_index(false)
        .value_index(true)
        .extend_i32(0..10)
        .build_with_layout();
    let reader = open(file);
    assert!(!reader.has_posidx());
    assert!(reader.has_validx());
    assert_eq!(
        reader.validx_root(),
        BlockPointer::from(layout.validx_root.unwrap())
    );
}

#[test]
#[should_panic(expected = "no positional index")]
fn test_posidx_root_without_index_panics() {
    let reader = open(
        CFileBuilder::new(DataTypePb::Int32)
            .positional_index(false)
            .value_index(true)
            .extend_i32(0..10)
            .build(),
    );
    reader.posidx_root();
}

#[test]
fn test_file_backed_reader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("column.cfile");
    let data = CFileBuilder::new(DataTypePb::String)
        .rows_per_block(7)
        .value_index(true)
        .extend_str(["ant", "bee", "cat", "dog", "eel", "fox", "gnu", "hen", "ibis", "jay"])
        .build();
    std::fs::write(&path, &data).unwrap();

    let file = FileReader::open(&path).unwrap();
    assert_eq!(file.size().unwrap(), data.len() as u64);
    let reader = CFileReader::open(ReaderOptions::default(), Arc::new(file)).unwrap();
    assert_eq!(reader.data_type(), DataType::String);
    assert_eq!(reader.count_rows(), 10);

    let mut iter = reader.new_iterator().unwrap();
    assert!(!iter.seek_at_or_after(&"dove".into()).unwrap());
    assert_eq!(iter.current_ordinal(), 4);
    iter.seek_to_ordinal(9).unwrap();
    assert_eq!(iter.current_ordinal(), 9);
}
