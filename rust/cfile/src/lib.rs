//! Read path of the CFile columnar format.
//!
//! A CFile stores a single typed column as a sequence of independently decodable
//! data blocks, reachable through a positional B-tree index (ordinal to block) and,
//! optionally, a value B-tree index (first value to block) for sorted columns.
//!
//! [`CFileReader`] validates the file and exposes its metadata; [`CFileIterator`]
//! seeks by ordinal or by value and copies values into a [`ColumnBlock`].

pub mod block;
pub mod column_block;
pub mod decoder;
pub mod index_btree;
pub mod iterator;
pub mod options;
pub mod reader;
pub mod types;

pub use block::{BlockData, BlockPointer};
pub use column_block::{Arena, ColumnBlock};
pub use iterator::CFileIterator;
pub use options::ReaderOptions;
pub use reader::CFileReader;
pub use types::{DataType, Datum, TypeInfo, get_type_info};
