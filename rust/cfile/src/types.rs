//! Column data types, their cell encoding and ordering.
//!
//! Every value has a canonical *cell* encoding: fixed-width types are stored
//! little-endian in `size()` bytes (`Bool` as a single `0`/`1` byte), variable-length
//! types as their raw bytes. Data blocks, value index keys and [`ColumnBlock`]
//! cells all use this encoding, and [`TypeInfo::compare`] orders cells.
//!
//! [`ColumnBlock`]: crate::ColumnBlock

use std::{borrow::Cow, cmp::Ordering};

use cfile_common::{Result, error::Error};
use cfile_format::defs::DataTypePb;

/// Logical type of the values stored in a CFile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Uint64,
    Int64,
    Float,
    Double,
    Bool,
    String,
    Binary,
}

impl DataType {
    /// Resolves the type tag recorded in the file footer.
    pub fn from_pb(tag: i32) -> Result<DataType> {
        let pb = DataTypePb::try_from(tag).map_err(|_| unrecognized_type(tag))?;
        let data_type = match pb {
            DataTypePb::UnknownType => return Err(unrecognized_type(tag)),
            DataTypePb::Uint8 => DataType::Uint8,
            DataTypePb::Int8 => DataType::Int8,
            DataTypePb::Uint16 => DataType::Uint16,
            DataTypePb::Int16 => DataType::Int16,
            DataTypePb::Uint32 => DataType::Uint32,
            DataTypePb::Int32 => DataType::Int32,
            DataTypePb::Uint64 => DataType::Uint64,
            DataTypePb::Int64 => DataType::Int64,
            DataTypePb::Float => DataType::Float,
            DataTypePb::Double => DataType::Double,
            DataTypePb::Bool => DataType::Bool,
            DataTypePb::String => DataType::String,
            DataTypePb::Binary => DataType::Binary,
        };
        Ok(data_type)
    }

    pub fn to_pb(self) -> DataTypePb {
        match self {
            DataType::Uint8 => DataTypePb::Uint8,
            DataType::Int8 => DataTypePb::Int8,
            DataType::Uint16 => DataTypePb::Uint16,
            DataType::Int16 => DataTypePb::Int16,
            DataType::Uint32 => DataTypePb::Uint32,
            DataType::Int32 => DataTypePb::Int32,
            DataType::Uint64 => DataTypePb::Uint64,
            DataType::Int64 => DataTypePb::Int64,
            DataType::Float => DataTypePb::Float,
            DataType::Double => DataTypePb::Double,
            DataType::Bool => DataTypePb::Bool,
            DataType::String => DataTypePb::String,
            DataType::Binary => DataTypePb::Binary,
        }
    }
}

#[cold]
fn unrecognized_type(tag: i32) -> Error {
    Error::invalid_format("footer data type", format!("unrecognized type tag {tag}"))
}

/// Static description of a [`DataType`]: cell width and ordering.
pub struct TypeInfo {
    data_type: DataType,
    name: &'static str,
    size: usize,
    compare_fn: fn(&[u8], &[u8]) -> Ordering,
}

impl TypeInfo {
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Width of a cell in bytes, `0` for variable-length types.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_variable_length(&self) -> bool {
        self.size == 0
    }

    /// Compares two cells of this type.
    ///
    /// Both cells must be well-formed: exactly `size()` bytes for fixed-width types.
    #[inline]
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        (self.compare_fn)(a, b)
    }
}

impl std::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish()
    }
}

trait FixedCell: bytemuck::Pod {
    fn total_cmp(&self, other: &Self) -> Ordering;
}

macro_rules! impl_int_cell {
    ($($t:ty),*) => {
        $(impl FixedCell for $t {
            #[inline]
            fn total_cmp(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }
        })*
    };
}

impl_int_cell!(u8, i8, u16, i16, u32, i32, u64, i64);

// IEEE total order, except that signed zeros compare equal.
impl FixedCell for f32 {
    #[inline]
    fn total_cmp(&self, other: &Self) -> Ordering {
        (self + 0.0).total_cmp(&(other + 0.0))
    }
}

impl FixedCell for f64 {
    #[inline]
    fn total_cmp(&self, other: &Self) -> Ordering {
        (self + 0.0).total_cmp(&(other + 0.0))
    }
}

/// Reads a little-endian cell.
#[inline]
fn read_cell<T: FixedCell>(cell: &[u8]) -> T {
    let value: T = bytemuck::pod_read_unaligned(cell);
    from_le(value)
}

#[inline]
fn from_le<T: bytemuck::Pod>(value: T) -> T {
    if cfg!(target_endian = "big") {
        let mut value = value;
        bytemuck::bytes_of_mut(&mut value).reverse();
        value
    } else {
        value
    }
}

fn compare_fixed<T: FixedCell>(a: &[u8], b: &[u8]) -> Ordering {
    read_cell::<T>(a).total_cmp(&read_cell::<T>(b))
}

fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

macro_rules! type_info {
    ($data_type:ident, $name:literal, $t:ty) => {
        TypeInfo {
            data_type: DataType::$data_type,
            name: $name,
            size: std::mem::size_of::<$t>(),
            compare_fn: compare_fixed::<$t>,
        }
    };
}

static TYPE_INFOS: [TypeInfo; 13] = [
    type_info!(Uint8, "uint8", u8),
    type_info!(Int8, "int8", i8),
    type_info!(Uint16, "uint16", u16),
    type_info!(Int16, "int16", i16),
    type_info!(Uint32, "uint32", u32),
    type_info!(Int32, "int32", i32),
    type_info!(Uint64, "uint64", u64),
    type_info!(Int64, "int64", i64),
    type_info!(Float, "float", f32),
    type_info!(Double, "double", f64),
    type_info!(Bool, "bool", u8),
    TypeInfo {
        data_type: DataType::String,
        name: "string",
        size: 0,
        compare_fn: compare_bytes,
    },
    TypeInfo {
        data_type: DataType::Binary,
        name: "binary",
        size: 0,
        compare_fn: compare_bytes,
    },
];

/// Returns the registered descriptor of `data_type`.
pub fn get_type_info(data_type: DataType) -> &'static TypeInfo {
    &TYPE_INFOS[data_type as usize]
}

/// A single value of any supported type, borrowing variable-length content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Datum<'a> {
    Uint8(u8),
    Int8(i8),
    Uint16(u16),
    Int16(i16),
    Uint32(u32),
    Int32(i32),
    Uint64(u64),
    Int64(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(&'a str),
    Binary(&'a [u8]),
}

impl<'a> Datum<'a> {
    pub fn data_type(&self) -> DataType {
        match self {
            Datum::Uint8(_) => DataType::Uint8,
            Datum::Int8(_) => DataType::Int8,
            Datum::Uint16(_) => DataType::Uint16,
            Datum::Int16(_) => DataType::Int16,
            Datum::Uint32(_) => DataType::Uint32,
            Datum::Int32(_) => DataType::Int32,
            Datum::Uint64(_) => DataType::Uint64,
            Datum::Int64(_) => DataType::Int64,
            Datum::Float(_) => DataType::Float,
            Datum::Double(_) => DataType::Double,
            Datum::Bool(_) => DataType::Bool,
            Datum::String(_) => DataType::String,
            Datum::Binary(_) => DataType::Binary,
        }
    }

    /// Returns the canonical cell encoding of the value.
    pub fn encode(&self) -> Cow<'a, [u8]> {
        match *self {
            Datum::Uint8(v) => Cow::Owned(v.to_le_bytes().to_vec()),
            Datum::Int8(v) => Cow::Owned(v.to_le_bytes().to_vec()),
            Datum::Uint16(v) => Cow::Owned(v.to_le_bytes().to_vec()),
            Datum::Int16(v) => Cow::Owned(v.to_le_bytes().to_vec()),
            Datum::Uint32(v) => Cow::Owned(v.to_le_bytes().to_vec()),
            Datum::Int32(v) => Cow::Owned(v.to_le_bytes().to_vec()),
            Datum::Uint64(v) => Cow::Owned(v.to_le_bytes().to_vec()),
            Datum::Int64(v) => Cow::Owned(v.to_le_bytes().to_vec()),
            Datum::Float(v) => Cow::Owned(v.to_le_bytes().to_vec()),
            Datum::Double(v) => Cow::Owned(v.to_le_bytes().to_vec()),
            Datum::Bool(v) => Cow::Owned(vec![v as u8]),
            Datum::String(s) => Cow::Borrowed(s.as_bytes()),
            Datum::Binary(b) => Cow::Borrowed(b),
        }
    }

    /// Interprets a cell of `data_type`.
    pub fn decode(data_type: DataType, cell: &'a [u8]) -> Result<Datum<'a>> {
        let size = get_type_info(data_type).size();
        if size != 0 && cell.len() != size {
            return Err(Error::invalid_format(
                "cell",
                format!(
                    "{} cell of {} bytes, expected {size}",
                    get_type_info(data_type).name(),
                    cell.len()
                ),
            ));
        }
        let datum = match data_type {
            DataType::Uint8 => Datum::Uint8(read_cell(cell)),
            DataType::Int8 => Datum::Int8(read_cell(cell)),
            DataType::Uint16 => Datum::Uint16(read_cell(cell)),
            DataType::Int16 => Datum::Int16(read_cell(cell)),
            DataType::Uint32 => Datum::Uint32(read_cell(cell)),
            DataType::Int32 => Datum::Int32(read_cell(cell)),
            DataType::Uint64 => Datum::Uint64(read_cell(cell)),
            DataType::Int64 => Datum::Int64(read_cell(cell)),
            DataType::Float => Datum::Float(read_cell(cell)),
            DataType::Double => Datum::Double(read_cell(cell)),
            DataType::Bool => Datum::Bool(cell[0] != 0),
            DataType::String => Datum::String(
                std::str::from_utf8(cell)
                    .map_err(|e| Error::invalid_format("string cell", e.to_string()))?,
            ),
            DataType::Binary => Datum::Binary(cell),
        };
        Ok(datum)
    }

    /// Returns the value as `i64` for integer types that fit.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Datum::Uint8(v) => Some(v as i64),
            Datum::Int8(v) => Some(v as i64),
            Datum::Uint16(v) => Some(v as i64),
            Datum::Int16(v) => Some(v as i64),
            Datum::Uint32(v) => Some(v as i64),
            Datum::Int32(v) => Some(v as i64),
            Datum::Uint64(v) => i64::try_from(v).ok(),
            Datum::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Datum::Float(v) => Some(v as f64),
            Datum::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Datum::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            Datum::String(s) => Some(s.as_bytes()),
            Datum::Binary(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! impl_datum_from {
    ($($t:ty => $variant:ident),*) => {
        $(impl From<$t> for Datum<'static> {
            fn from(v: $t) -> Self {
                Datum::$variant(v)
            }
        })*
    };
}

impl_datum_from!(
    u8 => Uint8, i8 => Int8, u16 => Uint16, i16 => Int16, u32 => Uint32, i32 => Int32,
    u64 => Uint64, i64 => Int64, f32 => Float, f64 => Double, bool => Bool
);

impl<'a> From<&'a str> for Datum<'a> {
    fn from(s: &'a str) -> Self {
        Datum::String(s)
    }
}

impl<'a> From<&'a [u8]> for Datum<'a> {
    fn from(b: &'a [u8]) -> Self {
        Datum::Binary(b)
    }
}
