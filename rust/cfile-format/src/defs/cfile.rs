// Protobuf records of the CFile header and footer.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileMetadataPairPb {
    #[prost(string, tag = "1")]
    pub key: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CFileHeaderPb {
    #[prost(uint32, tag = "1")]
    pub major_version: u32,
    #[prost(uint32, tag = "2")]
    pub minor_version: u32,
    #[prost(message, repeated, tag = "3")]
    pub metadata: ::prost::alloc::vec::Vec<FileMetadataPairPb>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct BlockPointerPb {
    #[prost(uint64, tag = "1")]
    pub offset: u64,
    #[prost(uint32, tag = "2")]
    pub size: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BTreeInfoPb {
    #[prost(message, optional, tag = "1")]
    pub root_block: ::core::option::Option<BlockPointerPb>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CFileFooterPb {
    #[prost(enumeration = "DataTypePb", tag = "1")]
    pub data_type: i32,
    #[prost(uint64, tag = "2")]
    pub num_values: u64,
    #[prost(message, optional, tag = "3")]
    pub posidx_info: ::core::option::Option<BTreeInfoPb>,
    #[prost(message, optional, tag = "4")]
    pub validx_info: ::core::option::Option<BTreeInfoPb>,
    #[prost(bool, tag = "5")]
    pub checksummed_blocks: bool,
    #[prost(message, repeated, tag = "6")]
    pub metadata: ::prost::alloc::vec::Vec<FileMetadataPairPb>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DataTypePb {
    UnknownType = 0,
    Uint8 = 1,
    Int8 = 2,
    Uint16 = 3,
    Int16 = 4,
    Uint32 = 5,
    Int32 = 6,
    Uint64 = 7,
    Int64 = 8,
    String = 9,
    Bool = 10,
    Float = 11,
    Double = 12,
    Binary = 13,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EncodingTypePb {
    UnknownEncoding = 0,
    Plain = 1,
    RunLength = 2,
    Dictionary = 3,
}
