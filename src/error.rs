use thiserror::Error;

use crate::io::data_types::DataType;

#[derive(Error, Debug)]
pub enum TdmsError {
    #[error("IO error")]
    Io(#[from] std::io::Error),
    #[error("Segment tag does not match TDSm: {0:X?}")]
    BadMagic([u8; 4]),
    #[error("No matching data type for tag {0:X}")]
    UnknownTypeTag(u32),
    #[error("String data is malformed")]
    MalformedString,
    #[error("Raw data block of {block_size} bytes is not a whole number of {stride} byte chunks")]
    MalformedChunking { block_size: u64, stride: u64 },
    #[error("Final segment is truncated")]
    TruncatedSegment,
    #[error("Expected data type {expected} but found {actual}")]
    TypeMismatch {
        expected: DataType,
        actual: DataType,
    },
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),
    #[error("Group not found: {0}")]
    GroupNotFound(String),
    #[error("Property not found: {0}")]
    PropertyNotFound(String),
    #[error("Not a valid object path: {0}")]
    InvalidPath(String),
    #[error("Empty data carries no schema and cannot be written")]
    EmptyData,
    #[error("Channel {path} is declared as {declared} and cannot change to {new}")]
    TypeChangedMidStream {
        path: String,
        declared: DataType,
        new: DataType,
    },
    #[error("Could not open the next file in the rotation")]
    RotationFailed(#[source] std::io::Error),
    #[error("Segment address overflowed u64")]
    SegmentAddressOverflow,
    #[error("Segment declares raw data but no channel contributes to it")]
    ZeroChannelDataBlock,
    #[error("Raw data index matches previous but {0} has no previously declared shape")]
    NoPreviousShape(String),
    #[error("Raw data offset exceeds the segment length")]
    InvalidRawOffset,
}

impl From<std::string::FromUtf8Error> for TdmsError {
    fn from(_: std::string::FromUtf8Error) -> Self {
        TdmsError::MalformedString
    }
}
