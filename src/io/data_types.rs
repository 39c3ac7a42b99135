//! This contains the code and structure for some of the fundamental
//! data types common to other components.

use std::{
    fmt::Display,
    io::{Read, Write},
};

use num_derive::FromPrimitive;

use crate::error::TdmsError;

/// The data types that can be encoded into TDMS data.
///
/// The values are the codes used in the TDMS file.
#[derive(Clone, Copy, Debug, FromPrimitive, PartialEq, Eq)]
#[repr(u32)]
pub enum DataType {
    Void = 0,
    I8 = 1,
    I16 = 2,
    I32 = 3,
    I64 = 4,
    U8 = 5,
    U16 = 6,
    U32 = 7,
    U64 = 8,
    SingleFloat = 9,
    DoubleFloat = 10,
    TdmsString = 0x20,
    Boolean = 0x21,
    TimeStamp = 0x44,
}

impl DataType {
    /// Size of a single element on disk. Strings are variable and report 0.
    pub fn size(&self) -> u64 {
        match self {
            DataType::Void => 0,
            DataType::I8 | DataType::U8 | DataType::Boolean => 1,
            DataType::I16 | DataType::U16 => 2,
            DataType::I32 | DataType::U32 | DataType::SingleFloat => 4,
            DataType::I64 | DataType::U64 | DataType::DoubleFloat => 8,
            DataType::TdmsString => 0,
            DataType::TimeStamp => 16,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DataType::TdmsString)
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Void => write!(f, "Void"),
            DataType::I8 => write!(f, "I8"),
            DataType::I16 => write!(f, "I16"),
            DataType::I32 => write!(f, "I32"),
            DataType::I64 => write!(f, "I64"),
            DataType::U8 => write!(f, "U8"),
            DataType::U16 => write!(f, "U16"),
            DataType::U32 => write!(f, "U32"),
            DataType::U64 => write!(f, "U64"),
            DataType::SingleFloat => write!(f, "SingleFloat"),
            DataType::DoubleFloat => write!(f, "DoubleFloat"),
            DataType::TdmsString => write!(f, "TdmsString"),
            DataType::Boolean => write!(f, "Boolean"),
            DataType::TimeStamp => write!(f, "TimeStamp"),
        }
    }
}

pub(crate) type StorageResult<T> = std::result::Result<T, TdmsError>;

/// A native type which can be stored to and loaded from the TDMS byte format.
pub trait TdmsStorageType: Sized {
    /// The [`DataType`] values that can be read as this storage type.
    const SUPPORTED_TYPES: &'static [DataType];
    /// The [`DataType`] that this storage type is naturally written as.
    const NATURAL_TYPE: DataType;
    /// Size in bytes of the type.
    const SIZE_BYTES: usize = std::mem::size_of::<Self>();
    fn read_le(reader: &mut impl Read) -> StorageResult<Self>;
    fn read_be(reader: &mut impl Read) -> StorageResult<Self>;
    /// Write the value as little endian.
    fn write_le(&self, writer: &mut impl Write) -> StorageResult<()>;
    /// Write the value as big endian.
    fn write_be(&self, writer: &mut impl Write) -> StorageResult<()>;
    /// Report the size of the type to allow for planning of writes.
    fn size(&self) -> usize;

    fn supports_data_type(data_type: &DataType) -> bool {
        Self::SUPPORTED_TYPES.contains(data_type)
    }
}

/// Fixed width types that can form raw channel data.
///
/// Strings are a storage type for metadata, but string channel data uses
/// the offset table block format instead of the scalar codec, so `String`
/// deliberately does not implement this. Use the dedicated string read and
/// write entry points for string channels.
pub trait TdmsChannelType: TdmsStorageType {}

/// Macro for scripting the wrapping of the different read methods.
///
/// Should provide the type which has a from_le_bytes and from_be_bytes,
/// then the natural type for the storage type,
/// and then a slice of supported [`DataType`] values.
macro_rules! numeric_type {
    ($type:ty, $natural:expr, $supported:expr) => {
        impl TdmsStorageType for $type {
            const NATURAL_TYPE: DataType = $natural;
            const SUPPORTED_TYPES: &'static [DataType] = $supported;
            fn read_le(reader: &mut impl Read) -> StorageResult<$type> {
                let mut buf = [0u8; std::mem::size_of::<$type>()];
                reader.read_exact(&mut buf)?;
                Ok(<$type>::from_le_bytes(buf))
            }
            fn read_be(reader: &mut impl Read) -> StorageResult<$type> {
                let mut buf = [0u8; std::mem::size_of::<$type>()];
                reader.read_exact(&mut buf)?;
                Ok(<$type>::from_be_bytes(buf))
            }
            fn write_le(&self, writer: &mut impl Write) -> StorageResult<()> {
                writer.write_all(&self.to_le_bytes())?;
                Ok(())
            }
            fn write_be(&self, writer: &mut impl Write) -> StorageResult<()> {
                writer.write_all(&self.to_be_bytes())?;
                Ok(())
            }
            fn size(&self) -> usize {
                Self::SIZE_BYTES
            }
        }

        impl TdmsChannelType for $type {}
    };
}

numeric_type!(i8, DataType::I8, &[DataType::I8]);
numeric_type!(u8, DataType::U8, &[DataType::U8]);
numeric_type!(i16, DataType::I16, &[DataType::I16]);
numeric_type!(u16, DataType::U16, &[DataType::U16]);
numeric_type!(i32, DataType::I32, &[DataType::I32]);
numeric_type!(u32, DataType::U32, &[DataType::U32]);
numeric_type!(i64, DataType::I64, &[DataType::I64]);
numeric_type!(u64, DataType::U64, &[DataType::U64]);
numeric_type!(f32, DataType::SingleFloat, &[DataType::SingleFloat]);
numeric_type!(f64, DataType::DoubleFloat, &[DataType::DoubleFloat]);

fn read_string_with_length(reader: &mut impl Read, length: u32) -> Result<String, TdmsError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(length as usize)
        .map_err(|_| TdmsError::MalformedString)?;
    buffer.resize(length as usize, 0);
    reader.read_exact(&mut buffer[..]).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            TdmsError::MalformedString
        } else {
            TdmsError::Io(e)
        }
    })?;
    let value = String::from_utf8(buffer)?;
    Ok(value)
}

impl TdmsStorageType for String {
    const SUPPORTED_TYPES: &'static [DataType] = &[DataType::TdmsString];

    const NATURAL_TYPE: DataType = DataType::TdmsString;

    fn read_le(reader: &mut impl Read) -> Result<Self, TdmsError> {
        let length = u32::read_le(reader)?;
        read_string_with_length(reader, length)
    }

    fn read_be(reader: &mut impl Read) -> Result<Self, TdmsError> {
        let length = u32::read_be(reader)?;
        read_string_with_length(reader, length)
    }

    fn write_le(&self, writer: &mut impl Write) -> StorageResult<()> {
        writer.write_all(&(self.len() as u32).to_le_bytes())?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }

    fn write_be(&self, writer: &mut impl Write) -> StorageResult<()> {
        writer.write_all(&(self.len() as u32).to_be_bytes())?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }

    fn size(&self) -> usize {
        self.len() + std::mem::size_of::<u32>()
    }
}

impl TdmsChannelType for bool {}

impl TdmsStorageType for bool {
    const SUPPORTED_TYPES: &'static [DataType] = &[DataType::Boolean];

    const NATURAL_TYPE: DataType = DataType::Boolean;

    fn read_le(reader: &mut impl Read) -> StorageResult<Self> {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(buf[0] != 0)
    }

    fn read_be(reader: &mut impl Read) -> StorageResult<Self> {
        // no endianess for bool.
        Self::read_le(reader)
    }

    fn write_le(&self, writer: &mut impl Write) -> StorageResult<()> {
        writer.write_all(&[*self as u8])?;
        Ok(())
    }

    fn write_be(&self, writer: &mut impl Write) -> StorageResult<()> {
        // no endianess for bool
        Self::write_le(self, writer)
    }

    fn size(&self) -> usize {
        1
    }
}
