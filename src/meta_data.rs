//! This module encodes the meta data types that we will encounter in the files.

use std::io::{Read, Seek, Write};

use num_traits::FromPrimitive;

use crate::error::TdmsError;
use crate::io::data_types::{DataType, TdmsStorageType};
use crate::io::reader::{BigEndianReader, LittleEndianReader, TdmsReader};
use crate::io::timestamp::Timestamp;
use crate::io::writer::TdmsWriter;

///The fixed byte size of the lead in section.
pub const LEAD_IN_BYTES: u64 = 28;

/// Sentinel in the lead in of a segment that was still being written when
/// the writer died. The real length must be recovered from the file length.
pub const TRUNCATED_SEGMENT_SENTINEL: u64 = u64::MAX;

/// Represents data that is endian agnostic.
pub trait TdmsMetaData: Sized {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<Self, TdmsError>;
    /// Write the piece of meta-data.
    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError>;
    /// Report the size on disk so we can plan the write.
    fn size(&self) -> usize;
}

impl TdmsMetaData for DataType {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<Self, TdmsError> {
        let raw_tag: u32 = reader.read_value()?;
        let data_type = <DataType as FromPrimitive>::from_u32(raw_tag)
            .ok_or(TdmsError::UnknownTypeTag(raw_tag))?;
        Ok(data_type)
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        writer.write_value(&(*self as u32))?;
        Ok(())
    }

    fn size(&self) -> usize {
        std::mem::size_of::<u32>()
    }
}

/// A wrapper type for property values found in tdms files.
///
/// Covers the full set of wire types a property can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Void,
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Boolean(bool),
    TimeStamp(Timestamp),
}

fn write_property_components<W: Write, T: TdmsStorageType>(
    writer: &mut impl TdmsWriter<W>,
    data_type: DataType,
    value: &T,
) -> Result<(), TdmsError> {
    writer.write_meta(&data_type)?;
    writer.write_value(value)?;
    Ok(())
}

impl PropertyValue {
    /// The wire tag this value serializes under.
    pub fn data_type(&self) -> DataType {
        match self {
            PropertyValue::Void => DataType::Void,
            PropertyValue::I8(_) => DataType::I8,
            PropertyValue::I16(_) => DataType::I16,
            PropertyValue::I32(_) => DataType::I32,
            PropertyValue::I64(_) => DataType::I64,
            PropertyValue::U8(_) => DataType::U8,
            PropertyValue::U16(_) => DataType::U16,
            PropertyValue::U32(_) => DataType::U32,
            PropertyValue::U64(_) => DataType::U64,
            PropertyValue::Float(_) => DataType::SingleFloat,
            PropertyValue::Double(_) => DataType::DoubleFloat,
            PropertyValue::String(_) => DataType::TdmsString,
            PropertyValue::Boolean(_) => DataType::Boolean,
            PropertyValue::TimeStamp(_) => DataType::TimeStamp,
        }
    }

    fn mismatch(&self, expected: DataType) -> TdmsError {
        TdmsError::TypeMismatch {
            expected,
            actual: self.data_type(),
        }
    }

    pub fn as_i32(&self) -> Result<i32, TdmsError> {
        match self {
            PropertyValue::I32(value) => Ok(*value),
            other => Err(other.mismatch(DataType::I32)),
        }
    }

    pub fn as_i64(&self) -> Result<i64, TdmsError> {
        match self {
            PropertyValue::I64(value) => Ok(*value),
            other => Err(other.mismatch(DataType::I64)),
        }
    }

    pub fn as_f64(&self) -> Result<f64, TdmsError> {
        match self {
            PropertyValue::Double(value) => Ok(*value),
            other => Err(other.mismatch(DataType::DoubleFloat)),
        }
    }

    pub fn as_str(&self) -> Result<&str, TdmsError> {
        match self {
            PropertyValue::String(value) => Ok(value),
            other => Err(other.mismatch(DataType::TdmsString)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, TdmsError> {
        match self {
            PropertyValue::Boolean(value) => Ok(*value),
            other => Err(other.mismatch(DataType::Boolean)),
        }
    }

    pub fn as_timestamp(&self) -> Result<Timestamp, TdmsError> {
        match self {
            PropertyValue::TimeStamp(value) => Ok(*value),
            other => Err(other.mismatch(DataType::TimeStamp)),
        }
    }
}

macro_rules! property_from {
    ($type:ty, $variant:ident) => {
        impl From<$type> for PropertyValue {
            fn from(value: $type) -> Self {
                PropertyValue::$variant(value)
            }
        }
    };
}

property_from!(i8, I8);
property_from!(i16, I16);
property_from!(i32, I32);
property_from!(i64, I64);
property_from!(u8, U8);
property_from!(u16, U16);
property_from!(u32, U32);
property_from!(u64, U64);
property_from!(f32, Float);
property_from!(f64, Double);
property_from!(String, String);
property_from!(bool, Boolean);
property_from!(Timestamp, TimeStamp);

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl TdmsMetaData for PropertyValue {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<Self, TdmsError> {
        let raw_type: DataType = reader.read_meta()?;

        match raw_type {
            DataType::Void => Ok(PropertyValue::Void),
            DataType::I8 => Ok(PropertyValue::I8(reader.read_value()?)),
            DataType::I16 => Ok(PropertyValue::I16(reader.read_value()?)),
            DataType::I32 => Ok(PropertyValue::I32(reader.read_value()?)),
            DataType::I64 => Ok(PropertyValue::I64(reader.read_value()?)),
            DataType::U8 => Ok(PropertyValue::U8(reader.read_value()?)),
            DataType::U16 => Ok(PropertyValue::U16(reader.read_value()?)),
            DataType::U32 => Ok(PropertyValue::U32(reader.read_value()?)),
            DataType::U64 => Ok(PropertyValue::U64(reader.read_value()?)),
            DataType::SingleFloat => Ok(PropertyValue::Float(reader.read_value()?)),
            DataType::DoubleFloat => Ok(PropertyValue::Double(reader.read_value()?)),
            DataType::TdmsString => Ok(PropertyValue::String(reader.read_value()?)),
            DataType::Boolean => Ok(PropertyValue::Boolean(reader.read_value()?)),
            DataType::TimeStamp => Ok(PropertyValue::TimeStamp(reader.read_value()?)),
        }
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        match self {
            PropertyValue::Void => writer.write_meta(&DataType::Void),
            PropertyValue::I8(value) => write_property_components(writer, DataType::I8, value),
            PropertyValue::I16(value) => write_property_components(writer, DataType::I16, value),
            PropertyValue::I32(value) => write_property_components(writer, DataType::I32, value),
            PropertyValue::I64(value) => write_property_components(writer, DataType::I64, value),
            PropertyValue::U8(value) => write_property_components(writer, DataType::U8, value),
            PropertyValue::U16(value) => write_property_components(writer, DataType::U16, value),
            PropertyValue::U32(value) => write_property_components(writer, DataType::U32, value),
            PropertyValue::U64(value) => write_property_components(writer, DataType::U64, value),
            PropertyValue::Float(value) => {
                write_property_components(writer, DataType::SingleFloat, value)
            }
            PropertyValue::Double(value) => {
                write_property_components(writer, DataType::DoubleFloat, value)
            }
            PropertyValue::String(value) => {
                write_property_components(writer, DataType::TdmsString, value)
            }
            PropertyValue::Boolean(value) => {
                write_property_components(writer, DataType::Boolean, value)
            }
            PropertyValue::TimeStamp(value) => {
                write_property_components(writer, DataType::TimeStamp, value)
            }
        }
    }

    fn size(&self) -> usize {
        let internal_size = match self {
            PropertyValue::Void => 0,
            PropertyValue::I8(value) => value.size(),
            PropertyValue::I16(value) => value.size(),
            PropertyValue::I32(value) => value.size(),
            PropertyValue::I64(value) => value.size(),
            PropertyValue::U8(value) => value.size(),
            PropertyValue::U16(value) => value.size(),
            PropertyValue::U32(value) => value.size(),
            PropertyValue::U64(value) => value.size(),
            PropertyValue::Float(value) => value.size(),
            PropertyValue::Double(value) => value.size(),
            PropertyValue::String(value) => TdmsStorageType::size(value),
            PropertyValue::Boolean(value) => value.size(),
            PropertyValue::TimeStamp(value) => value.size(),
        };
        internal_size + std::mem::size_of::<u32>()
    }
}

/// An extracted form of a segment table of contents.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct ToC {
    pub contains_meta_data: bool,
    pub contains_raw_data: bool,
    pub contains_daqmx_raw_data: bool,
    pub data_is_interleaved: bool,
    pub big_endian: bool,
    pub contains_new_object_list: bool,
}

fn mask_bit_set(value: u32, bit: u8) -> bool {
    let mask = 1u32 << bit;
    let masked = value & mask;
    masked != 0
}

fn set_bits(input: &mut u32, value: bool, bit: u8) {
    if value {
        *input |= 1u32 << bit
    }
}

impl ToC {
    pub fn from_u32(value: u32) -> Self {
        ToC {
            contains_meta_data: mask_bit_set(value, 1),
            contains_raw_data: mask_bit_set(value, 3),
            contains_daqmx_raw_data: mask_bit_set(value, 7),
            data_is_interleaved: mask_bit_set(value, 5),
            big_endian: mask_bit_set(value, 6),
            contains_new_object_list: mask_bit_set(value, 2),
        }
    }

    pub fn as_bytes(&self) -> [u8; 4] {
        let mut toc: u32 = 0;
        set_bits(&mut toc, self.contains_meta_data, 1);
        set_bits(&mut toc, self.contains_raw_data, 3);
        set_bits(&mut toc, self.contains_daqmx_raw_data, 7);
        set_bits(&mut toc, self.data_is_interleaved, 5);
        set_bits(&mut toc, self.big_endian, 6);
        set_bits(&mut toc, self.contains_new_object_list, 2);
        toc.to_le_bytes()
    }
}

impl TdmsMetaData for ToC {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<Self, TdmsError> {
        // ToC is always little endian.
        let toc_value = <u32 as TdmsStorageType>::read_le(reader.buffered_reader())?;
        Ok(ToC::from_u32(toc_value))
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        let bytes = self.as_bytes();
        for byte in &bytes {
            writer.write_value(byte)?;
        }
        Ok(())
    }

    fn size(&self) -> usize {
        std::mem::size_of::<u32>()
    }
}

/// The metadata section of a segment.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct MetaData {
    pub objects: Vec<ObjectMetaData>,
}

impl TdmsMetaData for MetaData {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<Self, TdmsError> {
        let object_length: u32 = reader.read_value()?;
        let objects = reader.read_vec(object_length as usize)?;
        Ok(MetaData { objects })
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        let objects_length: u32 = self.objects.len() as u32;
        writer.write_value(&objects_length)?;

        for object in &self.objects {
            writer.write_meta(object)?;
        }
        Ok(())
    }

    fn size(&self) -> usize {
        let mut size = std::mem::size_of::<u32>();
        for object in &self.objects {
            size += object.size();
        }
        size
    }
}

/// Contains the data from the TDMS segment header.
///
/// The offsets can be used to jump around the three elements that could be in the segment.
///
/// |----------------------------------------------------
/// | lead in: 28 bytes
/// |----------------------------------------------------
/// | metadata: size = raw_data_offset |
/// |--------------------------------- | next segment offset
/// | raw data                         |
/// |--------------------------------- |-----------------
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Segment {
    pub toc: ToC,
    /// The total length of the segment including data but minus the lead in.
    /// Can be used to jump to the next segment in the file.
    /// Can be all 0xFF for the last segment of the file if it crashes during a write.
    pub next_segment_offset: u64,
    /// The full length of the meta data.
    pub raw_data_offset: u64,
    pub meta_data: Option<MetaData>,
}

impl Segment {
    pub fn total_size_bytes(&self) -> Result<u64, TdmsError> {
        LEAD_IN_BYTES
            .checked_add(self.next_segment_offset)
            .ok_or(TdmsError::SegmentAddressOverflow)
    }

    /// Byte length of the raw data block.
    pub fn raw_data_length(&self) -> Result<u64, TdmsError> {
        self.next_segment_offset
            .checked_sub(self.raw_data_offset)
            .ok_or(TdmsError::InvalidRawOffset)
    }

    pub fn is_truncated(&self) -> bool {
        self.next_segment_offset == TRUNCATED_SEGMENT_SENTINEL
    }

    pub fn read(reader: &mut (impl Read + Seek)) -> Result<Segment, TdmsError> {
        let mut tag = [0u8; 4];
        reader.read_exact(&mut tag)?;

        if tag != [0x54, 0x44, 0x53, 0x6D] {
            return Err(TdmsError::BadMagic(tag));
        }

        //ToC is always little endian.
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        let toc = ToC::from_u32(u32::from_le_bytes(buf));

        let segment = match toc.big_endian {
            true => read_after_toc(&mut BigEndianReader::from_reader(reader), toc)?,
            false => read_after_toc(&mut LittleEndianReader::from_reader(reader), toc)?,
        };
        Ok(segment)
    }
}

/// Called immediately after the ToC has been read so the endianess is known.
fn read_after_toc<R: Read + Seek>(
    reader: &mut impl TdmsReader<R>,
    toc: ToC,
) -> Result<Segment, TdmsError> {
    let _version: u32 = reader.read_value()?;
    let next_segment_offset = reader.read_value()?;
    let raw_data_offset = reader.read_value()?;

    let meta_data = if toc.contains_meta_data {
        Some(reader.read_meta()?)
    } else {
        None
    };

    Ok(Segment {
        toc,
        next_segment_offset,
        raw_data_offset,
        meta_data,
    })
}

/// Contains all data from an object entry in a segment header.
#[derive(Debug, PartialEq, Clone)]
pub struct ObjectMetaData {
    pub path: String,
    pub properties: Vec<(String, PropertyValue)>,
    pub raw_data_index: RawDataIndex,
}

impl TdmsMetaData for ObjectMetaData {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<ObjectMetaData, TdmsError> {
        let path: String = reader.read_value()?;

        let raw_data: RawDataIndex = reader.read_meta()?;

        let property_count: u32 = reader.read_value()?;

        let mut properties = Vec::with_capacity(property_count as usize);

        for _prop in 0..property_count {
            let name: String = reader.read_value()?;
            let value: PropertyValue = reader.read_meta()?;
            properties.push((name, value));
        }

        Ok(ObjectMetaData {
            path,
            properties,
            raw_data_index: raw_data,
        })
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        writer.write_value(&self.path)?;
        writer.write_meta(&self.raw_data_index)?;
        writer.write_value(&(self.properties.len() as u32))?;

        for (prop_name, prop_value) in &self.properties {
            writer.write_value(prop_name)?;
            writer.write_meta(prop_value)?;
        }
        Ok(())
    }

    fn size(&self) -> usize {
        let mut size = TdmsStorageType::size(&self.path);
        size += self.raw_data_index.size();
        size += std::mem::size_of::<u32>();
        for (prop_name, prop_value) in &self.properties {
            size += TdmsStorageType::size(prop_name);
            size += prop_value.size();
        }
        size
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RawDataIndex {
    None,
    MatchPrevious,
    RawData(RawDataMeta),
}

impl TdmsMetaData for RawDataIndex {
    fn read<R: Read + Seek>(reader: &mut impl TdmsReader<R>) -> Result<RawDataIndex, TdmsError> {
        let raw_index: u32 = reader.read_value()?;

        let raw_data = match raw_index {
            0x0000_0000 => RawDataIndex::MatchPrevious,
            0xFFFF_FFFF => RawDataIndex::None,
            // DAQmx raw formats are out of scope for this codec.
            0x6912_0000..=0x6912_FFFF | 0x6913_0000..=0x6913_FFFF => {
                return Err(TdmsError::UnknownTypeTag(raw_index))
            }
            _ => {
                let data_type: DataType = reader.read_meta()?;
                let _array_dims: u32 = reader.read_value()?; //always 1.
                let number_of_values: u64 = reader.read_value()?;
                let total_size_bytes = if data_type.is_string() {
                    Some(reader.read_value()?)
                } else {
                    None
                };
                let meta = RawDataMeta {
                    data_type,
                    number_of_values,
                    total_size_bytes,
                };
                RawDataIndex::RawData(meta)
            }
        };

        Ok(raw_data)
    }

    fn write<W: Write>(&self, writer: &mut impl TdmsWriter<W>) -> Result<(), TdmsError> {
        match self {
            RawDataIndex::None => writer.write_value(&0xFFFF_FFFFu32)?,
            RawDataIndex::MatchPrevious => writer.write_value(&0u32)?,
            RawDataIndex::RawData(raw_meta) => {
                // The index length includes the length field itself:
                // 20 bytes normally, 28 with the string block size.
                if raw_meta.data_type.is_string() {
                    writer.write_value(&28u32)?;
                } else {
                    writer.write_value(&20u32)?;
                }
                writer.write_meta(&raw_meta.data_type)?;
                //array dim is alway 1 in TDMS v2.0.
                writer.write_value(&1u32)?;
                writer.write_value(&raw_meta.number_of_values)?;
                if raw_meta.data_type.is_string() {
                    writer.write_value(&raw_meta.total_size_bytes.unwrap_or_default())?;
                }
            }
        }
        Ok(())
    }

    fn size(&self) -> usize {
        match self {
            RawDataIndex::None => std::mem::size_of::<u32>(),
            RawDataIndex::MatchPrevious => std::mem::size_of::<u32>(),
            RawDataIndex::RawData(raw_meta) => {
                let base = 3 * std::mem::size_of::<u32>() + std::mem::size_of::<u64>();
                if raw_meta.data_type.is_string() {
                    base + std::mem::size_of::<u64>()
                } else {
                    base
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RawDataMeta {
    pub data_type: DataType,
    pub number_of_values: u64,
    /// Only if strings. Includes the offset table bytes.
    pub total_size_bytes: Option<u64>,
}

impl RawDataMeta {
    /// The bytes this channel contributes to a single chunk.
    pub fn chunk_bytes(&self) -> Option<u64> {
        match self.total_size_bytes {
            Some(total) => Some(total),
            None => self.number_of_values.checked_mul(self.data_type.size()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::io::writer::LittleEndianWriter;

    use super::*;

    #[test]
    fn test_unknown_type_tag() {
        //example from NI site
        let test_buffer = [
            0x23, 00, 00, 00, 0x2Fu8, 0x27, 0x4D, 0x65, 0x61, 0x73, 0x75, 0x72, 0x65, 0x64, 0x20,
            0x54, 0x68, 0x72, 0x6F, 0x75, 0x67, 0x68, 0x70, 0x75, 0x74, 0x20, 0x44, 0x61, 0x74,
            0x61, 0x20, 0x28, 0x56, 0x6F, 0x6C, 0x74, 0x73, 0x29, 0x27,
        ];
        let mut cursor = Cursor::new(test_buffer);
        let mut reader = LittleEndianReader::from_reader(&mut cursor);
        let result: Result<PropertyValue, TdmsError> = reader.read_meta();
        assert!(matches!(result, Err(TdmsError::UnknownTypeTag(0x23))));
    }

    #[test]
    fn test_toc_example_from_ni() {
        let toc_int = 0x0Eu32;
        let toc = ToC::from_u32(toc_int);

        assert!(toc.contains_meta_data);
        assert!(toc.contains_raw_data);
        assert!(!toc.contains_daqmx_raw_data);
        assert!(!toc.data_is_interleaved);
        assert!(!toc.big_endian);
        assert!(toc.contains_new_object_list);
    }

    #[test]
    fn test_toc_example_to_bytes() {
        let toc_int = 0x0Eu32;
        let toc = ToC::from_u32(toc_int);

        //Value as little endian.
        assert_eq!(toc.as_bytes(), [0xE, 0, 0, 0]);
    }

    #[test]
    fn test_segment_size_calc() {
        let segment = Segment {
            next_segment_offset: 500,
            raw_data_offset: 20,
            ..Default::default()
        };

        assert_eq!(segment.total_size_bytes().unwrap(), 528);
        assert_eq!(segment.raw_data_length().unwrap(), 480);
    }

    #[test]
    fn test_truncated_sentinel() {
        let segment = Segment {
            next_segment_offset: TRUNCATED_SEGMENT_SENTINEL,
            raw_data_offset: 20,
            ..Default::default()
        };
        assert!(segment.is_truncated());
    }

    #[test]
    fn test_properties_standard_data() {
        //example from NI "TDMS internal file format"
        let test_buffer = [
            0x02, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x2F, 0x27, 0x47, 0x72, 0x6F, 0x75,
            0x70, 0x27, 0xFF, 0xFF, 0xFF, 0xFF, 0x02, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
            0x70, 0x72, 0x6F, 0x70, 0x20, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x76, 0x61,
            0x6C, 0x75, 0x65, 0x03, 0x00, 0x00, 0x00, 0x6E, 0x75, 0x6D, 0x03, 0x00, 0x00, 0x00,
            0x0A, 0x00, 0x00, 0x00, 0x13, 0x00, 0x00, 0x00, 0x2F, 0x27, 0x47, 0x72, 0x6F, 0x75,
            0x70, 0x27, 0x2F, 0x27, 0x43, 0x68, 0x61, 0x6E, 0x6E, 0x65, 0x6C, 0x31, 0x27, 0x14,
            0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let mut cursor = Cursor::new(test_buffer);
        let mut reader = LittleEndianReader::from_reader(&mut cursor);
        let object_count: u32 = reader.read_value().unwrap();
        let objects: Vec<ObjectMetaData> = reader.read_vec(object_count as usize).unwrap();

        let expected = vec![
            ObjectMetaData {
                path: String::from("/'Group'"),
                properties: vec![
                    (
                        String::from("prop"),
                        PropertyValue::String(String::from("value")),
                    ),
                    (String::from("num"), PropertyValue::I32(10)),
                ],
                raw_data_index: RawDataIndex::None,
            },
            ObjectMetaData {
                path: String::from("/'Group'/'Channel1'"),
                properties: vec![],
                raw_data_index: RawDataIndex::RawData(RawDataMeta {
                    data_type: DataType::I32,
                    number_of_values: 2,
                    total_size_bytes: None,
                }),
            },
        ];

        assert_eq!(objects, expected);
    }

    /// Will write the value to an array and return it for comparison.
    fn write_meta_to_buffer<T: TdmsMetaData>(value: T, expected_size: usize) -> Vec<u8> {
        let mut output_buffer = vec![0u8; expected_size];
        {
            let mut cursor = Cursor::new(&mut output_buffer);
            let mut writer = LittleEndianWriter::from_writer(&mut cursor);
            writer.write_meta(&value).unwrap();
            assert_eq!(value.size(), expected_size);
        }
        output_buffer
    }

    #[test]
    fn test_properties_standard_data_write() {
        //example from NI "TDMS internal file format"
        let expected_buffer = [
            0x02, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x2F, 0x27, 0x47, 0x72, 0x6F, 0x75,
            0x70, 0x27, 0xFF, 0xFF, 0xFF, 0xFF, 0x02, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
            0x70, 0x72, 0x6F, 0x70, 0x20, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x76, 0x61,
            0x6C, 0x75, 0x65, 0x03, 0x00, 0x00, 0x00, 0x6E, 0x75, 0x6D, 0x03, 0x00, 0x00, 0x00,
            0x0A, 0x00, 0x00, 0x00, 0x13, 0x00, 0x00, 0x00, 0x2F, 0x27, 0x47, 0x72, 0x6F, 0x75,
            0x70, 0x27, 0x2F, 0x27, 0x43, 0x68, 0x61, 0x6E, 0x6E, 0x65, 0x6C, 0x31, 0x27, 0x14,
            0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let meta = MetaData {
            objects: vec![
                ObjectMetaData {
                    path: String::from("/'Group'"),
                    properties: vec![
                        (
                            String::from("prop"),
                            PropertyValue::String(String::from("value")),
                        ),
                        (String::from("num"), PropertyValue::I32(10)),
                    ],
                    raw_data_index: RawDataIndex::None,
                },
                ObjectMetaData {
                    path: String::from("/'Group'/'Channel1'"),
                    properties: vec![],
                    raw_data_index: RawDataIndex::RawData(RawDataMeta {
                        data_type: DataType::I32,
                        number_of_values: 2,
                        total_size_bytes: None,
                    }),
                },
            ],
        };

        let output = write_meta_to_buffer(meta, expected_buffer.len());
        assert_eq!(output, expected_buffer);
    }

    #[test]
    fn test_properties_raw_data_matches() {
        //example from NI "TDMS internal file format"
        let test_buffer = [
            0x02, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x2F, 0x27, 0x47, 0x72, 0x6F, 0x75,
            0x70, 0x27, 0xFF, 0xFF, 0xFF, 0xFF, 0x02, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
            0x70, 0x72, 0x6F, 0x70, 0x20, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x76, 0x61,
            0x6C, 0x75, 0x65, 0x03, 0x00, 0x00, 0x00, 0x6E, 0x75, 0x6D, 0x03, 0x00, 0x00, 0x00,
            0x0A, 0x00, 0x00, 0x00, 0x13, 0x00, 0x00, 0x00, 0x2F, 0x27, 0x47, 0x72, 0x6F, 0x75,
            0x70, 0x27, 0x2F, 0x27, 0x43, 0x68, 0x61, 0x6E, 0x6E, 0x65, 0x6C, 0x31, 0x27, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let mut cursor = Cursor::new(test_buffer);
        let mut reader = LittleEndianReader::from_reader(&mut cursor);
        let length: u32 = reader.read_value().unwrap();
        let objects: Vec<ObjectMetaData> = reader.read_vec(length as usize).unwrap();

        let expected = vec![
            ObjectMetaData {
                path: String::from("/'Group'"),
                properties: vec![
                    (
                        String::from("prop"),
                        PropertyValue::String(String::from("value")),
                    ),
                    (String::from("num"), PropertyValue::I32(10)),
                ],
                raw_data_index: RawDataIndex::None,
            },
            ObjectMetaData {
                path: String::from("/'Group'/'Channel1'"),
                properties: vec![],
                raw_data_index: RawDataIndex::MatchPrevious,
            },
        ];

        assert_eq!(objects, expected);
    }

    #[test]
    fn test_string_raw_index_round_trip() {
        let index = RawDataIndex::RawData(RawDataMeta {
            data_type: DataType::TdmsString,
            number_of_values: 5,
            total_size_bytes: Some(30),
        });

        let bytes = write_meta_to_buffer(index.clone(), 28);
        // length field includes itself, then type, dims, count, block size.
        assert_eq!(&bytes[0..4], &28u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0x20u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
        assert_eq!(&bytes[12..20], &5u64.to_le_bytes());
        assert_eq!(&bytes[20..28], &30u64.to_le_bytes());

        let mut cursor = Cursor::new(bytes);
        let mut reader = LittleEndianReader::from_reader(&mut cursor);
        let read_back: RawDataIndex = reader.read_meta().unwrap();
        assert_eq!(read_back, index);
    }

    #[test]
    fn test_timestamp_property_round_trip() {
        let value = PropertyValue::TimeStamp(Timestamp::new(3_761_827_200, 1 << 62));
        let bytes = write_meta_to_buffer(value.clone(), 20);

        let mut cursor = Cursor::new(bytes);
        let mut reader = LittleEndianReader::from_reader(&mut cursor);
        let read_back: PropertyValue = reader.read_meta().unwrap();
        assert_eq!(read_back, value);
    }

    #[test]
    fn test_daqmx_raw_index_rejected() {
        let mut buffer = Vec::new();
        buffer.extend(0x6912_1000u32.to_le_bytes());
        let mut cursor = Cursor::new(buffer);
        let mut reader = LittleEndianReader::from_reader(&mut cursor);
        let result: Result<RawDataIndex, TdmsError> = reader.read_meta();
        assert!(matches!(result, Err(TdmsError::UnknownTypeTag(_))));
    }

    #[test]
    fn test_property_accessor_mismatch() {
        let value = PropertyValue::I32(42);
        assert_eq!(value.as_i32().unwrap(), 42);
        let error = value.as_str().unwrap_err();
        assert!(matches!(
            error,
            TdmsError::TypeMismatch {
                expected: DataType::TdmsString,
                actual: DataType::I32
            }
        ));
    }
}
