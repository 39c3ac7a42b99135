//! Rewrites a fragmented file as a single segment.

use std::path::Path;

use log::debug;

use crate::error::TdmsError;
use crate::io::data_types::DataType;
use crate::io::timestamp::Timestamp;
use crate::meta_data::PropertyValue;
use crate::paths::path_components;
use crate::reader::TdmsFileReader;
use crate::writer::TdmsFileWriter;

macro_rules! copy_channel_data {
    ($reader:ident, $writer:ident, $group:expr, $channel:expr, $data_type:expr, $type:ty) => {{
        let data: Vec<$type> = $reader.read_data($group, $channel)?;
        if data.is_empty() {
            $writer.create_channel($group, $channel, $data_type)?;
        } else {
            $writer.write_data($group, $channel, &data)?;
        }
    }};
}

/// Defragment a TDMS file.
///
/// The destination holds the same logical content as the source in a single
/// segment: final accumulated properties, every channel's full data
/// concatenated in declared order. The source is opened read only and left
/// untouched. The destination's index sidecar is regenerated.
pub fn defragment(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<(), TdmsError> {
    let mut reader = TdmsFileReader::open(source)?;
    let mut writer = TdmsFileWriter::create(dest)?;

    let file_properties: Vec<(String, PropertyValue)> = reader
        .get_file_properties()
        .into_iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    for (name, value) in file_properties {
        writer.set_file_property(&name, value);
    }

    for group in reader.list_groups() {
        let properties: Vec<(String, PropertyValue)> = reader
            .get_group_properties(&group)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for (name, value) in properties {
            writer.set_group_property(&group, &name, value);
        }
    }

    let channels = reader.list_channels();
    debug!("Defragmenting {} channels", channels.len());

    for path in channels {
        let components = path_components(&path)?;
        let (group, channel) = match &components[..] {
            [group, channel] => (group.clone(), channel.clone()),
            _ => return Err(TdmsError::InvalidPath(path)),
        };

        let properties: Vec<(String, PropertyValue)> = reader
            .get_channel_properties(&group, &channel)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for (name, value) in properties {
            writer.set_channel_property(&group, &channel, &name, value);
        }

        let data_type = reader.channel_type(&group, &channel)?;
        match data_type {
            DataType::I8 => copy_channel_data!(reader, writer, &group, &channel, data_type, i8),
            DataType::I16 => copy_channel_data!(reader, writer, &group, &channel, data_type, i16),
            DataType::I32 => copy_channel_data!(reader, writer, &group, &channel, data_type, i32),
            DataType::I64 => copy_channel_data!(reader, writer, &group, &channel, data_type, i64),
            DataType::U8 => copy_channel_data!(reader, writer, &group, &channel, data_type, u8),
            DataType::U16 => copy_channel_data!(reader, writer, &group, &channel, data_type, u16),
            DataType::U32 => copy_channel_data!(reader, writer, &group, &channel, data_type, u32),
            DataType::U64 => copy_channel_data!(reader, writer, &group, &channel, data_type, u64),
            DataType::SingleFloat => {
                copy_channel_data!(reader, writer, &group, &channel, data_type, f32)
            }
            DataType::DoubleFloat => {
                copy_channel_data!(reader, writer, &group, &channel, data_type, f64)
            }
            DataType::Boolean => {
                copy_channel_data!(reader, writer, &group, &channel, data_type, bool)
            }
            DataType::TimeStamp => {
                copy_channel_data!(reader, writer, &group, &channel, data_type, Timestamp)
            }
            DataType::TdmsString => {
                let data = reader.read_strings(&group, &channel)?;
                if data.is_empty() {
                    writer.create_channel(&group, &channel, data_type)?;
                } else {
                    writer.write_strings(&group, &channel, &data)?;
                }
            }
            DataType::Void => {
                writer.create_channel(&group, &channel, data_type)?;
            }
        }
    }

    // A single close emits everything as one segment.
    writer.close()
}
