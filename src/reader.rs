//! The read API.
//!
//! Opening a file walks the segment chain once (or the index sidecar when it
//! is valid) to build the in memory index, after which property queries are
//! free and data reads gather exactly the bytes they need.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::TdmsError;
use crate::index::Index;
use crate::io::data_types::{DataType, TdmsChannelType};
use crate::meta_data::{PropertyValue, Segment, LEAD_IN_BYTES};
use crate::paths::{ChannelPath, PropertyPath};
use crate::raw_data::DataBlock;
use crate::sidecar;

/// A TDMS file reader.
pub struct TdmsFileReader {
    index: Index,
    file: File,
    path: PathBuf,
}

fn scan_file(file: &mut File, file_length: u64) -> Result<Index, TdmsError> {
    let mut index = Index::new();
    let mut position = 0u64;

    while position < file_length {
        // Reading buffers ahead so reposition explicitly for each segment.
        file.seek(SeekFrom::Start(position))?;
        let mut segment = Segment::read(file)?;

        if segment.is_truncated() {
            warn!("Final segment is truncated, keeping whole chunks only");
            segment.next_segment_offset = file_length - position - LEAD_IN_BYTES;
            index.add_truncated_segment(segment)?;
            break;
        }
        position = index.add_segment(segment)?;
    }
    Ok(index)
}

impl TdmsFileReader {
    /// Open the file and index its metadata ready for access.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TdmsError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let file_length = file.metadata()?.len();

        let index = match sidecar::load_segments(&path, file_length) {
            Some(segments) => {
                let mut index = Index::new();
                for segment in segments {
                    index.add_segment(segment)?;
                }
                index
            }
            None => scan_file(&mut file, file_length)?,
        };

        Ok(Self { index, file, path })
    }

    pub fn segment_count(&self) -> usize {
        self.index.segment_count()
    }

    pub fn channel_count(&self) -> usize {
        self.index.channel_count()
    }

    /// All group names in the file, sorted.
    pub fn list_groups(&self) -> Vec<String> {
        self.index.group_names().into_iter().collect()
    }

    /// Channel paths in the order they first produced data.
    pub fn list_channels(&self) -> Vec<String> {
        self.index.channel_paths().to_vec()
    }

    /// All file level properties.
    pub fn get_file_properties(&self) -> Vec<(&String, &PropertyValue)> {
        self.index
            .get_object_properties(&PropertyPath::file())
            .unwrap_or_default()
    }

    /// Group properties, or None for an unknown group.
    pub fn get_group_properties(&self, group: &str) -> Option<Vec<(&String, &PropertyValue)>> {
        self.index.get_object_properties(&PropertyPath::group(group))
    }

    /// Channel properties, or None for an unknown channel.
    pub fn get_channel_properties(
        &self,
        group: &str,
        channel: &str,
    ) -> Option<Vec<(&String, &PropertyValue)>> {
        self.index
            .get_object_properties(ChannelPath::new(group, channel).as_ref())
    }

    /// Read the property by name from the full object path.
    ///
    /// Returns Ok(None) if the object exists but the property does not.
    pub fn read_property(
        &self,
        object_path: &PropertyPath,
        property: &str,
    ) -> Result<Option<&PropertyValue>, TdmsError> {
        if !self.index.contains_object(object_path) {
            // A file with no file-level properties simply has no root object.
            if object_path.path() == "/" {
                return Ok(None);
            }
            return Err(self.missing_object_error(object_path));
        }
        Ok(self.index.get_object_property(object_path, property))
    }

    /// Read the property by name, failing if it is absent.
    pub fn property(
        &self,
        object_path: &PropertyPath,
        property: &str,
    ) -> Result<&PropertyValue, TdmsError> {
        self.read_property(object_path, property)?
            .ok_or_else(|| TdmsError::PropertyNotFound(property.to_string()))
    }

    fn missing_object_error(&self, object_path: &PropertyPath) -> TdmsError {
        match crate::paths::path_components(object_path.path()) {
            Ok(components) => match components.len() {
                2 => TdmsError::ChannelNotFound(object_path.path().to_string()),
                1 => TdmsError::GroupNotFound(components[0].clone()),
                _ => TdmsError::InvalidPath(object_path.path().to_string()),
            },
            Err(error) => error,
        }
    }

    /// The number of values in the channel.
    pub fn channel_length(&self, group: &str, channel: &str) -> Result<u64, TdmsError> {
        let path = self.resolve_channel(group, channel)?;
        Ok(self.index.channel_length(&path).unwrap_or(0))
    }

    /// The declared element type of the channel.
    pub fn channel_type(&self, group: &str, channel: &str) -> Result<DataType, TdmsError> {
        let path = self.resolve_channel(group, channel)?;
        self.index
            .channel_type(&path)
            .ok_or_else(|| TdmsError::ChannelNotFound(path.path().to_string()))
    }

    /// A channel only exists once a segment gave it a raw data index, so a
    /// property-only object is reported as missing.
    fn resolve_channel(&self, group: &str, channel: &str) -> Result<ChannelPath, TdmsError> {
        let path = ChannelPath::new(group, channel);
        if self.index.channel_type(&path).is_some() {
            return Ok(path);
        }
        if self.index.group_names().contains(group) {
            Err(TdmsError::ChannelNotFound(path.path().to_string()))
        } else {
            Err(TdmsError::GroupNotFound(group.to_string()))
        }
    }

    fn checked_channel_type(
        &self,
        group: &str,
        channel: &str,
        requested: DataType,
        supported: &[DataType],
    ) -> Result<ChannelPath, TdmsError> {
        let path = self.resolve_channel(group, channel)?;
        let declared = self
            .index
            .channel_type(&path)
            .ok_or_else(|| TdmsError::ChannelNotFound(path.path().to_string()))?;
        if !supported.contains(&declared) {
            return Err(TdmsError::TypeMismatch {
                expected: declared,
                actual: requested,
            });
        }
        Ok(path)
    }

    /// Read the channel's full contents in segment order.
    pub fn read_data<T: TdmsChannelType>(
        &mut self,
        group: &str,
        channel: &str,
    ) -> Result<Vec<T>, TdmsError> {
        let path =
            self.checked_channel_type(group, channel, T::NATURAL_TYPE, T::SUPPORTED_TYPES)?;

        let locations = self
            .index
            .get_channel_data_positions(&path)
            .unwrap_or(&[])
            .to_vec();
        let total: u64 = locations
            .iter()
            .map(|location| location.number_of_samples)
            .sum();

        let mut output = Vec::with_capacity(total as usize);
        for location in &locations {
            let block = self
                .index
                .get_data_block(location.data_block)
                .expect("Data location always references a registered block");
            block.read_channel(
                &mut self.file,
                location.channel_index,
                0,
                location.number_of_samples,
                &mut output,
            )?;
        }
        Ok(output)
    }

    /// Read the channel's full contents as strings.
    pub fn read_strings(&mut self, group: &str, channel: &str) -> Result<Vec<String>, TdmsError> {
        let path = self.checked_channel_type(
            group,
            channel,
            DataType::TdmsString,
            &[DataType::TdmsString],
        )?;

        let locations = self
            .index
            .get_channel_data_positions(&path)
            .unwrap_or(&[])
            .to_vec();

        let mut output = Vec::new();
        for location in &locations {
            let block = self
                .index
                .get_data_block(location.data_block)
                .expect("Data location always references a registered block");
            block.read_channel_strings(
                &mut self.file,
                location.channel_index,
                0,
                location.number_of_samples,
                &mut output,
            )?;
        }
        Ok(output)
    }

    fn build_plan(&self, path: &ChannelPath) -> (Vec<PlanEntry>, u64) {
        let mut plan = Vec::new();
        let mut total = 0u64;
        for location in self.index.get_channel_data_positions(path).unwrap_or(&[]) {
            let block = self
                .index
                .get_data_block(location.data_block)
                .expect("Data location always references a registered block");
            plan.push(PlanEntry {
                block: block.clone(),
                channel_index: location.channel_index,
                start: total,
                samples: location.number_of_samples,
            });
            total += location.number_of_samples;
        }
        (plan, total)
    }

    /// Iterate the channel in windows of `chunk_size` values.
    ///
    /// Every window is exactly `chunk_size` long except the last. Each pull
    /// performs only the IO for that window. The iterator holds its own file
    /// handle so several can run at once.
    pub fn iter_data<T: TdmsChannelType>(
        &self,
        group: &str,
        channel: &str,
        chunk_size: usize,
    ) -> Result<DataChunks<T>, TdmsError> {
        if chunk_size == 0 {
            return Err(TdmsError::EmptyData);
        }
        let path =
            self.checked_channel_type(group, channel, T::NATURAL_TYPE, T::SUPPORTED_TYPES)?;
        let (plan, total) = self.build_plan(&path);
        Ok(DataChunks {
            file: File::open(&self.path)?,
            plan,
            entry: 0,
            total,
            position: 0,
            chunk_size: chunk_size as u64,
            _marker: PhantomData,
        })
    }

    /// Iterate a string channel in windows of `chunk_size` values.
    pub fn iter_strings(
        &self,
        group: &str,
        channel: &str,
        chunk_size: usize,
    ) -> Result<StringChunks, TdmsError> {
        if chunk_size == 0 {
            return Err(TdmsError::EmptyData);
        }
        let path = self.checked_channel_type(
            group,
            channel,
            DataType::TdmsString,
            &[DataType::TdmsString],
        )?;
        let (plan, total) = self.build_plan(&path);
        Ok(StringChunks {
            file: File::open(&self.path)?,
            plan,
            entry: 0,
            total,
            position: 0,
            chunk_size: chunk_size as u64,
        })
    }

    pub fn close(self) {}
}

struct PlanEntry {
    block: DataBlock,
    channel_index: usize,
    /// Cumulative sample index of the first sample of this entry.
    start: u64,
    samples: u64,
}

/// Walk the plan gathering `count` samples from `position`, calling
/// `read` once per covered location.
fn gather<E>(
    plan: &[PlanEntry],
    entry: &mut usize,
    position: u64,
    count: u64,
    mut read: impl FnMut(&PlanEntry, u64, u64) -> Result<(), E>,
) -> Result<(), E> {
    let mut position = position;
    let mut remaining = count;
    while remaining > 0 {
        // The cursor only ever moves forward.
        while plan[*entry].start + plan[*entry].samples <= position {
            *entry += 1;
        }
        let current = &plan[*entry];
        let local = position - current.start;
        let take = (current.samples - local).min(remaining);
        read(current, local, take)?;
        position += take;
        remaining -= take;
    }
    Ok(())
}

/// Lazy, finite, non restartable sequence of value windows.
pub struct DataChunks<T: TdmsChannelType> {
    file: File,
    plan: Vec<PlanEntry>,
    entry: usize,
    total: u64,
    position: u64,
    chunk_size: u64,
    _marker: PhantomData<T>,
}

impl<T: TdmsChannelType> Iterator for DataChunks<T> {
    type Item = Result<Vec<T>, TdmsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.total {
            return None;
        }
        let count = self.chunk_size.min(self.total - self.position);
        let mut output = Vec::with_capacity(count as usize);

        let file = &mut self.file;
        let result = gather(
            &self.plan,
            &mut self.entry,
            self.position,
            count,
            |entry, local, take| {
                entry
                    .block
                    .read_channel(&mut *file, entry.channel_index, local, take, &mut output)
                    .map(|_| ())
            },
        );

        match result {
            Ok(()) => {
                self.position += count;
                Some(Ok(output))
            }
            Err(error) => {
                // Poison the iterator, the file position is unreliable now.
                self.position = self.total;
                Some(Err(error))
            }
        }
    }
}

/// Lazy, finite, non restartable sequence of string windows.
pub struct StringChunks {
    file: File,
    plan: Vec<PlanEntry>,
    entry: usize,
    total: u64,
    position: u64,
    chunk_size: u64,
}

impl Iterator for StringChunks {
    type Item = Result<Vec<String>, TdmsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.total {
            return None;
        }
        let count = self.chunk_size.min(self.total - self.position);
        let mut output = Vec::with_capacity(count as usize);

        let file = &mut self.file;
        let result = gather(
            &self.plan,
            &mut self.entry,
            self.position,
            count,
            |entry, local, take| {
                entry
                    .block
                    .read_channel_strings(&mut *file, entry.channel_index, local, take, &mut output)
                    .map(|_| ())
            },
        );

        match result {
            Ok(()) => {
                self.position += count;
                Some(Ok(output))
            }
            Err(error) => {
                self.position = self.total;
                Some(Err(error))
            }
        }
    }
}
