//! The write engine.
//!
//! The writer buffers property mutations and channel data between flushes
//! and emits each flush as one segment, using the incremental metadata
//! rules to avoid repeating an unchanged channel list.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use log::debug;

use crate::error::TdmsError;
use crate::io::data_types::{DataType, TdmsChannelType};
use crate::io::writer::{LittleEndianWriter, TdmsWriter};
use crate::meta_data::{
    MetaData, ObjectMetaData, PropertyValue, RawDataIndex, RawDataMeta, ToC, LEAD_IN_BYTES,
};
use crate::paths::{ChannelPath, PropertyPath};
use crate::raw_data::encode_string_block;
use crate::sidecar;

/// Writes segments to the data file and mirrors lead in + metadata to the
/// index sidecar.
pub(crate) struct SegmentSink {
    data: LittleEndianWriter<File>,
    index: LittleEndianWriter<File>,
    bytes_written: u64,
    segments_written: u64,
}

impl SegmentSink {
    pub(crate) fn create(path: &Path) -> Result<Self, TdmsError> {
        let data_file = File::create(path)?;
        let index_file = File::create(sidecar::sidecar_path(path))?;
        Ok(Self {
            data: LittleEndianWriter::from_writer(data_file),
            index: LittleEndianWriter::from_writer(index_file),
            bytes_written: 0,
            segments_written: 0,
        })
    }

    fn write_segment(
        &mut self,
        toc: ToC,
        meta: Option<MetaData>,
        raw_data: Option<&[u8]>,
    ) -> Result<(), TdmsError> {
        let segment = self.data.write_segment(toc, meta, raw_data)?;

        // The sidecar repeats the lead in with the main file offsets, the
        // raw block is simply not present.
        self.index.write_lead_in(
            segment.toc,
            segment.next_segment_offset,
            segment.raw_data_offset,
        )?;
        if let Some(meta_data) = &segment.meta_data {
            self.index.write_meta(meta_data)?;
        }

        self.bytes_written += LEAD_IN_BYTES + segment.next_segment_offset;
        self.segments_written += 1;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), TdmsError> {
        self.data.sync()?;
        self.index.sync()
    }
}

/// Data buffered for one channel until the next flush.
enum PendingData {
    Numeric {
        data_type: DataType,
        bytes: Vec<u8>,
        values: u64,
    },
    Strings {
        values: Vec<String>,
    },
}

impl PendingData {
    fn shape(&self) -> RawDataMeta {
        match self {
            PendingData::Numeric {
                data_type, values, ..
            } => RawDataMeta {
                data_type: *data_type,
                number_of_values: *values,
                total_size_bytes: None,
            },
            PendingData::Strings { values } => {
                let bytes: u64 = values.iter().map(|value| value.len() as u64).sum();
                RawDataMeta {
                    data_type: DataType::TdmsString,
                    number_of_values: values.len() as u64,
                    total_size_bytes: Some(4 * values.len() as u64 + bytes),
                }
            }
        }
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            PendingData::Numeric { bytes, .. } => bytes.clone(),
            PendingData::Strings { values } => encode_string_block(values),
        }
    }
}

/// One fully resolved segment, ready to write.
///
/// Assembly is separated from committing so the rotating writer can size a
/// segment before deciding which file receives it.
pub(crate) struct SegmentParts {
    toc: ToC,
    meta: MetaData,
    payload: Option<Vec<u8>>,
    order: Vec<String>,
    shapes: Vec<(String, RawDataMeta)>,
    groups: Vec<String>,
}

impl SegmentParts {
    pub(crate) fn size(&self) -> u64 {
        use crate::meta_data::TdmsMetaData;
        let payload = self.payload.as_ref().map(|data| data.len()).unwrap_or(0);
        LEAD_IN_BYTES + self.meta.size() as u64 + payload as u64
    }
}

/// A TDMS file writer.
///
/// Writers buffer everything until [`Self::flush`] and must be closed with
/// [`Self::close`] (or created through [`Self::scoped`]) to be durable.
/// Dropping a writer abandons any pending data.
pub struct TdmsFileWriter {
    sink: SegmentSink,

    pending_file_props: BTreeMap<String, PropertyValue>,
    pending_group_props: BTreeMap<String, BTreeMap<String, PropertyValue>>,
    pending_channel_props: BTreeMap<String, BTreeMap<String, PropertyValue>>,
    pending_raw: BTreeMap<String, PendingData>,
    /// Channels with data this flush, in insertion order.
    channel_order: Vec<String>,
    /// Channels created but not yet written to a file.
    declared: Vec<String>,

    known_channels: BTreeMap<String, DataType>,
    channel_groups: BTreeMap<String, String>,

    last_emitted_order: Vec<String>,
    last_shapes: BTreeMap<String, RawDataMeta>,
    emitted_groups: BTreeSet<String>,

    // Accumulated state, replayed into a fresh file on rotation.
    all_file_props: BTreeMap<String, PropertyValue>,
    all_group_props: BTreeMap<String, BTreeMap<String, PropertyValue>>,
    all_channel_props: BTreeMap<String, BTreeMap<String, PropertyValue>>,
}

impl TdmsFileWriter {
    /// Create a new TDMS file (and its index sidecar) at the path,
    /// replacing any existing file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TdmsError> {
        Ok(Self::from_sink(SegmentSink::create(path.as_ref())?))
    }

    pub(crate) fn from_sink(sink: SegmentSink) -> Self {
        Self {
            sink,
            pending_file_props: BTreeMap::new(),
            pending_group_props: BTreeMap::new(),
            pending_channel_props: BTreeMap::new(),
            pending_raw: BTreeMap::new(),
            channel_order: Vec::new(),
            declared: Vec::new(),
            known_channels: BTreeMap::new(),
            channel_groups: BTreeMap::new(),
            last_emitted_order: Vec::new(),
            last_shapes: BTreeMap::new(),
            emitted_groups: BTreeSet::new(),
            all_file_props: BTreeMap::new(),
            all_group_props: BTreeMap::new(),
            all_channel_props: BTreeMap::new(),
        }
    }

    /// Run `f` against a fresh writer and close it on the way out, even when
    /// `f` fails.
    pub fn scoped<T>(
        path: impl AsRef<Path>,
        f: impl FnOnce(&mut TdmsFileWriter) -> Result<T, TdmsError>,
    ) -> Result<T, TdmsError> {
        let mut writer = TdmsFileWriter::create(path)?;
        let result = f(&mut writer);
        let closed = writer.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    pub fn set_file_property(&mut self, name: &str, value: impl Into<PropertyValue>) {
        let value = value.into();
        self.pending_file_props
            .insert(name.to_string(), value.clone());
        self.all_file_props.insert(name.to_string(), value);
    }

    pub fn set_group_property(&mut self, group: &str, name: &str, value: impl Into<PropertyValue>) {
        let value = value.into();
        let path = PropertyPath::group(group).path().to_string();
        self.pending_group_props
            .entry(path.clone())
            .or_default()
            .insert(name.to_string(), value.clone());
        self.all_group_props
            .entry(path)
            .or_default()
            .insert(name.to_string(), value);
    }

    pub fn set_channel_property(
        &mut self,
        group: &str,
        channel: &str,
        name: &str,
        value: impl Into<PropertyValue>,
    ) {
        let value = value.into();
        let path = ChannelPath::new(group, channel).path().to_string();
        self.pending_channel_props
            .entry(path.clone())
            .or_default()
            .insert(name.to_string(), value.clone());
        self.all_channel_props
            .entry(path)
            .or_default()
            .insert(name.to_string(), value);
    }

    /// Declare a channel and its element type before writing any data.
    ///
    /// The channel appears in the next segment with an explicit raw data
    /// index, carrying zero values if nothing is written before the flush.
    pub fn create_channel(
        &mut self,
        group: &str,
        channel: &str,
        data_type: DataType,
    ) -> Result<(), TdmsError> {
        let path = ChannelPath::new(group, channel).path().to_string();
        self.check_channel_type(&path, data_type)?;
        self.channel_groups
            .insert(path.clone(), PropertyPath::group(group).path().to_string());
        if !self.declared.contains(&path) {
            self.declared.push(path);
        }
        Ok(())
    }

    fn check_channel_type(&mut self, path: &str, data_type: DataType) -> Result<(), TdmsError> {
        match self.known_channels.get(path) {
            Some(declared) if *declared != data_type => Err(TdmsError::TypeMismatch {
                expected: *declared,
                actual: data_type,
            }),
            Some(_) => Ok(()),
            None => {
                self.known_channels.insert(path.to_string(), data_type);
                Ok(())
            }
        }
    }

    /// Buffer an array of values for the channel.
    ///
    /// The element type is fixed by the first write (or [`Self::create_channel`])
    /// and may not change.
    pub fn write_data<T: TdmsChannelType>(
        &mut self,
        group: &str,
        channel: &str,
        values: &[T],
    ) -> Result<(), TdmsError> {
        if values.is_empty() {
            return Err(TdmsError::EmptyData);
        }
        let path = ChannelPath::new(group, channel).path().to_string();
        self.check_channel_type(&path, T::NATURAL_TYPE)?;
        self.channel_groups
            .insert(path.clone(), PropertyPath::group(group).path().to_string());

        let pending = self
            .pending_raw
            .entry(path.clone())
            .or_insert_with(|| PendingData::Numeric {
                data_type: T::NATURAL_TYPE,
                bytes: Vec::new(),
                values: 0,
            });
        match pending {
            PendingData::Numeric {
                bytes,
                values: count,
                ..
            } => {
                bytes.reserve(values.len() * T::SIZE_BYTES);
                for value in values {
                    value.write_le(bytes)?;
                }
                *count += values.len() as u64;
            }
            PendingData::Strings { .. } => {
                // Unreachable while the type check holds but keep it fatal.
                return Err(TdmsError::TypeMismatch {
                    expected: DataType::TdmsString,
                    actual: T::NATURAL_TYPE,
                });
            }
        }

        if !self.channel_order.contains(&path) {
            self.channel_order.push(path);
        }
        Ok(())
    }

    /// Buffer a list of strings for the channel.
    pub fn write_strings<S: AsRef<str>>(
        &mut self,
        group: &str,
        channel: &str,
        values: &[S],
    ) -> Result<(), TdmsError> {
        if values.is_empty() {
            return Err(TdmsError::EmptyData);
        }
        let path = ChannelPath::new(group, channel).path().to_string();
        self.check_channel_type(&path, DataType::TdmsString)?;
        self.channel_groups
            .insert(path.clone(), PropertyPath::group(group).path().to_string());

        let pending = self
            .pending_raw
            .entry(path.clone())
            .or_insert_with(|| PendingData::Strings { values: Vec::new() });
        match pending {
            PendingData::Strings { values: existing } => {
                existing.extend(values.iter().map(|value| value.as_ref().to_string()));
            }
            PendingData::Numeric { data_type, .. } => {
                return Err(TdmsError::TypeMismatch {
                    expected: *data_type,
                    actual: DataType::TdmsString,
                });
            }
        }

        if !self.channel_order.contains(&path) {
            self.channel_order.push(path);
        }
        Ok(())
    }

    /// Channels to emit this flush: data carriers first, then declarations
    /// that never saw data (with zero length payloads).
    fn effective_order(&self) -> Vec<String> {
        let mut order = self.channel_order.clone();
        for path in &self.declared {
            if !self.pending_raw.contains_key(path) && !order.contains(path) {
                order.push(path.clone());
            }
        }
        order
    }

    fn zero_shape(&self, path: &str) -> RawDataMeta {
        let data_type = self
            .known_channels
            .get(path)
            .copied()
            .unwrap_or(DataType::DoubleFloat);
        RawDataMeta {
            data_type,
            number_of_values: 0,
            total_size_bytes: data_type.is_string().then_some(0),
        }
    }

    /// Resolve the pending state into a segment, without consuming it.
    ///
    /// Returns None when there is nothing to write.
    pub(crate) fn assemble(&self) -> Option<SegmentParts> {
        let order = self.effective_order();

        let nothing_pending = order.is_empty()
            && self.pending_file_props.is_empty()
            && self.pending_group_props.is_empty()
            && self.pending_channel_props.is_empty();
        if nothing_pending {
            return None;
        }

        let new_object_list = !order.is_empty() && order != self.last_emitted_order;

        let mut objects = Vec::new();

        if !self.pending_file_props.is_empty() {
            objects.push(ObjectMetaData {
                path: PropertyPath::file().path().to_string(),
                properties: self
                    .pending_file_props
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
                raw_data_index: RawDataIndex::None,
            });
        }

        // Groups with property changes, plus the groups of channels that have
        // not been introduced to this file yet.
        let mut groups: BTreeSet<String> = self.pending_group_props.keys().cloned().collect();
        for path in &order {
            if let Some(group) = self.channel_groups.get(path) {
                if !self.emitted_groups.contains(group) {
                    groups.insert(group.clone());
                }
            }
        }
        for group in &groups {
            let properties = self
                .pending_group_props
                .get(group)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default();
            objects.push(ObjectMetaData {
                path: group.clone(),
                properties,
                raw_data_index: RawDataIndex::None,
            });
        }

        // Channels carrying data this segment.
        let mut shapes = Vec::with_capacity(order.len());
        let mut payload = Vec::new();
        for path in &order {
            let shape = self
                .pending_raw
                .get(path)
                .map(|pending| pending.shape())
                .unwrap_or_else(|| self.zero_shape(path));

            let unchanged = self.last_shapes.get(path) == Some(&shape);
            let raw_data_index = if !new_object_list && unchanged {
                RawDataIndex::MatchPrevious
            } else {
                RawDataIndex::RawData(shape.clone())
            };

            let properties = self
                .pending_channel_props
                .get(path)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default();

            objects.push(ObjectMetaData {
                path: path.clone(),
                properties,
                raw_data_index,
            });

            if let Some(pending) = self.pending_raw.get(path) {
                payload.extend(pending.payload());
            }
            shapes.push((path.clone(), shape));
        }

        // Channels with only property changes this flush.
        for (path, props) in &self.pending_channel_props {
            if order.contains(path) {
                continue;
            }
            objects.push(ObjectMetaData {
                path: path.clone(),
                properties: props
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
                raw_data_index: RawDataIndex::None,
            });
        }

        let toc = ToC {
            contains_new_object_list: new_object_list,
            ..Default::default()
        };

        Some(SegmentParts {
            toc,
            meta: MetaData { objects },
            payload: (!payload.is_empty()).then_some(payload),
            order,
            shapes,
            groups: groups.into_iter().collect(),
        })
    }

    fn write_parts(&mut self, parts: SegmentParts) -> Result<(), TdmsError> {
        debug!(
            "Flushing segment: {} objects, {} payload bytes",
            parts.meta.objects.len(),
            parts.payload.as_ref().map(|data| data.len()).unwrap_or(0)
        );
        self.sink
            .write_segment(parts.toc, Some(parts.meta), parts.payload.as_deref())?;

        // Consume the pending state the parts were assembled from.
        self.pending_file_props.clear();
        self.pending_group_props.clear();
        self.pending_channel_props.clear();
        self.pending_raw.clear();
        self.channel_order.clear();
        self.declared.clear();

        if !parts.order.is_empty() {
            self.last_emitted_order = parts.order;
        }
        for (path, shape) in parts.shapes {
            self.last_shapes.insert(path, shape);
        }
        self.emitted_groups.extend(parts.groups);
        Ok(())
    }

    /// Write everything pending as one segment.
    ///
    /// A flush with nothing pending writes nothing.
    pub fn flush(&mut self) -> Result<(), TdmsError> {
        if let Some(parts) = self.assemble() {
            self.write_parts(parts)?;
        }
        Ok(())
    }

    /// Flush pending changes and make the file durable.
    pub fn close(mut self) -> Result<(), TdmsError> {
        self.flush()?;
        self.sink.sync()
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.sink.bytes_written
    }

    pub(crate) fn segments_written(&self) -> u64 {
        self.sink.segments_written
    }

    pub(crate) fn sync_sink(&mut self) -> Result<(), TdmsError> {
        self.sink.sync()
    }

    pub(crate) fn install_sink(&mut self, sink: SegmentSink) {
        self.sink = sink;
    }

    /// Forget the incremental history and stage the accumulated state so the
    /// next segment is a complete, self contained header. Used after a file
    /// rotation.
    pub(crate) fn restage_for_new_file(&mut self) {
        self.last_emitted_order.clear();
        self.last_shapes.clear();
        self.emitted_groups.clear();

        self.pending_file_props = self.all_file_props.clone();
        self.pending_group_props = self.all_group_props.clone();
        self.pending_channel_props = self.all_channel_props.clone();

        // Every known channel is re-declared with an explicit type.
        for path in self.known_channels.keys() {
            if !self.pending_raw.contains_key(path) && !self.declared.contains(path) {
                self.declared.push(path.clone());
            }
        }
    }
}
