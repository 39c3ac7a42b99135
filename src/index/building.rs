//! Index methods for adding segments to the index.
//!
//! This is where the incremental metadata rules are resolved: a segment
//! without a new object list inherits the previous segment's channel order
//! and a "match previous" raw index inherits the last explicit shape.

use log::debug;

use crate::{
    error::TdmsError,
    meta_data::{ObjectMetaData, RawDataIndex, RawDataMeta, Segment, LEAD_IN_BYTES},
    paths::ObjectPath,
    raw_data::{DataBlock, DataLayout, Endianness},
};

use super::{DataLocation, ObjectData, ObjectIndex};

/// Data cached for the current "active" objects which are the objects
/// that we are expecting data in the next data block.
#[derive(Debug, Clone)]
pub struct ActiveObject {
    pub path: String,
    pub shape: RawDataMeta,
}

impl ActiveObject {
    fn new(path: &str, shape: RawDataMeta) -> Self {
        Self {
            path: path.to_string(),
            shape,
        }
    }

    fn update(&mut self, meta: &ObjectMetaData) {
        if let RawDataIndex::RawData(ref shape) = meta.raw_data_index {
            self.shape = shape.clone();
        }
    }

    /// Fetch the corresponding [`ObjectData`] for the active object in a mutable form.
    fn get_object_data_mut<'c>(&self, index: &'c mut ObjectIndex) -> &'c mut ObjectData {
        index
            .get_mut(&self.path)
            .expect("Should always have a registered version of active object")
    }
}

impl super::Index {
    /// Add the data for the next segment read from the file.
    ///
    /// Returns the start position of the next segment.
    pub fn add_segment(&mut self, segment: Segment) -> Result<u64, TdmsError> {
        self.add_segment_internal(segment, false)
    }

    /// Add a final segment whose lead in promised more data than the file
    /// holds. Partial chunks are dropped from the logical view.
    ///
    /// The caller must have replaced the truncation sentinel with the
    /// effective segment length first.
    pub fn add_truncated_segment(&mut self, segment: Segment) -> Result<(), TdmsError> {
        self.add_segment_internal(segment, true)?;
        Ok(())
    }

    fn add_segment_internal(&mut self, segment: Segment, lenient: bool) -> Result<u64, TdmsError> {
        //Basic procedure.
        //1. If new object list is set, clear active objects.
        //2. Update the active object list - adding new objects or updating
        //   properties and shapes for existing objects.
        //3. If the segment has raw data, describe it as a data block against
        //   the active objects.

        if segment.toc.contains_new_object_list {
            self.active_objects.clear();
        }

        if let Some(meta_data) = &segment.meta_data {
            for obj in meta_data.objects.iter() {
                match obj.raw_data_index {
                    RawDataIndex::None => self.update_meta_object(obj)?,
                    _ => self.update_or_activate_data_object(obj)?,
                }
            }
        }

        if segment.toc.contains_raw_data {
            let block = self.build_data_block(&segment)?;
            let chunks = if lenient {
                block.chunk_count_lenient()
            } else {
                block.chunk_count()?
            };
            self.insert_data_block(block, chunks)?;
        }

        debug!(
            "Indexed segment {} at {} ({} active channels)",
            self.segments,
            self.next_segment_start,
            self.active_objects.len()
        );

        self.segments += 1;
        let segment_size = segment.total_size_bytes()?;
        match self.next_segment_start.checked_add(segment_size) {
            Some(next_segment_start) => self.next_segment_start = next_segment_start,
            None => return Err(TdmsError::SegmentAddressOverflow),
        }
        Ok(self.next_segment_start)
    }

    fn build_data_block(&self, segment: &Segment) -> Result<DataBlock, TdmsError> {
        if self.active_objects.is_empty() {
            return Err(TdmsError::ZeroChannelDataBlock);
        }
        if segment.raw_data_offset > segment.next_segment_offset {
            return Err(TdmsError::InvalidRawOffset);
        }

        let byte_order = if segment.toc.big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        };
        let layout = if segment.toc.data_is_interleaved {
            DataLayout::Interleaved
        } else {
            DataLayout::Contiguous
        };

        let channels = self
            .active_objects
            .iter()
            .map(|active| active.shape.clone())
            .collect();

        DataBlock::new(
            self.next_segment_start + LEAD_IN_BYTES + segment.raw_data_offset,
            segment.raw_data_length()?,
            layout,
            byte_order,
            channels,
        )
    }

    fn insert_data_block(&mut self, block: DataBlock, chunks: u64) -> Result<(), TdmsError> {
        let data_index = self.data_blocks.len();
        self.data_blocks.push(block);

        for (channel_index, active_object) in self.active_objects.iter_mut().enumerate() {
            let number_of_samples = active_object
                .shape
                .number_of_values
                .checked_mul(chunks)
                .ok_or(TdmsError::SegmentAddressOverflow)?;
            if number_of_samples == 0 {
                continue;
            }
            let location = DataLocation {
                data_block: data_index,
                channel_index,
                number_of_samples,
            };
            active_object
                .get_object_data_mut(&mut self.objects)
                .add_data_location(location);
        }
        Ok(())
    }

    /// Activate Data Object
    ///
    /// Adds the object by path to the active objects. Creates it if it doesn't exist.
    fn update_or_activate_data_object(&mut self, object: &ObjectMetaData) -> Result<(), TdmsError> {
        let matching_active = self
            .active_objects
            .iter_mut()
            .find(|active_object| active_object.path == object.path);

        match matching_active {
            Some(active_object) => {
                active_object.update(object);
                active_object
                    .get_object_data_mut(&mut self.objects)
                    .update(object)?;
            }
            None => {
                self.update_meta_object(object)?;
                // Must fetch the stored shape in case this is match previous.
                let shape = self
                    .channel_shape(&object.path)
                    .ok_or_else(|| TdmsError::NoPreviousShape(object.path.clone()))?;

                self.active_objects.push(ActiveObject::new(&object.path, shape));
            }
        }

        if !self.channel_order.iter().any(|path| path == &object.path) {
            self.channel_order.push(object.path.clone());
        }
        Ok(())
    }

    /// Update Meta Only Object
    ///
    /// Update an object which contains no data.
    fn update_meta_object(&mut self, object: &ObjectMetaData) -> Result<(), TdmsError> {
        match self.objects.get_mut(&object.path) {
            Some(found_object) => found_object.update(object),
            None => {
                let object_data = ObjectData::from_metadata(object)?;
                let old = self.objects.insert(object_data.path.clone(), object_data);
                assert!(
                    old.is_none(),
                    "Should not be possible to be replacing an existing object."
                );
                Ok(())
            }
        }
    }

    /// Get the last explicit shape for the channel.
    ///
    /// Returns none if we have no channel or it never carried data.
    fn channel_shape(&self, path: ObjectPath) -> Option<RawDataMeta> {
        self.objects
            .get(path)
            .and_then(|object| object.latest_shape.clone())
    }
}
