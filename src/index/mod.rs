//! The index module creates the data structure which acts as
//! an in memory index of the file contents.
//!
//! This stores the known objects, their accumulated properties and the
//! location of every piece of channel data so reads never rescan the file.

mod building;
mod querying;

use std::collections::BTreeMap;

use crate::error::TdmsError;
use crate::io::data_types::DataType;
use crate::meta_data::{ObjectMetaData, PropertyValue, RawDataIndex, RawDataMeta};
use crate::paths::{ChannelPath, PropertyPath};
use crate::raw_data::DataBlock;

/// A store for a given channel pointing to the data block with its data and
/// the index within that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLocation {
    /// The index of the data block with the data in.
    pub data_block: usize,
    /// The channel index in that block.
    pub channel_index: usize,
    /// The number of samples in this location
    pub number_of_samples: u64,
}

/// Contains the data stored in the index for each object.
#[derive(Clone, PartialEq, Debug)]
struct ObjectData {
    path: String,
    properties: BTreeMap<String, PropertyValue>,
    data_locations: Vec<DataLocation>,
    /// The declared element type. Fixed once a raw data index has named it.
    data_type: Option<DataType>,
    /// The most recent explicit shape, used to resolve "match previous".
    latest_shape: Option<RawDataMeta>,
}

impl ObjectData {
    /// Create the object data from the file metadata.
    fn from_metadata(meta: &ObjectMetaData) -> Result<Self, TdmsError> {
        let mut new = Self {
            path: meta.path.clone(),
            properties: BTreeMap::new(),
            data_locations: vec![],
            data_type: None,
            latest_shape: None,
        };

        new.update(meta)?;

        Ok(new)
    }

    /// Update the object data from a new metadata object.
    ///
    /// For example update new properties.
    fn update(&mut self, other: &ObjectMetaData) -> Result<(), TdmsError> {
        for (name, value) in other.properties.iter() {
            self.properties.insert(name.clone(), value.clone());
        }

        if let RawDataIndex::RawData(shape) = &other.raw_data_index {
            match self.data_type {
                Some(declared) if declared != shape.data_type => {
                    return Err(TdmsError::TypeChangedMidStream {
                        path: self.path.clone(),
                        declared,
                        new: shape.data_type,
                    });
                }
                _ => self.data_type = Some(shape.data_type),
            }
            self.latest_shape = Some(shape.clone());
        }
        Ok(())
    }

    /// Add a new data location.
    fn add_data_location(&mut self, location: DataLocation) {
        self.data_locations.push(location);
    }

    /// Fetch all the properties as an array.
    fn get_all_properties(&self) -> Vec<(&String, &PropertyValue)> {
        self.properties.iter().collect()
    }
}

/// The inner format for registering the objects.
type ObjectIndex = BTreeMap<String, ObjectData>;

#[derive(Default, Debug, Clone)]
pub struct Index {
    active_objects: Vec<building::ActiveObject>,
    objects: ObjectIndex,
    /// Channel paths in order of first appearance with a raw data index.
    channel_order: Vec<String>,
    data_blocks: Vec<DataBlock>,
    next_segment_start: u64,
    segments: usize,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segment_count(&self) -> usize {
        self.segments
    }

    pub fn channel_count(&self) -> usize {
        self.channel_order.len()
    }

    /// Get all of the properties for the given object.
    ///
    /// Returns none if the object does not exist.
    pub fn get_object_properties(
        &self,
        path: &PropertyPath,
    ) -> Option<Vec<(&String, &PropertyValue)>> {
        self.objects
            .get(path.path())
            .map(|object| object.get_all_properties())
    }

    /// Get the property value for the given object.
    ///
    /// Returns none at either level if the object or the property is missing.
    pub fn get_object_property(&self, path: &PropertyPath, property: &str) -> Option<&PropertyValue> {
        self.objects
            .get(path.path())
            .and_then(|object| object.properties.get(property))
    }

    pub fn contains_object(&self, path: &PropertyPath) -> bool {
        self.objects.contains_key(path.path())
    }

    pub fn get_channel_data_positions(&self, path: &ChannelPath) -> Option<&[DataLocation]> {
        self.objects
            .get(path.path())
            .map(|object| &object.data_locations[..])
    }

    /// The declared element type of a channel.
    ///
    /// Returns None if the channel does not exist or never declared data.
    pub fn channel_type(&self, path: &ChannelPath) -> Option<DataType> {
        self.objects.get(path.path()).and_then(|object| object.data_type)
    }

    /// Get the length of the channel.
    ///
    /// Returns None if the channel does not exist.
    pub fn channel_length(&self, path: &ChannelPath) -> Option<u64> {
        self.objects.get(path.path()).map(|object| {
            object
                .data_locations
                .iter()
                .map(|location| location.number_of_samples)
                .sum()
        })
    }

    pub fn get_data_block(&self, index: usize) -> Option<&DataBlock> {
        self.data_blocks.get(index)
    }
}
