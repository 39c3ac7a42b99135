//! Module for more complex queries into the index.
//!
//! The base module handles basic recall but this enables queries such as
//! getting all groups or the channel listing.

use std::collections::BTreeSet;

use super::Index;
use crate::paths::{group_of_path, ObjectPath};

impl Index {
    /// Get all of the objects stored in the index.
    pub fn all_paths(&self) -> impl Iterator<Item = ObjectPath<'_>> {
        self.objects.keys().map(|path| path.as_str())
    }

    /// All group names, whether the group object was written explicitly or
    /// only implied by a channel path.
    pub fn group_names(&self) -> BTreeSet<String> {
        self.all_paths()
            .filter_map(|path| group_of_path(path).ok().flatten())
            .collect()
    }

    /// Channel paths in the order they first produced data.
    pub fn channel_paths(&self) -> &[String] {
        &self.channel_order
    }
}
