//! IO layer: the scalar codec and the endian-aware reader/writer wrappers.

pub mod data_types;
pub mod reader;
pub mod timestamp;
pub mod writer;
