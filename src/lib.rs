//! A segment-streaming reader and writer for TDMS 2.0 files.
//!
//! TDMS files are an ordered chain of self describing segments, each holding
//! a lead in, an object list with properties and raw data indexes, and a raw
//! data block. This crate implements the binary codec, the incremental
//! metadata rules the writer uses to avoid repeating unchanged channel
//! lists, a single pass read index, chunked data gathering and a
//! defragmentation pass.
//!
//! # Writing
//!
//! ```no_run
//! use tdms_stream::{TdmsFileWriter, TdmsError};
//!
//! # fn main() -> Result<(), TdmsError> {
//! let mut writer = TdmsFileWriter::create("measurements.tdms")?;
//! writer.set_file_property("title", "bench run 4");
//! writer.set_channel_property("acquisition", "voltage", "unit", "V");
//! writer.write_data("acquisition", "voltage", &[1.2f64, 1.3, 1.25])?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Reading
//!
//! ```no_run
//! use tdms_stream::{TdmsFileReader, TdmsError};
//!
//! # fn main() -> Result<(), TdmsError> {
//! let mut reader = TdmsFileReader::open("measurements.tdms")?;
//! let voltage: Vec<f64> = reader.read_data("acquisition", "voltage")?;
//! for chunk in reader.iter_data::<f64>("acquisition", "voltage", 1024)? {
//!     let window = chunk?;
//!     // process the window without holding the whole channel in memory
//! }
//! # Ok(())
//! # }
//! ```

mod defrag;
mod error;
mod index;
mod io;
mod meta_data;
mod paths;
mod raw_data;
mod reader;
mod rotating;
mod sidecar;
mod writer;

pub use defrag::defragment;
pub use error::TdmsError;
pub use io::data_types::{DataType, TdmsChannelType, TdmsStorageType};
pub use io::timestamp::Timestamp;
pub use meta_data::PropertyValue;
pub use paths::{ChannelPath, PropertyPath};
pub use reader::{DataChunks, StringChunks, TdmsFileReader};
pub use rotating::RotatingTdmsWriter;
pub use writer::TdmsFileWriter;
