//! Holds the capabilities for accessing the raw data blocks.
//!
//! A block may repeat the same payload shape many times (chunks) so the
//! geometry calculations and the multi-chunk gather live here, along with
//! the variable length string block format.

use std::io::{Read, Seek};

use crate::error::TdmsError;
use crate::io::data_types::TdmsStorageType;
use crate::io::reader::{BigEndianReader, LittleEndianReader, TdmsReader};
use crate::meta_data::RawDataMeta;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DataLayout {
    Interleaved,
    Contiguous,
}

impl std::fmt::Display for DataLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataLayout::Interleaved => write!(f, "Interleaved"),
            DataLayout::Contiguous => write!(f, "Contiguous"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Endianness {
    Big,
    Little,
}

/// Defines the size of the chunk and whether it is fixed or variable.
///
/// String data makes it variable.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChunkSize {
    Fixed(u64),
    Variable(u64),
}

impl ChunkSize {
    /// The sizes always add together, but a variable input always produces
    /// a variable output.
    fn combine(&mut self, rhs: Self) -> Result<(), TdmsError> {
        let (ChunkSize::Fixed(size) | ChunkSize::Variable(size)) = rhs;
        let variable = matches!(rhs, ChunkSize::Variable(_));
        match self {
            ChunkSize::Fixed(existing) | ChunkSize::Variable(existing) => {
                let total = existing
                    .checked_add(size)
                    .ok_or(TdmsError::SegmentAddressOverflow)?;
                if variable {
                    *self = ChunkSize::Variable(total);
                } else {
                    *existing = total;
                }
            }
        }
        Ok(())
    }

    pub fn bytes(&self) -> u64 {
        match self {
            ChunkSize::Fixed(size) | ChunkSize::Variable(size) => *size,
        }
    }
}

/// Encode a string channel block: a table of cumulative end offsets
/// followed by the concatenated UTF-8 bytes. Always little endian.
pub fn encode_string_block(values: &[String]) -> Vec<u8> {
    let byte_total: usize = values.iter().map(|value| value.len()).sum();
    let mut block = Vec::with_capacity(4 * values.len() + byte_total);
    let mut end = 0u32;
    for value in values {
        end += value.len() as u32;
        block.extend_from_slice(&end.to_le_bytes());
    }
    for value in values {
        block.extend_from_slice(value.as_bytes());
    }
    block
}

/// Represents a block of data inside the file for fast random access.
#[derive(Clone, PartialEq, Debug)]
pub struct DataBlock {
    /// Absolute file offset of the first payload byte.
    pub start: u64,
    pub length: u64,
    pub layout: DataLayout,
    pub channels: Vec<RawDataMeta>,
    pub byte_order: Endianness,
}

impl DataBlock {
    pub fn new(
        start: u64,
        length: u64,
        layout: DataLayout,
        byte_order: Endianness,
        channels: Vec<RawDataMeta>,
    ) -> Result<Self, TdmsError> {
        if channels.is_empty() {
            return Err(TdmsError::ZeroChannelDataBlock);
        }
        Ok(DataBlock {
            start,
            length,
            layout,
            channels,
            byte_order,
        })
    }

    /// Calculate the expected size of a single data chunk.
    ///
    /// A data chunk is the raw data written in a single write to the file and
    /// described in the header.
    pub fn chunk_size(&self) -> Result<ChunkSize, TdmsError> {
        let mut size = ChunkSize::Fixed(0);
        for channel in &self.channels {
            let bytes = channel
                .chunk_bytes()
                .ok_or(TdmsError::SegmentAddressOverflow)?;
            match channel.total_size_bytes {
                Some(_) => size.combine(ChunkSize::Variable(bytes))?,
                None => size.combine(ChunkSize::Fixed(bytes))?,
            }
        }
        Ok(size)
    }

    /// The number of repeats of the payload shape in this block.
    ///
    /// The block length must be a whole number of chunks.
    pub fn chunk_count(&self) -> Result<u64, TdmsError> {
        let stride = self.chunk_size()?;
        let malformed = TdmsError::MalformedChunking {
            block_size: self.length,
            stride: stride.bytes(),
        };
        match stride {
            ChunkSize::Fixed(0) => {
                if self.length == 0 {
                    Ok(0)
                } else {
                    Err(malformed)
                }
            }
            ChunkSize::Fixed(stride) => {
                if self.length % stride == 0 {
                    Ok(self.length / stride)
                } else {
                    Err(malformed)
                }
            }
            // Variable sizes cannot repeat so there is exactly one chunk.
            ChunkSize::Variable(stride) => {
                if self.length == stride {
                    Ok(1)
                } else {
                    Err(malformed)
                }
            }
        }
    }

    /// Chunk count for a truncated final segment: whole chunks only, the
    /// partial tail is dropped from the logical view.
    pub fn chunk_count_lenient(&self) -> u64 {
        match self.chunk_size() {
            Ok(ChunkSize::Fixed(0)) | Err(_) => 0,
            Ok(ChunkSize::Fixed(stride)) => self.length / stride,
            Ok(ChunkSize::Variable(stride)) => {
                if stride <= self.length {
                    1
                } else {
                    0
                }
            }
        }
    }

    /// Byte offset of the channel from the start of a chunk.
    fn channel_chunk_offset(&self, channel_index: usize) -> Result<u64, TdmsError> {
        let mut offset = 0u64;
        for channel in &self.channels[..channel_index] {
            offset = offset
                .checked_add(
                    channel
                        .chunk_bytes()
                        .ok_or(TdmsError::SegmentAddressOverflow)?,
                )
                .ok_or(TdmsError::SegmentAddressOverflow)?;
        }
        Ok(offset)
    }

    /// One row of an interleaved chunk holds a single sample of every channel.
    fn interleaved_row_bytes(&self) -> u64 {
        self.channels
            .iter()
            .map(|channel| channel.data_type.size())
            .sum()
    }

    fn interleaved_element_offset(&self, channel_index: usize) -> u64 {
        self.channels[..channel_index]
            .iter()
            .map(|channel| channel.data_type.size())
            .sum()
    }

    /// Gather values for one channel, appending to `output`.
    ///
    /// Starts at `start_sample` within this block's share of the channel and
    /// reads at most `max_samples`. Returns the number of samples read.
    pub fn read_channel<T: TdmsStorageType>(
        &self,
        file: &mut (impl Read + Seek),
        channel_index: usize,
        start_sample: u64,
        max_samples: u64,
        output: &mut Vec<T>,
    ) -> Result<u64, TdmsError> {
        match self.byte_order {
            Endianness::Little => self.read_channel_inner(
                &mut LittleEndianReader::from_reader(file),
                channel_index,
                start_sample,
                max_samples,
                output,
            ),
            Endianness::Big => self.read_channel_inner(
                &mut BigEndianReader::from_reader(file),
                channel_index,
                start_sample,
                max_samples,
                output,
            ),
        }
    }

    fn read_channel_inner<R: Read + Seek, T: TdmsStorageType>(
        &self,
        reader: &mut impl TdmsReader<R>,
        channel_index: usize,
        start_sample: u64,
        max_samples: u64,
        output: &mut Vec<T>,
    ) -> Result<u64, TdmsError> {
        let meta = &self.channels[channel_index];
        let per_chunk = meta.number_of_values;
        if per_chunk == 0 {
            return Ok(0);
        }
        let chunks = self.chunk_count_lenient();
        let total = per_chunk * chunks;
        if start_sample >= total {
            return Ok(0);
        }
        let to_read = (total - start_sample).min(max_samples);
        let stride = self.chunk_size()?.bytes();
        let element_size = meta.data_type.size();

        match self.layout {
            DataLayout::Contiguous => {
                let channel_offset = self.channel_chunk_offset(channel_index)?;
                let mut remaining = to_read;
                let mut chunk = start_sample / per_chunk;
                let mut within = start_sample % per_chunk;
                while remaining > 0 {
                    let take = (per_chunk - within).min(remaining);
                    let position =
                        self.start + chunk * stride + channel_offset + within * element_size;
                    reader.to_file_position(position)?;
                    for _ in 0..take {
                        output.push(reader.read_value()?);
                    }
                    remaining -= take;
                    chunk += 1;
                    within = 0;
                }
            }
            DataLayout::Interleaved => {
                let row_bytes = self.interleaved_row_bytes();
                let element_offset = self.interleaved_element_offset(channel_index);
                let skip = (row_bytes - element_size) as i64;
                for sample in start_sample..start_sample + to_read {
                    let chunk = sample / per_chunk;
                    let row = sample % per_chunk;
                    if row == 0 || sample == start_sample {
                        let position =
                            self.start + chunk * stride + row * row_bytes + element_offset;
                        reader.to_file_position(position)?;
                    }
                    output.push(reader.read_value()?);
                    reader.move_position(skip)?;
                }
            }
        }
        Ok(to_read)
    }

    /// Gather strings for one channel, appending to `output`.
    ///
    /// Strings are only defined for contiguous blocks.
    pub fn read_channel_strings(
        &self,
        file: &mut (impl Read + Seek),
        channel_index: usize,
        start_sample: u64,
        max_samples: u64,
        output: &mut Vec<String>,
    ) -> Result<u64, TdmsError> {
        if self.layout == DataLayout::Interleaved {
            return Err(TdmsError::MalformedChunking {
                block_size: self.length,
                stride: 0,
            });
        }
        match self.byte_order {
            Endianness::Little => self.read_channel_strings_inner(
                &mut LittleEndianReader::from_reader(file),
                channel_index,
                start_sample,
                max_samples,
                output,
            ),
            Endianness::Big => self.read_channel_strings_inner(
                &mut BigEndianReader::from_reader(file),
                channel_index,
                start_sample,
                max_samples,
                output,
            ),
        }
    }

    fn read_channel_strings_inner<R: Read + Seek>(
        &self,
        reader: &mut impl TdmsReader<R>,
        channel_index: usize,
        start_sample: u64,
        max_samples: u64,
        output: &mut Vec<String>,
    ) -> Result<u64, TdmsError> {
        let meta = &self.channels[channel_index];
        let count = meta.number_of_values;
        if count == 0 || start_sample >= count || self.chunk_count_lenient() == 0 {
            return Ok(0);
        }
        let to_read = (count - start_sample).min(max_samples);
        let block_bytes = meta
            .total_size_bytes
            .ok_or(TdmsError::MalformedString)?;
        let table_bytes = 4u64
            .checked_mul(count)
            .ok_or(TdmsError::SegmentAddressOverflow)?;
        if block_bytes < table_bytes {
            return Err(TdmsError::MalformedString);
        }
        let byte_area = block_bytes - table_bytes;

        let table_start = self.start + self.channel_chunk_offset(channel_index)?;
        reader.to_file_position(table_start)?;
        let mut offsets = Vec::new();
        offsets
            .try_reserve(count as usize)
            .map_err(|_| TdmsError::MalformedString)?;
        let mut previous = 0u32;
        for _ in 0..count {
            let end: u32 = reader.read_value()?;
            if end < previous || end as u64 > byte_area {
                return Err(TdmsError::MalformedString);
            }
            offsets.push(end);
            previous = end;
        }

        let range_start = if start_sample == 0 {
            0
        } else {
            offsets[start_sample as usize - 1]
        };
        let bytes_start = table_start + table_bytes + range_start as u64;
        reader.to_file_position(bytes_start)?;

        let mut cursor = range_start;
        for index in start_sample..start_sample + to_read {
            let end = offsets[index as usize];
            let length = (end - cursor) as usize;
            let mut buffer = vec![0u8; length];
            reader
                .buffered_reader()
                .read_exact(&mut buffer)
                .map_err(|e| {
                    if e.kind() == std::io::ErrorKind::UnexpectedEof {
                        TdmsError::MalformedString
                    } else {
                        TdmsError::Io(e)
                    }
                })?;
            output.push(String::from_utf8(buffer)?);
            cursor = end;
        }
        Ok(to_read)
    }
}
