//! Contains wrappers around readers to encode TDMS specific formatting e.g. endianess.

use std::io::{BufReader, Read, Seek};

use crate::error::TdmsError;
use crate::meta_data::TdmsMetaData;

use super::data_types::TdmsStorageType;

pub trait TdmsReader<R: Read + Seek>: Sized {
    fn from_reader(reader: R) -> Self;
    fn read_value<T: TdmsStorageType>(&mut self) -> Result<T, TdmsError>;
    fn read_meta<T: TdmsMetaData>(&mut self) -> Result<T, TdmsError> {
        T::read(self)
    }
    fn read_vec<T: TdmsMetaData>(&mut self, length: usize) -> Result<Vec<T>, TdmsError> {
        // The length comes from the file so treat allocation failure for a
        // garbage count as a malformed input rather than aborting.
        let mut vec = Vec::new();
        vec.try_reserve(length)
            .map_err(|_| TdmsError::MalformedString)?;
        for _ in 0..length {
            vec.push(self.read_meta()?);
        }
        Ok(vec)
    }
    fn buffered_reader(&mut self) -> &mut BufReader<R>;

    /// Move to an absolute position in the file.
    fn to_file_position(&mut self, position: u64) -> Result<(), TdmsError> {
        self.buffered_reader()
            .seek(std::io::SeekFrom::Start(position))?;
        Ok(())
    }

    /// Move relative to the current file position.
    fn move_position(&mut self, offset: i64) -> Result<(), TdmsError> {
        self.buffered_reader().seek_relative(offset)?;
        Ok(())
    }
}

/// Generates the reader wrapper for one byte order.
macro_rules! endian_reader {
    ($name:ident, $read_fn:ident) => {
        pub struct $name<R: Read>(BufReader<R>);

        impl<R: Read + Seek> TdmsReader<R> for $name<R> {
            fn from_reader(reader: R) -> Self {
                Self(BufReader::new(reader))
            }

            fn read_value<T: TdmsStorageType>(&mut self) -> Result<T, TdmsError> {
                T::$read_fn(&mut self.0)
            }

            fn buffered_reader(&mut self) -> &mut BufReader<R> {
                &mut self.0
            }
        }
    };
}

endian_reader!(LittleEndianReader, read_le);
endian_reader!(BigEndianReader, read_be);

#[cfg(test)]
mod tests {

    use super::*;
    use crate::io::data_types::DataType;
    use std::io::Cursor;

    #[test]
    fn test_endianness_selects_byte_order() {
        let bytes = [0x01u8, 0x02, 0x03, 0x04];

        let mut cursor = Cursor::new(bytes);
        let mut reader = LittleEndianReader::from_reader(&mut cursor);
        let value: u32 = reader.read_value().unwrap();
        assert_eq!(value, 0x0403_0201);

        let mut cursor = Cursor::new(bytes);
        let mut reader = BigEndianReader::from_reader(&mut cursor);
        let value: u32 = reader.read_value().unwrap();
        assert_eq!(value, 0x0102_0304);
    }

    #[test]
    fn test_absolute_and_relative_positioning() {
        let bytes: Vec<u8> = (0..32).collect();
        let mut cursor = Cursor::new(bytes);
        let mut reader = LittleEndianReader::from_reader(&mut cursor);

        reader.to_file_position(8).unwrap();
        let value: u8 = reader.read_value().unwrap();
        assert_eq!(value, 8);

        reader.move_position(4).unwrap();
        let value: u8 = reader.read_value().unwrap();
        assert_eq!(value, 13);

        // Backwards moves must survive the buffering.
        reader.move_position(-10).unwrap();
        let value: u8 = reader.read_value().unwrap();
        assert_eq!(value, 4);
    }

    #[test]
    fn test_read_vec_of_meta() {
        let mut buffer = Vec::new();
        buffer.extend(3u32.to_le_bytes());
        buffer.extend(0x20u32.to_le_bytes());
        let mut cursor = Cursor::new(buffer);
        let mut reader = LittleEndianReader::from_reader(&mut cursor);
        let tags: Vec<DataType> = reader.read_vec(2).unwrap();
        assert_eq!(tags, vec![DataType::I32, DataType::TdmsString]);
    }

    #[test]
    fn test_read_vec_rejects_absurd_length() {
        let mut cursor = Cursor::new(Vec::new());
        let mut reader = LittleEndianReader::from_reader(&mut cursor);
        // A garbage object count from a corrupt file must not abort.
        let result: Result<Vec<DataType>, TdmsError> = reader.read_vec(usize::MAX);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_value_past_end_is_io_error() {
        let mut cursor = Cursor::new([0u8; 2]);
        let mut reader = LittleEndianReader::from_reader(&mut cursor);
        let result: Result<u32, TdmsError> = reader.read_value();
        assert!(matches!(result, Err(TdmsError::Io(_))));
    }
}
