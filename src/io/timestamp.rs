//! The timestamp type is a 128 bit value made of whole seconds since the
//! 1904 epoch and positive fractions of a second in units of 2^-64.
//!
//! Little endian files store the fractions first, big endian files store the
//! seconds first.

use std::fmt::Display;
use std::io::{Read, Write};

use super::data_types::{DataType, StorageResult, TdmsChannelType, TdmsStorageType};

/// Seconds between 1904-01-01T00:00:00Z and 1970-01-01T00:00:00Z.
const EPOCH_DELTA_SECONDS: i64 = 2_082_844_800;
const NS_PER_SECOND: u64 = 1_000_000_000;
const TIMESTAMP_SIZE: usize = 16;

/// A TDMS timestamp.
///
/// `seconds` counts from 1904-01-01T00:00:00 UTC and may be negative,
/// `fractions` adds `fractions * 2^-64` seconds on top.
///
/// Conversions to and from unix nanoseconds round to the nearest nanosecond
/// and round trip within ±1 ns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub seconds: i64,
    pub fractions: u64,
}

impl Timestamp {
    pub fn new(seconds: i64, fractions: u64) -> Self {
        Self { seconds, fractions }
    }

    /// Build a timestamp from nanoseconds since the unix epoch.
    pub fn from_unix_ns(nanoseconds: i64) -> Self {
        let seconds = nanoseconds.div_euclid(NS_PER_SECOND as i64);
        let remainder_ns = nanoseconds.rem_euclid(NS_PER_SECOND as i64) as u128;
        // Scale the remainder to 2^-64 seconds, rounding to nearest.
        let fractions = ((remainder_ns << 64) + (NS_PER_SECOND as u128) / 2) / NS_PER_SECOND as u128;
        Self {
            seconds: seconds + EPOCH_DELTA_SECONDS,
            fractions: fractions as u64,
        }
    }

    /// Nanoseconds since the unix epoch, rounded to nearest.
    pub fn to_unix_ns(&self) -> i64 {
        let scaled = (self.fractions as u128) * (NS_PER_SECOND as u128) + (1u128 << 63);
        let mut fraction_ns = (scaled >> 64) as i64;
        let mut seconds = self.seconds - EPOCH_DELTA_SECONDS;
        // Rounding can carry into the next whole second.
        if fraction_ns == NS_PER_SECOND as i64 {
            fraction_ns = 0;
            seconds += 1;
        }
        seconds * NS_PER_SECOND as i64 + fraction_ns
    }

    #[cfg(feature = "chrono")]
    pub fn from_datetime(datetime: chrono::DateTime<chrono::Utc>) -> Self {
        let nanoseconds = datetime
            .timestamp()
            .saturating_mul(NS_PER_SECOND as i64)
            .saturating_add(datetime.timestamp_subsec_nanos() as i64);
        Self::from_unix_ns(nanoseconds)
    }

    #[cfg(feature = "chrono")]
    pub fn to_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let nanoseconds = self.to_unix_ns();
        chrono::DateTime::from_timestamp(
            nanoseconds.div_euclid(NS_PER_SECOND as i64),
            nanoseconds.rem_euclid(NS_PER_SECOND as i64) as u32,
        )
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s + {}/2^64", self.seconds, self.fractions)
    }
}

impl TdmsChannelType for Timestamp {}

impl TdmsStorageType for Timestamp {
    const SUPPORTED_TYPES: &'static [DataType] = &[DataType::TimeStamp];
    const NATURAL_TYPE: DataType = DataType::TimeStamp;
    const SIZE_BYTES: usize = TIMESTAMP_SIZE;

    fn read_le(reader: &mut impl Read) -> StorageResult<Self> {
        let fractions = u64::read_le(reader)?;
        let seconds = i64::read_le(reader)?;
        Ok(Self { seconds, fractions })
    }

    fn read_be(reader: &mut impl Read) -> StorageResult<Self> {
        let seconds = i64::read_be(reader)?;
        let fractions = u64::read_be(reader)?;
        Ok(Self { seconds, fractions })
    }

    fn write_le(&self, writer: &mut impl Write) -> StorageResult<()> {
        self.fractions.write_le(writer)?;
        self.seconds.write_le(writer)?;
        Ok(())
    }

    fn write_be(&self, writer: &mut impl Write) -> StorageResult<()> {
        self.seconds.write_be(writer)?;
        self.fractions.write_be(writer)?;
        Ok(())
    }

    fn size(&self) -> usize {
        TIMESTAMP_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_epoch_is_zero() {
        let time = Timestamp::from_unix_ns(-EPOCH_DELTA_SECONDS * NS_PER_SECOND as i64);
        assert_eq!(time, Timestamp::new(0, 0));
    }

    #[test]
    fn test_half_second_fraction() {
        let time = Timestamp::from_unix_ns(500_000_000);
        assert_eq!(time.seconds, EPOCH_DELTA_SECONDS);
        assert_eq!(time.fractions, 1u64 << 63);
    }

    #[test]
    fn test_round_trip_within_one_ns() {
        let cases = [
            0i64,
            1,
            -1,
            999_999_999,
            1_700_000_000_123_456_789,
            -2_082_844_800_000_000_000,
            i64::MAX / 4,
        ];
        for nanoseconds in cases {
            let time = Timestamp::from_unix_ns(nanoseconds);
            let difference = (time.to_unix_ns() - nanoseconds).abs();
            assert!(difference <= 1, "{nanoseconds} drifted by {difference}");
        }
    }

    #[test]
    fn test_rounding_carry_into_seconds() {
        let time = Timestamp::new(10, u64::MAX);
        // Fractions of almost a whole second round up into second 11.
        assert_eq!(
            time.to_unix_ns(),
            (10 - EPOCH_DELTA_SECONDS + 1) * NS_PER_SECOND as i64
        );
    }

    #[test]
    fn test_le_layout_fractions_first() {
        let time = Timestamp::new(3, 7);
        let mut bytes = Vec::new();
        time.write_le(&mut bytes).unwrap();
        assert_eq!(&bytes[0..8], &7u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &3i64.to_le_bytes());

        let read_back = Timestamp::read_le(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read_back, time);
    }

    #[test]
    fn test_be_layout_seconds_first() {
        let time = Timestamp::new(3, 7);
        let mut bytes = Vec::new();
        time.write_be(&mut bytes).unwrap();
        assert_eq!(&bytes[0..8], &3i64.to_be_bytes());
        assert_eq!(&bytes[8..16], &7u64.to_be_bytes());

        let read_back = Timestamp::read_be(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read_back, time);
    }
}
