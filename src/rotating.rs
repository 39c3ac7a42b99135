//! A writer that starts a new file when the current one would grow past a
//! byte cap.
//!
//! Rotated files are numbered `base.1.ext`, `base.2.ext` and so on, and each
//! starts with a complete metadata header (every channel re-declared, every
//! property replayed) so it can be read on its own.

use std::path::{Path, PathBuf};

use log::debug;

use crate::error::TdmsError;
use crate::io::data_types::{DataType, TdmsChannelType};
use crate::meta_data::PropertyValue;
use crate::writer::{SegmentSink, TdmsFileWriter};

pub struct RotatingTdmsWriter {
    inner: TdmsFileWriter,
    base_path: PathBuf,
    max_size_bytes: u64,
    file_index: u32,
}

/// File 0 keeps the base name, later files insert the counter before the
/// extension.
fn rotated_path(base: &Path, index: u32) -> PathBuf {
    if index == 0 {
        return base.to_path_buf();
    }
    match base.extension().and_then(|ext| ext.to_str()) {
        Some(extension) => {
            let stem = base
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default();
            base.with_file_name(format!("{stem}.{index}.{extension}"))
        }
        None => {
            let name = base
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            base.with_file_name(format!("{name}.{index}"))
        }
    }
}

impl RotatingTdmsWriter {
    /// Create a rotating writer with the given file size cap in bytes.
    pub fn create(path: impl AsRef<Path>, max_size_bytes: u64) -> Result<Self, TdmsError> {
        let base_path = path.as_ref().to_path_buf();
        let inner = TdmsFileWriter::create(&base_path)?;
        Ok(Self {
            inner,
            base_path,
            max_size_bytes,
            file_index: 0,
        })
    }

    pub fn set_file_property(&mut self, name: &str, value: impl Into<PropertyValue>) {
        self.inner.set_file_property(name, value);
    }

    pub fn set_group_property(&mut self, group: &str, name: &str, value: impl Into<PropertyValue>) {
        self.inner.set_group_property(group, name, value);
    }

    pub fn set_channel_property(
        &mut self,
        group: &str,
        channel: &str,
        name: &str,
        value: impl Into<PropertyValue>,
    ) {
        self.inner.set_channel_property(group, channel, name, value);
    }

    pub fn create_channel(
        &mut self,
        group: &str,
        channel: &str,
        data_type: DataType,
    ) -> Result<(), TdmsError> {
        self.inner.create_channel(group, channel, data_type)
    }

    pub fn write_data<T: TdmsChannelType>(
        &mut self,
        group: &str,
        channel: &str,
        values: &[T],
    ) -> Result<(), TdmsError> {
        self.flush_before_overrun((values.len() * T::SIZE_BYTES) as u64)?;
        self.inner.write_data(group, channel, values)?;
        self.flush_if_over_cap()
    }

    pub fn write_strings<S: AsRef<str>>(
        &mut self,
        group: &str,
        channel: &str,
        values: &[S],
    ) -> Result<(), TdmsError> {
        let incoming: u64 = values
            .iter()
            .map(|value| 4 + value.as_ref().len() as u64)
            .sum();
        self.flush_before_overrun(incoming)?;
        self.inner.write_strings(group, channel, values)?;
        self.flush_if_over_cap()
    }

    pub fn flush(&mut self) -> Result<(), TdmsError> {
        self.rotate_if_needed()?;
        self.inner.flush()
    }

    /// Flush pending changes and make the current file durable.
    pub fn close(mut self) -> Result<(), TdmsError> {
        self.rotate_if_needed()?;
        self.inner.close()
    }

    /// Flush the buffered segment while it still fits, so an incoming write
    /// never inflates a segment past the cap.
    fn flush_before_overrun(&mut self, incoming_bytes: u64) -> Result<(), TdmsError> {
        if let Some(parts) = self.inner.assemble() {
            let projected = self.inner.bytes_written() + parts.size() + incoming_bytes;
            if projected > self.max_size_bytes {
                self.flush()?;
            }
        }
        Ok(())
    }

    /// The buffered data auto-flushes once it would push the current file
    /// past the cap, rotating first so the flush lands in the next file.
    fn flush_if_over_cap(&mut self) -> Result<(), TdmsError> {
        if self.projected_over_cap() {
            self.rotate_if_needed()?;
            self.inner.flush()?;
        }
        Ok(())
    }

    fn projected_over_cap(&self) -> bool {
        match self.inner.assemble() {
            Some(parts) => self.inner.bytes_written() + parts.size() > self.max_size_bytes,
            None => false,
        }
    }

    fn rotate_if_needed(&mut self) -> Result<(), TdmsError> {
        // Rotating an empty file would not help: an oversized single segment
        // lands somewhere regardless.
        if !self.projected_over_cap() || self.inner.segments_written() == 0 {
            return Ok(());
        }

        self.inner.sync_sink()?;
        self.file_index += 1;
        let next_path = rotated_path(&self.base_path, self.file_index);
        debug!("Rotating to {}", next_path.display());
        let sink = SegmentSink::create(&next_path).map_err(|error| match error {
            TdmsError::Io(io) => TdmsError::RotationFailed(io),
            other => other,
        })?;
        self.inner.install_sink(sink);
        self.inner.restage_for_new_file();
        Ok(())
    }
}
