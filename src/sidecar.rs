//! The `_index` sidecar mirrors each segment's lead in and metadata without
//! the raw data so the reader can index a large file without seeking
//! through it.
//!
//! The lead in keeps the offsets of the main file (the raw block is simply
//! absent) because chunk counts cannot be recovered without the raw block
//! size. Metadata is self delimiting so the segments sit back-to-back.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::TdmsError;
use crate::meta_data::{Segment, LEAD_IN_BYTES};

/// Sidecar path for a data file: the full file name with `_index` appended.
pub(crate) fn sidecar_path(data_path: &Path) -> PathBuf {
    let mut name = data_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push("_index");
    data_path.with_file_name(name)
}

/// Load the segment metadata from the sidecar if it is usable.
///
/// Returns None when the sidecar is missing, stale or disagrees with the
/// main file, in which case the caller falls back to scanning the main file.
pub(crate) fn load_segments(data_path: &Path, main_length: u64) -> Option<Vec<Segment>> {
    let path = sidecar_path(data_path);
    let mut file = File::open(&path).ok()?;

    if sidecar_is_stale(data_path, &path) {
        warn!("Ignoring stale index sidecar at {}", path.display());
        return None;
    }

    match read_sidecar_segments(&mut file, main_length) {
        Ok(segments) => Some(segments),
        Err(error) => {
            warn!(
                "Ignoring unusable index sidecar at {}: {error}",
                path.display()
            );
            None
        }
    }
}

fn sidecar_is_stale(data_path: &Path, sidecar: &Path) -> bool {
    let modified = |path: &Path| std::fs::metadata(path).and_then(|meta| meta.modified()).ok();
    match (modified(sidecar), modified(data_path)) {
        (Some(sidecar_time), Some(data_time)) => sidecar_time < data_time,
        // Without timestamps assume the worst.
        _ => true,
    }
}

fn read_sidecar_segments(file: &mut File, main_length: u64) -> Result<Vec<Segment>, TdmsError> {
    let sidecar_length = file.metadata()?.len();
    let mut segments = Vec::new();
    let mut main_position = 0u64;
    let mut sidecar_position = 0u64;

    while sidecar_position < sidecar_length {
        file.seek(SeekFrom::Start(sidecar_position))?;
        let segment = Segment::read(file)?;
        if segment.is_truncated() {
            return Err(TdmsError::TruncatedSegment);
        }
        main_position = main_position
            .checked_add(segment.total_size_bytes()?)
            .ok_or(TdmsError::SegmentAddressOverflow)?;
        // A sidecar entry is the lead in plus the metadata bytes only.
        sidecar_position = sidecar_position
            .checked_add(LEAD_IN_BYTES + segment.raw_data_offset)
            .ok_or(TdmsError::SegmentAddressOverflow)?;
        segments.push(segment);
    }

    // The sidecar must describe exactly the main file or it is out of date.
    if main_position != main_length {
        return Err(TdmsError::TruncatedSegment);
    }
    Ok(segments)
}
