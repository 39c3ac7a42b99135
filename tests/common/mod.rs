//! Shared helpers for the integration tests.

use std::path::PathBuf;

use tempfile::TempDir;

/// A temporary directory plus a data file path inside it.
///
/// Keep the [`TempDir`] alive for the duration of the test, dropping it
/// removes the files.
pub fn test_file(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("could not create test directory");
    let path = dir.path().join(name);
    (dir, path)
}
