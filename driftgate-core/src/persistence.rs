//! Atomic file writes for reports, validated tables, and ingested splits.
//!
//! Every writer goes through a `.tmp` sibling followed by a rename.

use crate::error::StageError;
use std::io;
use std::path::Path;

/// Atomically write raw bytes to a file, creating parent directories.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StageError> {
    write_through_tmp(path, data).map_err(|e| StageError::persistence(path, e))
}

/// Serialize `data` as YAML and atomically write it to `path`.
pub fn atomic_write_yaml<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), StageError> {
    let yaml = serde_yaml::to_string(data)
        .map_err(|e| StageError::persistence(path, io::Error::other(e)))?;
    atomic_write(path, yaml.as_bytes())
}

fn write_through_tmp(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
