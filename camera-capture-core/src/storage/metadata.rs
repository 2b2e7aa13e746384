//! JSON metadata sidecar written next to each finalized recording.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{CaptureError, RecordingMetadata};

/// Sidecar path for a recording: `clip.cmv` gets `clip.metadata.json`.
pub fn sidecar_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

pub fn write_sidecar(
    metadata: &RecordingMetadata,
    recording_path: &Path,
) -> Result<PathBuf, CaptureError> {
    let path = sidecar_path(recording_path);
    let json = serde_json::to_string_pretty(metadata).map_err(|e| {
        CaptureError::InitializationFailed(format!("could not encode metadata: {}", e))
    })?;
    fs::write(&path, json).map_err(|e| {
        CaptureError::InitializationFailed(format!(
            "could not write {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(path)
}

pub fn read_sidecar(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let path = sidecar_path(recording_path);
    let json = fs::read_to_string(&path).map_err(|e| {
        CaptureError::InitializationFailed(format!("could not read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&json).map_err(|e| {
        CaptureError::InitializationFailed(format!("could not parse {}: {}", path.display(), e))
    })
}
