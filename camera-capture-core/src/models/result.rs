//! Results handed back to the caller after a capture completes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A finalized video recording on disk.
#[derive(Debug, Clone)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub metadata: RecordingMetadata,
}

/// Sidecar metadata written next to each recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
    pub size_bytes: u64,
    pub sha256: String,
}

impl RecordingMetadata {
    pub fn new(
        duration_seconds: f64,
        width: u32,
        height: u32,
        has_audio: bool,
        size_bytes: u64,
        sha256: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            duration_seconds,
            width,
            height,
            has_audio,
            size_bytes,
            sha256,
        }
    }
}

/// A processed still photo: JPEG bytes cropped to the requested viewport.
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    pub jpeg_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_serializes_round_trip() {
        let metadata = RecordingMetadata::new(2.5, 720, 1280, true, 4096, "abc123".into());
        let json = serde_json::to_string(&metadata).unwrap();
        let back: RecordingMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }
}
