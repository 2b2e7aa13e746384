//! Capture and recording configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::camera::{FacingPosition, FlashMode, Orientation};
use super::error::CaptureError;
use super::geometry::Size;

/// Portrait viewport, the narrowest supported.
pub const MIN_ASPECT_RATIO: f64 = 9.0 / 16.0;
/// The widest supported viewport.
pub const MAX_ASPECT_RATIO: f64 = 3.0 / 4.0;

/// Settings for the video recorder.
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// H.264 target bit rate in bits per second.
    pub average_bit_rate: u32,
    /// Maximum frames between keyframes.
    pub max_keyframe_interval: u32,
    /// Output frames are scaled so the long side is at most this.
    pub max_output_dimension: f64,
    /// Recordings stopped earlier than this keep capturing until they
    /// reach it.
    pub minimum_duration: Duration,
    /// Finalized files larger than this are rejected.
    pub max_file_size: u64,
    /// Directory recordings and their sidecars are written to.
    pub output_directory: PathBuf,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            average_bit_rate: 2_000_000,
            max_keyframe_interval: 90,
            max_output_dimension: 1280.0,
            minimum_duration: Duration::from_secs(1),
            max_file_size: 100 * 1024 * 1024,
            output_directory: env::temp_dir(),
        }
    }
}

impl RecordingConfig {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.average_bit_rate == 0 {
            return Err(CaptureError::InitializationFailed(
                "average bit rate must be positive".into(),
            ));
        }
        if self.max_keyframe_interval == 0 {
            return Err(CaptureError::InitializationFailed(
                "keyframe interval must be positive".into(),
            ));
        }
        if !(self.max_output_dimension > 0.0) {
            return Err(CaptureError::InitializationFailed(
                "output dimension must be positive".into(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(CaptureError::InitializationFailed(
                "maximum file size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration for a capture facade.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Camera shown when the session first starts.
    pub initial_position: FacingPosition,
    /// Viewport aspect ratio (short side over long side). Out-of-range
    /// values are clamped at use.
    pub aspect_ratio: f64,
    pub recording: RecordingConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            initial_position: FacingPosition::Back,
            aspect_ratio: MIN_ASPECT_RATIO,
            recording: RecordingConfig::default(),
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if !self.aspect_ratio.is_finite() || self.aspect_ratio <= 0.0 {
            return Err(CaptureError::InitializationFailed(
                "aspect ratio must be a positive number".into(),
            ));
        }
        self.recording.validate()
    }

    /// The configured aspect ratio clamped to the supported range.
    pub fn clamped_aspect_ratio(&self) -> f64 {
        if self.aspect_ratio < MIN_ASPECT_RATIO || self.aspect_ratio > MAX_ASPECT_RATIO {
            log::warn!(
                "aspect ratio {} outside supported range, clamping",
                self.aspect_ratio
            );
        }
        self.aspect_ratio.clamp(MIN_ASPECT_RATIO, MAX_ASPECT_RATIO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    H264,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCodec {
    Aac,
}

/// Encoder settings for the video track of one recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTrackSettings {
    pub codec: VideoCodec,
    pub width: u32,
    pub height: u32,
    pub average_bit_rate: u32,
    pub max_keyframe_interval: u32,
}

impl VideoTrackSettings {
    /// Derive output dimensions from the sensor size: crop to the viewport
    /// aspect ratio, then scale down to the configured ceiling.
    pub fn for_capture(captured: Size, aspect_ratio: f64, config: &RecordingConfig) -> Self {
        let output = captured
            .cropped_to_aspect_ratio(aspect_ratio)
            .scaled_to_fit(config.max_output_dimension);
        let (width, height) = output.even_pixels();
        Self {
            codec: VideoCodec::H264,
            width,
            height,
            average_bit_rate: config.average_bit_rate,
            max_keyframe_interval: config.max_keyframe_interval,
        }
    }
}

/// Encoder settings for the audio track of one recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrackSettings {
    pub codec: AudioCodec,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate: u32,
}

impl Default for AudioTrackSettings {
    /// Stereo AAC at 44.1 kHz, used when a backend has no opinion.
    fn default() -> Self {
        Self {
            codec: AudioCodec::Aac,
            sample_rate: 44_100,
            channels: 2,
            bit_rate: 192_000,
        }
    }
}

/// Request for a single still capture. Each request gets a fresh id so
/// concurrent captures can be tracked independently.
#[derive(Debug, Clone)]
pub struct PhotoSettings {
    pub id: Uuid,
    pub flash_mode: FlashMode,
    pub high_resolution: bool,
    pub orientation: Orientation,
}

impl PhotoSettings {
    pub fn new(flash_mode: FlashMode, orientation: Orientation) -> Self {
        Self {
            id: Uuid::new_v4(),
            flash_mode,
            high_resolution: true,
            orientation,
        }
    }
}
