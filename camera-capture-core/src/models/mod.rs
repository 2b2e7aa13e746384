//! Shared data types: camera descriptors, geometry, timestamps, samples,
//! configuration, errors, state machines, and results.

pub mod camera;
pub mod config;
pub mod error;
pub mod geometry;
pub mod result;
pub mod sample;
pub mod state;
pub mod time;

pub use camera::{
    CameraRole, CameraSystem, ExposureMode, FacingPosition, FlashMode, FocusMode, Orientation,
    TorchMode,
};
pub use config::{
    AudioCodec, AudioTrackSettings, CaptureConfig, PhotoSettings, RecordingConfig, VideoCodec,
    VideoTrackSettings,
};
pub use error::CaptureError;
pub use geometry::{Point, Rect, Size};
pub use result::{CapturedPhoto, RecordingMetadata, RecordingResult};
pub use sample::{MediaTrack, SampleBuffer};
pub use state::{RecordingState, VideoRecordingState};
pub use time::MediaTime;
