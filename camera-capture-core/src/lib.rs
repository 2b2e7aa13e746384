//! Platform-agnostic camera capture core.
//!
//! Drives live photo and video capture against a backend supplied by a
//! platform crate (or the virtual backend for tests and development).
//!
//! Module map:
//! - [`models`]: shared data types, configuration, errors, state machines
//! - [`traits`]: backend contracts and the UI-facing delegate
//! - [`device`]: camera discovery and classification
//! - [`zoom`]: visible vs API zoom factor mapping
//! - [`photo`]: one-shot still capture with viewport cropping
//! - [`recording`]: the video recording pipeline
//! - [`storage`]: the muxed container writer and metadata sidecars
//! - [`session`]: session ownership and the [`CaptureOrchestrator`] facade
//! - [`util`]: serial queues and one-shot promises
//!
//! Typical use: build a [`CaptureOrchestrator`] from a backend's
//! discovery, session, audio, and photo implementations, attach a
//! [`CaptureDelegate`], then `prepare()` and `resume()`.

pub mod device;
pub mod models;
pub mod photo;
pub mod recording;
pub mod session;
pub mod storage;
pub mod traits;
pub mod util;
pub mod zoom;

#[cfg(test)]
mod test_support;

pub use device::DeviceSelector;
pub use models::{
    CameraRole, CameraSystem, CaptureConfig, CaptureError, CapturedPhoto, FacingPosition,
    FlashMode, Orientation, Point, Rect, RecordingConfig, RecordingResult, SampleBuffer,
    VideoRecordingState,
};
pub use session::{CaptureOrchestrator, CaptureSessionManager};
pub use traits::{CaptureDelegate, SampleHandler};
pub use util::Deferred;
pub use zoom::ZoomMapper;
