//! Contracts a camera backend implements.
//!
//! The core never talks to hardware directly; everything below is the
//! surface a platform (or virtual) backend provides.

use std::sync::Arc;

use crate::models::{
    AudioTrackSettings, CameraRole, CaptureError, ExposureMode, FacingPosition, FocusMode,
    PhotoSettings, Point, SampleBuffer, Size, TorchMode,
};

/// Delivers encoded samples from a backend to the recorder. Called on the
/// backend's delivery thread.
pub type SampleHandler = Arc<dyn Fn(SampleBuffer) + Send + Sync + 'static>;

/// Completion for a raw still capture: encoded image bytes straight from
/// the backend.
pub type RawPhotoCompletion = Box<dyn FnOnce(Result<Vec<u8>, CaptureError>) + Send + 'static>;

/// Observer for device-generated events. Callbacks may arrive on any
/// thread; implementations are responsible for hopping to their own queue.
pub trait DeviceObserver: Send + Sync {
    /// The scene changed enough that a point focus is likely stale.
    fn subject_area_did_change(&self, device_id: &str);

    /// The lens started or stopped a focus sweep.
    fn focus_adjusting_did_change(&self, device_id: &str, adjusting: bool);
}

/// A physical (or simulated) camera at one facing position.
///
/// Control calls are best-effort: a device that does not support a mode
/// ignores the request, and callers check `supports_*` first when the
/// distinction matters.
pub trait CameraDevice: Send + Sync {
    fn id(&self) -> String;
    fn role(&self) -> CameraRole;
    fn position(&self) -> FacingPosition;

    /// API zoom factors at which a multi-lens device hands off between
    /// lenses, ascending. Empty for single-lens devices.
    fn switch_over_zoom_factors(&self) -> Vec<f64>;

    /// Hardware ceiling on the API zoom factor.
    fn max_available_zoom_factor(&self) -> f64;

    fn zoom_factor(&self) -> f64;

    /// Jump to the factor immediately.
    fn set_zoom_factor(&self, factor: f64);

    /// Glide toward the factor at `rate` (doublings per second).
    fn ramp_zoom(&self, factor: f64, rate: f64);

    fn supports_focus_mode(&self, mode: FocusMode) -> bool;
    fn supports_exposure_mode(&self, mode: ExposureMode) -> bool;
    fn supports_focus_point(&self) -> bool;
    fn supports_exposure_point(&self) -> bool;

    fn set_focus(&self, mode: FocusMode, point: Option<Point>);
    fn set_exposure(&self, mode: ExposureMode, point: Option<Point>);
    fn focus_point(&self) -> Point;

    /// Enable or disable subject-area-change notifications.
    fn set_subject_area_monitoring(&self, enabled: bool);

    fn has_torch(&self) -> bool;
    fn supports_torch_mode(&self, mode: TorchMode) -> bool;
    fn set_torch_mode(&self, mode: TorchMode);

    /// Install or clear the observer for device events.
    fn set_observer(&self, observer: Option<Arc<dyn DeviceObserver>>);
}

/// Enumerates the cameras a backend exposes.
pub trait CameraDiscovery: Send + Sync {
    fn devices(&self, position: FacingPosition) -> Vec<Arc<dyn CameraDevice>>;
}

/// The backend's video session: owns the active input and produces video
/// samples while running.
pub trait CaptureSession: Send + Sync {
    /// Open a reconfiguration bracket. Changes are applied atomically at
    /// `commit_configuration`.
    fn begin_configuration(&self);
    fn commit_configuration(&self);

    fn add_input(&self, device: Arc<dyn CameraDevice>) -> Result<(), CaptureError>;
    fn remove_input(&self, device_id: &str);

    /// Install the handler video samples are delivered to, or clear it.
    fn set_sample_handler(&self, handler: Option<SampleHandler>);

    fn start_running(&self);
    fn stop_running(&self);
    fn is_running(&self) -> bool;

    /// Sensor dimensions the backend recommends for recording output.
    fn recommended_video_dimensions(&self) -> Size;
}

/// Microphone capture. Deliberately separate from the video session so
/// attaching audio never stalls the running preview.
pub trait AudioCapture: Send + Sync {
    fn is_available(&self) -> bool;

    /// Mark the start of a named recording activity. Returns false when
    /// the audio system refuses (another app holds the route, say).
    fn begin_activity(&self, description: &str) -> bool;
    fn end_activity(&self, description: &str);

    fn start(&self, handler: SampleHandler) -> Result<(), CaptureError>;
    fn stop(&self);

    /// Encoder settings the backend recommends, when it knows them.
    fn recommended_settings(&self) -> Option<AudioTrackSettings>;
}

/// One-shot still capture.
pub trait PhotoOutput: Send + Sync {
    /// Capture a single frame. The completion receives encoded image
    /// bytes and may be invoked on any thread.
    fn capture_photo(&self, settings: PhotoSettings, completion: RawPhotoCompletion);
}
