//! UI-facing event surface.

use crate::models::{
    CaptureError, CapturedPhoto, FacingPosition, Orientation, Point, RecordingResult,
};

/// Receives capture lifecycle events.
///
/// All notifications are delivered on a dedicated notify queue, in order.
/// Every method has a no-op default so implementors subscribe only to
/// what they need; `can_capture_more_items` is queried synchronously on
/// the caller's thread before a capture begins.
pub trait CaptureDelegate: Send + Sync {
    /// A still capture was accepted and the shutter fired.
    fn capture_did_start(&self) {}

    fn photo_did_finish(&self, _photo: CapturedPhoto) {}

    /// A photo or recording failed. `error.user_description()` is
    /// suitable for display.
    fn capture_did_fail(&self, _error: &CaptureError) {}

    /// A recording was requested; the backend is spinning up.
    fn recording_will_begin(&self) {}

    /// The first video sample landed and the clock is running.
    fn recording_did_begin(&self) {}

    fn recording_duration_changed(&self, _seconds: f64) {}

    fn recording_did_finish(&self, _result: &RecordingResult) {}

    /// The recording was canceled; any partial file has been removed.
    fn recording_did_cancel(&self) {}

    fn orientation_did_change(&self, _orientation: Orientation) {}

    /// The visible zoom factor changed (already truncated for display).
    fn zoom_did_change(&self, _visible_factor: f64, _position: FacingPosition) {}

    /// A focus sweep triggered by a tap has settled.
    fn focus_did_complete(&self, _point: Point) {}

    /// Whether another captured item may be added. Defaults to
    /// unlimited.
    fn can_capture_more_items(&self) -> bool {
        true
    }

    /// A capture was refused because `can_capture_more_items` said no.
    fn did_try_to_capture_too_many(&self) {}
}
