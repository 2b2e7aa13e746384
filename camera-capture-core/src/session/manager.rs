//! Owns the backend video session, the active camera input, and the
//! separate audio session.
//!
//! All control methods are expected to run on the facade's session
//! queue; device events arriving on backend threads are re-dispatched
//! onto the same queue before they touch any state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::device::DeviceSelector;
use crate::models::{
    AudioTrackSettings, CaptureError, ExposureMode, FacingPosition, FocusMode, Point, Size,
    TorchMode,
};
use crate::traits::hardware::{
    AudioCapture, CameraDevice, CaptureSession, DeviceObserver, SampleHandler,
};
use crate::util::SerialQueue;
use crate::zoom::ZoomMapper;

/// Notified with the visible zoom factor whenever zoom is applied.
pub type ZoomChangedFn = Arc<dyn Fn(f64, FacingPosition) + Send + Sync + 'static>;
/// Notified when a tap-triggered focus sweep settles.
pub type FocusCompletedFn = Arc<dyn Fn(Point) + Send + Sync + 'static>;

/// Zoom ramp speed in doublings per second.
const ZOOM_RAMP_RATE: f64 = 16.0;
const AUDIO_ACTIVITY: &str = "VideoRecording";

pub struct CaptureSessionManager {
    video_session: Arc<dyn CaptureSession>,
    audio: Arc<dyn AudioCapture>,
    selector: Arc<DeviceSelector>,
    zoom: ZoomMapper,
    active_input: Mutex<Option<Arc<dyn CameraDevice>>>,
    observer: Arc<ManagerObserver>,
    event_queue: Mutex<Option<SerialQueue>>,
    zoom_changed: Mutex<Option<ZoomChangedFn>>,
    focus_completed: Mutex<Option<FocusCompletedFn>>,
    audio_running: AtomicBool,
}

impl CaptureSessionManager {
    pub fn new(
        video_session: Arc<dyn CaptureSession>,
        audio: Arc<dyn AudioCapture>,
        selector: Arc<DeviceSelector>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| Self {
            video_session,
            audio,
            zoom: ZoomMapper::new(Arc::clone(&selector)),
            selector,
            active_input: Mutex::new(None),
            observer: Arc::new(ManagerObserver {
                manager: weak.clone(),
                adjusting: Mutex::new(HashMap::new()),
            }),
            event_queue: Mutex::new(None),
            zoom_changed: Mutex::new(None),
            focus_completed: Mutex::new(None),
            audio_running: AtomicBool::new(false),
        })
    }

    /// Queue that device events are funneled onto. Must be attached
    /// before the first input is configured.
    pub fn attach_event_queue(&self, queue: SerialQueue) {
        *self.event_queue.lock() = Some(queue);
    }

    pub fn set_zoom_changed(&self, callback: ZoomChangedFn) {
        *self.zoom_changed.lock() = Some(callback);
    }

    pub fn set_focus_completed(&self, callback: FocusCompletedFn) {
        *self.focus_completed.lock() = Some(callback);
    }

    pub fn zoom_mapper(&self) -> &ZoomMapper {
        &self.zoom
    }

    pub fn selector(&self) -> &Arc<DeviceSelector> {
        &self.selector
    }

    // Video session passthroughs; the manager is the only component
    // allowed to talk to the backend session.

    pub fn begin_configuration(&self) {
        self.video_session.begin_configuration();
    }

    pub fn commit_configuration(&self) {
        self.video_session.commit_configuration();
    }

    pub fn start_running(&self) {
        self.video_session.start_running();
    }

    pub fn stop_running(&self) {
        self.video_session.stop_running();
    }

    pub fn is_running(&self) -> bool {
        self.video_session.is_running()
    }

    pub fn set_video_sample_handler(&self, handler: Option<SampleHandler>) {
        self.video_session.set_sample_handler(handler);
    }

    pub fn recommended_video_dimensions(&self) -> Size {
        self.video_session.recommended_video_dimensions()
    }

    /// Swap the active input to the default camera at `position` and
    /// reset zoom, focus, and exposure for the fresh lens. Callers wrap
    /// this in a begin/commit configuration bracket.
    pub fn reconfigure_input(&self, position: FacingPosition) -> Result<(), CaptureError> {
        let device = self
            .selector
            .default_device(position)
            .ok_or(CaptureError::DeviceUnavailable)?;
        log::info!("configuring video input {}", device.id());

        if let Some(old) = self.active_input.lock().take() {
            old.set_observer(None);
            self.video_session.remove_input(&old.id());
        }
        self.video_session.add_input(Arc::clone(&device))?;
        device.set_observer(Some(Arc::clone(&self.observer) as Arc<dyn DeviceObserver>));
        *self.active_input.lock() = Some(Arc::clone(&device));

        self.reset_zoom(&device);
        self.reset_focus_and_exposure();
        Ok(())
    }

    pub fn active_device(&self) -> Option<Arc<dyn CameraDevice>> {
        self.active_input.lock().clone()
    }

    pub fn active_position(&self) -> Option<FacingPosition> {
        self.active_device().map(|d| d.position())
    }

    /// Current API zoom factor of the active input.
    pub fn current_zoom(&self) -> Option<f64> {
        self.active_device().map(|d| d.zoom_factor())
    }

    /// Apply an API zoom factor to the active input, clamped to the
    /// usable range. The visible factor is reported through the zoom
    /// callback.
    pub fn set_zoom(&self, api_factor: f64, animated: bool) {
        match self.active_device() {
            Some(device) => self.apply_zoom(&device, api_factor, animated),
            None => log::warn!("zoom change with no active camera"),
        }
    }

    fn reset_zoom(&self, device: &Arc<dyn CameraDevice>) {
        // Fresh inputs start at the wide lens, visible 1x.
        let api = self.zoom.api_from_visible(device.position(), 1.0);
        self.apply_zoom(device, api, false);
    }

    fn apply_zoom(&self, device: &Arc<dyn CameraDevice>, api_factor: f64, animated: bool) {
        let clamped = self.zoom.clamp(device.as_ref(), api_factor);
        if animated {
            device.ramp_zoom(clamped, ZOOM_RAMP_RATE);
        } else {
            device.set_zoom_factor(clamped);
        }
        let visible = self.zoom.visible_from_api(device.position(), clamped);
        if let Some(callback) = self.zoom_changed.lock().clone() {
            callback(visible, device.position());
        }
    }

    /// Best-effort focus and exposure. Unsupported modes or points are
    /// silently skipped; the preview keeps working either way.
    pub fn focus(
        &self,
        focus_mode: FocusMode,
        exposure_mode: ExposureMode,
        point: Point,
        monitor_subject_area: bool,
    ) {
        let Some(device) = self.active_device() else {
            log::debug!("focus request with no active camera");
            return;
        };
        if device.supports_focus_mode(focus_mode) {
            let focus_point = device.supports_focus_point().then_some(point);
            device.set_focus(focus_mode, focus_point);
        }
        if device.supports_exposure_mode(exposure_mode) {
            let exposure_point = device.supports_exposure_point().then_some(point);
            device.set_exposure(exposure_mode, exposure_point);
        }
        device.set_subject_area_monitoring(monitor_subject_area);
    }

    pub fn reset_focus_and_exposure(&self) {
        self.focus(
            FocusMode::ContinuousAuto,
            ExposureMode::ContinuousAuto,
            Point::CENTER,
            false,
        );
    }

    pub fn set_torch_mode(&self, mode: TorchMode) {
        let Some(device) = self.active_device() else {
            return;
        };
        if !device.has_torch() || !device.supports_torch_mode(mode) {
            log::debug!("torch {:?} unsupported on {}", mode, device.id());
            return;
        }
        device.set_torch_mode(mode);
    }

    /// Start the separate audio session. A `false` return means the
    /// recording proceeds without sound; it is never fatal.
    pub fn start_audio_capture(&self, handler: SampleHandler) -> bool {
        if self.audio_running.load(Ordering::SeqCst) {
            log::warn!("audio capture already running");
            return true;
        }
        if !self.audio.begin_activity(AUDIO_ACTIVITY) {
            log::warn!("audio system refused the recording activity");
            return false;
        }
        if !self.audio.is_available() {
            log::info!("no microphone available, recording without audio");
            self.audio.end_activity(AUDIO_ACTIVITY);
            return false;
        }
        match self.audio.start(handler) {
            Ok(()) => {
                self.audio_running.store(true, Ordering::SeqCst);
                true
            }
            Err(e) => {
                log::warn!("audio capture failed to start: {}", e);
                self.audio.end_activity(AUDIO_ACTIVITY);
                false
            }
        }
    }

    pub fn stop_audio_capture(&self) {
        if !self.audio_running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.audio.stop();
        self.audio.end_activity(AUDIO_ACTIVITY);
    }

    pub fn recommended_audio_settings(&self) -> Option<AudioTrackSettings> {
        self.audio.recommended_settings()
    }

    fn handle_subject_area_change(&self, device_id: &str) {
        let is_active = matches!(self.active_device(), Some(d) if d.id() == device_id);
        if !is_active {
            return;
        }
        // The scene moved; drop the stale point focus.
        self.reset_focus_and_exposure();
    }

    fn handle_focus_settled(&self) {
        let Some(device) = self.active_device() else {
            return;
        };
        let point = device.focus_point();
        if let Some(callback) = self.focus_completed.lock().clone() {
            callback(point);
        }
    }

}

/// Hop a device event onto the manager's event queue.
fn on_event_queue(
    manager: &Arc<CaptureSessionManager>,
    job: impl FnOnce(&CaptureSessionManager) + Send + 'static,
) {
    let queue = manager.event_queue.lock().clone();
    match queue {
        Some(queue) => {
            let manager = Arc::clone(manager);
            queue.dispatch(move || job(&manager));
        }
        None => log::warn!("device event before an event queue was attached"),
    }
}

/// Installed on the active input; forwards device events onto the
/// session queue.
struct ManagerObserver {
    manager: Weak<CaptureSessionManager>,
    /// Last known focus-adjusting flag per device, for edge detection.
    adjusting: Mutex<HashMap<String, bool>>,
}

impl DeviceObserver for ManagerObserver {
    fn subject_area_did_change(&self, device_id: &str) {
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        let device_id = device_id.to_string();
        on_event_queue(&manager, move |m| m.handle_subject_area_change(&device_id));
    }

    fn focus_adjusting_did_change(&self, device_id: &str, adjusting: bool) {
        let previous = self.adjusting.lock().insert(device_id.to_string(), adjusting);
        // Only the sweep-settled edge is interesting.
        if !(previous == Some(true) && !adjusting) {
            return;
        }
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        on_event_queue(&manager, |m| m.handle_focus_settled());
    }
}
