//! Public facade over the capture components.
//!
//! All backend work is funneled through one serial session queue so the
//! camera is never reconfigured from two threads at once; delegate
//! notifications go out on a separate notify queue so a slow UI cannot
//! stall capture. Long-running operations return a [`Deferred`] the
//! caller can wait on or ignore.

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::device::DeviceSelector;
use crate::models::{
    CameraRole, CaptureConfig, CaptureError, FacingPosition, FlashMode, Orientation, Point, Rect,
    RecordingMetadata, RecordingResult, TorchMode, VideoRecordingState, VideoTrackSettings,
};
use crate::photo::PhotoCaptureAdapter;
use crate::recording::pipeline::{
    RecordingPipeline, RecordingPipelineObserver, RecordingRequest, RecordingRequestBox,
};
use crate::session::manager::CaptureSessionManager;
use crate::storage::metadata::write_sidecar;
use crate::storage::muxed_writer::FinalizedFile;
use crate::traits::delegate::CaptureDelegate;
use crate::traits::hardware::{AudioCapture, CameraDiscovery, CaptureSession, PhotoOutput};
use crate::util::{Deferred, SerialQueue};
use crate::zoom::ZoomMapper;

struct ControlState {
    video_state: VideoRecordingState,
    desired_position: FacingPosition,
    flash_mode: FlashMode,
    orientation: Orientation,
    /// API zoom at the start of the current pinch gesture.
    pinch_base_zoom: f64,
    request_box: Option<RecordingRequestBox>,
}

struct Inner {
    manager: Arc<CaptureSessionManager>,
    photo: PhotoCaptureAdapter,
    pipeline: RecordingPipeline,
    session_queue: SerialQueue,
    notify_queue: SerialQueue,
    delegate: Mutex<Option<Arc<dyn CaptureDelegate>>>,
    control: Mutex<ControlState>,
    config: CaptureConfig,
    prepared: AtomicBool,
}

impl Inner {
    fn notify(&self, f: impl FnOnce(&dyn CaptureDelegate) + Send + 'static) {
        let Some(delegate) = self.delegate.lock().clone() else {
            return;
        };
        self.notify_queue.dispatch(move || f(delegate.as_ref()));
    }
}

/// The capture facade. Cheap to clone; all clones drive the same
/// session.
#[derive(Clone)]
pub struct CaptureOrchestrator {
    inner: Arc<Inner>,
}

impl CaptureOrchestrator {
    pub fn new(
        discovery: Arc<dyn CameraDiscovery>,
        video_session: Arc<dyn CaptureSession>,
        audio: Arc<dyn AudioCapture>,
        photo_output: Arc<dyn PhotoOutput>,
        config: CaptureConfig,
    ) -> Result<Self, CaptureError> {
        config.validate()?;
        let spawn_err = |e: std::io::Error| {
            CaptureError::InitializationFailed(format!("could not spawn capture queue: {}", e))
        };
        let session_queue = SerialQueue::new("capture-session").map_err(spawn_err)?;
        let notify_queue = SerialQueue::new("capture-notify").map_err(spawn_err)?;
        let pipeline = RecordingPipeline::new(config.recording.clone()).map_err(spawn_err)?;

        let selector = Arc::new(DeviceSelector::new(discovery));
        let manager = CaptureSessionManager::new(video_session, audio, selector);
        manager.attach_event_queue(session_queue.clone());

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let zoom_weak = weak.clone();
            manager.set_zoom_changed(Arc::new(move |visible, position| {
                if let Some(inner) = zoom_weak.upgrade() {
                    let truncated = ZoomMapper::truncate_visible(visible);
                    inner.notify(move |d| d.zoom_did_change(truncated, position));
                }
            }));
            let focus_weak = weak.clone();
            manager.set_focus_completed(Arc::new(move |point| {
                if let Some(inner) = focus_weak.upgrade() {
                    inner.notify(move |d| d.focus_did_complete(point));
                }
            }));

            Inner {
                manager: Arc::clone(&manager),
                photo: PhotoCaptureAdapter::new(photo_output),
                pipeline,
                session_queue,
                notify_queue,
                delegate: Mutex::new(None),
                control: Mutex::new(ControlState {
                    video_state: VideoRecordingState::Ready,
                    desired_position: config.initial_position,
                    flash_mode: FlashMode::Off,
                    orientation: Orientation::default(),
                    pinch_base_zoom: 1.0,
                    request_box: None,
                }),
                config,
                prepared: AtomicBool::new(false),
            }
        });
        inner.pipeline.set_observer(Arc::new(PipelineBridge {
            inner: Arc::downgrade(&inner),
        }));
        Ok(Self { inner })
    }

    pub fn set_delegate(&self, delegate: Arc<dyn CaptureDelegate>) {
        *self.inner.delegate.lock() = Some(delegate);
    }

    pub fn video_recording_state(&self) -> VideoRecordingState {
        self.inner.control.lock().video_state
    }

    pub fn desired_position(&self) -> FacingPosition {
        self.inner.control.lock().desired_position
    }

    pub fn flash_mode(&self) -> FlashMode {
        self.inner.control.lock().flash_mode
    }

    /// Duration recorded so far, readable without blocking the capture
    /// queues.
    pub fn recorded_duration_seconds(&self) -> f64 {
        self.inner.pipeline.recorded_duration_seconds()
    }

    /// Configure the initial camera input and install the sample route.
    /// Idempotent: later calls resolve immediately.
    pub fn prepare(&self) -> Deferred<Result<(), CaptureError>> {
        let deferred = Deferred::new();
        if self.inner.prepared.load(Ordering::SeqCst) {
            deferred.resolve(Ok(()));
            return deferred;
        }
        let inner = Arc::clone(&self.inner);
        let resolve = deferred.clone();
        self.inner.session_queue.dispatch(move || {
            if inner.prepared.swap(true, Ordering::SeqCst) {
                resolve.resolve(Ok(()));
                return;
            }
            let position = inner.control.lock().desired_position;
            inner
                .manager
                .set_video_sample_handler(Some(inner.pipeline.sample_handler()));
            inner.manager.begin_configuration();
            let result = inner.manager.reconfigure_input(position);
            inner.manager.commit_configuration();
            if let Err(e) = &result {
                log::error!("capture preparation failed: {}", e);
                inner.prepared.store(false, Ordering::SeqCst);
            }
            resolve.resolve(result);
        });
        deferred
    }

    /// Start the preview if it is not already running.
    pub fn resume(&self) -> Deferred<()> {
        let deferred = Deferred::new();
        let inner = Arc::clone(&self.inner);
        let resolve = deferred.clone();
        self.inner.session_queue.dispatch(move || {
            if !inner.manager.is_running() {
                inner.manager.start_running();
            }
            resolve.resolve(());
        });
        deferred
    }

    pub fn stop(&self) -> Deferred<()> {
        let deferred = Deferred::new();
        let inner = Arc::clone(&self.inner);
        let resolve = deferred.clone();
        self.inner.session_queue.dispatch(move || {
            inner.manager.stop_running();
            resolve.resolve(());
        });
        deferred
    }

    /// Swap between the front and back cameras. Rejected while a
    /// recording is active so the clip never mixes lenses.
    pub fn switch_camera_position(&self) -> Deferred<Result<FacingPosition, CaptureError>> {
        let deferred = Deferred::new();
        let inner = Arc::clone(&self.inner);
        let resolve = deferred.clone();
        self.inner.session_queue.dispatch(move || {
            let position = {
                let mut control = inner.control.lock();
                if !control.video_state.is_ready() {
                    log::warn!("camera switch rejected while a recording is active");
                    resolve.resolve(Err(CaptureError::AssertionError(
                        "cannot switch cameras while a recording is active".into(),
                    )));
                    return;
                }
                control.desired_position = control.desired_position.toggled();
                control.desired_position
            };
            inner.manager.begin_configuration();
            let result = inner.manager.reconfigure_input(position);
            inner.manager.commit_configuration();
            resolve.resolve(result.map(|()| position));
        });
        deferred
    }

    /// Jump to the lens shown at `role` on the selector. On single-lens
    /// devices, tapping 1x while at 1x toggles to 2x digital zoom.
    pub fn switch_camera_role(&self, role: CameraRole) {
        let inner = Arc::clone(&self.inner);
        self.inner.session_queue.dispatch(move || {
            let control = inner.control.lock();
            if !control.video_state.is_ready() {
                log::warn!("lens switch rejected while a recording is active");
                return;
            }
            let position = control.desired_position;
            drop(control);

            let mapper = inner.manager.zoom_mapper();
            let map = mapper.zoom_factor_map(position);
            let Some(visible) = map.get(&role).copied() else {
                log::warn!("no {:?} camera at {:?}", role, position);
                return;
            };
            let mut api = mapper.api_from_visible(position, visible);
            if map.len() == 1 {
                if let Some(current) = inner.manager.current_zoom() {
                    if (current - api).abs() < 0.01 {
                        api *= 2.0;
                    }
                }
            }
            inner.manager.set_zoom(api, true);
        });
    }

    /// Set zoom in visible units (the scale the user sees).
    pub fn set_visible_zoom(&self, visible_factor: f64, animated: bool) {
        let inner = Arc::clone(&self.inner);
        self.inner.session_queue.dispatch(move || {
            let position = inner.control.lock().desired_position;
            let api = inner
                .manager
                .zoom_mapper()
                .api_from_visible(position, visible_factor);
            inner.manager.set_zoom(api, animated);
        });
    }

    /// Capture the zoom level a pinch gesture scales from.
    pub fn begin_pinch_zoom(&self) {
        let inner = Arc::clone(&self.inner);
        self.inner.session_queue.dispatch(move || {
            let base = inner.manager.current_zoom().unwrap_or(1.0);
            inner.control.lock().pinch_base_zoom = base;
        });
    }

    pub fn update_pinch_zoom(&self, scale: f64) {
        let inner = Arc::clone(&self.inner);
        self.inner.session_queue.dispatch(move || {
            let base = inner.control.lock().pinch_base_zoom;
            inner.manager.set_zoom(base * scale, false);
        });
    }

    pub fn complete_pinch_zoom(&self, scale: f64) {
        let inner = Arc::clone(&self.inner);
        self.inner.session_queue.dispatch(move || {
            let base = inner.control.lock().pinch_base_zoom;
            inner.manager.set_zoom(base * scale, false);
            log::debug!("pinch ended at scale {:.2}", scale);
        });
    }

    /// Focus and expose at a tapped point, watching for scene changes so
    /// the tap focus can expire.
    pub fn focus_at(&self, point: Point) {
        let inner = Arc::clone(&self.inner);
        self.inner.session_queue.dispatch(move || {
            inner.manager.focus(
                crate::models::FocusMode::Auto,
                crate::models::ExposureMode::Auto,
                point,
                true,
            );
        });
    }

    pub fn toggle_flash_mode(&self) -> Deferred<FlashMode> {
        let deferred = Deferred::new();
        let inner = Arc::clone(&self.inner);
        let resolve = deferred.clone();
        self.inner.session_queue.dispatch(move || {
            let mut control = inner.control.lock();
            control.flash_mode = control.flash_mode.toggled();
            resolve.resolve(control.flash_mode);
        });
        deferred
    }

    pub fn update_orientation(&self, orientation: Orientation) {
        let inner = Arc::clone(&self.inner);
        self.inner.session_queue.dispatch(move || {
            {
                let mut control = inner.control.lock();
                if control.orientation == orientation {
                    return;
                }
                control.orientation = orientation;
            }
            inner.notify(move |d| d.orientation_did_change(orientation));
        });
    }

    /// Capture a still photo cropped to `viewport` (normalized
    /// coordinates of the visible preview).
    pub fn take_photo(&self, viewport: Rect) {
        let inner = Arc::clone(&self.inner);
        let Some(delegate) = inner.delegate.lock().clone() else {
            log::warn!("photo requested with no delegate attached");
            return;
        };
        if !delegate.can_capture_more_items() {
            delegate.did_try_to_capture_too_many();
            return;
        }
        inner.notify(|d| d.capture_did_start());

        let session_inner = Arc::clone(&inner);
        inner.session_queue.dispatch(move || {
            let (flash_mode, orientation) = {
                let control = session_inner.control.lock();
                (control.flash_mode, control.orientation)
            };
            let callback_inner = Arc::downgrade(&session_inner);
            session_inner.photo.capture(
                flash_mode,
                orientation,
                viewport,
                Box::new(move |result| {
                    let Some(inner) = callback_inner.upgrade() else {
                        return;
                    };
                    match result {
                        Ok(photo) => inner.notify(move |d| d.photo_did_finish(photo)),
                        Err(e) => inner.notify(move |d| d.capture_did_fail(&e)),
                    }
                }),
            );
        });
    }

    /// Begin a video recording: torch per the flash mode, separate audio
    /// session, writer armed for the first frame.
    pub fn start_video_recording(&self) {
        let inner = Arc::clone(&self.inner);
        let request_box = {
            let mut control = inner.control.lock();
            if !control.video_state.is_ready() {
                log::warn!(
                    "recording start ignored in state {:?}",
                    control.video_state
                );
                return;
            }
            let delegate = inner.delegate.lock().clone();
            if let Some(d) = delegate {
                if !d.can_capture_more_items() {
                    d.did_try_to_capture_too_many();
                    return;
                }
            }
            control.video_state = VideoRecordingState::Starting;
            let request_box = RecordingRequestBox::new();
            control.request_box = Some(request_box.clone());
            request_box
        };
        inner.notify(|d| d.recording_will_begin());

        let session_inner = Arc::clone(&inner);
        inner.session_queue.dispatch(move || {
            let flash_mode = session_inner.control.lock().flash_mode;
            session_inner.manager.set_torch_mode(flash_mode.torch_mode());

            let audio_started = session_inner
                .manager
                .start_audio_capture(session_inner.pipeline.sample_handler());
            let audio = audio_started.then(|| {
                session_inner
                    .manager
                    .recommended_audio_settings()
                    .unwrap_or_default()
            });

            let captured = session_inner.manager.recommended_video_dimensions();
            let video = VideoTrackSettings::for_capture(
                captured,
                session_inner.config.clamped_aspect_ratio(),
                &session_inner.config.recording,
            );
            session_inner
                .pipeline
                .begin(RecordingRequest { video, audio }, request_box);
        });
    }

    /// Ask the active recording to end and finalize.
    pub fn stop_video_recording(&self) {
        {
            let mut control = self.inner.control.lock();
            if !control.video_state.is_active() {
                log::warn!("recording stop ignored in state {:?}", control.video_state);
                return;
            }
            control.video_state = VideoRecordingState::Stopping;
        }
        // Hop through the session queue so the stop lands behind a
        // start job that has not reached the pipeline yet; otherwise a
        // zero-shortfall finish could run before the writer exists and
        // the recording would never resolve.
        let inner = Arc::clone(&self.inner);
        self.inner.session_queue.dispatch(move || {
            inner.pipeline.request_stop();
        });
    }

    /// Abandon the active recording. No file survives and no error is
    /// reported; the delegate hears `recording_did_cancel`.
    pub fn cancel_video_recording(&self) {
        {
            let mut control = self.inner.control.lock();
            if !control.video_state.is_active() {
                log::warn!(
                    "recording cancel ignored in state {:?}",
                    control.video_state
                );
                return;
            }
            control.video_state = VideoRecordingState::Canceling;
            // The start job may not have reached the pipeline yet; kill
            // the request at the source so it cannot resurrect.
            if let Some(request_box) = control.request_box.take() {
                request_box.invalidate();
            }
        }
        self.inner.pipeline.cancel();
        cleanup_after_recording(&self.inner);
        self.inner.notify(|d| d.recording_did_cancel());
    }
}

/// Torch off, audio session released, control state back to `Ready`.
/// Runs after every recording outcome, including failures and cancels.
fn cleanup_after_recording(inner: &Arc<Inner>) {
    let session_inner = Arc::clone(inner);
    inner.session_queue.dispatch(move || {
        session_inner.manager.set_torch_mode(TorchMode::Off);
        session_inner.manager.stop_audio_capture();
    });
    let mut control = inner.control.lock();
    control.video_state = VideoRecordingState::Ready;
    control.request_box = None;
}

/// Applies a first-frame signal to the control state. Returns whether
/// the recording is still live and the begin should reach the delegate.
fn register_first_frame(state: &mut VideoRecordingState) -> bool {
    match *state {
        VideoRecordingState::Starting => {
            *state = VideoRecordingState::Recording;
            true
        }
        // The first frame can land while the shortfall timer runs; the
        // clip is real, so the begin still goes out.
        VideoRecordingState::Stopping => true,
        // A cancel already unwound this recording (the facade may even
        // be back to Ready); a frame job left on the queue must not
        // surface a begin for it.
        other => {
            log::debug!("first frame arrived in state {:?}, ignoring", other);
            false
        }
    }
}

/// Re-dispatches recording-queue events into facade state and delegate
/// notifications.
struct PipelineBridge {
    inner: Weak<Inner>,
}

impl RecordingPipelineObserver for PipelineBridge {
    fn recording_did_start(&self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let live = register_first_frame(&mut inner.control.lock().video_state);
        if !live {
            return;
        }
        inner.notify(|d| d.recording_did_begin());
    }

    fn recording_duration_changed(&self, seconds: f64) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        inner.notify(move |d| d.recording_duration_changed(seconds));
    }

    fn recording_will_finish(&self) {}

    fn recording_did_finish(&self, result: Result<FinalizedFile, CaptureError>) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let canceling = inner.control.lock().video_state.is_canceling();
        match result {
            Ok(file) if canceling => {
                // Cancel raced finalization; the cancel path already
                // notified, so only the file needs to go.
                if let Err(e) = fs::remove_file(&file.path) {
                    log::warn!("could not remove canceled recording: {}", e);
                }
                cleanup_after_recording(&inner);
            }
            Err(_) if canceling => cleanup_after_recording(&inner),
            Ok(file) => {
                if file.size_bytes > inner.config.recording.max_file_size {
                    log::error!(
                        "recording is {} bytes, over the {} byte ceiling",
                        file.size_bytes,
                        inner.config.recording.max_file_size
                    );
                    if let Err(e) = fs::remove_file(&file.path) {
                        log::warn!("could not remove oversized recording: {}", e);
                    }
                    cleanup_after_recording(&inner);
                    inner.notify(|d| d.capture_did_fail(&CaptureError::VideoTooLarge));
                    return;
                }
                let metadata = RecordingMetadata::new(
                    file.duration_seconds,
                    file.width,
                    file.height,
                    file.has_audio,
                    file.size_bytes,
                    file.sha256.clone(),
                );
                if let Err(e) = write_sidecar(&metadata, &file.path) {
                    log::warn!("could not write recording sidecar: {}", e);
                }
                let recording = RecordingResult {
                    file_path: file.path,
                    metadata,
                };
                cleanup_after_recording(&inner);
                inner.notify(move |d| d.recording_did_finish(&recording));
            }
            Err(e) => {
                cleanup_after_recording(&inner);
                inner.notify(move |d| d.capture_did_fail(&e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_promotes_starting_to_recording() {
        let mut state = VideoRecordingState::Starting;
        assert!(register_first_frame(&mut state));
        assert_eq!(state, VideoRecordingState::Recording);
    }

    #[test]
    fn first_frame_during_the_shortfall_window_still_counts() {
        let mut state = VideoRecordingState::Stopping;
        assert!(register_first_frame(&mut state));
        assert_eq!(state, VideoRecordingState::Stopping);
    }

    #[test]
    fn late_first_frame_after_a_cancel_stays_silent() {
        let mut state = VideoRecordingState::Canceling;
        assert!(!register_first_frame(&mut state));
        assert_eq!(state, VideoRecordingState::Canceling);

        // Cleanup may already have reset the facade before the queued
        // frame job ran.
        let mut state = VideoRecordingState::Ready;
        assert!(!register_first_frame(&mut state));
        assert_eq!(state, VideoRecordingState::Ready);
    }
}
