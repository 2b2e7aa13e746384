//! Shared harness for the end-to-end capture tests.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use camera_capture_core::models::{
    CaptureConfig, CaptureError, CapturedPhoto, FacingPosition, Orientation, Point,
    RecordingResult,
};
use camera_capture_core::traits::CaptureDelegate;

/// One delegate notification, recorded in arrival order.
#[derive(Debug, Clone)]
pub enum Event {
    CaptureStarted,
    Photo(u32, u32),
    Failed(CaptureError),
    WillBegin,
    DidBegin,
    Duration(f64),
    Finished(RecordingResult),
    Canceled,
    Zoom(f64, FacingPosition),
    FocusDone(Point),
    OrientationChanged(Orientation),
    TooMany,
}

/// Records every delegate callback and lets tests block until a
/// predicate over the event log holds.
pub struct TestDelegate {
    events: Mutex<Vec<Event>>,
    arrived: Condvar,
    allow_more: AtomicBool,
}

impl TestDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            arrived: Condvar::new(),
            allow_more: AtomicBool::new(true),
        })
    }

    pub fn set_allow_more(&self, allow: bool) {
        self.allow_more.store(allow, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Block until `pred` holds over the event log, or the timeout
    /// passes. Returns whether the predicate held.
    pub fn wait_for<F>(&self, timeout: Duration, pred: F) -> bool
    where
        F: Fn(&[Event]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock();
        while !pred(&events) {
            if self.arrived.wait_until(&mut events, deadline).timed_out() {
                return pred(&events);
            }
        }
        true
    }

    pub fn finished_result(&self) -> Option<RecordingResult> {
        self.events.lock().iter().find_map(|e| match e {
            Event::Finished(result) => Some(result.clone()),
            _ => None,
        })
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
        self.arrived.notify_all();
    }
}

impl CaptureDelegate for TestDelegate {
    fn capture_did_start(&self) {
        self.push(Event::CaptureStarted);
    }

    fn photo_did_finish(&self, photo: CapturedPhoto) {
        self.push(Event::Photo(photo.width, photo.height));
    }

    fn capture_did_fail(&self, error: &CaptureError) {
        self.push(Event::Failed(error.clone()));
    }

    fn recording_will_begin(&self) {
        self.push(Event::WillBegin);
    }

    fn recording_did_begin(&self) {
        self.push(Event::DidBegin);
    }

    fn recording_duration_changed(&self, seconds: f64) {
        self.push(Event::Duration(seconds));
    }

    fn recording_did_finish(&self, result: &RecordingResult) {
        self.push(Event::Finished(result.clone()));
    }

    fn recording_did_cancel(&self) {
        self.push(Event::Canceled);
    }

    fn orientation_did_change(&self, orientation: Orientation) {
        self.push(Event::OrientationChanged(orientation));
    }

    fn zoom_did_change(&self, visible_factor: f64, position: FacingPosition) {
        self.push(Event::Zoom(visible_factor, position));
    }

    fn focus_did_complete(&self, point: Point) {
        self.push(Event::FocusDone(point));
    }

    fn can_capture_more_items(&self) -> bool {
        self.allow_more.load(Ordering::SeqCst)
    }

    fn did_try_to_capture_too_many(&self) {
        self.push(Event::TooMany);
    }
}

/// A fresh output directory per test, keyed by tag and process id.
pub fn temp_output_dir(tag: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("camera-capture-{}-{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Default config pointed at `dir`, with the minimum clip length
/// shortened so tests that do not exercise it stay fast.
pub fn test_config(dir: PathBuf) -> CaptureConfig {
    let mut config = CaptureConfig::default();
    config.recording.output_directory = dir;
    config.recording.minimum_duration = Duration::from_millis(200);
    config
}
