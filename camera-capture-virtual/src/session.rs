//! Simulated video session with a paced frame feed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::Mutex;

use camera_capture_core::models::{CaptureError, MediaTime, SampleBuffer, Size};
use camera_capture_core::traits::hardware::{CameraDevice, CaptureSession, SampleHandler};

const FRAME_RATE: u32 = 30;
const TIMESCALE: u32 = 600;
const TICKS_PER_FRAME: i64 = (TIMESCALE / FRAME_RATE) as i64;
const KEYFRAME_INTERVAL: u64 = 30;

struct SessionState {
    inputs: Vec<Arc<dyn CameraDevice>>,
    handler: Option<SampleHandler>,
    configuring: u32,
}

struct Shared {
    state: Mutex<SessionState>,
    running: AtomicBool,
}

/// A capture session that synthesizes encoded video samples at a steady
/// frame rate while running, so the recording path can be exercised with
/// no hardware.
pub struct VirtualCaptureSession {
    shared: Arc<Shared>,
    feed: Mutex<Option<JoinHandle<()>>>,
    sensor_dimensions: Size,
    fail_next_input: AtomicBool,
}

impl VirtualCaptureSession {
    pub fn new(sensor_dimensions: Size) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState {
                    inputs: Vec::new(),
                    handler: None,
                    configuring: 0,
                }),
                running: AtomicBool::new(false),
            }),
            feed: Mutex::new(None),
            sensor_dimensions,
            fail_next_input: AtomicBool::new(false),
        }
    }

    /// Make the next `add_input` fail, to exercise setup error paths.
    pub fn fail_next_input(&self) {
        self.fail_next_input.store(true, Ordering::SeqCst);
    }

    pub fn input_count(&self) -> usize {
        self.shared.state.lock().inputs.len()
    }
}

impl Default for VirtualCaptureSession {
    fn default() -> Self {
        Self::new(Size::new(1920.0, 1080.0))
    }
}

fn feed_loop(shared: Arc<Shared>) {
    let frame_interval = Duration::from_secs(1) / FRAME_RATE;
    let started = Instant::now();
    let mut frame_index: u64 = 0;
    while shared.running.load(Ordering::SeqCst) {
        let handler = {
            let state = shared.state.lock();
            if state.inputs.is_empty() {
                None
            } else {
                state.handler.clone()
            }
        };
        if let Some(handler) = handler {
            let pts = MediaTime::new(frame_index as i64 * TICKS_PER_FRAME, TIMESCALE);
            let keyframe = frame_index % KEYFRAME_INTERVAL == 0;
            // A small stand-in payload; the container does not inspect
            // frame contents.
            let data = vec![(frame_index & 0xff) as u8; 256];
            handler(SampleBuffer::video(pts, keyframe, data));
        }
        frame_index += 1;
        // Pace against the wall clock so drift does not accumulate.
        let next_due = frame_interval * frame_index as u32;
        let elapsed = started.elapsed();
        if next_due > elapsed {
            thread::sleep(next_due - elapsed);
        }
    }
}

impl CaptureSession for VirtualCaptureSession {
    fn begin_configuration(&self) {
        self.shared.state.lock().configuring += 1;
    }

    fn commit_configuration(&self) {
        let mut state = self.shared.state.lock();
        if state.configuring == 0 {
            warn!("commit_configuration without matching begin");
            return;
        }
        state.configuring -= 1;
    }

    fn add_input(&self, device: Arc<dyn CameraDevice>) -> Result<(), CaptureError> {
        if self.fail_next_input.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::InputConstructionFailed(
                "simulated input failure".to_string(),
            ));
        }
        debug!("virtual session: adding input {}", device.id());
        self.shared.state.lock().inputs.push(device);
        Ok(())
    }

    fn remove_input(&self, device_id: &str) {
        self.shared
            .state
            .lock()
            .inputs
            .retain(|d| d.id() != device_id);
    }

    fn set_sample_handler(&self, handler: Option<SampleHandler>) {
        self.shared.state.lock().handler = handler;
    }

    fn start_running(&self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("virtual-video-feed".to_string())
            .spawn(move || feed_loop(shared));
        match handle {
            Ok(handle) => *self.feed.lock() = Some(handle),
            Err(e) => {
                warn!("could not spawn virtual video feed: {}", e);
                self.shared.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn stop_running(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.feed.lock().take() {
            let _ = handle.join();
        }
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    fn recommended_video_dimensions(&self) -> Size {
        self.sensor_dimensions
    }
}

impl Drop for VirtualCaptureSession {
    fn drop(&mut self) {
        self.stop_running();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::device::VirtualCamera;
    use camera_capture_core::models::{CameraRole, FacingPosition};

    fn wide_input() -> Arc<dyn CameraDevice> {
        VirtualCamera::new(CameraRole::Wide, FacingPosition::Back, vec![], 16.0, true)
    }

    #[test]
    fn delivers_paced_video_samples_while_running() {
        let session = VirtualCaptureSession::default();
        session.add_input(wide_input()).unwrap();

        let (tx, rx) = mpsc::channel();
        session.set_sample_handler(Some(Arc::new(move |sample: SampleBuffer| {
            let _ = tx.send(sample);
        })));
        session.start_running();

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(first.is_video());
        assert!(first.keyframe);
        assert_eq!(first.presentation_time.timescale, TIMESCALE);

        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(second.presentation_time.micros() > first.presentation_time.micros());

        session.stop_running();
        assert!(!session.is_running());
    }

    #[test]
    fn no_samples_without_an_input() {
        let session = VirtualCaptureSession::default();
        let (tx, rx) = mpsc::channel();
        session.set_sample_handler(Some(Arc::new(move |sample: SampleBuffer| {
            let _ = tx.send(sample);
        })));
        session.start_running();
        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
        session.stop_running();
    }

    #[test]
    fn forced_input_failure_is_one_shot() {
        let session = VirtualCaptureSession::default();
        session.fail_next_input();
        assert!(session.add_input(wide_input()).is_err());
        assert!(session.add_input(wide_input()).is_ok());
        assert_eq!(session.input_count(), 1);
    }
}
