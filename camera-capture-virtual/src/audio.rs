//! Simulated microphone capture.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::warn;
use parking_lot::Mutex;

use camera_capture_core::models::{AudioTrackSettings, CaptureError, MediaTime, SampleBuffer};
use camera_capture_core::traits::hardware::{AudioCapture, SampleHandler};

const CHUNK_INTERVAL_MICROS: i64 = 20_000;

/// Synthesizes encoded audio chunks at a steady rate while started.
pub struct VirtualAudioCapture {
    available: AtomicBool,
    refuse_activity: AtomicBool,
    running: Arc<AtomicBool>,
    feed: Mutex<Option<JoinHandle<()>>>,
    activities: Mutex<Vec<String>>,
}

impl VirtualAudioCapture {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            refuse_activity: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(false)),
            feed: Mutex::new(None),
            activities: Mutex::new(Vec::new()),
        }
    }

    /// Simulate the microphone being absent or permission-denied.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Simulate the audio system refusing new recording activities.
    pub fn set_refuse_activity(&self, refuse: bool) {
        self.refuse_activity.store(refuse, Ordering::SeqCst);
    }

    pub fn active_activity_count(&self) -> usize {
        self.activities.lock().len()
    }
}

impl Default for VirtualAudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

fn audio_feed_loop(running: Arc<AtomicBool>, handler: SampleHandler) {
    let chunk_interval = Duration::from_micros(CHUNK_INTERVAL_MICROS as u64);
    let started = Instant::now();
    let mut chunk_index: u64 = 0;
    while running.load(Ordering::SeqCst) {
        let pts = MediaTime::from_micros(chunk_index as i64 * CHUNK_INTERVAL_MICROS);
        handler(SampleBuffer::audio(pts, vec![0u8; 128]));
        chunk_index += 1;
        let next_due = chunk_interval * chunk_index as u32;
        let elapsed = started.elapsed();
        if next_due > elapsed {
            thread::sleep(next_due - elapsed);
        }
    }
}

impl AudioCapture for VirtualAudioCapture {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn begin_activity(&self, description: &str) -> bool {
        if self.refuse_activity.load(Ordering::SeqCst) {
            return false;
        }
        self.activities.lock().push(description.to_string());
        true
    }

    fn end_activity(&self, description: &str) {
        let mut activities = self.activities.lock();
        if let Some(index) = activities.iter().position(|a| a == description) {
            activities.remove(index);
        }
    }

    fn start(&self, handler: SampleHandler) -> Result<(), CaptureError> {
        if !self.is_available() {
            return Err(CaptureError::DeviceUnavailable);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name("virtual-audio-feed".to_string())
            .spawn(move || audio_feed_loop(running, handler));
        match handle {
            Ok(handle) => {
                *self.feed.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(CaptureError::InitializationFailed(format!(
                    "could not spawn virtual audio feed: {}",
                    e
                )))
            }
        }
    }

    fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.feed.lock().take() {
            let _ = handle.join();
        }
    }

    fn recommended_settings(&self) -> Option<AudioTrackSettings> {
        Some(AudioTrackSettings::default())
    }
}

impl Drop for VirtualAudioCapture {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            warn!("virtual audio capture dropped while running");
            self.stop();
        }
    }
}
