//! Simulated still capture.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use image::codecs::png::PngEncoder;
use image::{ImageBuffer, Rgb};
use log::warn;

use camera_capture_core::models::{CaptureError, PhotoSettings};
use camera_capture_core::traits::hardware::{PhotoOutput, RawPhotoCompletion};

/// Renders a synthetic frame off-thread and hands back encoded bytes,
/// the same shape a hardware photo output delivers.
pub struct VirtualPhotoOutput {
    width: u32,
    height: u32,
    fail_next: AtomicBool,
    captured: AtomicUsize,
}

impl VirtualPhotoOutput {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fail_next: AtomicBool::new(false),
            captured: AtomicUsize::new(0),
        }
    }

    /// Make the next capture fail, to exercise error delivery.
    pub fn fail_next_capture(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn captured_count(&self) -> usize {
        self.captured.load(Ordering::SeqCst)
    }

    fn render(width: u32, height: u32) -> Result<Vec<u8>, CaptureError> {
        // A gradient keeps each pixel cheap to compute and the output
        // decodable.
        let frame = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128u8,
            ])
        });
        let mut bytes = Vec::new();
        frame
            .write_with_encoder(PngEncoder::new(Cursor::new(&mut bytes)))
            .map_err(|e| {
                warn!("virtual photo encode failed: {}", e);
                CaptureError::CaptureFailed
            })?;
        Ok(bytes)
    }
}

impl Default for VirtualPhotoOutput {
    fn default() -> Self {
        Self::new(1600, 1200)
    }
}

/// Holds the completion until a result is delivered. If the capture is
/// dropped without delivering, the caller hears a failure instead of
/// waiting forever.
struct CompletionGuard {
    completion: Option<RawPhotoCompletion>,
}

impl CompletionGuard {
    fn new(completion: RawPhotoCompletion) -> Self {
        Self {
            completion: Some(completion),
        }
    }

    fn deliver(mut self, result: Result<Vec<u8>, CaptureError>) {
        if let Some(completion) = self.completion.take() {
            completion(result);
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            completion(Err(CaptureError::CaptureFailed));
        }
    }
}

impl PhotoOutput for VirtualPhotoOutput {
    fn capture_photo(&self, settings: PhotoSettings, completion: RawPhotoCompletion) {
        let failed = self.fail_next.swap(false, Ordering::SeqCst);
        if !failed {
            self.captured.fetch_add(1, Ordering::SeqCst);
        }
        let (width, height) = (self.width, self.height);
        let guard = CompletionGuard::new(completion);
        let spawn = thread::Builder::new()
            .name("virtual-photo".to_string())
            .spawn(move || {
                log::debug!("virtual photo capture {}", settings.id);
                if failed {
                    guard.deliver(Err(CaptureError::CaptureFailed));
                } else {
                    guard.deliver(Self::render(width, height));
                }
            });
        // A failed spawn drops the guard, which reports the failure.
        if let Err(e) = spawn {
            warn!("could not spawn virtual photo thread: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use camera_capture_core::models::{FlashMode, Orientation};

    fn settings() -> PhotoSettings {
        PhotoSettings::new(FlashMode::Off, Orientation::Portrait)
    }

    #[test]
    fn produces_decodable_image_bytes() {
        let output = VirtualPhotoOutput::new(64, 48);
        let (tx, rx) = mpsc::channel();
        output.capture_photo(
            settings(),
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        let bytes = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
        assert_eq!(output.captured_count(), 1);
    }

    #[test]
    fn forced_failure_is_delivered_once() {
        let output = VirtualPhotoOutput::new(64, 48);
        output.fail_next_capture();
        let (tx, rx) = mpsc::channel();
        output.capture_photo(
            settings(),
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result, Err(CaptureError::CaptureFailed));
        assert_eq!(output.captured_count(), 0);
    }

    #[test]
    fn dropped_capture_still_reports_a_failure() {
        let (tx, rx) = mpsc::channel();
        let guard = CompletionGuard::new(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        drop(guard);
        let result = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(result, Err(CaptureError::CaptureFailed));
    }

    #[test]
    fn delivered_capture_fires_the_completion_once() {
        let (tx, rx) = mpsc::channel();
        let guard = CompletionGuard::new(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        guard.deliver(Ok(vec![1, 2, 3]));
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            Ok(vec![1, 2, 3])
        );
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
