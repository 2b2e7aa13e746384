//! One-shot still capture and viewport processing.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::{CaptureError, CapturedPhoto, FlashMode, Orientation, PhotoSettings, Rect};
use crate::traits::hardware::{PhotoOutput, RawPhotoCompletion};

const JPEG_QUALITY: u8 = 90;

pub type PhotoCompletion = Box<dyn FnOnce(Result<CapturedPhoto, CaptureError>) + Send + 'static>;

/// Bridges photo requests to the backend and post-processes the results.
///
/// Each request gets its own settings id and is tracked until its
/// completion runs, so overlapping captures stay independent.
pub struct PhotoCaptureAdapter {
    output: Arc<dyn PhotoOutput>,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl PhotoCaptureAdapter {
    pub fn new(output: Arc<dyn PhotoOutput>) -> Self {
        Self {
            output,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Capture one frame and deliver it cropped to `viewport` (normalized
    /// coordinates). The completion may run on any thread.
    pub fn capture(
        &self,
        flash_mode: FlashMode,
        orientation: Orientation,
        viewport: Rect,
        completion: PhotoCompletion,
    ) {
        let settings = PhotoSettings::new(flash_mode, orientation);
        let id = settings.id;
        self.in_flight.lock().insert(id);
        log::debug!("photo capture {} requested ({:?})", id, flash_mode);

        let in_flight = Arc::clone(&self.in_flight);
        let raw: RawPhotoCompletion = Box::new(move |result| {
            in_flight.lock().remove(&id);
            completion(result.and_then(|bytes| process_photo(&bytes, viewport)));
        });
        self.output.capture_photo(settings, raw);
    }
}

/// Decode the backend's image, crop to the viewport, re-encode as JPEG.
fn process_photo(bytes: &[u8], viewport: Rect) -> Result<CapturedPhoto, CaptureError> {
    if !viewport.is_valid_viewport() {
        log::error!("invalid photo viewport {:?}", viewport);
        return Err(CaptureError::CaptureFailed);
    }
    let decoded = image::load_from_memory(bytes).map_err(|e| {
        log::error!("could not decode captured photo: {}", e);
        CaptureError::CaptureFailed
    })?;

    let (full_width, full_height) = (decoded.width(), decoded.height());
    let crop_x = ((viewport.origin.x * full_width as f64).round() as u32).min(full_width - 1);
    let crop_y = ((viewport.origin.y * full_height as f64).round() as u32).min(full_height - 1);
    let crop_width = ((viewport.size.width * full_width as f64).round() as u32)
        .clamp(1, full_width - crop_x);
    let crop_height = ((viewport.size.height * full_height as f64).round() as u32)
        .clamp(1, full_height - crop_y);

    let cropped = decoded.crop_imm(crop_x, crop_y, crop_width, crop_height).to_rgb8();
    let (width, height) = (cropped.width(), cropped.height());

    let mut jpeg_data = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut jpeg_data), JPEG_QUALITY);
    cropped.write_with_encoder(encoder).map_err(|e| {
        log::error!("could not encode cropped photo: {}", e);
        CaptureError::CaptureFailed
    })?;

    Ok(CapturedPhoto {
        jpeg_data,
        width,
        height,
    })
}
