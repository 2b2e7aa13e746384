//! Simulated camera devices.

use std::sync::Arc;

use parking_lot::Mutex;

use camera_capture_core::models::{
    CameraRole, ExposureMode, FacingPosition, FocusMode, Point, TorchMode,
};
use camera_capture_core::traits::hardware::{CameraDevice, DeviceObserver};

#[derive(Debug)]
struct DeviceState {
    zoom: f64,
    focus_mode: Option<FocusMode>,
    focus_point: Option<Point>,
    exposure_mode: Option<ExposureMode>,
    monitoring: bool,
    torch: TorchMode,
}

/// A virtual camera. Control calls apply immediately; point focus with
/// the one-shot auto mode simulates a sweep by firing the adjusting
/// edge synchronously.
pub struct VirtualCamera {
    id: String,
    role: CameraRole,
    position: FacingPosition,
    switch_overs: Vec<f64>,
    max_zoom: f64,
    has_torch: bool,
    state: Mutex<DeviceState>,
    observer: Mutex<Option<Arc<dyn DeviceObserver>>>,
}

impl VirtualCamera {
    pub fn new(
        role: CameraRole,
        position: FacingPosition,
        switch_overs: Vec<f64>,
        max_zoom: f64,
        has_torch: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: format!("virtual-{:?}-{:?}", position, role).to_lowercase(),
            role,
            position,
            switch_overs,
            max_zoom,
            has_torch,
            state: Mutex::new(DeviceState {
                zoom: 1.0,
                focus_mode: None,
                focus_point: None,
                exposure_mode: None,
                monitoring: false,
                torch: TorchMode::Off,
            }),
            observer: Mutex::new(None),
        })
    }

    /// Pretend the scene changed; fires the observer when monitoring is
    /// on, like real hardware.
    pub fn trigger_subject_area_change(&self) {
        if !self.state.lock().monitoring {
            return;
        }
        if let Some(observer) = self.observer.lock().clone() {
            observer.subject_area_did_change(&self.id);
        }
    }

    pub fn torch(&self) -> TorchMode {
        self.state.lock().torch
    }

    pub fn focus_mode(&self) -> Option<FocusMode> {
        self.state.lock().focus_mode
    }

    fn simulate_focus_sweep(&self) {
        let observer = self.observer.lock().clone();
        if let Some(observer) = observer {
            observer.focus_adjusting_did_change(&self.id, true);
            observer.focus_adjusting_did_change(&self.id, false);
        }
    }
}

impl CameraDevice for VirtualCamera {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn role(&self) -> CameraRole {
        self.role
    }

    fn position(&self) -> FacingPosition {
        self.position
    }

    fn switch_over_zoom_factors(&self) -> Vec<f64> {
        self.switch_overs.clone()
    }

    fn max_available_zoom_factor(&self) -> f64 {
        self.max_zoom
    }

    fn zoom_factor(&self) -> f64 {
        self.state.lock().zoom
    }

    fn set_zoom_factor(&self, factor: f64) {
        self.state.lock().zoom = factor;
    }

    fn ramp_zoom(&self, factor: f64, _rate: f64) {
        // Ramps land instantly in the simulation.
        self.state.lock().zoom = factor;
    }

    fn supports_focus_mode(&self, _mode: FocusMode) -> bool {
        true
    }

    fn supports_exposure_mode(&self, _mode: ExposureMode) -> bool {
        true
    }

    fn supports_focus_point(&self) -> bool {
        true
    }

    fn supports_exposure_point(&self) -> bool {
        true
    }

    fn set_focus(&self, mode: FocusMode, point: Option<Point>) {
        {
            let mut state = self.state.lock();
            state.focus_mode = Some(mode);
            if point.is_some() {
                state.focus_point = point;
            }
        }
        if mode == FocusMode::Auto {
            self.simulate_focus_sweep();
        }
    }

    fn set_exposure(&self, mode: ExposureMode, _point: Option<Point>) {
        self.state.lock().exposure_mode = Some(mode);
    }

    fn focus_point(&self) -> Point {
        self.state.lock().focus_point.unwrap_or(Point::CENTER)
    }

    fn set_subject_area_monitoring(&self, enabled: bool) {
        self.state.lock().monitoring = enabled;
    }

    fn has_torch(&self) -> bool {
        self.has_torch
    }

    fn supports_torch_mode(&self, _mode: TorchMode) -> bool {
        self.has_torch
    }

    fn set_torch_mode(&self, mode: TorchMode) {
        self.state.lock().torch = mode;
    }

    fn set_observer(&self, observer: Option<Arc<dyn DeviceObserver>>) {
        *self.observer.lock() = observer;
    }
}
