//! Shared test doubles for unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::{
    CameraRole, ExposureMode, FacingPosition, FocusMode, Point, TorchMode,
};
use crate::traits::hardware::{CameraDevice, CameraDiscovery, DeviceObserver};

#[derive(Default)]
pub struct MockCameraState {
    pub zoom: f64,
    pub ramped: bool,
    pub focus_mode: Option<FocusMode>,
    pub focus_point: Option<Point>,
    pub exposure_mode: Option<ExposureMode>,
    pub exposure_point: Option<Point>,
    pub monitoring: bool,
    pub torch: Option<TorchMode>,
}

pub struct MockCamera {
    id: String,
    role: CameraRole,
    position: FacingPosition,
    switch_overs: Vec<f64>,
    max_zoom: f64,
    pub state: Mutex<MockCameraState>,
    pub observer: Mutex<Option<Arc<dyn DeviceObserver>>>,
}

impl MockCamera {
    pub fn new(
        role: CameraRole,
        position: FacingPosition,
        switch_overs: Vec<f64>,
        max_zoom: f64,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: format!("{:?}-{:?}", position, role),
            role,
            position,
            switch_overs,
            max_zoom,
            state: Mutex::new(MockCameraState {
                zoom: 1.0,
                ..MockCameraState::default()
            }),
            observer: Mutex::new(None),
        })
    }
}

impl CameraDevice for MockCamera {
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
        let mut state = self.state.lock();
        state.zoom = factor;
        state.ramped = false;
    }

    fn ramp_zoom(&self, factor: f64, _rate: f64) {
        let mut state = self.state.lock();
        state.zoom = factor;
        state.ramped = true;
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
        let mut state = self.state.lock();
        state.focus_mode = Some(mode);
        if point.is_some() {
            state.focus_point = point;
        }
    }

    fn set_exposure(&self, mode: ExposureMode, point: Option<Point>) {
        let mut state = self.state.lock();
        state.exposure_mode = Some(mode);
        if point.is_some() {
            state.exposure_point = point;
        }
    }

    fn focus_point(&self) -> Point {
        self.state.lock().focus_point.unwrap_or(Point::CENTER)
    }

    fn set_subject_area_monitoring(&self, enabled: bool) {
        self.state.lock().monitoring = enabled;
    }

    fn has_torch(&self) -> bool {
        self.position == FacingPosition::Back
    }

    fn supports_torch_mode(&self, _mode: TorchMode) -> bool {
        true
    }

    fn set_torch_mode(&self, mode: TorchMode) {
        self.state.lock().torch = Some(mode);
    }

    fn set_observer(&self, observer: Option<Arc<dyn DeviceObserver>>) {
        *self.observer.lock() = observer;
    }
}

pub struct MockDiscovery {
    devices: Vec<Arc<MockCamera>>,
}

impl MockDiscovery {
    pub fn new(devices: Vec<Arc<MockCamera>>) -> Self {
        Self { devices }
    }

    /// Back triple camera (hand-offs at 2x and 3x) plus a front wide.
    pub fn triple_back() -> Self {
        Self::new(vec![
            MockCamera::new(CameraRole::UltraWide, FacingPosition::Back, vec![], 8.0),
            MockCamera::new(
                CameraRole::Wide,
                FacingPosition::Back,
                vec![2.0, 3.0],
                16.0,
            ),
            MockCamera::new(CameraRole::Telephoto, FacingPosition::Back, vec![], 16.0),
            MockCamera::new(CameraRole::Wide, FacingPosition::Front, vec![], 4.0),
        ])
    }

    /// Back ultra-wide plus wide (hand-off at 2x), no telephoto.
    pub fn dual_wide_back() -> Self {
        Self::new(vec![
            MockCamera::new(CameraRole::UltraWide, FacingPosition::Back, vec![], 8.0),
            MockCamera::new(CameraRole::Wide, FacingPosition::Back, vec![2.0], 16.0),
        ])
    }

    /// Single wide camera on each side.
    pub fn wide_only() -> Self {
        Self::new(vec![
            MockCamera::new(CameraRole::Wide, FacingPosition::Back, vec![], 16.0),
            MockCamera::new(CameraRole::Wide, FacingPosition::Front, vec![], 4.0),
        ])
    }
}

impl CameraDiscovery for MockDiscovery {
    fn devices(&self, position: FacingPosition) -> Vec<Arc<dyn CameraDevice>> {
        self.devices
            .iter()
            .filter(|d| d.position() == position)
            .map(|d| Arc::clone(d) as Arc<dyn CameraDevice>)
            .collect()
    }
}
