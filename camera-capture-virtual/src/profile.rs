//! Hardware profiles for the virtual backend.

use camera_capture_core::models::{CameraRole, FacingPosition};

/// One simulated lens.
#[derive(Debug, Clone)]
pub struct VirtualLens {
    pub role: CameraRole,
    pub max_zoom_factor: f64,
}

/// The camera hardware a virtual backend pretends to have at one facing
/// position.
#[derive(Debug, Clone)]
pub struct VirtualCameraProfile {
    pub position: FacingPosition,
    pub lenses: Vec<VirtualLens>,
    /// API zoom factors at which the combined device hands off between
    /// lenses, carried by the wide lens like real multi-camera devices.
    pub switch_over_zoom_factors: Vec<f64>,
    pub has_torch: bool,
}

impl VirtualCameraProfile {
    /// A single wide camera, like a front camera or an older device.
    pub fn wide_only(position: FacingPosition) -> Self {
        Self {
            position,
            lenses: vec![VirtualLens {
                role: CameraRole::Wide,
                max_zoom_factor: 16.0,
            }],
            switch_over_zoom_factors: vec![],
            has_torch: position == FacingPosition::Back,
        }
    }

    /// Ultra-wide plus wide on the back, hand-off at 2x.
    pub fn dual_wide_back() -> Self {
        Self {
            position: FacingPosition::Back,
            lenses: vec![
                VirtualLens {
                    role: CameraRole::UltraWide,
                    max_zoom_factor: 8.0,
                },
                VirtualLens {
                    role: CameraRole::Wide,
                    max_zoom_factor: 16.0,
                },
            ],
            switch_over_zoom_factors: vec![2.0],
            has_torch: true,
        }
    }

    /// Ultra-wide, wide, and telephoto on the back, hand-offs at 2x and
    /// 3x.
    pub fn triple_back() -> Self {
        Self {
            position: FacingPosition::Back,
            lenses: vec![
                VirtualLens {
                    role: CameraRole::UltraWide,
                    max_zoom_factor: 8.0,
                },
                VirtualLens {
                    role: CameraRole::Wide,
                    max_zoom_factor: 16.0,
                },
                VirtualLens {
                    role: CameraRole::Telephoto,
                    max_zoom_factor: 16.0,
                },
            ],
            switch_over_zoom_factors: vec![2.0, 3.0],
            has_torch: true,
        }
    }

    /// A typical phone: triple back camera plus a front wide.
    pub fn phone() -> Vec<Self> {
        vec![Self::triple_back(), Self::wide_only(FacingPosition::Front)]
    }
}
