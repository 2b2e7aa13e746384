//! Visible vs API zoom factor mapping.
//!
//! Camera APIs treat the base lens as zoom 1.0 even when that lens is an
//! ultra-wide. Users instead expect the wide lens at 1x and the
//! ultra-wide at 0.5x. The mapper converts between the two scales and
//! produces the factor map shown on the lens selector.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::device::DeviceSelector;
use crate::models::{CameraRole, FacingPosition};
use crate::traits::hardware::CameraDevice;

/// Display scale applied when an ultra-wide lens is present.
pub const ULTRA_WIDE_MULTIPLIER: f64 = 0.5;

/// Visible zoom may go this many times past the largest mapped factor
/// (digital zoom headroom).
const MAX_VISIBLE_ZOOM_MULTIPLE: f64 = 5.0;

pub struct ZoomMapper {
    selector: Arc<DeviceSelector>,
}

impl ZoomMapper {
    pub fn new(selector: Arc<DeviceSelector>) -> Self {
        Self { selector }
    }

    /// Conversion factor from API zoom to visible zoom at a position.
    pub fn multiplier(&self, position: FacingPosition) -> f64 {
        if self.selector.camera_system(position).includes_ultra_wide() {
            ULTRA_WIDE_MULTIPLIER
        } else {
            1.0
        }
    }

    /// Visible zoom factor each lens is reachable at: ultra-wide at the
    /// multiplier, wide at 1x, telephoto at the multiplier times the last
    /// lens hand-off factor.
    pub fn zoom_factor_map(&self, position: FacingPosition) -> BTreeMap<CameraRole, f64> {
        let multiplier = self.multiplier(position);
        let mut map = BTreeMap::new();
        for role in self.selector.available_roles(position) {
            match role {
                CameraRole::UltraWide => {
                    map.insert(role, multiplier);
                }
                CameraRole::Wide => {
                    map.insert(role, 1.0);
                }
                CameraRole::Telephoto => {
                    let hand_offs = self.selector.switch_over_zoom_factors(position);
                    match hand_offs.last() {
                        Some(last) => {
                            map.insert(role, multiplier * last);
                        }
                        None => log::warn!(
                            "telephoto camera without hand-off factors at {:?}",
                            position
                        ),
                    }
                }
            }
        }
        map
    }

    /// Smallest selectable visible zoom at a position.
    pub fn min_visible_zoom(&self, position: FacingPosition) -> f64 {
        self.zoom_factor_map(position)
            .values()
            .copied()
            .fold(1.0_f64, f64::min)
    }

    /// Largest allowed API zoom factor at a position, before the
    /// hardware ceiling is applied.
    pub fn max_zoom_factor(&self, position: FacingPosition) -> f64 {
        let max_visible = self
            .zoom_factor_map(position)
            .values()
            .copied()
            .fold(1.0_f64, f64::max);
        MAX_VISIBLE_ZOOM_MULTIPLE * max_visible / self.multiplier(position)
    }

    /// Clamp an API zoom factor to the position's usable range and the
    /// device's hardware ceiling.
    pub fn clamp(&self, device: &dyn CameraDevice, api_factor: f64) -> f64 {
        let position = device.position();
        let min_api = self.min_visible_zoom(position) / self.multiplier(position);
        let max_api = self
            .max_zoom_factor(position)
            .min(device.max_available_zoom_factor());
        api_factor.clamp(min_api, max_api)
    }

    pub fn visible_from_api(&self, position: FacingPosition, api_factor: f64) -> f64 {
        api_factor * self.multiplier(position)
    }

    pub fn api_from_visible(&self, position: FacingPosition, visible_factor: f64) -> f64 {
        visible_factor / self.multiplier(position)
    }

    /// Truncate a visible factor to one decimal for display, always
    /// rounding toward zero so 1.29 reads as 1.2, not 1.3.
    pub fn truncate_visible(visible_factor: f64) -> f64 {
        (visible_factor * 10.0).floor() / 10.0
    }
}
