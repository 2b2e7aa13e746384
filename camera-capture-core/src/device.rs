//! Camera discovery and classification.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::{CameraRole, CameraSystem, FacingPosition};
use crate::traits::hardware::{CameraDevice, CameraDiscovery};
use crate::util::debug_failure;

/// Answers capability questions about the cameras at each facing
/// position.
///
/// Enumeration results are cached per position since backends treat
/// discovery as expensive; call `invalidate` if device topology changes.
pub struct DeviceSelector {
    discovery: Arc<dyn CameraDiscovery>,
    cache: Mutex<HashMap<FacingPosition, BTreeMap<CameraRole, Arc<dyn CameraDevice>>>>,
}

impl DeviceSelector {
    pub fn new(discovery: Arc<dyn CameraDiscovery>) -> Self {
        Self {
            discovery,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// All cameras at a position, keyed by lens role.
    pub fn devices(&self, position: FacingPosition) -> BTreeMap<CameraRole, Arc<dyn CameraDevice>> {
        let mut cache = self.cache.lock();
        cache
            .entry(position)
            .or_insert_with(|| {
                let mut map = BTreeMap::new();
                for device in self.discovery.devices(position) {
                    let role = device.role();
                    if map.insert(role, device).is_some() {
                        log::warn!(
                            "duplicate {:?} camera at {:?}, keeping the later one",
                            role,
                            position
                        );
                    }
                }
                map
            })
            .clone()
    }

    pub fn available_roles(&self, position: FacingPosition) -> BTreeSet<CameraRole> {
        self.devices(position).keys().copied().collect()
    }

    /// The richest camera system the position supports.
    pub fn camera_system(&self, position: FacingPosition) -> CameraSystem {
        CameraSystem::from_roles(&self.available_roles(position))
    }

    /// The handle used for session input and zoom control. Multi-lens
    /// backends expose lens hand-off through the wide camera, so that is
    /// the one attached to the session.
    pub fn default_device(&self, position: FacingPosition) -> Option<Arc<dyn CameraDevice>> {
        let devices = self.devices(position);
        if let Some(wide) = devices.get(&CameraRole::Wide) {
            return Some(Arc::clone(wide));
        }
        if let Some((_, device)) = devices.iter().next() {
            debug_failure("camera set without a wide lens");
            return Some(Arc::clone(device));
        }
        None
    }

    /// API zoom factors at which the default device hands off between
    /// lenses. Empty when the position has a single lens.
    pub fn switch_over_zoom_factors(&self, position: FacingPosition) -> Vec<f64> {
        self.default_device(position)
            .map(|d| d.switch_over_zoom_factors())
            .unwrap_or_default()
    }

    /// Drop cached enumerations, forcing re-discovery on next use.
    pub fn invalidate(&self) {
        self.cache.lock().clear();
    }
}
