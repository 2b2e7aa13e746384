//! Camera enumeration over a fixed set of profiles.

use std::sync::Arc;

use camera_capture_core::models::{CameraRole, FacingPosition};
use camera_capture_core::traits::hardware::{CameraDevice, CameraDiscovery};

use crate::device::VirtualCamera;
use crate::profile::VirtualCameraProfile;

/// Enumerates virtual cameras. Devices are built once so repeated
/// discovery hands out the same instances, matching real backends.
pub struct VirtualDiscovery {
    devices: Vec<Arc<VirtualCamera>>,
}

impl VirtualDiscovery {
    pub fn new(profiles: &[VirtualCameraProfile]) -> Self {
        let mut devices = Vec::new();
        for profile in profiles {
            for lens in &profile.lenses {
                // Lens hand-off factors live on the wide device, the one
                // attached to the session.
                let switch_overs = if lens.role == CameraRole::Wide {
                    profile.switch_over_zoom_factors.clone()
                } else {
                    vec![]
                };
                devices.push(VirtualCamera::new(
                    lens.role,
                    profile.position,
                    switch_overs,
                    lens.max_zoom_factor,
                    profile.has_torch,
                ));
            }
        }
        Self { devices }
    }

    /// Direct access to a device, for inspecting simulated state.
    pub fn device(
        &self,
        position: FacingPosition,
        role: CameraRole,
    ) -> Option<Arc<VirtualCamera>> {
        self.devices
            .iter()
            .find(|d| d.position() == position && d.role() == role)
            .cloned()
    }
}

impl CameraDiscovery for VirtualDiscovery {
    fn devices(&self, position: FacingPosition) -> Vec<Arc<dyn CameraDevice>> {
        self.devices
            .iter()
            .filter(|d| d.position() == position)
            .map(|d| Arc::clone(d) as Arc<dyn CameraDevice>)
            .collect()
    }
}
