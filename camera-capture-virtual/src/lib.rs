//! A complete in-process camera backend with no hardware behind it.
//!
//! Every contract the capture core consumes is implemented against
//! synthesized data: a paced video feed, a chunked audio feed, rendered
//! stills, and simulated multi-lens devices. Useful for integration
//! tests and for developing against the capture pipeline on machines
//! without cameras.
//!
//! Module map:
//! - [`profile`]: describes the hardware a backend pretends to have
//! - [`device`]: simulated cameras
//! - [`discovery`]: enumeration over a fixed profile set
//! - [`session`]: the synthetic video feed
//! - [`audio`]: the synthetic microphone
//! - [`photo`]: rendered still capture

pub mod audio;
pub mod device;
pub mod discovery;
pub mod photo;
pub mod profile;
pub mod session;

use std::sync::Arc;

use camera_capture_core::models::{CaptureConfig, CaptureError};
use camera_capture_core::traits::hardware::{
    AudioCapture, CameraDiscovery, CaptureSession, PhotoOutput,
};
use camera_capture_core::CaptureOrchestrator;

pub use audio::VirtualAudioCapture;
pub use device::VirtualCamera;
pub use discovery::VirtualDiscovery;
pub use photo::VirtualPhotoOutput;
pub use profile::{VirtualCameraProfile, VirtualLens};
pub use session::VirtualCaptureSession;

/// All four backend pieces, wired and ready to hand to an orchestrator.
pub struct VirtualBackend {
    pub discovery: Arc<VirtualDiscovery>,
    pub session: Arc<VirtualCaptureSession>,
    pub audio: Arc<VirtualAudioCapture>,
    pub photo: Arc<VirtualPhotoOutput>,
}

impl VirtualBackend {
    pub fn new(profiles: &[VirtualCameraProfile]) -> Self {
        Self {
            discovery: Arc::new(VirtualDiscovery::new(profiles)),
            session: Arc::new(VirtualCaptureSession::default()),
            audio: Arc::new(VirtualAudioCapture::new()),
            photo: Arc::new(VirtualPhotoOutput::default()),
        }
    }

    /// A backend shaped like a current phone: triple back camera plus a
    /// front wide.
    pub fn phone() -> Self {
        Self::new(&VirtualCameraProfile::phone())
    }

    pub fn orchestrator(&self, config: CaptureConfig) -> Result<CaptureOrchestrator, CaptureError> {
        CaptureOrchestrator::new(
            Arc::clone(&self.discovery) as Arc<dyn CameraDiscovery>,
            Arc::clone(&self.session) as Arc<dyn CaptureSession>,
            Arc::clone(&self.audio) as Arc<dyn AudioCapture>,
            Arc::clone(&self.photo) as Arc<dyn PhotoOutput>,
            config,
        )
    }
}
