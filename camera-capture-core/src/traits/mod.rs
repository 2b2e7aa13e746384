//! Trait seams: hardware-facing backend contracts and the UI-facing
//! delegate.

pub mod delegate;
pub mod hardware;

pub use delegate::CaptureDelegate;
pub use hardware::{
    AudioCapture, CameraDevice, CameraDiscovery, CaptureSession, DeviceObserver, PhotoOutput,
    RawPhotoCompletion, SampleHandler,
};
