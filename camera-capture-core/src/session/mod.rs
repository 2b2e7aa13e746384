//! Session ownership and the public capture facade.

pub mod manager;
pub mod orchestrator;

pub use manager::CaptureSessionManager;
pub use orchestrator::CaptureOrchestrator;
