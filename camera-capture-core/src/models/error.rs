//! Error taxonomy for the capture pipeline.

use thiserror::Error;

/// Errors surfaced by capture operations.
///
/// `Clone` so a single failure can be both returned to the caller and
/// fanned out to the delegate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No camera exists for the requested facing position.
    #[error("no capture device is available for the requested position")]
    DeviceUnavailable,

    /// A device exists but could not be attached to the session.
    #[error("could not attach capture input: {0}")]
    InputConstructionFailed(String),

    /// The recording output could not be set up.
    #[error("could not initialize the recording output: {0}")]
    InitializationFailed(String),

    /// Finalization did not produce a playable file.
    #[error("the recording did not produce a valid video file")]
    InvalidVideo,

    /// The finalized file exceeds the configured size ceiling.
    #[error("the recorded video exceeds the maximum allowed file size")]
    VideoTooLarge,

    /// Still photo capture or processing failed.
    #[error("photo capture failed")]
    CaptureFailed,

    /// An internal invariant was violated. Fatal in debug builds, logged
    /// in release builds.
    #[error("internal invariant violated: {0}")]
    AssertionError(String),
}

impl CaptureError {
    /// A short message suitable for display to a person.
    pub fn user_description(&self) -> &'static str {
        match self {
            CaptureError::DeviceUnavailable | CaptureError::InputConstructionFailed(_) => {
                "The camera is not available."
            }
            CaptureError::InitializationFailed(_) | CaptureError::InvalidVideo => {
                "The video could not be saved."
            }
            CaptureError::VideoTooLarge => "The video is too large.",
            CaptureError::CaptureFailed => "The photo could not be captured.",
            CaptureError::AssertionError(_) => "An unexpected error occurred.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = CaptureError::InputConstructionFailed("front wide busy".into());
        assert!(err.to_string().contains("front wide busy"));
    }

    #[test]
    fn every_error_has_a_user_description() {
        let errors = [
            CaptureError::DeviceUnavailable,
            CaptureError::InputConstructionFailed(String::new()),
            CaptureError::InitializationFailed(String::new()),
            CaptureError::InvalidVideo,
            CaptureError::VideoTooLarge,
            CaptureError::CaptureFailed,
            CaptureError::AssertionError(String::new()),
        ];
        for err in errors {
            assert!(!err.user_description().is_empty());
        }
    }
}
