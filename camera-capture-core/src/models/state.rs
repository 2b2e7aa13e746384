//! State machines for video recording.

/// Facade-level recording control state.
///
/// ```text
/// Ready -> Starting -> Recording -> Stopping -> Ready
///             |            |
///             +-> Canceling <-+   (-> Ready)
/// ```
///
/// Camera switches and new recordings are only accepted in `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoRecordingState {
    Ready,
    Starting,
    Recording,
    Stopping,
    Canceling,
}

impl VideoRecordingState {
    pub fn is_ready(&self) -> bool {
        matches!(self, VideoRecordingState::Ready)
    }

    /// A recording has been requested and not yet asked to end.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            VideoRecordingState::Starting | VideoRecordingState::Recording
        )
    }

    pub fn is_canceling(&self) -> bool {
        matches!(self, VideoRecordingState::Canceling)
    }
}

/// Writer-facing lifecycle of a single recording.
///
/// Strictly forward: `Unstarted` until the first video sample lands,
/// `Recording` while samples append, `Finished` once finalized or
/// discarded. `Finished` is terminal; late samples are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Unstarted,
    Recording,
    Finished,
}

impl RecordingState {
    pub fn is_unstarted(&self) -> bool {
        matches!(self, RecordingState::Unstarted)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingState::Recording)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, RecordingState::Finished)
    }
}
