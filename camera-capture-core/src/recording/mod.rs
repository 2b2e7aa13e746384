//! Video recording: per-recording writer lifecycle and the queue that
//! drives it.

pub mod pipeline;
pub mod session;

pub use pipeline::{
    RecordingPipeline, RecordingPipelineObserver, RecordingRequest, RecordingRequestBox,
};
pub use session::{AppendOutcome, RecordingClock, RecordingSession};
