//! Writer lifecycle for a single recording.
//!
//! The timed session opens lazily on the first *video* sample, so the
//! recording clock starts when the first frame is actually on disk.
//! Audio arriving earlier is dropped; audio-only recordings never start.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::{
    CaptureError, MediaTime, MediaTrack, RecordingState, SampleBuffer, VideoTrackSettings,
};
use crate::storage::muxed_writer::{FinalizedFile, MuxedFileWriter};

#[derive(Debug, Default)]
struct SampleTimes {
    first_video: Option<MediaTime>,
    last_video: Option<MediaTime>,
}

/// Cross-queue view of a recording's elapsed time.
///
/// Only the timestamp pair is locked, so the facade can read the
/// duration while the recording queue is mid-append.
#[derive(Clone)]
pub struct RecordingClock {
    times: Arc<Mutex<SampleTimes>>,
}

impl RecordingClock {
    pub fn duration_seconds(&self) -> f64 {
        let times = self.times.lock();
        match (times.first_video, times.last_video) {
            (Some(first), Some(last)) => last.seconds_since(first).max(0.0),
            _ => 0.0,
        }
    }

    pub fn has_started(&self) -> bool {
        self.times.lock().first_video.is_some()
    }
}

/// Outcome of appending one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// First video sample landed; the timed session just opened.
    Started,
    Appended { video: bool },
    /// Dropped without effect: audio before the session opened, or any
    /// sample after the recording finished.
    Ignored,
}

/// One recording from writer creation to finalize or discard.
pub struct RecordingSession {
    writer: Option<MuxedFileWriter>,
    state: RecordingState,
    video_settings: VideoTrackSettings,
    has_audio: bool,
    times: Arc<Mutex<SampleTimes>>,
}

impl RecordingSession {
    /// Takes a writer whose tracks are declared and whose file is
    /// already open.
    pub fn new(writer: MuxedFileWriter, video_settings: VideoTrackSettings, has_audio: bool) -> Self {
        Self {
            writer: Some(writer),
            state: RecordingState::Unstarted,
            video_settings,
            has_audio,
            times: Arc::new(Mutex::new(SampleTimes::default())),
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn clock(&self) -> RecordingClock {
        RecordingClock {
            times: Arc::clone(&self.times),
        }
    }

    pub fn video_settings(&self) -> &VideoTrackSettings {
        &self.video_settings
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.writer.as_ref().map(|w| w.path().to_path_buf())
    }

    pub fn append(&mut self, sample: &SampleBuffer) -> Result<AppendOutcome, CaptureError> {
        match self.state {
            RecordingState::Finished => {
                log::debug!("sample after finish, dropping");
                Ok(AppendOutcome::Ignored)
            }
            RecordingState::Unstarted if !sample.is_video() => Ok(AppendOutcome::Ignored),
            RecordingState::Unstarted => {
                let writer = self.writer_mut()?;
                writer.start_session(sample.presentation_time);
                writer.append(sample)?;
                self.state = RecordingState::Recording;
                let mut times = self.times.lock();
                times.first_video = Some(sample.presentation_time);
                times.last_video = Some(sample.presentation_time);
                Ok(AppendOutcome::Started)
            }
            RecordingState::Recording => {
                self.writer_mut()?.append(sample)?;
                if sample.is_video() {
                    self.times.lock().last_video = Some(sample.presentation_time);
                }
                Ok(AppendOutcome::Appended {
                    video: sample.is_video(),
                })
            }
        }
    }

    /// Close both tracks, end the timed session at the last video
    /// timestamp, and finalize. Terminal either way.
    pub fn finish(&mut self) -> Result<FinalizedFile, CaptureError> {
        if self.state.is_finished() {
            return Err(CaptureError::AssertionError(
                "recording already finished".into(),
            ));
        }
        let was_unstarted = self.state.is_unstarted();
        self.state = RecordingState::Finished;
        let Some(mut writer) = self.writer.take() else {
            return Err(CaptureError::AssertionError(
                "recording session lost its writer".into(),
            ));
        };
        if was_unstarted {
            // Stopped before any frame arrived; nothing playable exists.
            writer.discard();
            return Err(CaptureError::InvalidVideo);
        }
        writer.mark_finished(MediaTrack::Video);
        writer.mark_finished(MediaTrack::Audio);
        if let Some(last) = self.times.lock().last_video {
            writer.end_session(last);
        }
        writer.finalize()
    }

    /// Terminal discard: remove the partial file, produce nothing.
    pub fn discard(&mut self) {
        self.state = RecordingState::Finished;
        if let Some(writer) = self.writer.take() {
            writer.discard();
        }
    }

    fn writer_mut(&mut self) -> Result<&mut MuxedFileWriter, CaptureError> {
        self.writer.as_mut().ok_or_else(|| {
            CaptureError::AssertionError("recording session lost its writer".into())
        })
    }
}
