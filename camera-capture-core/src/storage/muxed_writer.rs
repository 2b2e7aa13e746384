//! Streaming writer for the muxed recording container.
//!
//! Layout:
//!
//! ```text
//! [0..8)    magic "CMVMUX01"
//! [8..12)   u32 LE: track header JSON length
//! [12..12+n) track header JSON (video settings, optional audio settings)
//! summary block (33 bytes, patched on finalize):
//!   u64 LE  video sample count
//!   u64 LE  audio sample count
//!   i64 LE  session start, microseconds
//!   i64 LE  session end, microseconds
//!   u8      finalized flag
//! sample records, repeated:
//!   u8      track tag (0 video, 1 audio)
//!   u8      keyframe flag
//!   i64 LE  presentation time, microseconds
//!   u32 LE  payload length
//!   payload
//! ```
//!
//! The summary is written as zeroes up front and patched in place when
//! the recording finalizes, so a crash mid-recording leaves a file whose
//! finalized flag is still clear.

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{
    AudioTrackSettings, CaptureError, MediaTime, MediaTrack, SampleBuffer, VideoTrackSettings,
};

pub const CONTAINER_MAGIC: &[u8; 8] = b"CMVMUX01";
pub const CONTAINER_EXTENSION: &str = "cmv";

const SUMMARY_LEN: usize = 8 + 8 + 8 + 8 + 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackHeader {
    video: VideoTrackSettings,
    audio: Option<AudioTrackSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Configuring,
    Writing,
}

/// A successfully finalized container file.
#[derive(Debug, Clone)]
pub struct FinalizedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
    pub duration_seconds: f64,
    pub video_samples: u64,
    pub audio_samples: u64,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
}

/// Writes one recording. Single-owner; the recording queue is the only
/// caller.
pub struct MuxedFileWriter {
    path: PathBuf,
    file: Option<File>,
    video_settings: Option<VideoTrackSettings>,
    audio_settings: Option<AudioTrackSettings>,
    state: WriterState,
    summary_offset: u64,
    video_samples: u64,
    audio_samples: u64,
    video_finished: bool,
    audio_finished: bool,
    session_start: Option<MediaTime>,
    session_end: Option<MediaTime>,
}

impl MuxedFileWriter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: None,
            video_settings: None,
            audio_settings: None,
            state: WriterState::Configuring,
            summary_offset: 0,
            video_samples: 0,
            audio_samples: 0,
            video_finished: false,
            audio_finished: false,
            session_start: None,
            session_end: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_video_track(&mut self, settings: VideoTrackSettings) -> Result<(), CaptureError> {
        if self.state != WriterState::Configuring {
            return Err(CaptureError::AssertionError(
                "tracks must be added before writing starts".into(),
            ));
        }
        self.video_settings = Some(settings);
        Ok(())
    }

    pub fn add_audio_track(&mut self, settings: AudioTrackSettings) -> Result<(), CaptureError> {
        if self.state != WriterState::Configuring {
            return Err(CaptureError::AssertionError(
                "tracks must be added before writing starts".into(),
            ));
        }
        self.audio_settings = Some(settings);
        Ok(())
    }

    /// Create the file and write the header. Tracks are frozen after
    /// this.
    pub fn start_writing(&mut self) -> Result<(), CaptureError> {
        if self.state != WriterState::Configuring {
            return Err(CaptureError::AssertionError(
                "writer already started".into(),
            ));
        }
        let video = self.video_settings.clone().ok_or_else(|| {
            CaptureError::InitializationFailed("a video track is required".into())
        })?;
        let header = TrackHeader {
            video,
            audio: self.audio_settings.clone(),
        };
        let header_json = serde_json::to_vec(&header).map_err(|e| {
            CaptureError::InitializationFailed(format!("could not encode track header: {}", e))
        })?;

        let mut file = File::create(&self.path).map_err(|e| {
            CaptureError::InitializationFailed(format!(
                "could not create {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let write_header = |file: &mut File| -> io::Result<()> {
            file.write_all(CONTAINER_MAGIC)?;
            file.write_all(&(header_json.len() as u32).to_le_bytes())?;
            file.write_all(&header_json)?;
            file.write_all(&[0u8; SUMMARY_LEN])?;
            Ok(())
        };
        write_header(&mut file).map_err(|e| {
            CaptureError::InitializationFailed(format!("could not write container header: {}", e))
        })?;

        self.summary_offset = (CONTAINER_MAGIC.len() + 4 + header_json.len()) as u64;
        self.file = Some(file);
        self.state = WriterState::Writing;
        Ok(())
    }

    /// Open the timed session. The first call wins; later calls are
    /// ignored.
    pub fn start_session(&mut self, at: MediaTime) {
        if self.session_start.is_some() {
            log::warn!("session already started, ignoring");
            return;
        }
        self.session_start = Some(at);
    }

    pub fn has_session(&self) -> bool {
        self.session_start.is_some()
    }

    pub fn end_session(&mut self, at: MediaTime) {
        self.session_end = Some(at);
    }

    /// Declare that no more samples will arrive for a track.
    pub fn mark_finished(&mut self, track: MediaTrack) {
        match track {
            MediaTrack::Video => self.video_finished = true,
            MediaTrack::Audio => self.audio_finished = true,
        }
    }

    /// Append one sample record. Samples for a finished track, or for an
    /// audio track that was never declared, are dropped.
    pub fn append(&mut self, sample: &SampleBuffer) -> Result<(), CaptureError> {
        if self.state != WriterState::Writing {
            return Err(CaptureError::AssertionError(
                "append before start_writing".into(),
            ));
        }
        if self.session_start.is_none() {
            return Err(CaptureError::AssertionError(
                "append before the session opened".into(),
            ));
        }
        let (tag, finished) = match sample.track {
            MediaTrack::Video => (0u8, self.video_finished),
            MediaTrack::Audio => (1u8, self.audio_finished || self.audio_settings.is_none()),
        };
        if finished {
            log::debug!("dropping {:?} sample for closed track", sample.track);
            return Ok(());
        }

        let file = self.file.as_mut().ok_or_else(|| {
            CaptureError::AssertionError("writer has no open file".into())
        })?;
        let write_record = |file: &mut File| -> io::Result<()> {
            file.write_all(&[tag, sample.keyframe as u8])?;
            file.write_all(&sample.presentation_time.micros().to_le_bytes())?;
            file.write_all(&(sample.data.len() as u32).to_le_bytes())?;
            file.write_all(&sample.data)?;
            Ok(())
        };
        if let Err(e) = write_record(file) {
            log::error!("sample write failed: {}", e);
            return Err(CaptureError::InvalidVideo);
        }
        match sample.track {
            MediaTrack::Video => self.video_samples += 1,
            MediaTrack::Audio => self.audio_samples += 1,
        }
        Ok(())
    }

    pub fn video_sample_count(&self) -> u64 {
        self.video_samples
    }

    /// Patch the summary block and close the file. A recording whose
    /// session never opened, or that holds no video samples, is not a
    /// playable file; it is removed and `InvalidVideo` returned.
    pub fn finalize(mut self) -> Result<FinalizedFile, CaptureError> {
        if self.state != WriterState::Writing {
            return Err(CaptureError::AssertionError(
                "finalize before start_writing".into(),
            ));
        }
        let (start, end) = match (self.session_start, self.session_end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                self.remove_file();
                return Err(CaptureError::InvalidVideo);
            }
        };
        if self.video_samples == 0 {
            self.remove_file();
            return Err(CaptureError::InvalidVideo);
        }

        let Some(mut file) = self.file.take() else {
            return Err(CaptureError::AssertionError("writer has no open file".into()));
        };
        let patch = |file: &mut File| -> io::Result<()> {
            file.seek(SeekFrom::Start(self.summary_offset))?;
            file.write_all(&self.video_samples.to_le_bytes())?;
            file.write_all(&self.audio_samples.to_le_bytes())?;
            file.write_all(&start.micros().to_le_bytes())?;
            file.write_all(&end.micros().to_le_bytes())?;
            file.write_all(&[1u8])?;
            file.flush()?;
            file.sync_all()
        };
        if let Err(e) = patch(&mut file) {
            log::error!("could not finalize {}: {}", self.path.display(), e);
            drop(file);
            self.remove_file();
            return Err(CaptureError::InvalidVideo);
        }
        drop(file);

        let size_bytes = fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|_| CaptureError::InvalidVideo)?;
        let sha256 = sha256_file(&self.path)?;
        let duration_seconds = end.seconds_since(start).max(0.0);
        let video = self.video_settings.as_ref();
        Ok(FinalizedFile {
            path: self.path.clone(),
            size_bytes,
            sha256,
            duration_seconds,
            video_samples: self.video_samples,
            audio_samples: self.audio_samples,
            width: video.map(|v| v.width).unwrap_or(0),
            height: video.map(|v| v.height).unwrap_or(0),
            has_audio: self.audio_settings.is_some(),
        })
    }

    /// Close and delete the partial file.
    pub fn discard(mut self) {
        self.file.take();
        self.remove_file();
    }

    fn remove_file(&self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("could not remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// What a reader can learn from a container without decoding samples.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub video: VideoTrackSettings,
    pub audio: Option<AudioTrackSettings>,
    pub video_samples: u64,
    pub audio_samples: u64,
    pub duration_seconds: f64,
    pub finalized: bool,
}

/// Read the header and summary of a container file.
pub fn probe_container(path: &Path) -> Result<ContainerSummary, CaptureError> {
    let bytes = fs::read(path).map_err(|_| CaptureError::InvalidVideo)?;
    let header_end = CONTAINER_MAGIC.len() + 4;
    if bytes.len() < header_end || &bytes[..CONTAINER_MAGIC.len()] != CONTAINER_MAGIC {
        return Err(CaptureError::InvalidVideo);
    }
    let json_len =
        u32::from_le_bytes(bytes[CONTAINER_MAGIC.len()..header_end].try_into().unwrap_or_default())
            as usize;
    let summary_offset = header_end + json_len;
    if bytes.len() < summary_offset + SUMMARY_LEN {
        return Err(CaptureError::InvalidVideo);
    }
    let header: TrackHeader = serde_json::from_slice(&bytes[header_end..summary_offset])
        .map_err(|_| CaptureError::InvalidVideo)?;

    let read_u64 = |offset: usize| {
        u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap_or_default())
    };
    let read_i64 = |offset: usize| {
        i64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap_or_default())
    };
    let video_samples = read_u64(summary_offset);
    let audio_samples = read_u64(summary_offset + 8);
    let start_micros = read_i64(summary_offset + 16);
    let end_micros = read_i64(summary_offset + 24);
    let finalized = bytes[summary_offset + 32] == 1;

    Ok(ContainerSummary {
        video: header.video,
        audio: header.audio,
        video_samples,
        audio_samples,
        duration_seconds: ((end_micros - start_micros) as f64 / 1_000_000.0).max(0.0),
        finalized,
    })
}

fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let mut file = File::open(path).map_err(|_| CaptureError::InvalidVideo)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|_| CaptureError::InvalidVideo)?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}
