//! Encoded media samples flowing from a capture backend to the recorder.

use super::time::MediaTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaTrack {
    Video,
    Audio,
}

/// One encoded sample from a capture backend.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub track: MediaTrack,
    pub presentation_time: MediaTime,
    /// Whether the sample can be decoded without prior samples. Audio
    /// samples are always independent.
    pub keyframe: bool,
    pub data: Vec<u8>,
}

impl SampleBuffer {
    pub fn video(presentation_time: MediaTime, keyframe: bool, data: Vec<u8>) -> Self {
        Self {
            track: MediaTrack::Video,
            presentation_time,
            keyframe,
            data,
        }
    }

    pub fn audio(presentation_time: MediaTime, data: Vec<u8>) -> Self {
        Self {
            track: MediaTrack::Audio,
            presentation_time,
            keyframe: true,
            data,
        }
    }

    pub fn is_video(&self) -> bool {
        self.track == MediaTrack::Video
    }
}
