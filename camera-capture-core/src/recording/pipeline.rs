//! Drives recording sessions on a dedicated serial queue.
//!
//! Samples may arrive from backend delivery threads at any time; every
//! mutation of the active session happens on the recording queue, so the
//! session itself needs no locking discipline beyond its clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::{
    AudioTrackSettings, CaptureError, RecordingConfig, SampleBuffer, VideoTrackSettings,
};
use crate::recording::session::{AppendOutcome, RecordingClock, RecordingSession};
use crate::storage::muxed_writer::{FinalizedFile, MuxedFileWriter, CONTAINER_EXTENSION};
use crate::traits::hardware::SampleHandler;
use crate::util::SerialQueue;

/// Cancellation token paired with one recording request.
///
/// The facade invalidates it when the user cancels. Writer setup runs
/// asynchronously, so a cancel can overtake it; whichever side observes
/// the flag later abandons the recording instead of resurrecting it.
#[derive(Clone, Default)]
pub struct RecordingRequestBox {
    invalidated: Arc<AtomicBool>,
}

impl RecordingRequestBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::SeqCst)
    }
}

/// Events emitted from the recording queue. The facade re-dispatches
/// them onto its notify queue.
pub trait RecordingPipelineObserver: Send + Sync {
    /// The first video sample landed; the clock is running.
    fn recording_did_start(&self);

    fn recording_duration_changed(&self, seconds: f64);

    /// Finalization is about to run.
    fn recording_will_finish(&self);

    fn recording_did_finish(&self, result: Result<FinalizedFile, CaptureError>);
}

/// Parameters for one recording.
#[derive(Debug, Clone)]
pub struct RecordingRequest {
    pub video: VideoTrackSettings,
    pub audio: Option<AudioTrackSettings>,
}

type SharedSession = Arc<Mutex<Option<RecordingSession>>>;
type SharedObserver = Arc<Mutex<Option<Arc<dyn RecordingPipelineObserver>>>>;

pub struct RecordingPipeline {
    queue: SerialQueue,
    config: RecordingConfig,
    session: SharedSession,
    clock: Arc<Mutex<Option<RecordingClock>>>,
    request_box: Arc<Mutex<Option<RecordingRequestBox>>>,
    observer: SharedObserver,
}

impl RecordingPipeline {
    pub fn new(config: RecordingConfig) -> std::io::Result<Self> {
        Ok(Self {
            queue: SerialQueue::new("capture-recording")?,
            config,
            session: Arc::new(Mutex::new(None)),
            clock: Arc::new(Mutex::new(None)),
            request_box: Arc::new(Mutex::new(None)),
            observer: Arc::new(Mutex::new(None)),
        })
    }

    pub fn set_observer(&self, observer: Arc<dyn RecordingPipelineObserver>) {
        *self.observer.lock() = Some(observer);
    }

    /// Handler for backends to deliver samples to. Hops to the recording
    /// queue; samples arriving with no active recording are dropped there.
    pub fn sample_handler(&self) -> SampleHandler {
        let queue = self.queue.clone();
        let session = Arc::clone(&self.session);
        let observer = Arc::clone(&self.observer);
        Arc::new(move |sample: SampleBuffer| {
            let session = Arc::clone(&session);
            let observer = Arc::clone(&observer);
            queue.dispatch(move || handle_sample(&session, &observer, sample));
        })
    }

    /// Create the writer for a new recording. Setup runs on the
    /// recording queue; failures surface through the observer.
    pub fn begin(&self, request: RecordingRequest, request_box: RecordingRequestBox) {
        *self.request_box.lock() = Some(request_box.clone());

        let config = self.config.clone();
        let session = Arc::clone(&self.session);
        let clock = Arc::clone(&self.clock);
        let observer = Arc::clone(&self.observer);
        self.queue.dispatch(move || {
            if request_box.is_invalidated() {
                log::info!("recording canceled before writer setup");
                return;
            }
            match build_session(&config, &request) {
                Ok(mut new_session) => {
                    if request_box.is_invalidated() {
                        // Cancel overtook the setup.
                        new_session.discard();
                        return;
                    }
                    *clock.lock() = Some(new_session.clock());
                    *session.lock() = Some(new_session);
                }
                Err(e) => {
                    log::error!("recording setup failed: {}", e);
                    notify(&observer, |o| o.recording_did_finish(Err(e)));
                }
            }
        });
    }

    /// Ask the recording to end. When the recorded duration is still
    /// under the configured minimum, finalization is postponed by the
    /// shortfall; samples keep appending in the meantime, so the final
    /// clip reaches the minimum instead of being padded or rejected.
    ///
    /// Callers must order this after the matching [`begin`](Self::begin)
    /// call; a stop enqueued first finds nothing to finalize.
    pub fn request_stop(&self) {
        let recorded = self
            .clock
            .lock()
            .as_ref()
            .map(|c| c.duration_seconds())
            .unwrap_or(0.0);
        let minimum = self.config.minimum_duration.as_secs_f64();
        let shortfall = (minimum - recorded).max(0.0);
        if shortfall > 0.0 {
            log::info!(
                "recording stopped at {:.2}s, extending by {:.2}s to reach the minimum",
                recorded,
                shortfall
            );
        }

        let session = Arc::clone(&self.session);
        let clock = Arc::clone(&self.clock);
        let request_box = Arc::clone(&self.request_box);
        let observer = Arc::clone(&self.observer);
        self.queue
            .dispatch_after(Duration::from_secs_f64(shortfall), move || {
                finish(&session, &clock, &request_box, &observer)
            });
    }

    /// Drop the active recording without producing a file. Invalidates
    /// the request box first, so a setup still in flight aborts too.
    pub fn cancel(&self) {
        if let Some(b) = self.request_box.lock().as_ref() {
            b.invalidate();
        }
        let session = Arc::clone(&self.session);
        let clock = Arc::clone(&self.clock);
        let request_box = Arc::clone(&self.request_box);
        self.queue.dispatch(move || {
            if let Some(mut active) = session.lock().take() {
                active.discard();
            }
            clock.lock().take();
            request_box.lock().take();
        });
    }

    /// Duration recorded so far, readable from any thread.
    pub fn recorded_duration_seconds(&self) -> f64 {
        self.clock
            .lock()
            .as_ref()
            .map(|c| c.duration_seconds())
            .unwrap_or(0.0)
    }
}

fn handle_sample(session: &SharedSession, observer: &SharedObserver, sample: SampleBuffer) {
    let mut guard = session.lock();
    let Some(active) = guard.as_mut() else {
        log::trace!("sample with no active recording, dropping");
        return;
    };
    match active.append(&sample) {
        Ok(AppendOutcome::Started) => {
            drop(guard);
            notify(observer, |o| o.recording_did_start());
        }
        Ok(AppendOutcome::Appended { video: true }) => {
            let seconds = active.clock().duration_seconds();
            drop(guard);
            notify(observer, |o| o.recording_duration_changed(seconds));
        }
        Ok(AppendOutcome::Appended { video: false }) | Ok(AppendOutcome::Ignored) => {}
        Err(e) => {
            log::error!("append failed, abandoning the recording: {}", e);
            active.discard();
            drop(guard);
            notify(observer, |o| o.recording_did_finish(Err(e)));
        }
    }
}

fn finish(
    session: &SharedSession,
    clock: &Arc<Mutex<Option<RecordingClock>>>,
    request_box: &Arc<Mutex<Option<RecordingRequestBox>>>,
    observer: &SharedObserver,
) {
    let taken = session.lock().take();
    clock.lock().take();
    request_box.lock().take();
    match taken {
        Some(mut active) => {
            notify(observer, |o| o.recording_will_finish());
            let result = active.finish();
            notify(observer, |o| o.recording_did_finish(result));
        }
        None => log::warn!("stop requested with no active recording"),
    }
}

fn notify(
    observer: &SharedObserver,
    f: impl FnOnce(&dyn RecordingPipelineObserver),
) {
    let current = observer.lock().clone();
    if let Some(o) = current {
        f(o.as_ref());
    }
}

fn build_session(
    config: &RecordingConfig,
    request: &RecordingRequest,
) -> Result<RecordingSession, CaptureError> {
    config.validate()?;
    let file_name = format!("recording-{}.{}", Uuid::new_v4(), CONTAINER_EXTENSION);
    let mut writer = MuxedFileWriter::new(config.output_directory.join(file_name));
    writer.add_video_track(request.video.clone())?;
    if let Some(audio) = &request.audio {
        writer.add_audio_track(audio.clone())?;
    }
    writer.start_writing()?;
    Ok(RecordingSession::new(
        writer,
        request.video.clone(),
        request.audio.is_some(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaTime, VideoCodec};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::mpsc::{channel, Sender};
    use std::time::Instant;

    struct TestObserver {
        events: Mutex<Vec<String>>,
        finished: Sender<Result<FinalizedFile, CaptureError>>,
    }

    impl RecordingPipelineObserver for TestObserver {
        fn recording_did_start(&self) {
            self.events.lock().push("started".into());
        }

        fn recording_duration_changed(&self, _seconds: f64) {}

        fn recording_will_finish(&self) {
            self.events.lock().push("will-finish".into());
        }

        fn recording_did_finish(&self, result: Result<FinalizedFile, CaptureError>) {
            self.events.lock().push("finished".into());
            let _ = self.finished.send(result);
        }
    }

    fn test_config(minimum_ms: u64) -> (RecordingConfig, PathBuf) {
        let dir = std::env::temp_dir().join(format!("pipeline-test-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let config = RecordingConfig {
            minimum_duration: Duration::from_millis(minimum_ms),
            output_directory: dir.clone(),
            ..RecordingConfig::default()
        };
        (config, dir)
    }

    fn request() -> RecordingRequest {
        RecordingRequest {
            video: VideoTrackSettings {
                codec: VideoCodec::H264,
                width: 720,
                height: 1280,
                average_bit_rate: 2_000_000,
                max_keyframe_interval: 90,
            },
            audio: None,
        }
    }

    #[test]
    fn records_and_finalizes_through_the_queue() {
        let (config, dir) = test_config(0);
        let pipeline = RecordingPipeline::new(config).unwrap();
        let (tx, rx) = channel();
        let observer = Arc::new(TestObserver {
            events: Mutex::new(Vec::new()),
            finished: tx,
        });
        pipeline.set_observer(observer.clone());

        pipeline.begin(request(), RecordingRequestBox::new());
        let handler = pipeline.sample_handler();
        for frame in 0..10i64 {
            handler(SampleBuffer::video(
                MediaTime::new(frame * 20, 600),
                frame == 0,
                vec![0u8; 32],
            ));
        }
        pipeline.request_stop();

        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(result.video_samples, 10);
        assert!((result.duration_seconds - 0.3).abs() < 1e-9);
        assert_eq!(
            *observer.events.lock(),
            vec!["started", "will-finish", "finished"]
        );
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn cancel_overtaking_setup_leaves_no_file() {
        let (config, dir) = test_config(0);
        let pipeline = RecordingPipeline::new(config).unwrap();
        let request_box = RecordingRequestBox::new();
        pipeline.begin(request(), request_box.clone());
        pipeline.cancel();
        assert!(request_box.is_invalidated());

        // A sample arriving after the cancel must be dropped, not revive
        // the recording. Give the queued jobs time to drain.
        let handler = pipeline.sample_handler();
        handler(SampleBuffer::video(MediaTime::new(0, 600), true, vec![]));
        std::thread::sleep(Duration::from_millis(150));

        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn stop_waits_out_the_minimum_duration() {
        let (config, dir) = test_config(300);
        let pipeline = RecordingPipeline::new(config).unwrap();
        let (tx, rx) = channel();
        pipeline.set_observer(Arc::new(TestObserver {
            events: Mutex::new(Vec::new()),
            finished: tx,
        }));

        pipeline.begin(request(), RecordingRequestBox::new());
        let handler = pipeline.sample_handler();
        // 50ms of video, well under the 300ms minimum.
        handler(SampleBuffer::video(MediaTime::new(0, 600), true, vec![0u8; 8]));
        handler(SampleBuffer::video(MediaTime::new(30, 600), false, vec![0u8; 8]));
        std::thread::sleep(Duration::from_millis(50));

        let asked = Instant::now();
        pipeline.request_stop();
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert!(asked.elapsed() >= Duration::from_millis(200));
        assert_eq!(result.video_samples, 2);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn stop_without_a_recording_reports_nothing() {
        let (config, dir) = test_config(0);
        let pipeline = RecordingPipeline::new(config).unwrap();
        let (tx, rx) = channel();
        pipeline.set_observer(Arc::new(TestObserver {
            events: Mutex::new(Vec::new()),
            finished: tx,
        }));
        pipeline.request_stop();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        fs::remove_dir_all(dir).unwrap();
    }
}
