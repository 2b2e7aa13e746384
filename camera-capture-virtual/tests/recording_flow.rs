//! End-to-end recording flows driven through the orchestrator.

mod common;

use std::fs;
use std::thread;
use std::time::Duration;

use camera_capture_core::models::VideoRecordingState;
use camera_capture_core::storage::{self, probe_container};
use camera_capture_core::traits::CaptureSession;
use camera_capture_virtual::VirtualBackend;

use common::{temp_output_dir, test_config, Event, TestDelegate};

const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn records_and_finalizes_a_clip() {
    let dir = temp_output_dir("records-clip");
    let backend = VirtualBackend::phone();
    let orchestrator = backend.orchestrator(test_config(dir)).unwrap();
    let delegate = TestDelegate::new();
    orchestrator.set_delegate(delegate.clone());

    orchestrator.prepare().wait().unwrap();
    orchestrator.resume().wait();

    orchestrator.start_video_recording();
    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events.iter().any(|e| matches!(e, Event::DidBegin))
    }));
    assert!(delegate
        .snapshot()
        .iter()
        .any(|e| matches!(e, Event::WillBegin)));

    thread::sleep(Duration::from_millis(1200));
    orchestrator.stop_video_recording();

    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events.iter().any(|e| matches!(e, Event::Finished(_)))
    }));
    let result = delegate.finished_result().unwrap();

    assert!(result.file_path.exists());
    assert!(result.metadata.duration_seconds >= 1.0);
    assert!(result.metadata.has_audio);
    assert_eq!(result.metadata.width, 1280);
    assert_eq!(result.metadata.height, 720);
    assert!(result.metadata.size_bytes > 0);
    assert_eq!(result.metadata.sha256.len(), 64);

    let summary = probe_container(&result.file_path).unwrap();
    assert!(summary.finalized);
    assert!(summary.video_samples > 0);
    assert!(summary.audio.is_some());
    assert!(summary.duration_seconds >= 1.0);

    let sidecar = storage::read_sidecar(&result.file_path).unwrap();
    assert_eq!(sidecar, result.metadata);

    // Every recording outcome unwinds the audio activity.
    assert_eq!(backend.audio.active_activity_count(), 0);
    assert_eq!(
        orchestrator.video_recording_state(),
        VideoRecordingState::Ready
    );

    orchestrator.stop().wait();
}

#[test]
fn short_recordings_run_on_to_the_minimum_duration() {
    let dir = temp_output_dir("minimum-duration");
    let backend = VirtualBackend::phone();
    let mut config = test_config(dir);
    config.recording.minimum_duration = Duration::from_secs(1);
    let orchestrator = backend.orchestrator(config).unwrap();
    let delegate = TestDelegate::new();
    orchestrator.set_delegate(delegate.clone());

    orchestrator.prepare().wait().unwrap();
    orchestrator.resume().wait();

    orchestrator.start_video_recording();
    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events.iter().any(|e| matches!(e, Event::DidBegin))
    }));

    // Stop well short of the minimum; capture keeps running until the
    // clip is long enough.
    thread::sleep(Duration::from_millis(200));
    orchestrator.stop_video_recording();

    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events.iter().any(|e| matches!(e, Event::Finished(_)))
    }));
    let result = delegate.finished_result().unwrap();
    assert!(
        result.metadata.duration_seconds >= 0.9,
        "clip was only {}s",
        result.metadata.duration_seconds
    );

    orchestrator.stop().wait();
}

#[test]
fn immediate_stop_with_no_minimum_still_resolves() {
    let dir = temp_output_dir("instant-stop");
    let backend = VirtualBackend::phone();
    let mut config = test_config(dir);
    config.recording.minimum_duration = Duration::ZERO;
    let orchestrator = backend.orchestrator(config).unwrap();
    let delegate = TestDelegate::new();
    orchestrator.set_delegate(delegate.clone());

    orchestrator.prepare().wait().unwrap();
    orchestrator.resume().wait();

    // Stop before the start job has had a chance to build the writer.
    orchestrator.start_video_recording();
    orchestrator.stop_video_recording();

    // The clip may hold zero frames, so either outcome is acceptable;
    // what must not happen is the recording hanging in Stopping.
    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events
            .iter()
            .any(|e| matches!(e, Event::Finished(_) | Event::Failed(_)))
    }));
    assert_eq!(
        orchestrator.video_recording_state(),
        VideoRecordingState::Ready
    );

    // A later recording runs normally on the same pipeline.
    let seen = delegate.snapshot().len();
    orchestrator.start_video_recording();
    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events[seen..].iter().any(|e| matches!(e, Event::DidBegin))
    }));
    thread::sleep(Duration::from_millis(300));
    orchestrator.stop_video_recording();
    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events[seen..]
            .iter()
            .any(|e| matches!(e, Event::Finished(_)))
    }));

    orchestrator.stop().wait();
}

#[test]
fn cancel_removes_the_partial_file() {
    let dir = temp_output_dir("cancel");
    let backend = VirtualBackend::phone();
    let orchestrator = backend.orchestrator(test_config(dir.clone())).unwrap();
    let delegate = TestDelegate::new();
    orchestrator.set_delegate(delegate.clone());

    orchestrator.prepare().wait().unwrap();
    orchestrator.resume().wait();

    orchestrator.start_video_recording();
    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events.iter().any(|e| matches!(e, Event::DidBegin))
    }));
    thread::sleep(Duration::from_millis(150));
    orchestrator.cancel_video_recording();

    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events.iter().any(|e| matches!(e, Event::Canceled))
    }));

    // Let any stale finalize work drain before inspecting the directory.
    thread::sleep(Duration::from_millis(300));
    let leftovers: Vec<_> = fs::read_dir(&dir).unwrap().collect();
    assert!(leftovers.is_empty(), "leftover files: {:?}", leftovers);

    let events = delegate.snapshot();
    assert!(!events.iter().any(|e| matches!(e, Event::Finished(_))));
    assert!(!events.iter().any(|e| matches!(e, Event::Failed(_))));
    assert_eq!(
        orchestrator.video_recording_state(),
        VideoRecordingState::Ready
    );

    orchestrator.stop().wait();
}

#[test]
fn cancel_immediately_after_start_leaves_nothing_behind() {
    let dir = temp_output_dir("cancel-race");
    let backend = VirtualBackend::phone();
    let orchestrator = backend.orchestrator(test_config(dir.clone())).unwrap();
    let delegate = TestDelegate::new();
    orchestrator.set_delegate(delegate.clone());

    orchestrator.prepare().wait().unwrap();
    orchestrator.resume().wait();

    // Cancel before the recording setup job has had a chance to run.
    orchestrator.start_video_recording();
    orchestrator.cancel_video_recording();

    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events.iter().any(|e| matches!(e, Event::Canceled))
    }));
    thread::sleep(Duration::from_millis(400));

    let leftovers: Vec<_> = fs::read_dir(&dir).unwrap().collect();
    assert!(leftovers.is_empty(), "leftover files: {:?}", leftovers);
    assert!(!delegate
        .snapshot()
        .iter()
        .any(|e| matches!(e, Event::Finished(_))));

    orchestrator.stop().wait();
}

#[test]
fn switching_position_is_rejected_while_recording() {
    let dir = temp_output_dir("switch-while-recording");
    let backend = VirtualBackend::phone();
    let orchestrator = backend.orchestrator(test_config(dir)).unwrap();
    let delegate = TestDelegate::new();
    orchestrator.set_delegate(delegate.clone());

    orchestrator.prepare().wait().unwrap();
    orchestrator.resume().wait();
    let initial = orchestrator.desired_position();

    orchestrator.start_video_recording();
    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events.iter().any(|e| matches!(e, Event::DidBegin))
    }));

    let switch = orchestrator.switch_camera_position().wait();
    assert!(switch.is_err());
    assert_eq!(orchestrator.desired_position(), initial);

    orchestrator.stop_video_recording();
    assert!(delegate.wait_for(EVENT_TIMEOUT, |events| {
        events.iter().any(|e| matches!(e, Event::Finished(_)))
    }));

    orchestrator.stop().wait();
}

#[test]
fn prepare_is_idempotent() {
    let dir = temp_output_dir("prepare-twice");
    let backend = VirtualBackend::phone();
    let orchestrator = backend.orchestrator(test_config(dir)).unwrap();

    orchestrator.prepare().wait().unwrap();
    orchestrator.prepare().wait().unwrap();
    assert_eq!(backend.session.input_count(), 1);

    orchestrator.resume().wait();
    assert!(backend.session.is_running());
    orchestrator.stop().wait();
    assert!(!backend.session.is_running());
}
