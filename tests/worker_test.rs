//! Tests for the collection worker: session lifecycle, pause/resume, stop, reset and save


use landmark_collector::{
    constants::{status, KEYPOINT_VECTOR_LEN},
    cue::SilentCue,
    keypoints::HolisticLandmarks,
    worker::{Worker, WorkerEvent},
};
use ndarray::Array1;
use ndarray_npy::read_npy;
use std::sync::atomic::Ordering;
use std::time::Duration;
use test_helpers::{
    count_files, events_until, events_until_status, sample_pose, statuses, test_config, Detection, FakeBackend,
    RecordingCue,
};

fn finished(events: &[WorkerEvent]) -> Option<(usize, bool)> {
    events.iter().find_map(|event| match event {
        WorkerEvent::CollectionFinished { buffered, interrupted } => Some((*buffered, *interrupted)),
        _ => None,
    })
}

fn saved(events: &[WorkerEvent]) -> Option<usize> {
    events.iter().find_map(|event| match event {
        WorkerEvent::Saved(summary) => Some(summary.written),
        _ => None,
    })
}

#[test]
fn test_complete_session_buffers_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, probe) = FakeBackend::new();
    let (worker, events) =
        Worker::spawn(test_config(dir.path(), 2, 3), Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    let seen = events_until(&events, |e| matches!(e, WorkerEvent::CollectionFinished { .. }));

    assert_eq!(finished(&seen), Some((6, false)));
    assert_eq!(probe.reads(), 6);
    assert!(probe.released());
    assert!(statuses(&seen).contains(&status::COMPLETED));

    // One preview per frame, then the preview is cleared
    let previews = seen.iter().filter(|e| matches!(e, WorkerEvent::Frame(Some(_)))).count();
    assert_eq!(previews, 6);
    assert!(seen.iter().any(|e| matches!(e, WorkerEvent::Frame(None))));
}

#[test]
fn test_save_distributes_frames_across_sequences() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 2, 3);
    config.start_folder = 4;
    let (backend, _probe) = FakeBackend::new();
    let (worker, events) = Worker::spawn(config, Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    events_until_status(&events, status::COMPLETED);
    worker.save();
    let seen = events_until_status(&events, status::SAVED);

    assert_eq!(saved(&seen), Some(6));
    assert_eq!(count_files(dir.path(), "npy"), 6);
    for sequence in [4, 5] {
        for frame in 0..3 {
            let path = dir.path().join("wave").join(sequence.to_string()).join(format!("{frame}.npy"));
            let keypoints: Array1<f32> = read_npy(&path).unwrap();
            assert_eq!(keypoints.len(), KEYPOINT_VECTOR_LEN);
        }
    }
}

#[test]
fn test_pause_then_resume_continues_where_it_left_off() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 2, 5);
    config.timing.frame_delay_ms = 5;
    let (backend, probe) = FakeBackend::new();
    let (worker, events) = Worker::spawn(config, Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    probe.wait_for_reads(2);
    worker.pause();
    assert!(worker.is_paused());
    events_until_status(&events, status::PAUSED);

    // Let an in-flight frame finish, then the count must hold still
    std::thread::sleep(Duration::from_millis(50));
    let reads_while_paused = probe.reads();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(probe.reads(), reads_while_paused);
    assert!(reads_while_paused < 10);

    worker.resume();
    let seen = events_until(&events, |e| matches!(e, WorkerEvent::CollectionFinished { .. }));
    assert!(statuses(&seen).contains(&status::RESUMED));
    assert_eq!(finished(&seen), Some((10, false)));
    assert_eq!(probe.reads(), 10);
    assert_eq!(probe.opened.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stop_saves_what_was_collected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 5, 10);
    config.timing.frame_delay_ms = 5;
    let (backend, probe) = FakeBackend::new();
    let (worker, events) = Worker::spawn(config, Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("nod");
    probe.wait_for_reads(3);
    worker.stop();
    assert!(!worker.is_collecting());

    let seen = events_until_status(&events, status::STOPPED);
    let (buffered, interrupted) = finished(&seen).unwrap();
    assert!(interrupted);
    assert!(buffered >= 2 && buffered < 50);
    assert_eq!(saved(&seen), Some(buffered));
    assert_eq!(count_files(&dir.path().join("nod"), "npy"), buffered);

    let order = statuses(&seen);
    let saved_at = order.iter().position(|s| *s == status::SAVED).unwrap();
    let stopped_at = order.iter().position(|s| *s == status::STOPPED).unwrap();
    assert!(saved_at < stopped_at);
}

#[test]
fn test_reset_releases_camera_and_clears_buffers() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 5, 10);
    config.timing.frame_delay_ms = 5;
    let (backend, probe) = FakeBackend::new();
    let (worker, events) = Worker::spawn(config, Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    probe.wait_for_reads(2);
    worker.reset();
    events_until_status(&events, status::RESET);

    assert!(probe.released());
    assert!(!worker.is_collecting());
    assert!(!worker.is_paused());

    // Nothing is left to save and the action was forgotten
    worker.save();
    events_until_status(&events, status::NO_ACTION);
    assert_eq!(count_files(dir.path(), "npy"), 0);
}

#[test]
fn test_reset_when_idle() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, probe) = FakeBackend::new();
    let (worker, events) =
        Worker::spawn(test_config(dir.path(), 1, 1), Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.reset();
    events_until_status(&events, status::RESET);
    assert_eq!(probe.opened.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failed_reads_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let (mut backend, probe) = FakeBackend::new();
    backend.fail_every = Some(3);
    let (worker, events) =
        Worker::spawn(test_config(dir.path(), 2, 3), Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    let seen = events_until(&events, |e| matches!(e, WorkerEvent::CollectionFinished { .. }));

    // Reads 3 and 6 fail; their frame slots are not retried
    assert_eq!(probe.reads(), 6);
    assert_eq!(finished(&seen), Some((4, false)));
}

#[test]
fn test_detector_failure_stores_zero_vector() {
    let dir = tempfile::tempdir().unwrap();
    let (mut backend, _probe) = FakeBackend::new();
    backend.detection = Detection::Failure;
    let (worker, events) =
        Worker::spawn(test_config(dir.path(), 1, 2), Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    events_until_status(&events, status::COMPLETED);
    worker.save();
    events_until_status(&events, status::SAVED);

    let keypoints: Array1<f32> = read_npy(dir.path().join("wave/0/1.npy")).unwrap();
    assert_eq!(keypoints.len(), KEYPOINT_VECTOR_LEN);
    assert!(keypoints.iter().all(|&v| v == 0.0));
}

#[test]
fn test_detected_pose_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let (mut backend, _probe) = FakeBackend::new();
    backend.detection = Detection::Landmarks(HolisticLandmarks {
        pose: Some(sample_pose()),
        ..Default::default()
    });
    let (worker, events) =
        Worker::spawn(test_config(dir.path(), 1, 1), Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    events_until_status(&events, status::COMPLETED);
    worker.stop();
    events_until_status(&events, status::STOPPED);

    let keypoints: Array1<f32> = read_npy(dir.path().join("wave/0/0.npy")).unwrap();
    // Second pose landmark: x, y, z, visibility
    assert!((keypoints[4] - 0.01).abs() < 1e-6);
    assert!((keypoints[5] - 0.5).abs() < 1e-6);
    assert!((keypoints[6] + 0.1).abs() < 1e-6);
    assert!((keypoints[7] - 0.9).abs() < 1e-6);
    assert!(keypoints.iter().skip(132).all(|&v| v == 0.0));
}

#[test]
fn test_countdown_announces_and_ticks() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 1, 1);
    config.timing.countdown_seconds = 1;
    let cue = RecordingCue::default();
    let ticks = cue.ticks.clone();
    let (backend, _probe) = FakeBackend::new();
    let (worker, events) = Worker::spawn(config, Box::new(backend), Box::new(cue)).unwrap();

    worker.start("wave");
    let seen = events_until_status(&events, status::COMPLETED);
    assert_eq!(statuses(&seen)[0], "Starting in 1...");
    assert_eq!(*ticks.lock().unwrap(), vec![1]);
}

#[test]
fn test_stop_during_countdown_interrupts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 1, 1);
    config.timing.countdown_seconds = 3;
    let (backend, probe) = FakeBackend::new();
    let (worker, events) = Worker::spawn(config, Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    events_until_status(&events, "Starting in 3...");
    worker.stop();
    let seen = events_until_status(&events, status::STOPPED);

    assert_eq!(finished(&seen), Some((0, true)));
    assert_eq!(probe.reads(), 0);
}

#[test]
fn test_second_start_while_collecting_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 2, 5);
    config.timing.frame_delay_ms = 5;
    let (backend, probe) = FakeBackend::new();
    let (worker, events) = Worker::spawn(config, Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    worker.start("nod");
    let seen = events_until(&events, |e| matches!(e, WorkerEvent::CollectionFinished { .. }));
    assert_eq!(finished(&seen), Some((10, false)));
    assert_eq!(probe.opened.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sessions_reuse_the_detector() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, probe) = FakeBackend::new();
    let (worker, events) =
        Worker::spawn(test_config(dir.path(), 1, 2), Box::new(backend), Box::new(SilentCue)).unwrap();

    for _ in 0..2 {
        worker.start("wave");
        events_until_status(&events, status::COMPLETED);
    }
    assert_eq!(probe.opened.load(Ordering::SeqCst), 2);
    assert_eq!(probe.resets.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stop_then_immediate_start_interrupts_the_first_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 5, 10);
    config.timing.frame_delay_ms = 5;
    let (backend, probe) = FakeBackend::new();
    let (worker, events) = Worker::spawn(config, Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    probe.wait_for_reads(2);
    worker.stop();
    worker.start("nod");
    assert!(worker.is_collecting());

    let first = events_until(&events, |e| matches!(e, WorkerEvent::CollectionFinished { .. }));
    let (buffered, interrupted) = finished(&first).unwrap();
    assert!(interrupted);
    assert!(buffered < 50);
    assert!(worker.is_collecting());

    // The stop still saves the interrupted session under its own action
    let stopped = events_until_status(&events, status::STOPPED);
    assert_eq!(saved(&stopped), Some(buffered));
    assert_eq!(count_files(&dir.path().join("wave"), "npy"), buffered);

    let second = events_until(&events, |e| matches!(e, WorkerEvent::CollectionFinished { .. }));
    assert_eq!(finished(&second), Some((50, false)));
    assert!(!worker.is_collecting());
    assert_eq!(probe.opened.load(Ordering::SeqCst), 2);
}

#[test]
fn test_reset_then_immediate_start_keeps_controls_live() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), 5, 10);
    config.timing.frame_delay_ms = 5;
    let (backend, probe) = FakeBackend::new();
    let (worker, events) = Worker::spawn(config, Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    probe.wait_for_reads(2);
    worker.reset();
    worker.start("nod");

    let first = events_until(&events, |e| matches!(e, WorkerEvent::CollectionFinished { .. }));
    assert!(finished(&first).unwrap().1);
    assert!(worker.is_collecting());
    events_until_status(&events, status::RESET);

    // Pause and resume act on the new session
    worker.pause();
    assert!(worker.is_paused());
    events_until_status(&events, status::PAUSED);
    worker.resume();
    assert!(!worker.is_paused());

    let second = events_until(&events, |e| matches!(e, WorkerEvent::CollectionFinished { .. }));
    assert!(statuses(&second).contains(&status::RESUMED));
    assert_eq!(finished(&second), Some((50, false)));
    assert!(!worker.is_collecting());

    worker.save();
    events_until_status(&events, status::SAVED);
    assert_eq!(count_files(&dir.path().join("wave"), "npy"), 0);
    assert_eq!(count_files(&dir.path().join("nod"), "npy"), 50);
}

#[test]
fn test_reset_after_completed_session_discards_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let (backend, _probe) = FakeBackend::new();
    let (worker, events) =
        Worker::spawn(test_config(dir.path(), 1, 2), Box::new(backend), Box::new(SilentCue)).unwrap();

    worker.start("wave");
    let seen = events_until(&events, |e| matches!(e, WorkerEvent::CollectionFinished { .. }));
    assert_eq!(finished(&seen), Some((2, false)));

    worker.reset();
    events_until_status(&events, status::RESET);
    worker.save();
    events_until_status(&events, status::NO_ACTION);
    assert_eq!(count_files(dir.path(), "npy"), 0);
}
