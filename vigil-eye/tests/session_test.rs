//! Tests for DetectionSession with classifier detectors and snapshots

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vigil_core::{AlarmKind, AlertSink, DecisionConfig, DriverStatus};
use vigil_eye::overlay::overlay_lines;
use vigil_eye::{
    Classification, ClassifierLabel, DetectionSession, Detector, Frame, FrameClassifier,
    SnapshotSink, VisionError,
};

#[derive(Default)]
struct CountingSink {
    raised: AtomicUsize,
}

impl AlertSink for CountingSink {
    fn raise(&self, _kind: AlarmKind) -> bool {
        self.raised.fetch_add(1, Ordering::SeqCst);
        true
    }
}

/// Plays back a fixed list of labels, one per frame
struct ScriptedClassifier {
    labels: Vec<ClassifierLabel>,
}

impl FrameClassifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted"
    }

    fn classify(&mut self, frame: &Frame) -> Result<Classification, VisionError> {
        let label = self
            .labels
            .get(frame.sequence as usize)
            .copied()
            .ok_or_else(|| VisionError::Processing("script exhausted".to_string()))?;
        let scores: Vec<f32> = ClassifierLabel::ALL
            .iter()
            .map(|l| if *l == label { 0.9 } else { 0.1 / 3.0 })
            .collect();
        Classification::from_scores(&scores)
    }
}

fn frame(sequence: u64, ms: u64) -> Frame {
    Frame::blank(32, 24, sequence, Duration::from_millis(ms))
}

fn session(labels: Vec<ClassifierLabel>, config: DecisionConfig) -> (Arc<CountingSink>, DetectionSession) {
    let sink = Arc::new(CountingSink::default());
    let session = DetectionSession::new(config, sink.clone())
        .with_detector(Detector::Classifier(Box::new(ScriptedClassifier { labels })));
    (sink, session)
}

#[test]
fn test_closed_eye_labels_raise_drowsiness() {
    let mut labels = vec![ClassifierLabel::OpenEyes];
    labels.extend(std::iter::repeat(ClassifierLabel::ClosedEyes).take(4));
    let (sink, mut session) = session(
        labels,
        DecisionConfig {
            consec_frames: 3,
            ..DecisionConfig::default()
        },
    );

    let reports: Vec<_> = (0..5)
        .map(|i| session.process(&frame(i, i * 33)).unwrap())
        .collect();

    assert_eq!(reports[3].decision.alarm, Some(AlarmKind::Drowsiness));
    assert_eq!(reports[4].status(), DriverStatus::Drowsy);
    assert_eq!(sink.raised.load(Ordering::SeqCst), 1);
    assert!(reports[4].analysis.classification.is_some());
    assert!(reports[4].analysis.sample.is_none());
}

#[test]
fn test_yawn_label_sets_yawning() {
    let (sink, mut session) = session(
        vec![ClassifierLabel::NoYawn, ClassifierLabel::Yawn, ClassifierLabel::Yawn],
        DecisionConfig::default(),
    );

    let statuses: Vec<_> = (0..3)
        .map(|i| session.process(&frame(i, i * 33)).unwrap().status())
        .collect();
    assert_eq!(
        statuses,
        vec![DriverStatus::Normal, DriverStatus::Yawning, DriverStatus::Yawning]
    );
    // One onset, one yawn alarm
    assert_eq!(sink.raised.load(Ordering::SeqCst), 1);
}

#[test]
fn test_snapshots_are_rate_limited() {
    let dir = TempDir::new().unwrap();
    let (_, session) = session(
        vec![ClassifierLabel::Yawn; 4],
        DecisionConfig::default(),
    );
    let mut session =
        session.with_snapshots(SnapshotSink::new(dir.path(), Duration::from_millis(1000)));

    // 0 ms saves, 400 ms is inside the interval, 1200 ms saves again
    let saved: Vec<bool> = [(0, 0), (1, 400), (2, 1200)]
        .into_iter()
        .map(|(seq, ms)| session.process(&frame(seq, ms)).unwrap().snapshot.is_some())
        .collect();
    assert_eq!(saved, vec![true, false, true]);

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert!(!files.is_empty());
    assert!(files.iter().all(|f| f.starts_with("Yawning_") && f.ends_with(".jpg")));
}

#[test]
fn test_snapshots_in_one_second_keep_distinct_files() {
    let dir = TempDir::new().unwrap();
    let (_, session) = session(vec![ClassifierLabel::Yawn; 3], DecisionConfig::default());
    let mut session = session.with_snapshots(SnapshotSink::new(dir.path(), Duration::ZERO));

    let saved: Vec<_> = (0..3)
        .filter_map(|i| session.process(&frame(i, i * 33)).unwrap().snapshot)
        .collect();
    assert_eq!(saved.len(), 3);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
}

#[test]
fn test_run_stops_when_callback_declines() {
    let (sink, mut session) = session(
        vec![ClassifierLabel::Yawn; 5],
        DecisionConfig::default(),
    );
    let (tx, rx) = tokio::sync::mpsc::channel(8);
    for i in 0..5 {
        tx.try_send(frame(i, i * 33)).unwrap();
    }
    drop(tx);

    let mut seen = 0;
    let summary = tokio_test::block_on(session.run(rx, |_| {
        seen += 1;
        seen < 3
    }));

    assert_eq!(seen, 3);
    assert_eq!(summary.frames, 3);
    assert_eq!(sink.raised.load(Ordering::SeqCst), 1);
}

#[test]
fn test_normal_frames_take_no_snapshot() {
    let dir = TempDir::new().unwrap();
    let (_, session) = session(
        vec![ClassifierLabel::OpenEyes, ClassifierLabel::NoYawn],
        DecisionConfig::default(),
    );
    let mut session = session.with_snapshots(SnapshotSink::new(dir.path(), Duration::ZERO));

    for i in 0..2 {
        assert!(session.process(&frame(i, i * 500)).unwrap().snapshot.is_none());
    }
    assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
}

#[test]
fn test_classifier_error_propagates() {
    let (_, mut session) = session(vec![], DecisionConfig::default());
    assert!(session.process(&frame(0, 0)).is_err());
    assert_eq!(session.summary().frames, 0);
}

#[test]
fn test_overlay_reflects_classification() {
    let (_, mut session) = session(vec![ClassifierLabel::Yawn], DecisionConfig::default());
    let report = session.process(&frame(0, 0)).unwrap();
    let lines = overlay_lines(&report);

    assert_eq!(lines[0].text, "Status: Yawning");
    assert!(lines[0].alert);
    assert!(lines[1].text.starts_with("yawn"));
    assert_eq!(lines.last().unwrap().text, "YAWNING ALERT!");
}

#[test]
fn test_session_without_detector_fails() {
    let mut session = DetectionSession::new(DecisionConfig::default(), Arc::new(CountingSink::default()));
    assert!(matches!(
        session.process(&frame(0, 0)),
        Err(VisionError::Config(_))
    ));
}
