//! Detection session: frames in, decisions, history, snapshots and alarms out

use crate::classifier::{Classification, FrameClassifier};
use crate::error::VisionError;
use crate::frame::Frame;
use crate::landmarks::LandmarkProvider;
use crate::snapshot::SnapshotSink;
use chrono::Local;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use vigil_core::landmarks::select_driver;
use vigil_core::{
    AlarmKind, AlertSink, Decision, DecisionConfig, DecisionEngine, DriverStatus, HistoryConfig,
    HistoryLog, HistoryRecord, LandmarkSet, Observation, RatioSample, RecordKind,
};

/// Where observations come from
pub enum Detector {
    Landmarks(Box<dyn LandmarkProvider>),
    Classifier(Box<dyn FrameClassifier>),
}

impl Detector {
    pub fn name(&self) -> &str {
        match self {
            Detector::Landmarks(p) => p.name(),
            Detector::Classifier(c) => c.name(),
        }
    }
}

/// What the detector saw in one frame
#[derive(Debug, Clone, Default)]
pub struct FrameAnalysis {
    /// Faces found before picking the driver
    pub faces: usize,
    pub landmarks: Option<LandmarkSet>,
    pub sample: Option<RatioSample>,
    pub classification: Option<Classification>,
    pub observation: Option<Observation>,
}

impl FrameAnalysis {
    /// Analysis of a recorded ratio sample; `None` means no face
    pub fn from_sample(sample: Option<RatioSample>, config: &DecisionConfig) -> Self {
        Self {
            faces: usize::from(sample.is_some()),
            observation: sample.as_ref().map(|s| Observation::from_sample(s, config)),
            sample,
            ..Self::default()
        }
    }
}

/// Everything that happened for one frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub sequence: u64,
    pub at: Duration,
    pub analysis: FrameAnalysis,
    pub decision: Decision,
    /// The alarm sink accepted this frame's alarm edge
    pub alarm_sounded: bool,
    pub snapshot: Option<PathBuf>,
}

impl FrameReport {
    pub fn status(&self) -> DriverStatus {
        self.decision.status
    }
}

/// Totals over a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub frames: u64,
    pub frames_without_face: u64,
    pub alarms: BTreeMap<String, u64>,
    pub statuses: BTreeMap<String, u64>,
}

impl SessionSummary {
    fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        if report.analysis.observation.is_none() {
            self.frames_without_face += 1;
        }
        *self.statuses.entry(report.status().to_string()).or_default() += 1;
        if let Some(kind) = report.decision.alarm {
            *self.alarms.entry(kind.to_string()).or_default() += 1;
        }
    }

    pub fn total_alarms(&self) -> u64 {
        self.alarms.values().sum()
    }
}

/// Runs frames through a detector and the decision engine and fans results out to the sinks
pub struct DetectionSession {
    engine: DecisionEngine,
    detector: Option<Detector>,
    alerts: Arc<dyn AlertSink>,
    status_log: Option<HistoryLog>,
    event_log: Option<HistoryLog>,
    log_every_frame: bool,
    snapshots: Option<SnapshotSink>,
    last_status: Option<DriverStatus>,
    summary: SessionSummary,
}

impl DetectionSession {
    pub fn new(config: DecisionConfig, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            engine: DecisionEngine::new(config),
            detector: None,
            alerts,
            status_log: None,
            event_log: None,
            log_every_frame: true,
            snapshots: None,
            last_status: None,
            summary: SessionSummary::default(),
        }
    }

    pub fn with_detector(mut self, detector: Detector) -> Self {
        info!("Detector: {}", detector.name());
        self.detector = Some(detector);
        self
    }

    /// Open the status and event history files
    pub fn with_history(mut self, config: &HistoryConfig) -> Result<Self, VisionError> {
        if !config.enabled {
            return Ok(self);
        }
        self.status_log = Some(HistoryLog::open(&config.status_path, RecordKind::Status)?);
        self.event_log = Some(HistoryLog::open(&config.events_path, RecordKind::Event)?);
        self.log_every_frame = config.every_frame;
        info!(
            "History: {} and {}",
            config.status_path.display(),
            config.events_path.display()
        );
        Ok(self)
    }

    pub fn with_snapshots(mut self, sink: SnapshotSink) -> Self {
        info!("Snapshots: {}", sink.dir().display());
        self.snapshots = Some(sink);
        self
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Run the detector on one frame
    pub fn analyze(&mut self, frame: &Frame) -> Result<FrameAnalysis, VisionError> {
        let detector = self
            .detector
            .as_mut()
            .ok_or_else(|| VisionError::Config("session has no detector".to_string()))?;

        match detector {
            Detector::Landmarks(provider) => {
                let faces = provider.detect(frame)?;
                let count = faces.len();
                let landmarks = select_driver(faces);
                let sample = landmarks.as_ref().and_then(|l| l.ratios());
                if landmarks.is_some() && sample.is_none() {
                    debug!("Degenerate landmarks in frame {}, treating as no face", frame.sequence);
                }
                Ok(FrameAnalysis {
                    faces: count,
                    observation: sample
                        .as_ref()
                        .map(|s| Observation::from_sample(s, self.engine.config())),
                    landmarks,
                    sample,
                    classification: None,
                })
            }
            Detector::Classifier(classifier) => {
                let classification = classifier.classify(frame)?;
                Ok(FrameAnalysis {
                    faces: 1,
                    observation: Some(classification.label.observation()),
                    classification: Some(classification),
                    ..FrameAnalysis::default()
                })
            }
        }
    }

    /// Analyze a frame and apply the result
    pub fn process(&mut self, frame: &Frame) -> Result<FrameReport, VisionError> {
        let analysis = self.analyze(frame)?;
        Ok(self.apply(analysis, frame.sequence, frame.captured_at, Some(frame)))
    }

    /// Feed a recorded ratio sample through the engine and sinks
    pub fn process_sample(&mut self, sample: Option<RatioSample>, sequence: u64, at: Duration) -> FrameReport {
        let analysis = FrameAnalysis::from_sample(sample, self.engine.config());
        self.apply(analysis, sequence, at, None)
    }

    /// Step the engine and write to every sink. Sink failures are logged, never returned.
    pub fn apply(
        &mut self,
        analysis: FrameAnalysis,
        sequence: u64,
        at: Duration,
        frame: Option<&Frame>,
    ) -> FrameReport {
        let decision = self.engine.observe(analysis.observation, at);
        let status = decision.status;
        let now = Local::now();

        if self.last_status != Some(status) {
            match self.last_status {
                Some(previous) => info!("Driver status: {} -> {}", previous, status),
                None => info!("Driver status: {}", status),
            }
        }

        let mut alarm_sounded = false;
        if let Some(kind) = decision.alarm {
            warn!("{} at frame {}", kind, sequence);
            alarm_sounded = self.alerts.raise(kind);
            let details = alarm_details(kind, &analysis, &decision);
            self.log_event(kind.as_str(), details);
        }

        if decision.face_lost {
            warn!("Face lost for {} frames", self.engine.state().missed_frames);
            self.log_event(
                "FaceLost",
                format!("missed_frames={}", self.engine.state().missed_frames),
            );
        }

        if self.log_every_frame || self.last_status != Some(status) {
            if let Some(log) = self.status_log.as_mut() {
                if let Err(e) = log.append(&HistoryRecord::Status {
                    timestamp: now,
                    status,
                }) {
                    warn!("Failed to append status history: {}", e);
                }
            }
        }

        let mut snapshot = None;
        if status.is_alert() {
            if let (Some(sink), Some(frame)) = (self.snapshots.as_mut(), frame) {
                match sink.save(frame, status, &now) {
                    Ok(path) => snapshot = path,
                    Err(e) => warn!("Failed to save snapshot: {}", e),
                }
            }
        }

        self.last_status = Some(status);

        let report = FrameReport {
            sequence,
            at,
            analysis,
            decision,
            alarm_sounded,
            snapshot,
        };
        self.summary.record(&report);
        report
    }

    fn log_event(&mut self, event: &str, details: String) {
        if let Some(log) = self.event_log.as_mut() {
            if let Err(e) = log.append(&HistoryRecord::event(event, details)) {
                warn!("Failed to append event history: {}", e);
            }
        }
    }

    /// Process frames until the channel closes or `on_report` returns `false`
    pub async fn run<F>(&mut self, mut frames: mpsc::Receiver<Frame>, mut on_report: F) -> SessionSummary
    where
        F: FnMut(&FrameReport) -> bool,
    {
        while let Some(frame) = frames.recv().await {
            match self.process(&frame) {
                Ok(report) => {
                    if !on_report(&report) {
                        info!("Session stopped at frame {}", frame.sequence);
                        break;
                    }
                }
                Err(e) => {
                    error!("Frame processing error: {}", e);
                }
            }
        }

        self.summary.clone()
    }
}

fn alarm_details(kind: AlarmKind, analysis: &FrameAnalysis, decision: &Decision) -> String {
    let mut parts = match kind {
        AlarmKind::Drowsiness => vec![format!("closed_frames={}", decision.closed_frames)],
        AlarmKind::FrequentYawning | AlarmKind::Yawn => {
            vec![format!("yawn_count={}", decision.yawn_count)]
        }
    };
    if let Some(sample) = &analysis.sample {
        parts.push(format!("ear={:.3}", sample.ear));
        parts.push(format!("mar={:.3}", sample.mar));
    }
    if let Some(c) = &analysis.classification {
        parts.push(format!("label={}", c.label));
        parts.push(format!("confidence={:.2}", c.confidence));
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierLabel;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        raised: Mutex<Vec<AlarmKind>>,
    }

    impl AlertSink for RecordingSink {
        fn raise(&self, kind: AlarmKind) -> bool {
            self.raised.lock().unwrap().push(kind);
            true
        }
    }

    struct FixedClassifier(ClassifierLabel);

    impl FrameClassifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn classify(&mut self, _frame: &Frame) -> Result<Classification, VisionError> {
            let mut scores = [0.0; 4];
            let idx = ClassifierLabel::ALL.iter().position(|l| *l == self.0).unwrap();
            scores[idx] = 1.0;
            Classification::from_scores(&scores)
        }
    }

    fn config() -> DecisionConfig {
        DecisionConfig {
            consec_frames: 3,
            ..DecisionConfig::default()
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_replayed_samples_raise_once() {
        let sink = Arc::new(RecordingSink::default());
        let mut session = DetectionSession::new(config(), sink.clone());

        let reports: Vec<FrameReport> = (0..6)
            .map(|i| session.process_sample(RatioSample::new(0.2, 0.3), i, ms(i * 33)))
            .collect();

        assert_eq!(*sink.raised.lock().unwrap(), vec![AlarmKind::Drowsiness]);
        assert!(reports[2].alarm_sounded);
        assert_eq!(reports[5].status(), DriverStatus::Drowsy);
        assert_eq!(session.summary().frames, 6);
        assert_eq!(session.summary().total_alarms(), 1);
    }

    #[test]
    fn test_history_rows_written() {
        let dir = TempDir::new().unwrap();
        let history = HistoryConfig {
            enabled: true,
            status_path: dir.path().join("status.csv"),
            events_path: dir.path().join("events.csv"),
            every_frame: true,
        };
        let mut session = DetectionSession::new(config(), Arc::new(RecordingSink::default()))
            .with_history(&history)
            .unwrap();

        for i in 0..4 {
            session.process_sample(RatioSample::new(0.1, 0.2), i, ms(i * 33));
        }

        let status_rows = vigil_core::history::read_rows(&history.status_path).unwrap();
        assert_eq!(status_rows.len(), 4);
        assert_eq!(status_rows[3][1], "Drowsy");

        let event_rows = vigil_core::history::read_rows(&history.events_path).unwrap();
        assert_eq!(event_rows.len(), 1);
        assert_eq!(event_rows[0][1], "DrowsinessAlarm");
        assert!(event_rows[0][2].contains("closed_frames=3"));
        assert!(event_rows[0][2].contains("ear=0.100"));
    }

    #[test]
    fn test_status_changes_only() {
        let dir = TempDir::new().unwrap();
        let history = HistoryConfig {
            enabled: true,
            status_path: dir.path().join("status.csv"),
            events_path: dir.path().join("events.csv"),
            every_frame: false,
        };
        let mut session = DetectionSession::new(config(), Arc::new(RecordingSink::default()))
            .with_history(&history)
            .unwrap();

        for i in 0..5 {
            session.process_sample(RatioSample::new(0.3, 0.2), i, ms(i * 33));
        }
        session.process_sample(RatioSample::new(0.3, 0.9), 5, ms(165));

        let rows = vigil_core::history::read_rows(&history.status_path).unwrap();
        let statuses: Vec<&str> = rows.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(statuses, vec!["Normal", "Yawning"]);
    }

    #[test]
    fn test_classifier_detector_drives_engine() {
        let sink = Arc::new(RecordingSink::default());
        let mut session = DetectionSession::new(config(), sink.clone())
            .with_detector(Detector::Classifier(Box::new(FixedClassifier(
                ClassifierLabel::ClosedEyes,
            ))));

        let mut last = None;
        for i in 0..3 {
            let frame = Frame::blank(8, 8, i, ms(i * 33));
            last = Some(session.process(&frame).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.status(), DriverStatus::Drowsy);
        assert_eq!(last.analysis.classification.unwrap().label, ClassifierLabel::ClosedEyes);
        assert_eq!(*sink.raised.lock().unwrap(), vec![AlarmKind::Drowsiness]);
    }

    #[test]
    fn test_snapshots_for_alert_frames() {
        let dir = TempDir::new().unwrap();
        let mut session = DetectionSession::new(config(), Arc::new(RecordingSink::default()))
            .with_detector(Detector::Classifier(Box::new(FixedClassifier(ClassifierLabel::Yawn))))
            .with_snapshots(SnapshotSink::new(dir.path(), Duration::from_secs(1)));

        let first = session.process(&Frame::blank(8, 8, 0, ms(0))).unwrap();
        let second = session.process(&Frame::blank(8, 8, 1, ms(33))).unwrap();
        assert_eq!(first.status(), DriverStatus::Yawning);
        assert!(first.snapshot.is_some());
        assert!(second.snapshot.is_none());
    }

    #[test]
    fn test_process_without_detector_fails() {
        let mut session = DetectionSession::new(config(), Arc::new(RecordingSink::default()));
        let result = session.process(&Frame::blank(2, 2, 0, ms(0)));
        assert!(matches!(result, Err(VisionError::Config(_))));
    }

    #[tokio::test]
    async fn test_run_until_channel_closes() {
        let mut session = DetectionSession::new(config(), Arc::new(RecordingSink::default()))
            .with_detector(Detector::Classifier(Box::new(FixedClassifier(
                ClassifierLabel::OpenEyes,
            ))));

        let (tx, rx) = mpsc::channel(8);
        for i in 0..5 {
            tx.send(Frame::blank(4, 4, i, ms(i * 33))).await.unwrap();
        }
        drop(tx);

        let mut seen = 0;
        let summary = session
            .run(rx, |_| {
                seen += 1;
                true
            })
            .await;
        assert_eq!(seen, 5);
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.statuses.get("Normal"), Some(&5));
    }

    #[tokio::test]
    async fn test_run_stops_when_callback_declines() {
        let mut session = DetectionSession::new(config(), Arc::new(RecordingSink::default()))
            .with_detector(Detector::Classifier(Box::new(FixedClassifier(
                ClassifierLabel::OpenEyes,
            ))));

        let (tx, rx) = mpsc::channel(8);
        for i in 0..5 {
            tx.send(Frame::blank(4, 4, i, ms(i * 33))).await.unwrap();
        }

        let summary = session.run(rx, |report| report.sequence < 1).await;
        assert_eq!(summary.frames, 2);
    }
}
