//! Terminal output for reports and summaries

use serde::Serialize;
use vigil_core::{DriverStatus, RatioSample};
use vigil_eye::{Classification, FrameReport, SessionSummary};

/// Result of a single-frame analysis
#[derive(Debug, Serialize)]
pub struct SingleResult {
    pub status: String,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mar: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SingleResult {
    pub fn from_sample(sample: RatioSample, status: DriverStatus, confidence: f32) -> Self {
        Self {
            status: status.to_string(),
            confidence,
            ear: Some(sample.ear),
            mar: Some(sample.mar),
            label: None,
        }
    }

    pub fn from_classification(classification: &Classification) -> Self {
        let observation = classification.label.observation();
        let status = if observation.eyes_closed {
            DriverStatus::Drowsy
        } else if observation.mouth_open {
            DriverStatus::Yawning
        } else {
            DriverStatus::Normal
        };
        Self {
            status: status.to_string(),
            confidence: classification.confidence,
            ear: None,
            mar: None,
            label: Some(classification.label.to_string()),
        }
    }
}

pub fn print_single(result: &SingleResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("Status:     {}", result.status);
    println!("Confidence: {:.2}", result.confidence);
    if let (Some(ear), Some(mar)) = (result.ear, result.mar) {
        println!("EAR:        {:.3}", ear);
        println!("MAR:        {:.3}", mar);
    }
    if let Some(label) = &result.label {
        println!("Label:      {}", label);
    }
    Ok(())
}

/// One line per frame that raised an alarm or lost the face
pub fn print_report(report: &FrameReport) {
    if let Some(kind) = report.decision.alarm {
        let ratios = report
            .analysis
            .sample
            .map(|s| format!(" ear={:.3} mar={:.3}", s.ear, s.mar))
            .unwrap_or_default();
        println!(
            "[{:>6}] {:>8.2}s  {}  status={}{}",
            report.sequence,
            report.at.as_secs_f64(),
            kind,
            report.status(),
            ratios
        );
    }
    if report.decision.face_lost {
        println!(
            "[{:>6}] {:>8.2}s  FaceLost",
            report.sequence,
            report.at.as_secs_f64()
        );
    }
}

pub fn print_summary(summary: &SessionSummary) {
    println!();
    println!("Frames:           {}", summary.frames);
    println!("Without face:     {}", summary.frames_without_face);
    for (status, count) in &summary.statuses {
        println!("  {:<14} {}", status, count);
    }
    println!("Alarms:           {}", summary.total_alarms());
    for (kind, count) in &summary.alarms {
        println!("  {:<22} {}", kind, count);
    }
}
