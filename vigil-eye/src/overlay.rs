//! Text shown over a frame in the display window

use crate::session::FrameReport;
use vigil_core::DriverStatus;

/// One line of overlay text
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLine {
    pub text: String,
    /// Draw in the alert colour
    pub alert: bool,
}

impl OverlayLine {
    fn plain(text: String) -> Self {
        Self { text, alert: false }
    }
}

/// Lines to draw for a report, top to bottom
pub fn overlay_lines(report: &FrameReport) -> Vec<OverlayLine> {
    let status = report.status();
    let mut lines = vec![OverlayLine {
        text: format!("Status: {}", status),
        alert: status.is_alert(),
    }];

    if let Some(sample) = &report.analysis.sample {
        lines.push(OverlayLine::plain(format!("EAR: {:.2}", sample.ear)));
        lines.push(OverlayLine::plain(format!("MAR: {:.2}", sample.mar)));
    } else if let Some(c) = &report.analysis.classification {
        lines.push(OverlayLine::plain(format!("{} ({:.0}%)", c.label, c.confidence * 100.0)));
    } else {
        lines.push(OverlayLine::plain("No face".to_string()));
    }

    match status {
        DriverStatus::Drowsy => lines.push(OverlayLine {
            text: "DROWSINESS ALERT!".to_string(),
            alert: true,
        }),
        DriverStatus::Yawning => lines.push(OverlayLine {
            text: "YAWNING ALERT!".to_string(),
            alert: true,
        }),
        _ => {}
    }

    lines
}
