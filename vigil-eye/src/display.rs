//! Live window with the annotated frame

use crate::cv::image_to_mat;
use crate::error::VisionError;
use crate::frame::Frame;
use crate::overlay::overlay_lines;
use crate::session::FrameReport;
use opencv::{
    core::{Point, Scalar, Vector},
    highgui, imgproc,
    prelude::*,
};
use tracing::warn;
use vigil_core::landmarks::regions;
use vigil_core::LandmarkSet;

const GREEN: (f64, f64, f64) = (0.0, 255.0, 0.0);
const RED: (f64, f64, f64) = (0.0, 0.0, 255.0);

fn bgr((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

pub struct DisplayWindow {
    name: String,
}

impl DisplayWindow {
    pub fn open(name: &str) -> Result<Self, VisionError> {
        highgui::named_window(name, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            name: name.to_string(),
        })
    }

    /// Draw and show one frame; returns `false` once the user pressed `q`
    pub fn show(&self, frame: &Frame, report: &FrameReport) -> Result<bool, VisionError> {
        let mut mat = image_to_mat(&frame.image)?;

        if let Some(landmarks) = &report.analysis.landmarks {
            draw_outlines(&mut mat, landmarks)?;
        }

        for (i, line) in overlay_lines(report).iter().enumerate() {
            let color = if line.alert { RED } else { GREEN };
            imgproc::put_text(
                &mut mat,
                &line.text,
                Point::new(10, 30 + 30 * i as i32),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.7,
                bgr(color),
                2,
                imgproc::LINE_8,
                false,
            )?;
        }

        highgui::imshow(&self.name, &mat)?;
        let key = highgui::wait_key(1)?;
        Ok(key != 'q' as i32)
    }
}

fn draw_outlines(mat: &mut Mat, landmarks: &LandmarkSet) -> Result<(), VisionError> {
    let points = landmarks.points();
    // Outer lip only; the inner lip would clutter the contour
    for range in [regions::LEFT_EYE, regions::RIGHT_EYE, 48..60] {
        let contour: Vector<Point> = points[range]
            .iter()
            .map(|p| Point::new(p.x.round() as i32, p.y.round() as i32))
            .collect();
        let mut contours = Vector::<Vector<Point>>::new();
        contours.push(contour);
        imgproc::polylines(mat, &contours, true, bgr(GREEN), 1, imgproc::LINE_8, 0)?;
    }
    Ok(())
}

impl Drop for DisplayWindow {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.name) {
            warn!("Failed to close window: {}", e);
        }
    }
}
