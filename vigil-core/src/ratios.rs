//! Eye and mouth aspect ratios
//!
//! Both ratios compare two vertical openings against one horizontal span:
//!
//! ```text
//! EAR = (|p2 - p6| + |p3 - p5|) / (2 |p1 - p4|)
//! MAR = (|m3 - m11| + |m5 - m9|) / (2 |m1 - m7|)
//! ```
//!
//! (1-indexed over the eye contour and the 20-point mouth region.) A
//! horizontal span of zero makes the ratio unbounded; it is reported as
//! `f32::INFINITY` and never turned into a [`RatioSample`].

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Eye aspect ratio over the 6-point eye contour
pub fn eye_aspect_ratio(eye: &[Point; 6]) -> f32 {
    let vertical = eye[1].distance(&eye[5]) + eye[2].distance(&eye[4]);
    aspect(vertical, eye[0].distance(&eye[3]))
}

/// Mouth aspect ratio over the 20-point mouth region (landmarks 48..68)
pub fn mouth_aspect_ratio(mouth: &[Point; 20]) -> f32 {
    let vertical = mouth[2].distance(&mouth[10]) + mouth[4].distance(&mouth[8]);
    aspect(vertical, mouth[0].distance(&mouth[6]))
}

fn aspect(vertical_sum: f32, horizontal: f32) -> f32 {
    if horizontal <= f32::EPSILON {
        return f32::INFINITY;
    }
    vertical_sum / (2.0 * horizontal)
}

/// EAR and MAR for one face in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioSample {
    pub ear: f32,
    pub mar: f32,
}

impl RatioSample {
    /// Build a sample; both ratios must be finite and non-negative
    pub fn new(ear: f32, mar: f32) -> Option<Self> {
        let valid = |v: f32| v.is_finite() && v >= 0.0;
        if valid(ear) && valid(mar) {
            Some(Self { ear, mar })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::fixtures::face_with;

    fn open_eye() -> [Point; 6] {
        [
            Point::new(0.0, 0.0),
            Point::new(10.0, -5.0),
            Point::new(20.0, -5.0),
            Point::new(30.0, 0.0),
            Point::new(20.0, 5.0),
            Point::new(10.0, 5.0),
        ]
    }

    #[test]
    fn test_ear_known_value() {
        // Two openings of 10 over a width of 30
        let ear = eye_aspect_ratio(&open_eye());
        assert!((ear - 20.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_ear_collapsed_lids_is_zero() {
        let mut eye = open_eye();
        for p in eye.iter_mut() {
            p.y = 0.0;
        }
        assert_eq!(eye_aspect_ratio(&eye), 0.0);
    }

    #[test]
    fn test_ear_zero_width_is_infinite() {
        let eye = [Point::new(5.0, 5.0); 6];
        assert_eq!(eye_aspect_ratio(&eye), f32::INFINITY);
    }

    #[test]
    fn test_mar_uses_mouth_pairs() {
        let sample = face_with(0.3, 0.75, 0.0, 0.0, 1.0).ratios().unwrap();
        assert!((sample.mar - 0.75).abs() < 1e-4);
    }

    #[test]
    fn test_mar_zero_width_is_infinite() {
        let mouth = [Point::new(1.0, 1.0); 20];
        assert!(mouth_aspect_ratio(&mouth).is_infinite());
    }

    #[test]
    fn test_ratios_scale_invariant() {
        let small = face_with(0.27, 0.4, 0.0, 0.0, 1.0).ratios().unwrap();
        let large = face_with(0.27, 0.4, 0.0, 0.0, 3.5).ratios().unwrap();
        assert!((small.ear - large.ear).abs() < 1e-4);
        assert!((small.mar - large.mar).abs() < 1e-4);
    }

    #[test]
    fn test_sample_rejects_invalid() {
        assert!(RatioSample::new(0.3, 0.5).is_some());
        assert!(RatioSample::new(0.0, 0.0).is_some());
        assert!(RatioSample::new(f32::INFINITY, 0.5).is_none());
        assert!(RatioSample::new(0.3, f32::NAN).is_none());
        assert!(RatioSample::new(-0.1, 0.5).is_none());
    }
}
