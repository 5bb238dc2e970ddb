//! 68-point facial landmark sets
//!
//! Index layout (iBUG 300-W, as produced by dlib and OpenCV LBF):
//!
//! - 0-16: jaw line
//! - 17-26: eyebrows
//! - 27-35: nose
//! - 36-41: left eye (image left)
//! - 42-47: right eye
//! - 48-67: mouth (outer lip 48-59, inner lip 60-67)

use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::ratios::{eye_aspect_ratio, mouth_aspect_ratio, RatioSample};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Number of points in a landmark set
pub const LANDMARK_COUNT: usize = 68;

/// Fixed index slices into a landmark set
pub mod regions {
    use std::ops::Range;

    pub const LEFT_EYE: Range<usize> = 36..42;
    pub const RIGHT_EYE: Range<usize> = 42..48;
    pub const MOUTH: Range<usize> = 48..68;
}

/// Landmarks for one detected face in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct LandmarkSet {
    // Always exactly LANDMARK_COUNT finite points
    points: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if points.len() != LANDMARK_COUNT {
            return Err(Error::Landmarks(format!(
                "expected {} landmarks, got {}",
                LANDMARK_COUNT,
                points.len()
            )));
        }

        if let Some(idx) = points.iter().position(|p| !p.is_finite()) {
            return Err(Error::Landmarks(format!("landmark {} is not finite", idx)));
        }

        Ok(Self { points })
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        Self::new(pairs.into_iter().map(Point::from).collect())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn left_eye(&self) -> [Point; 6] {
        self.region(regions::LEFT_EYE)
    }

    pub fn right_eye(&self) -> [Point; 6] {
        self.region(regions::RIGHT_EYE)
    }

    pub fn mouth(&self) -> [Point; 20] {
        self.region(regions::MOUTH)
    }

    fn region<const N: usize>(&self, range: Range<usize>) -> [Point; N] {
        debug_assert_eq!(range.len(), N);
        std::array::from_fn(|i| self.points[range.start + i])
    }

    /// Per-eye aspect ratios (left, right)
    pub fn eye_ratios(&self) -> (f32, f32) {
        (
            eye_aspect_ratio(&self.left_eye()),
            eye_aspect_ratio(&self.right_eye()),
        )
    }

    /// Averaged EAR and MAR, or `None` when a region is degenerate
    pub fn ratios(&self) -> Option<RatioSample> {
        let (left, right) = self.eye_ratios();
        let ear = (left + right) / 2.0;
        let mar = mouth_aspect_ratio(&self.mouth());
        RatioSample::new(ear, mar)
    }

    /// Axis-aligned bounds as (min_x, min_y, max_x, max_y)
    pub fn bounding_box(&self) -> (f32, f32, f32, f32) {
        self.points.iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        )
    }

    pub fn area(&self) -> f32 {
        let (min_x, min_y, max_x, max_y) = self.bounding_box();
        (max_x - min_x).max(0.0) * (max_y - min_y).max(0.0)
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            points: self.points.iter().map(|p| p.translate(dx, dy)).collect(),
        }
    }
}

impl TryFrom<Vec<Point>> for LandmarkSet {
    type Error = Error;

    fn try_from(points: Vec<Point>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<LandmarkSet> for Vec<Point> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}

/// Pick the driver among several detected faces: the one with the largest extent
pub fn select_driver(faces: Vec<LandmarkSet>) -> Option<LandmarkSet> {
    faces
        .into_iter()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

/// Synthetic faces for tests, also exported through the `test-util` feature
#[cfg(any(test, feature = "test-util"))]
pub mod fixtures {
    use super::*;

    /// Unscaled face at the origin showing `ear` and `mar`
    pub fn face_showing(ear: f32, mar: f32) -> LandmarkSet {
        face_with(ear, mar, 0.0, 0.0, 1.0)
    }

    /// Synthetic face with open eyes (EAR 0.3) and a closed mouth (MAR 0.2)
    pub fn face(offset_x: f32, offset_y: f32, scale: f32) -> LandmarkSet {
        face_with(0.3, 0.2, offset_x, offset_y, scale)
    }

    /// Synthetic face whose eyes and mouth produce the requested ratios
    pub fn face_with(ear: f32, mar: f32, offset_x: f32, offset_y: f32, scale: f32) -> LandmarkSet {
        let mut points = vec![Point::default(); LANDMARK_COUNT];

        // Jaw line so the bounding box scales with the face
        for (i, p) in points.iter_mut().take(17).enumerate() {
            *p = Point::new(i as f32 * 10.0, 80.0 + (i as f32 - 8.0).abs() * 2.0);
        }
        for p in points.iter_mut().take(36).skip(17) {
            *p = Point::new(80.0, 20.0);
        }

        let eye = |cx: f32| -> [Point; 6] {
            // Width 30, vertical gaps chosen so EAR = h / 30
            let h = ear * 30.0;
            [
                Point::new(cx - 15.0, 40.0),
                Point::new(cx - 5.0, 40.0 - h / 2.0),
                Point::new(cx + 5.0, 40.0 - h / 2.0),
                Point::new(cx + 15.0, 40.0),
                Point::new(cx + 5.0, 40.0 + h / 2.0),
                Point::new(cx - 5.0, 40.0 + h / 2.0),
            ]
        };
        points[36..42].copy_from_slice(&eye(50.0));
        points[42..48].copy_from_slice(&eye(110.0));

        // Mouth width 60 between indices 48 and 54, openings at 50/58 and 52/56
        let h = mar * 60.0;
        let mut mouth = [Point::new(80.0, 120.0); 20];
        mouth[0] = Point::new(50.0, 120.0);
        mouth[6] = Point::new(110.0, 120.0);
        mouth[2] = Point::new(70.0, 120.0 - h / 2.0);
        mouth[10] = Point::new(70.0, 120.0 + h / 2.0);
        mouth[4] = Point::new(90.0, 120.0 - h / 2.0);
        mouth[8] = Point::new(90.0, 120.0 + h / 2.0);
        points[48..68].copy_from_slice(&mouth);

        let points = points
            .into_iter()
            .map(|p| Point::new(p.x * scale + offset_x, p.y * scale + offset_y))
            .collect();
        LandmarkSet::new(points).expect("fixture produces 68 finite points")
    }
}
