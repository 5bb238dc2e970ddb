//! 2-D points and distances

use serde::{Deserialize, Serialize};

/// A landmark position in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "PointRepr")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Recorded landmark files write points either as `{"x": .., "y": ..}` or as `[x, y]`
#[derive(Deserialize)]
#[serde(untagged)]
enum PointRepr {
    Pair(f32, f32),
    Named { x: f32, y: f32 },
}

impl From<PointRepr> for Point {
    fn from(repr: PointRepr) -> Self {
        match repr {
            PointRepr::Pair(x, y) | PointRepr::Named { x, y } => Point { x, y },
        }
    }
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Point::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_pythagorean() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert!((b.distance(&a) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = Point::new(12.5, -7.25);
        assert_eq!(p.distance(&p), 0.0);
    }

    #[test]
    fn test_point_deserialize_both_shapes() {
        let named: Point = serde_json::from_str(r#"{"x": 1.5, "y": 2.0}"#).unwrap();
        let pair: Point = serde_json::from_str("[1.5, 2.0]").unwrap();
        assert_eq!(named, pair);
    }

    #[test]
    fn test_point_serializes_named() {
        let json = serde_json::to_string(&Point::new(1.0, 2.0)).unwrap();
        assert!(json.contains("\"x\""));
        assert!(json.contains("\"y\""));
    }

    #[test]
    fn test_is_finite() {
        assert!(Point::new(1.0, 2.0).is_finite());
        assert!(!Point::new(f32::NAN, 2.0).is_finite());
        assert!(!Point::new(1.0, f32::INFINITY).is_finite());
    }
}
