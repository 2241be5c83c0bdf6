use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Identifier of a view (one calibrated image) within a reconstruction session.
pub type ViewId = u32;

/// Identity of a 2D segment: the owning view plus its index in that view's
/// segment list. Used as the key of every per-segment map in the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Segment2D {
    pub view: ViewId,
    pub index: u32,
}

impl Segment2D {
    pub fn new(view: ViewId, index: u32) -> Self {
        Self { view, index }
    }
}

/// Pixel-space line segment as delivered by a detector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub p1: [f64; 2],
    pub p2: [f64; 2],
}

impl LineSegment {
    pub fn new(p1: [f64; 2], p2: [f64; 2]) -> Self {
        Self { p1, p2 }
    }

    pub fn p1(&self) -> Vector2<f64> {
        Vector2::new(self.p1[0], self.p1[1])
    }

    pub fn p2(&self) -> Vector2<f64> {
        Vector2::new(self.p2[0], self.p2[1])
    }

    /// Homogeneous coordinates of both endpoints.
    pub fn homogeneous(&self) -> (Vector3<f64>, Vector3<f64>) {
        (
            Vector3::new(self.p1[0], self.p1[1], 1.0),
            Vector3::new(self.p2[0], self.p2[1], 1.0),
        )
    }

    pub fn midpoint(&self) -> [f64; 2] {
        [
            (self.p1[0] + self.p2[0]) * 0.5,
            (self.p1[1] + self.p2[1]) * 0.5,
        ]
    }

    pub fn length(&self) -> f64 {
        (self.p2() - self.p1()).norm()
    }

    /// Line representation: ax + by + c = 0, with sqrt(a^2+b^2)=1.
    /// Returns `None` for a degenerate (zero-length) segment.
    pub fn line(&self) -> Option<Vector3<f64>> {
        let a = self.p2[1] - self.p1[1];
        let b = self.p1[0] - self.p2[0];
        let c = self.p2[0] * self.p1[1] - self.p1[0] * self.p2[1];
        let norm = (a * a + b * b).sqrt();
        if norm <= f64::EPSILON {
            return None;
        }
        Some(Vector3::new(a / norm, b / norm, c / norm))
    }

    /// Unsigned distance from `p` to the infinite line through the segment.
    pub fn distance_to_line(&self, p: [f64; 2]) -> Option<f64> {
        self.line().map(|l| (l[0] * p[0] + l[1] * p[1] + l[2]).abs())
    }

    /// Scale both endpoints (used when detection ran on a resized image).
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            p1: [self.p1[0] * factor, self.p1[1] * factor],
            p2: [self.p2[0] * factor, self.p2[1] * factor],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_is_normalized_and_passes_through_endpoints() {
        let seg = LineSegment::new([1.0, 2.0], [4.0, 6.0]);
        let l = seg.line().expect("non-degenerate");
        assert!((l[0] * l[0] + l[1] * l[1] - 1.0).abs() < 1e-12);
        assert!(seg.distance_to_line(seg.p1).unwrap() < 1e-12);
        assert!(seg.distance_to_line(seg.p2).unwrap() < 1e-12);
        assert!((seg.length() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_segment_has_no_line() {
        let seg = LineSegment::new([3.0, 3.0], [3.0, 3.0]);
        assert!(seg.line().is_none());
    }

    #[test]
    fn segment_ids_order_by_view_then_index() {
        let a = Segment2D::new(0, 5);
        let b = Segment2D::new(1, 0);
        assert!(a < b);
        assert!(Segment2D::new(1, 1) > b);
    }
}
