use super::EPS;
use nalgebra::Vector3;
use serde::Serialize;

/// 3D line segment given by its two endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Segment3D {
    pub p1: Vector3<f64>,
    pub p2: Vector3<f64>,
}

impl Segment3D {
    pub fn new(p1: Vector3<f64>, p2: Vector3<f64>) -> Self {
        Self { p1, p2 }
    }

    pub fn length(&self) -> f64 {
        (self.p2 - self.p1).norm()
    }

    pub fn is_degenerate(&self) -> bool {
        self.length() < EPS
    }

    /// Unit direction from `p1` to `p2` (zero for a degenerate segment).
    pub fn direction(&self) -> Vector3<f64> {
        let d = self.p2 - self.p1;
        let n = d.norm();
        if n < EPS {
            Vector3::zeros()
        } else {
            d / n
        }
    }

    pub fn midpoint(&self) -> Vector3<f64> {
        (self.p1 + self.p2) * 0.5
    }

    /// Distance from `x` to the infinite line through the segment.
    pub fn distance_to_line(&self, x: &Vector3<f64>) -> f64 {
        let dir = self.direction();
        if dir == Vector3::zeros() {
            return (x - self.p1).norm();
        }
        (x - self.p1).cross(&dir).norm()
    }
}
