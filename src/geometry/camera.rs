use super::EPS;
use nalgebra::{Matrix3, Vector2, Vector3};

/// Pinhole camera: intrinsics `K` and world-to-camera pose `x_cam = R x + t`.
#[derive(Clone, Debug)]
pub struct Camera {
    k: Matrix3<f64>,
    r: Matrix3<f64>,
    t: Vector3<f64>,
    k_inv: Option<Matrix3<f64>>,
    center: Vector3<f64>,
    /// `Rᵀ K⁻¹`, maps homogeneous pixels to world-frame directions.
    rt_kinv: Matrix3<f64>,
}

impl Camera {
    pub fn new(k: Matrix3<f64>, r: Matrix3<f64>, t: Vector3<f64>) -> Self {
        let k_inv = k.try_inverse();
        let center = -(r.transpose() * t);
        let rt_kinv = k_inv
            .map(|ki| r.transpose() * ki)
            .unwrap_or_else(Matrix3::zeros);
        Self {
            k,
            r,
            t,
            k_inv,
            center,
            rt_kinv,
        }
    }

    /// `false` when the intrinsics cannot be inverted.
    pub fn is_valid(&self) -> bool {
        self.k_inv.is_some() && self.r.iter().chain(self.t.iter()).all(|v| v.is_finite())
    }

    pub fn k(&self) -> &Matrix3<f64> {
        &self.k
    }

    pub fn k_inv(&self) -> Matrix3<f64> {
        self.k_inv.unwrap_or_else(Matrix3::zeros)
    }

    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.r
    }

    pub fn translation(&self) -> &Vector3<f64> {
        &self.t
    }

    /// Camera center in world coordinates, `-Rᵀ t`.
    pub fn center(&self) -> Vector3<f64> {
        self.center
    }

    /// Viewing direction (camera z axis) in world coordinates.
    pub fn optical_axis(&self) -> Vector3<f64> {
        self.r.row(2).transpose()
    }

    pub fn principal_point(&self) -> Vector2<f64> {
        Vector2::new(self.k[(0, 2)], self.k[(1, 2)])
    }

    /// Unit world-frame direction of the viewing ray through pixel `p`.
    pub fn ray(&self, p: &Vector2<f64>) -> Vector3<f64> {
        let d = self.rt_kinv * Vector3::new(p.x, p.y, 1.0);
        let n = d.norm();
        if n > EPS {
            d / n
        } else {
            d
        }
    }

    /// Projects a world point to pixels; `None` behind (or on) the image plane.
    pub fn project(&self, x: &Vector3<f64>) -> Option<Vector2<f64>> {
        let xc = self.r * x + self.t;
        if xc.z <= EPS {
            return None;
        }
        let h = self.k * xc;
        Some(Vector2::new(h.x / h.z, h.y / h.z))
    }

    pub fn baseline_to(&self, other: &Camera) -> f64 {
        (self.center - other.center).norm()
    }
}
