//! Angle utilities used across the reconstruction pipeline.

use nalgebra::Vector3;

/// Clamped arc-cosine, safe against rounding slightly outside [-1, 1].
#[inline]
pub fn safe_acos(cos: f64) -> f64 {
    cos.clamp(-1.0, 1.0).acos()
}

/// Unsigned angle between two 3D vectors in radians, in [0, π].
#[inline]
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let na = a.norm().max(1e-12);
    let nb = b.norm().max(1e-12);
    safe_acos(a.dot(b) / (na * nb))
}

/// Orientation difference between two 3D directions in degrees, treating
/// antipodal directions as equivalent. Returns a value in [0, 90].
///
/// Line directions carry no sign, so this is the angle to compare when
/// judging whether two 3D segments describe the same line.
#[inline]
pub fn undirected_angle_deg(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let na = a.norm().max(1e-12);
    let nb = b.norm().max(1e-12);
    let cos = (a.dot(b) / (na * nb)).abs();
    safe_acos(cos).to_degrees()
}
