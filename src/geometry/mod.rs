//! Projective geometry primitives: cameras, 3D segments and epipolar
//! relations between view pairs.

pub mod camera;
pub mod epipolar;
pub mod segment3d;

pub use camera::Camera;
pub use epipolar::{fundamental_matrix, mutual_overlap};
pub use segment3d::Segment3D;

/// Numerical tolerance for depths, determinants and homogeneous scales.
pub const EPS: f64 = 1e-12;
