//! A calibrated image together with its detected 2D segments.
//!
//! Besides geometry (rays, unprojection, projection) a view carries the
//! depth regularizer used by the similarity kernel: the world-space
//! uncertainty `k · depth` that corresponds to a fixed pixel uncertainty at
//! the principal point, capped beyond the median scene depth.

pub mod collinear;

use crate::geometry::{Camera, Segment3D, EPS};
use crate::types::{LineSegment, ViewId};
use nalgebra::{Vector2, Vector3};

/// Projected segments shorter than `diagonal * MIN_LINE_LENGTH_FACTOR`
/// pixels are discarded from the final output.
pub const MIN_LINE_LENGTH_FACTOR: f64 = 0.005;

/// How the positional uncertainty is specified.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Regularizer {
    /// Uncertainty in pixels, converted to world units per view.
    Pixel(f64),
    /// Uncertainty in world units, identical for all views.
    Fixed(f64),
}

#[derive(Clone, Debug)]
pub struct View {
    id: ViewId,
    camera: Camera,
    width: u32,
    height: u32,
    segments: Vec<LineSegment>,
    initial_median_depth: f64,
    median_depth: f64,
    k: f64,
    median_sigma: f64,
    regularizer: Regularizer,
    min_line_length: f64,
    collinear: Vec<Vec<u32>>,
    collinearity_t: f64,
}

impl View {
    pub fn new(
        id: ViewId,
        camera: Camera,
        width: u32,
        height: u32,
        segments: Vec<LineSegment>,
        median_depth: f64,
    ) -> Self {
        let diagonal = (width as f64).hypot(height as f64);
        let median_depth = median_depth.abs().max(EPS);
        let n = segments.len();
        Self {
            id,
            camera,
            width,
            height,
            segments,
            initial_median_depth: median_depth,
            median_depth,
            k: 0.0,
            median_sigma: 0.0,
            regularizer: Regularizer::Pixel(0.0),
            min_line_length: diagonal * MIN_LINE_LENGTH_FACTOR,
            collinear: vec![Vec::new(); n],
            collinearity_t: 0.0,
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn diagonal(&self) -> f64 {
        (self.width as f64).hypot(self.height as f64)
    }

    pub fn segments(&self) -> &[LineSegment] {
        &self.segments
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, index: usize) -> Option<&LineSegment> {
        self.segments.get(index)
    }

    pub fn center(&self) -> Vector3<f64> {
        self.camera.center()
    }

    pub fn ray(&self, p: &Vector2<f64>) -> Vector3<f64> {
        self.camera.ray(p)
    }

    /// Unit rays through both endpoints of segment `index`.
    pub fn endpoint_rays(&self, index: usize) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let seg = self.segments.get(index)?;
        Some((self.camera.ray(&seg.p1()), self.camera.ray(&seg.p2())))
    }

    /// Back-projects segment `index` to the given depths along its endpoint rays.
    pub fn unproject_segment(&self, index: usize, depth_p1: f64, depth_p2: f64) -> Option<Segment3D> {
        let (r1, r2) = self.endpoint_rays(index)?;
        let c = self.camera.center();
        Some(Segment3D::new(c + r1 * depth_p1, c + r2 * depth_p2))
    }

    pub fn project(&self, x: &Vector3<f64>) -> Option<Vector2<f64>> {
        self.camera.project(x)
    }

    /// `true` when `seg` projects to an image segment longer than the minimum
    /// line length of this view.
    pub fn projected_long_enough(&self, seg: &Segment3D) -> bool {
        match (self.project(&seg.p1), self.project(&seg.p2)) {
            (Some(a), Some(b)) => (a - b).norm() > self.min_line_length,
            _ => false,
        }
    }

    pub fn baseline(&self, other: &View) -> f64 {
        self.camera.baseline_to(&other.camera)
    }

    /// Angle between the optical axes of both views, in radians.
    pub fn optical_axis_angle(&self, other: &View) -> f64 {
        crate::angle::angle_between(&self.camera.optical_axis(), &other.camera.optical_axis())
    }

    // --- depth regularizer ----------------------------------------------

    /// Restores the user-supplied median depth (start of a matching run).
    pub fn reset_median_depth(&mut self) {
        self.median_depth = self.initial_median_depth;
    }

    pub fn set_regularizer(&mut self, regularizer: Regularizer) {
        self.regularizer = regularizer;
        match regularizer {
            Regularizer::Pixel(sigma_px) => self.compute_spatial_regularizer(sigma_px),
            Regularizer::Fixed(sigma) => self.apply_fixed_regularizer(sigma),
        }
    }

    /// Pixel mode: `k` is the world distance at unit depth spanned by
    /// `sigma_px` pixels at the principal point.
    fn compute_spatial_regularizer(&mut self, sigma_px: f64) {
        let pp = self.camera.principal_point();
        let shifted = pp + Vector2::new(sigma_px, 0.0);
        self.k = (self.camera.ray(&pp) - self.camera.ray(&shifted)).norm();
        self.median_sigma = self.k * self.median_depth;
    }

    fn apply_fixed_regularizer(&mut self, sigma: f64) {
        self.k = sigma / self.median_depth;
        self.median_sigma = sigma;
    }

    pub fn update_median_depth(&mut self, depth: f64) {
        self.median_depth = depth.max(EPS);
        match self.regularizer {
            Regularizer::Pixel(_) => self.median_sigma = self.k * self.median_depth,
            Regularizer::Fixed(sigma) => self.apply_fixed_regularizer(sigma),
        }
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn median_depth(&self) -> f64 {
        self.median_depth
    }

    pub fn median_sigma(&self) -> f64 {
        self.median_sigma
    }

    /// Positional standard deviation for a point at `depth` from this view.
    pub fn sigma_at(&self, depth: f64) -> f64 {
        if depth > self.median_depth {
            self.median_sigma
        } else {
            depth * self.k
        }
    }

    // --- collinearity ---------------------------------------------------

    /// Recomputes collinear segment sets when the threshold changed.
    /// Returns `true` if a recomputation happened.
    pub fn update_collinearity(&mut self, threshold_px: f64) -> bool {
        if (threshold_px - self.collinearity_t).abs() <= EPS {
            return false;
        }
        self.collinear = collinear::find_collinear(&self.segments, threshold_px);
        self.collinearity_t = threshold_px;
        true
    }

    pub fn collinear_segments(&self, index: usize) -> &[u32] {
        self.collinear.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}
