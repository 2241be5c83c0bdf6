//! Region growing over aligned gradient pixels.
//!
//! Seeds are visited in raster order. A region collects 8-connected pixels
//! above the magnitude threshold whose orientation lies within the tolerance
//! of the seed orientation. Regions are fitted by PCA of the pixel scatter and
//! turned into a segment spanning the projection extent along the major axis.

use super::gradient::{orientation_difference, Gradients};
use crate::types::LineSegment;
use nalgebra::{Matrix2, SymmetricEigen};

const NEIGH_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Clone, Copy, Debug)]
pub(super) struct GrowParams {
    pub magnitude_threshold: f32,
    pub angle_tolerance: f32,
    pub min_region_pixels: usize,
    pub min_aligned_fraction: f32,
}

#[derive(Default)]
struct Region {
    indices: Vec<usize>,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
    aligned: usize,
}

impl Region {
    fn reset(&mut self) {
        self.indices.clear();
        self.sum_x = 0.0;
        self.sum_y = 0.0;
        self.sum_xx = 0.0;
        self.sum_yy = 0.0;
        self.sum_xy = 0.0;
        self.aligned = 0;
    }

    fn push(&mut self, idx: usize, x: usize, y: usize, aligned: bool) {
        self.indices.push(idx);
        let (xf, yf) = (x as f64, y as f64);
        self.sum_x += xf;
        self.sum_y += yf;
        self.sum_xx += xf * xf;
        self.sum_yy += yf * yf;
        self.sum_xy += xf * yf;
        if aligned {
            self.aligned += 1;
        }
    }

    fn aligned_fraction(&self) -> f32 {
        if self.indices.is_empty() {
            0.0
        } else {
            self.aligned as f32 / self.indices.len() as f32
        }
    }
}

pub(super) struct RegionGrower<'a> {
    grad: &'a Gradients,
    params: GrowParams,
    used: Vec<bool>,
    stack: Vec<usize>,
    region: Region,
    segments: Vec<LineSegment>,
}

impl<'a> RegionGrower<'a> {
    pub(super) fn new(grad: &'a Gradients, params: GrowParams) -> Self {
        Self {
            grad,
            params,
            used: vec![false; grad.width * grad.height],
            stack: Vec::with_capacity(64),
            region: Region::default(),
            segments: Vec::new(),
        }
    }

    pub(super) fn extract(mut self) -> Vec<LineSegment> {
        for idx in 0..self.used.len() {
            self.process_seed(idx);
        }
        self.segments
    }

    fn process_seed(&mut self, idx: usize) {
        if self.used[idx] || self.grad.mag[idx] < self.params.magnitude_threshold {
            return;
        }
        self.region.reset();
        self.stack.clear();
        let seed_angle = self.grad.orientation(idx);
        self.used[idx] = true;
        self.stack.push(idx);
        self.grow(seed_angle);

        match self.fit() {
            Some(segment) => self.segments.push(segment),
            None => {
                for &i in &self.region.indices {
                    self.used[i] = false;
                }
            }
        }
    }

    fn grow(&mut self, seed_angle: f32) {
        let (w, h) = (self.grad.width, self.grad.height);
        let half_tol = self.params.angle_tolerance * 0.5;
        while let Some(idx) = self.stack.pop() {
            let x = idx % w;
            let y = idx / w;
            let angle = self.grad.orientation(idx);
            let aligned = orientation_difference(angle, seed_angle) <= half_tol;
            self.region.push(idx, x, y, aligned);

            for (dx, dy) in NEIGH_OFFSETS {
                let xn = x as isize + dx;
                let yn = y as isize + dy;
                if xn < 0 || yn < 0 || xn >= w as isize || yn >= h as isize {
                    continue;
                }
                let n = yn as usize * w + xn as usize;
                if self.used[n] || self.grad.mag[n] < self.params.magnitude_threshold {
                    continue;
                }
                if orientation_difference(self.grad.orientation(n), seed_angle)
                    <= self.params.angle_tolerance
                {
                    self.used[n] = true;
                    self.stack.push(n);
                }
            }
        }
    }

    fn fit(&self) -> Option<LineSegment> {
        let region = &self.region;
        if region.indices.len() < self.params.min_region_pixels {
            return None;
        }
        if region.aligned_fraction() < self.params.min_aligned_fraction {
            return None;
        }

        let count = region.indices.len() as f64;
        let cx = region.sum_x / count;
        let cy = region.sum_y / count;
        let cxx = region.sum_xx / count - cx * cx;
        let cyy = region.sum_yy / count - cy * cy;
        let cxy = region.sum_xy / count - cx * cy;
        let eig = SymmetricEigen::new(Matrix2::new(cxx, cxy, cxy, cyy));
        let major = if eig.eigenvalues[0] >= eig.eigenvalues[1] { 0 } else { 1 };
        if !eig.eigenvalues[major].is_finite() || eig.eigenvalues[major] <= 0.0 {
            return None;
        }
        let axis = eig.eigenvectors.column(major);
        let norm = axis.norm();
        if !norm.is_finite() || norm < 1e-9 {
            return None;
        }
        let (tx, ty) = (axis[0] / norm, axis[1] / norm);

        let mut smin = f64::INFINITY;
        let mut smax = f64::NEG_INFINITY;
        for &idx in &region.indices {
            let dx = (idx % self.grad.width) as f64 - cx;
            let dy = (idx / self.grad.width) as f64 - cy;
            let s = dx * tx + dy * ty;
            smin = smin.min(s);
            smax = smax.max(s);
        }
        if !(smax - smin).is_finite() || smax - smin <= 0.0 {
            return None;
        }

        Some(LineSegment::new(
            [cx + smin * tx, cy + smin * ty],
            [cx + smax * tx, cy + smax * ty],
        ))
    }
}
