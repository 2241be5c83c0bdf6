//! Similarity of two 3D hypotheses for the same 2D segment (or for two
//! segments believed to lie on the same 3D line).
//!
//! Positional term: every endpoint of one hypothesis is compared with the
//! infinite line of the other, using a Gaussian whose width grows with the
//! endpoint's depth (`k · depth`) up to the view's median sigma. The
//! weakest of the four terms wins.
//!
//! Angular term: Gaussian over the undirected angle between both
//! directions, in degrees.
//!
//! The final similarity is the minimum of both terms, so a hypothesis pair
//! must agree in position *and* direction.

use crate::angle::undirected_angle_deg;
use crate::geometry::{Segment3D, EPS};
use crate::matching::Match;
use crate::view::View;

/// 3D hypothesis together with the depths of its endpoints in the view it
/// was unprojected from.
#[derive(Clone, Copy, Debug)]
pub struct Hypothesis {
    pub segment: Segment3D,
    pub depths: [f64; 2],
}

impl Hypothesis {
    /// Unprojects the source segment of `m` in `view` (its source view).
    pub fn from_match(view: &View, m: &Match) -> Option<Self> {
        let segment = view.unproject_segment(m.src.index as usize, m.depth_p1, m.depth_p2)?;
        Some(Self {
            segment,
            depths: [m.depth_p1, m.depth_p2],
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SimilarityKernel {
    two_sigma_a_sq: f64,
    min_similarity: f64,
}

impl SimilarityKernel {
    /// `sigma_a_deg` is the angular standard deviation in degrees;
    /// similarities at or below `min_similarity` are truncated to zero by
    /// [`SimilarityKernel::truncated`].
    pub fn new(sigma_a_deg: f64, min_similarity: f64) -> Self {
        let sigma = sigma_a_deg.abs().max(EPS);
        Self {
            two_sigma_a_sq: 2.0 * sigma * sigma,
            min_similarity,
        }
    }

    pub fn angular(&self, a: &Segment3D, b: &Segment3D) -> f64 {
        let angle = undirected_angle_deg(&a.direction(), &b.direction());
        (-angle * angle / self.two_sigma_a_sq).exp()
    }

    pub fn positional(&self, h1: &Hypothesis, v1: &View, h2: &Hypothesis, v2: &View) -> f64 {
        let s1 = &h1.segment;
        let s2 = &h2.segment;
        let terms = [
            (s2.distance_to_line(&s1.p1), v1.sigma_at(h1.depths[0])),
            (s2.distance_to_line(&s1.p2), v1.sigma_at(h1.depths[1])),
            (s1.distance_to_line(&s2.p1), v2.sigma_at(h2.depths[0])),
            (s1.distance_to_line(&s2.p2), v2.sigma_at(h2.depths[1])),
        ];
        terms
            .iter()
            .map(|&(d, sigma)| gaussian(d, sigma))
            .fold(f64::INFINITY, f64::min)
    }

    /// Untruncated similarity in [0, 1]; zero for degenerate hypotheses.
    pub fn similarity(&self, h1: &Hypothesis, v1: &View, h2: &Hypothesis, v2: &View) -> f64 {
        if h1.segment.is_degenerate() || h2.segment.is_degenerate() {
            return 0.0;
        }
        let sim_a = self.angular(&h1.segment, &h2.segment);
        let sim_p = self.positional(h1, v1, h2, v2);
        sim_a.min(sim_p)
    }

    /// Like [`SimilarityKernel::similarity`], with weak agreement cut to zero.
    pub fn truncated(&self, h1: &Hypothesis, v1: &View, h2: &Hypothesis, v2: &View) -> f64 {
        let sim = self.similarity(h1, v1, h2, v2);
        if sim > self.min_similarity {
            sim
        } else {
            0.0
        }
    }
}

#[inline]
fn gaussian(d: f64, sigma: f64) -> f64 {
    let sigma = sigma.max(EPS);
    (-d * d / (2.0 * sigma * sigma)).exp()
}
