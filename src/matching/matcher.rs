//! CPU pairwise matcher.
//!
//! For every source segment the epipolar lines of both endpoints are
//! intersected with every target segment's line. The intersections and the
//! target endpoints are collinear, and their mutual overlap measures how well
//! the two segments can correspond. Candidates passing the overlap threshold
//! are triangulated against each other; all four depths must be positive.
//!
//! Work is partitioned by source segment: each task owns exactly one match
//! list, so no synchronization is needed while matching.

use super::types::Match;
use crate::geometry::epipolar::{depth_along_ray, intersect_epipolar, mutual_overlap};
use crate::geometry::EPS;
use crate::types::Segment2D;
use crate::view::View;
use nalgebra::{Matrix3, Vector2};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Clone, Copy, Debug)]
pub struct PairMatchParams {
    /// Minimum mutual overlap (exclusive) for a candidate to be considered.
    pub epipolar_overlap: f64,
    /// Keep only the k best candidates per source segment; 0 keeps all.
    pub knn: usize,
}

/// Depths of the source endpoints `p1`, `p2` where their rays meet the plane
/// through the target view's center and segment `q1 q2`.
pub fn triangulation_depths(
    src: &View,
    p1: &Vector2<f64>,
    p2: &Vector2<f64>,
    tgt: &View,
    q1: &Vector2<f64>,
    q2: &Vector2<f64>,
) -> Option<(f64, f64)> {
    let normal = tgt.ray(q1).cross(&tgt.ray(q2));
    let len = normal.norm();
    if len < EPS {
        return None;
    }
    let normal = normal / len;
    let origin = src.center();
    let plane_point = tgt.center();
    let d1 = depth_along_ray(&origin, &src.ray(p1), &plane_point, &normal)?;
    let d2 = depth_along_ray(&origin, &src.ray(p2), &plane_point, &normal)?;
    Some((d1, d2))
}

/// All valid candidates for source segment `r`, best first when kNN is on.
pub fn match_segment(
    src: &View,
    r: usize,
    tgt: &View,
    f: &Matrix3<f64>,
    params: &PairMatchParams,
) -> Vec<Match> {
    let Some(seg) = src.segment(r) else {
        return Vec::new();
    };
    let (p1h, p2h) = seg.homogeneous();
    let (p1, p2) = (seg.p1(), seg.p2());
    let epi_p1 = f * p1h;
    let epi_p2 = f * p2h;

    let mut ranked = TopK::new(params.knn);
    for (c, target) in tgt.segments().iter().enumerate() {
        let (q1h, q2h) = target.homogeneous();
        let l2 = q1h.cross(&q2h);
        let (Some(p1_proj), Some(p2_proj)) = (
            intersect_epipolar(&l2, &epi_p1),
            intersect_epipolar(&l2, &epi_p2),
        ) else {
            continue;
        };
        let (q1, q2) = (target.p1(), target.p2());
        let overlap = mutual_overlap(&[p1_proj, p2_proj, q1, q2]);
        if overlap <= params.epipolar_overlap {
            continue;
        }

        let Some((d_p1, d_p2)) = triangulation_depths(src, &p1, &p2, tgt, &q1, &q2) else {
            continue;
        };
        let Some((d_q1, d_q2)) = triangulation_depths(tgt, &q1, &q2, src, &p1, &p2) else {
            continue;
        };
        if d_p1 <= EPS || d_p2 <= EPS || d_q1 <= EPS || d_q2 <= EPS {
            continue;
        }

        ranked.push(Match {
            src: Segment2D::new(src.id(), r as u32),
            tgt: Segment2D::new(tgt.id(), c as u32),
            overlap_score: overlap,
            score3d: 0.0,
            depth_p1: d_p1,
            depth_p2: d_p2,
            depth_q1: d_q1,
            depth_q2: d_q2,
        });
    }
    ranked.into_vec()
}

/// Matches every segment of `src` against `tgt`, appending to `lists`
/// (one list per source segment). Returns the number of new matches.
pub fn match_pair(
    src: &View,
    tgt: &View,
    f: &Matrix3<f64>,
    params: &PairMatchParams,
    lists: &mut [Vec<Match>],
) -> usize {
    #[cfg(feature = "parallel")]
    let iter = lists.par_iter_mut().enumerate();
    #[cfg(not(feature = "parallel"))]
    let iter = lists.iter_mut().enumerate();

    iter.map(|(r, list)| {
        let found = match_segment(src, r, tgt, f, params);
        let n = found.len();
        list.extend(found);
        n
    })
    .sum()
}

/// Candidate ordered by overlap; equal overlaps prefer the lower target index.
struct Ranked(Match);

impl Ranked {
    fn key(&self) -> (f64, Reverse<u32>) {
        (self.0.overlap_score, Reverse(self.0.tgt.index))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, ia) = self.key();
        let (b, ib) = other.key();
        a.total_cmp(&b).then(ia.cmp(&ib))
    }
}

/// Bounded selection of the best `k` candidates (unbounded when `k == 0`).
struct TopK {
    k: usize,
    heap: BinaryHeap<Reverse<Ranked>>,
    all: Vec<Match>,
}

impl TopK {
    fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::new(),
            all: Vec::new(),
        }
    }

    fn push(&mut self, m: Match) {
        if self.k == 0 {
            self.all.push(m);
            return;
        }
        self.heap.push(Reverse(Ranked(m)));
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    fn into_vec(self) -> Vec<Match> {
        if self.k == 0 {
            return self.all;
        }
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(Ranked(m))| m)
            .collect()
    }
}
