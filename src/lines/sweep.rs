//! Sweep along a fitted 3D line.
//!
//! Every residual 2D segment of a cluster is projected onto the cluster's
//! line, yielding an interval. Walking the interval endpoints in order, a
//! 3D segment is emitted for each stretch covered by intervals from at
//! least [`MIN_SWEEP_VIEWS`] distinct views. Stretches are consecutive
//! along the sweep, so the emitted segments never overlap.

use super::fit::project_segment_onto_line;
use super::LineCluster3D;
use crate::geometry::Segment3D;
use crate::types::{Segment2D, ViewId};
use crate::view::View;
use nalgebra::Vector3;
use std::collections::{BTreeMap, HashSet};

/// Distinct views that must overlap for a stretch to be emitted.
pub const MIN_SWEEP_VIEWS: usize = 3;

pub fn sweep_collinear(cluster: &LineCluster3D, views: &BTreeMap<ViewId, View>) -> Vec<Segment3D> {
    let anchor = cluster.line.p1;
    let dir = cluster.line.direction();

    let mut points: Vec<(Vector3<f64>, Segment2D)> = Vec::with_capacity(cluster.residuals.len() * 2);
    for seg in &cluster.residuals {
        let Some(view) = views.get(&seg.view) else {
            continue;
        };
        if let Some(projected) = project_segment_onto_line(view, seg.index as usize, &anchor, &dir) {
            points.push((projected.p1, *seg));
            points.push((projected.p2, *seg));
        }
    }
    if points.len() < 2 * MIN_SWEEP_VIEWS {
        return Vec::new();
    }

    let cog = cluster.line.midpoint();
    let border = points
        .iter()
        .map(|(p, _)| *p)
        .max_by(|a, b| (a - cog).norm().total_cmp(&(b - cog).norm()))
        .unwrap_or(cog);
    points.sort_by(|a, b| (a.0 - border).norm().total_cmp(&(b.0 - border).norm()));

    let mut visited: HashSet<Segment2D> = HashSet::with_capacity(cluster.residuals.len());
    let mut open: BTreeMap<ViewId, usize> = BTreeMap::new();
    let mut start: Option<Vector3<f64>> = None;
    let mut segments = Vec::new();

    for (p, seg) in points {
        if visited.insert(seg) {
            *open.entry(seg.view).or_insert(0) += 1;
            if start.is_none() && open.len() >= MIN_SWEEP_VIEWS {
                start = Some(p);
            }
        } else {
            if let Some(count) = open.get_mut(&seg.view) {
                *count -= 1;
                if *count == 0 {
                    open.remove(&seg.view);
                }
            }
            if open.len() < MIN_SWEEP_VIEWS {
                if let Some(s) = start.take() {
                    segments.push(Segment3D::new(s, p));
                }
            }
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Camera;
    use crate::types::LineSegment;
    use nalgebra::Matrix3;

    /// Views looking down +z from x = 0, 1, 2, 3, each seeing the part of the
    /// line `y = 0, z = 5` given by `spans[i]` (in world x).
    fn setup(spans: &[(f64, f64)]) -> (BTreeMap<ViewId, View>, LineCluster3D) {
        let k = Matrix3::new(500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0);
        let mut views = BTreeMap::new();
        let mut residuals = Vec::new();
        for (i, &(x0, x1)) in spans.iter().enumerate() {
            let cx = i as f64;
            let cam = Camera::new(k, Matrix3::identity(), Vector3::new(-cx, 0.0, 0.0));
            let a = cam.project(&Vector3::new(x0, 0.0, 5.0)).unwrap();
            let b = cam.project(&Vector3::new(x1, 0.0, 5.0)).unwrap();
            let seg = LineSegment::new([a.x, a.y], [b.x, b.y]);
            views.insert(i as ViewId, View::new(i as ViewId, cam, 640, 480, vec![seg], 5.0));
            residuals.push(Segment2D::new(i as ViewId, 0));
        }
        let cluster = LineCluster3D {
            line: Segment3D::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(4.0, 0.0, 5.0)),
            representative: Segment2D::new(0, 0),
            residuals,
        };
        (views, cluster)
    }

    #[test]
    fn emits_stretch_covered_by_three_views() {
        let (views, cluster) = setup(&[(0.0, 2.0), (0.5, 3.0), (1.0, 4.0), (3.5, 4.0)]);
        let segs = sweep_collinear(&cluster, &views);
        // [1, 2] has three views; [3.5, 4] has only two (views 2 and 3).
        assert_eq!(segs.len(), 1);
        let (lo, hi) = {
            let a = segs[0].p1.x.min(segs[0].p2.x);
            let b = segs[0].p1.x.max(segs[0].p2.x);
            (a, b)
        };
        assert!((lo - 1.0).abs() < 1e-6 && (hi - 2.0).abs() < 1e-6, "got [{lo}, {hi}]");
    }

    #[test]
    fn separate_stretches_are_disjoint() {
        let (views, cluster) = setup(&[(0.0, 1.0), (0.0, 1.0), (0.0, 4.0), (3.0, 4.0), (3.0, 4.0)]);
        let segs = sweep_collinear(&cluster, &views);
        assert_eq!(segs.len(), 2);
        let ranges: Vec<(f64, f64)> = segs
            .iter()
            .map(|s| (s.p1.x.min(s.p2.x), s.p1.x.max(s.p2.x)))
            .collect();
        let (a, b) = (ranges[0], ranges[1]);
        assert!(a.1 <= b.0 + 1e-9 || b.1 <= a.0 + 1e-9, "{ranges:?} overlap");
    }

    #[test]
    fn too_few_residuals_yield_nothing() {
        let (views, cluster) = setup(&[(0.0, 2.0), (0.0, 2.0)]);
        assert!(sweep_collinear(&cluster, &views).is_empty());
    }
}
