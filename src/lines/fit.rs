use super::LineCluster3D;
use crate::geometry::{Segment3D, EPS};
use crate::scoring::EstimateTable;
use crate::types::{Segment2D, ViewId};
use crate::view::View;
use nalgebra::{Matrix3, Vector3};
use std::collections::BTreeMap;

/// Least-squares 3D line through `points`: centroid and the direction of
/// maximum scatter. `None` for fewer than two points or a degenerate spread.
pub fn fit_line(points: &[Vector3<f64>]) -> Option<(Vector3<f64>, Vector3<f64>)> {
    if points.len() < 2 {
        return None;
    }
    let centroid = points.iter().sum::<Vector3<f64>>() / points.len() as f64;
    let scatter = points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p - centroid;
        acc + d * d.transpose()
    });

    let svd = scatter.svd(true, false);
    let u = svd.u?;
    let (idx, &sigma_max) = svd
        .singular_values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    if sigma_max <= EPS {
        return None;
    }
    let dir = u.column(idx).normalize();
    Some((centroid, dir))
}

/// Point on the line `anchor + s·dir` closest to the ray `origin + t·ray`.
pub fn closest_point_to_ray(
    anchor: &Vector3<f64>,
    dir: &Vector3<f64>,
    origin: &Vector3<f64>,
    ray: &Vector3<f64>,
) -> Option<Vector3<f64>> {
    let w = anchor - origin;
    let a = dir.dot(dir);
    let b = dir.dot(ray);
    let c = ray.dot(ray);
    let d = dir.dot(&w);
    let e = ray.dot(&w);
    let denom = a * c - b * b;
    if denom.abs() <= EPS {
        return None;
    }
    let s = (b * e - c * d) / denom;
    Some(anchor + dir * s)
}

/// Projects both endpoints of a 2D segment onto a 3D line.
pub fn project_segment_onto_line(
    view: &View,
    index: usize,
    anchor: &Vector3<f64>,
    dir: &Vector3<f64>,
) -> Option<Segment3D> {
    let (r1, r2) = view.endpoint_rays(index)?;
    let c = view.center();
    let p1 = closest_point_to_ray(anchor, dir, &c, &r1)?;
    let p2 = closest_point_to_ray(anchor, dir, &c, &r2)?;
    Some(Segment3D::new(p1, p2))
}

/// Fits a 3D line to a cluster of estimated segments.
///
/// The representative is the member whose estimate is longest; its 2D
/// segment, projected onto the fitted line, becomes the cluster's canonical
/// 3D segment.
pub fn build_cluster(
    members: &[Segment2D],
    estimates: &EstimateTable,
    views: &BTreeMap<ViewId, View>,
) -> Option<LineCluster3D> {
    let mut points = Vec::with_capacity(members.len() * 2);
    let mut representative: Option<(Segment2D, f64)> = None;
    for seg in members {
        let Some(est) = estimates.get(seg) else {
            continue;
        };
        points.push(est.position.p1);
        points.push(est.position.p2);
        let len = est.position.length();
        if representative.map_or(true, |(_, best)| len > best) {
            representative = Some((*seg, len));
        }
    }
    let (rep, _) = representative?;
    let (centroid, dir) = fit_line(&points)?;

    let view = views.get(&rep.view)?;
    let line = project_segment_onto_line(view, rep.index as usize, &centroid, &dir)?;
    if line.is_degenerate() {
        return None;
    }
    Some(LineCluster3D {
        line,
        representative: rep,
        residuals: members.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_recovers_dominant_direction() {
        let points: Vec<_> = (0..10)
            .map(|i| {
                let t = i as f64 * 0.5;
                let wobble = if i % 2 == 0 { 1e-3 } else { -1e-3 };
                Vector3::new(1.0 + t, 2.0 + wobble, 3.0 - t)
            })
            .collect();
        let (centroid, dir) = fit_line(&points).expect("well spread points");
        let expected = Vector3::new(1.0, 0.0, -1.0).normalize();
        assert!(dir.dot(&expected).abs() > 1.0 - 1e-6);
        assert!((centroid - Vector3::new(3.25, 2.0, 0.75)).norm() < 1e-3);
    }

    #[test]
    fn fit_rejects_coincident_points() {
        let p = Vector3::new(1.0, 1.0, 1.0);
        assert!(fit_line(&[p, p, p]).is_none());
        assert!(fit_line(&[p]).is_none());
    }

    #[test]
    fn closest_point_on_line_to_crossing_ray() {
        let anchor = Vector3::new(0.0, 0.0, 5.0);
        let dir = Vector3::new(1.0, 0.0, 0.0);
        let origin = Vector3::new(2.0, -3.0, 5.0);
        let ray = Vector3::new(0.0, 1.0, 0.0);
        let p = closest_point_to_ray(&anchor, &dir, &origin, &ray).unwrap();
        assert!((p - Vector3::new(2.0, 0.0, 5.0)).norm() < 1e-12);
        assert!(closest_point_to_ray(&anchor, &dir, &origin, &dir).is_none());
    }
}
