//! Epipolar geometry between two calibrated views.
//!
//! - `fundamental_matrix`: `F = K₂⁻ᵀ [t]ₓ R K₁⁻¹` with the relative pose
//!   `R = R₂ R₁ᵀ`, `t = t₂ − R t₁`, so that `q ᵀ F p = 0` for corresponding
//!   pixels `p` (source) and `q` (target).
//! - `intersect_epipolar`: intersects a target segment's line with the
//!   epipolar line of a source endpoint.
//! - `mutual_overlap`: overlap ratio of two collinear point pairs.
//! - `depth_along_ray`: depth at which a viewing ray meets the plane spanned
//!   by another view's segment.

use super::camera::Camera;
use super::EPS;
use nalgebra::{Matrix3, Vector2, Vector3};

/// Cross-product matrix: `skew(v) * x == v × x`.
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

pub fn fundamental_matrix(src: &Camera, tgt: &Camera) -> Matrix3<f64> {
    let r = tgt.rotation() * src.rotation().transpose();
    let t = tgt.translation() - r * src.translation();
    let e = skew(&t) * r;
    tgt.k_inv().transpose() * e * src.k_inv()
}

/// Intersection of the homogeneous line `line` with the epipolar line `epi`.
/// `None` when the two lines are (numerically) parallel.
pub fn intersect_epipolar(line: &Vector3<f64>, epi: &Vector3<f64>) -> Option<Vector2<f64>> {
    let x = line.cross(epi);
    if x.z.abs() > EPS {
        Some(Vector2::new(x.x / x.z, x.y / x.z))
    } else {
        None
    }
}

/// `true` when `x` lies between `p1` and `p2` (assuming collinearity).
pub fn point_on_segment(x: &Vector2<f64>, p1: &Vector2<f64>, p2: &Vector2<f64>) -> bool {
    (p1 - x).dot(&(p2 - x)) < EPS
}

/// Overlap score in [0, 1] of two collinear point pairs `[p1, p2, q1, q2]`.
///
/// Zero unless the pairs overlap at all. Otherwise the ratio between the
/// distance of the two inner points and the distance of the two outermost
/// points. Outer spans shorter than one pixel are degenerate and score zero.
pub fn mutual_overlap(points: &[Vector2<f64>; 4]) -> f64 {
    let [p1, p2, q1, q2] = points;
    let overlapping = point_on_segment(p1, q1, q2)
        || point_on_segment(p2, q1, q2)
        || point_on_segment(q1, p1, p2)
        || point_on_segment(q2, p1, p2);
    if !overlapping {
        return 0.0;
    }

    let mut max_dist = 0.0;
    let mut outer = (0usize, 1usize);
    for i in 0..3 {
        for j in (i + 1)..4 {
            let dist = (points[i] - points[j]).norm();
            if dist > max_dist {
                max_dist = dist;
                outer = (i, j);
            }
        }
    }
    if max_dist < 1.0 {
        return 0.0;
    }

    let mut inner = (0..4).filter(|&i| i != outer.0 && i != outer.1);
    match (inner.next(), inner.next()) {
        (Some(a), Some(b)) => ((points[a] - points[b]).norm() / max_dist).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Depth along the unit ray `ray` (from `origin`) where it meets the plane
/// through `plane_point` with unit normal `normal`. `None` if the ray is
/// parallel to the plane.
pub fn depth_along_ray(
    origin: &Vector3<f64>,
    ray: &Vector3<f64>,
    plane_point: &Vector3<f64>,
    normal: &Vector3<f64>,
) -> Option<f64> {
    let denom = normal.dot(ray);
    if denom.abs() < EPS {
        return None;
    }
    Some((normal.dot(plane_point) - normal.dot(origin)) / denom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> Vector2<f64> {
        Vector2::new(x, y)
    }

    fn camera(r: Matrix3<f64>, t: Vector3<f64>) -> Camera {
        let k = Matrix3::new(500.0, 0.0, 320.0, 0.0, 480.0, 240.0, 0.0, 0.0, 1.0);
        Camera::new(k, r, t)
    }

    #[test]
    fn corresponding_points_satisfy_epipolar_constraint() {
        let rot = nalgebra::Rotation3::from_euler_angles(0.05, -0.1, 0.02).into_inner();
        let a = camera(Matrix3::identity(), Vector3::zeros());
        let b = camera(rot, Vector3::new(-1.0, 0.2, 0.1));
        let f = fundamental_matrix(&a, &b);
        for x in [
            Vector3::new(0.3, -0.2, 5.0),
            Vector3::new(-1.0, 0.5, 8.0),
            Vector3::new(2.0, 1.0, 6.0),
        ] {
            let p = a.project(&x).unwrap();
            let q = b.project(&x).unwrap();
            let residual = Vector3::new(q.x, q.y, 1.0).dot(&(f * Vector3::new(p.x, p.y, 1.0)));
            assert!(residual.abs() < 1e-9, "residual={residual}");
        }
    }

    #[test]
    fn reverse_fundamental_is_transpose() {
        let rot = nalgebra::Rotation3::from_euler_angles(-0.1, 0.2, 0.0).into_inner();
        let a = camera(Matrix3::identity(), Vector3::new(0.1, 0.0, 0.0));
        let b = camera(rot, Vector3::new(-1.0, 0.0, 0.3));
        let fab = fundamental_matrix(&a, &b);
        let fba = fundamental_matrix(&b, &a);
        let scale = fab.norm().max(1e-12);
        assert!((fab.transpose() - fba).norm() / scale < 1e-9);
    }

    #[test]
    fn overlap_of_identical_pairs_is_one() {
        let pts = [v(0.0, 0.0), v(10.0, 0.0), v(0.0, 0.0), v(10.0, 0.0)];
        assert!((mutual_overlap(&pts) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn partial_overlap_is_inner_over_outer() {
        let pts = [v(0.0, 0.0), v(10.0, 0.0), v(5.0, 0.0), v(20.0, 0.0)];
        assert!((mutual_overlap(&pts) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn disjoint_pairs_do_not_overlap() {
        let pts = [v(0.0, 0.0), v(4.0, 0.0), v(6.0, 0.0), v(20.0, 0.0)];
        assert_eq!(mutual_overlap(&pts), 0.0);
    }

    #[test]
    fn tiny_span_is_degenerate() {
        let pts = [v(0.0, 0.0), v(0.5, 0.0), v(0.1, 0.0), v(0.4, 0.0)];
        assert_eq!(mutual_overlap(&pts), 0.0);
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = [v(1.0, 1.0), v(11.0, 6.0)];
        let b = [v(5.0, 3.0), v(19.0, 10.0)];
        let forward = mutual_overlap(&[a[0], a[1], b[0], b[1]]);
        let swapped = mutual_overlap(&[b[0], b[1], a[0], a[1]]);
        let reversed = mutual_overlap(&[a[1], a[0], b[1], b[0]]);
        assert!(forward > 0.0);
        assert!((forward - swapped).abs() < 1e-12);
        assert!((forward - reversed).abs() < 1e-12);
    }

    #[test]
    fn ray_plane_depth() {
        let origin = Vector3::zeros();
        let ray = Vector3::new(0.0, 0.0, 1.0);
        let normal = Vector3::new(0.0, 0.0, 1.0);
        let d = depth_along_ray(&origin, &ray, &Vector3::new(3.0, 1.0, 4.0), &normal);
        assert!((d.unwrap() - 4.0).abs() < 1e-12);
        let parallel = Vector3::new(1.0, 0.0, 0.0);
        assert!(depth_along_ray(&origin, &parallel, &Vector3::zeros(), &normal).is_none());
    }
}
