use line3d::reconstruction::ViewInput;
use line3d::{Camera, LineSegment, NeighborSource, Reconstructor, ViewId};
use nalgebra::{Matrix3, Vector3};

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;

/// A 3D segment given by its endpoints.
pub type Line = (Vector3<f64>, Vector3<f64>);

pub fn intrinsics() -> Matrix3<f64> {
    Matrix3::new(500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0)
}

/// Camera looking down +z from `(x, 0, 0)`.
pub fn camera_at(x: f64) -> Camera {
    Camera::new(intrinsics(), Matrix3::identity(), Vector3::new(-x, 0.0, 0.0))
}

/// Projects `line` into `camera`, shifting the endpoints by `noise_px` along
/// a deterministic pattern driven by `seed`.
pub fn project_line(camera: &Camera, line: &Line, noise_px: f64, seed: usize) -> LineSegment {
    let a = camera.project(&line.0).expect("line start visible");
    let b = camera.project(&line.1).expect("line end visible");
    let pattern = [1.0, -1.0, 0.5, -0.5, 0.0, 1.0, -1.0];
    let n = |k: usize| noise_px * pattern[(seed * 3 + k) % pattern.len()];
    LineSegment::new([a.x + n(0), a.y + n(1)], [b.x + n(2), b.y + n(3)])
}

/// Line roughly parallel to the image y axis, in front of every camera in
/// the scene.
pub fn upper_line() -> Line {
    (Vector3::new(1.0, -0.8, 5.0), Vector3::new(1.2, -0.1, 5.5))
}

pub fn lower_line() -> Line {
    (Vector3::new(0.6, 0.2, 4.5), Vector3::new(0.9, 0.9, 5.0))
}

pub fn view_input(id: ViewId, camera: Camera, segments: Vec<LineSegment>, neighbors: NeighborSource) -> ViewInput {
    ViewInput {
        id,
        camera,
        width: WIDTH,
        height: HEIGHT,
        median_depth: 5.0,
        segments,
        neighbors,
    }
}

/// Session with one view per entry of `centers` (camera x positions), each
/// seeing all `lines` and listing every other view as neighbor.
pub fn build_session(centers: &[f64], lines: &[Line], noise_px: f64) -> Reconstructor {
    let mut recon = Reconstructor::new();
    let ids: Vec<ViewId> = (0..centers.len() as ViewId).collect();
    for (i, &x) in centers.iter().enumerate() {
        let camera = camera_at(x);
        let segments = lines
            .iter()
            .enumerate()
            .map(|(l, line)| project_line(&camera, line, noise_px, i + l))
            .collect();
        let id = ids[i];
        let neighbors = NeighborSource::Explicit(ids.iter().copied().filter(|&o| o != id).collect());
        recon
            .add_view(view_input(id, camera, segments, neighbors))
            .expect("synthetic view is valid");
    }
    recon
}

/// Distance from `p` to the infinite line through `line`.
pub fn distance_to_line(p: &Vector3<f64>, line: &Line) -> f64 {
    let dir = (line.1 - line.0).normalize();
    let v = p - line.0;
    (v - dir * v.dot(&dir)).norm()
}
