use crate::detect::DetectorOptions;
use crate::geometry::Camera;
use crate::neighbors::NeighborSource;
use crate::reconstruction::{MatchingParams, ReconstructParams, ViewInput};
use crate::types::{LineSegment, ViewId};
use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Input of the `reconstruct_lines` tool: calibrated views plus parameters.
#[derive(Debug, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub matching: MatchingParams,
    #[serde(default)]
    pub reconstruction: ReconstructParams,
    #[serde(default)]
    pub detector: DetectorOptions,
    pub views: Vec<ViewConfig>,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct ViewConfig {
    pub id: ViewId,
    /// Intrinsics, row-major.
    pub k: [[f64; 3]; 3],
    /// World-to-camera rotation, row-major. Takes precedence over `rpy`.
    #[serde(default)]
    pub rotation: Option<[[f64; 3]; 3]>,
    /// Roll, pitch, yaw in radians; `R = Rz(yaw) Ry(pitch) Rx(roll)`.
    #[serde(default)]
    pub rpy: Option<[f64; 3]>,
    pub translation: [f64; 3],
    /// Image size; required when `segments` are given inline.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Typical scene depth seen by this view (world units).
    pub median_depth: f64,
    /// Segments as `[x1, y1, x2, y2]`. When absent, `image` is run through
    /// the detector.
    #[serde(default)]
    pub segments: Option<Vec<[f64; 4]>>,
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default)]
    pub landmarks: Option<Vec<u32>>,
    #[serde(default)]
    pub neighbors: Option<Vec<ViewId>>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// File stem; derived from the parameters when absent.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub json: bool,
    #[serde(default = "default_true")]
    pub obj: bool,
    #[serde(default)]
    pub stl: bool,
    #[serde(default)]
    pub txt: bool,
}

fn default_true() -> bool {
    true
}

impl ViewConfig {
    pub fn camera(&self) -> Result<Camera, String> {
        let k = matrix_from_rows(&self.k);
        let r = match (&self.rotation, &self.rpy) {
            (Some(rows), _) => matrix_from_rows(rows),
            (None, Some([roll, pitch, yaw])) => rotation_from_rpy(*roll, *pitch, *yaw),
            (None, None) => {
                return Err(format!("View {} needs `rotation` or `rpy`", self.id));
            }
        };
        let t = Vector3::from(self.translation);
        Ok(Camera::new(k, r, t))
    }

    pub fn neighbor_source(&self) -> Result<NeighborSource, String> {
        match (&self.neighbors, &self.landmarks) {
            (Some(ids), _) => Ok(NeighborSource::Explicit(ids.clone())),
            (None, Some(ids)) => Ok(NeighborSource::Landmarks(ids.clone())),
            (None, None) => Err(format!(
                "View {} needs `neighbors` or `landmarks`",
                self.id
            )),
        }
    }

    pub fn inline_segments(&self) -> Option<Vec<LineSegment>> {
        self.segments.as_ref().map(|segs| {
            segs.iter()
                .map(|s| LineSegment::new([s[0], s[1]], [s[2], s[3]]))
                .collect()
        })
    }

    /// Build the session input from already available segments.
    pub fn to_view_input(
        &self,
        segments: Vec<LineSegment>,
        width: u32,
        height: u32,
    ) -> Result<ViewInput, String> {
        Ok(ViewInput {
            id: self.id,
            camera: self.camera()?,
            width,
            height,
            median_depth: self.median_depth,
            segments,
            neighbors: self.neighbor_source()?,
        })
    }
}

/// `Rz(yaw) * Ry(pitch) * Rx(roll)`.
pub fn rotation_from_rpy(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    Rotation3::from_euler_angles(roll, pitch, yaw).into_inner()
}

fn matrix_from_rows(rows: &[[f64; 3]; 3]) -> Matrix3<f64> {
    Matrix3::from_fn(|r, c| rows[r][c])
}

pub fn load_config(path: &Path) -> Result<DatasetConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "matching": { "sigma_position": -0.05, "knn": 0 },
        "views": [
            {
                "id": 3,
                "k": [[500, 0, 320], [0, 500, 240], [0, 0, 1]],
                "rpy": [0.0, 0.0, 1.5707963267948966],
                "translation": [1, 2, 3],
                "width": 640,
                "height": 480,
                "median_depth": 4.0,
                "segments": [[1, 2, 3, 4]],
                "landmarks": [7, 8]
            }
        ],
        "output": { "directory": "out", "txt": true }
    }"#;

    #[test]
    fn parses_dataset_with_defaults() {
        let cfg: DatasetConfig = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.matching.sigma_position, -0.05);
        assert_eq!(cfg.matching.num_neighbors, 10);
        assert_eq!(cfg.reconstruction.visibility, 3);
        assert!(cfg.output.json && cfg.output.obj && cfg.output.txt && !cfg.output.stl);

        let view = &cfg.views[0];
        let segments = view.inline_segments().unwrap();
        assert_eq!(segments, vec![LineSegment::new([1.0, 2.0], [3.0, 4.0])]);
        let input = view.to_view_input(segments, 640, 480).unwrap();
        assert_eq!(input.id, 3);
        assert_eq!(input.neighbors, NeighborSource::Landmarks(vec![7, 8]));
        assert!(input.camera.is_valid());
    }

    #[test]
    fn yaw_rotates_about_z() {
        let r = rotation_from_rpy(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let x = r * Vector3::x();
        assert!((x - Vector3::y()).norm() < 1e-12);
    }

    #[test]
    fn rpy_composes_z_y_x() {
        let (roll, pitch, yaw) = (0.1, -0.2, 0.3);
        let expected = Rotation3::from_axis_angle(&Vector3::z_axis(), yaw)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), pitch)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), roll);
        let r = rotation_from_rpy(roll, pitch, yaw);
        assert!((r - expected.into_inner()).norm() < 1e-12);
    }

    #[test]
    fn missing_pose_or_neighbors_is_reported() {
        let mut cfg: DatasetConfig = serde_json::from_str(SAMPLE).unwrap();
        let view = &mut cfg.views[0];
        view.rpy = None;
        assert!(view.camera().unwrap_err().contains("rotation"));
        view.landmarks = None;
        assert!(view.neighbor_source().unwrap_err().contains("neighbors"));
    }
}
