//! Parameter types configuring matching and reconstruction.
//!
//! Values are sanitized before use (`resolve`): out-of-range inputs are
//! clamped rather than rejected, so a loaded config never aborts a run.
//!
//! For tuning, start with `sigma_position` (positional tolerance, in pixels
//! when positive, in world units when negative) and `min_baseline`, which
//! depends on the scale of the scene.

use crate::view::Regularizer;
use serde::{Deserialize, Serialize};

/// Parameters of the matching stage (neighbors, matching, scoring).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingParams {
    /// Maximum number of visual neighbors per view (>= 2).
    pub num_neighbors: usize,
    /// Positional uncertainty. Positive: pixels at the principal point,
    /// converted per view. Negative: fixed world units (absolute value).
    pub sigma_position: f64,
    /// Angular uncertainty in degrees (clamped to 90).
    pub sigma_angle: f64,
    /// Minimum camera baseline between neighbors (world units).
    pub min_baseline: f64,
    /// Minimum mutual overlap of a candidate match (clamped to 0.99).
    pub epipolar_overlap: f64,
    /// Keep the k best candidates per segment and neighbor; 0 keeps all.
    pub knn: usize,
}

impl Default for MatchingParams {
    fn default() -> Self {
        Self {
            num_neighbors: 10,
            sigma_position: 2.5,
            sigma_angle: 10.0,
            min_baseline: 0.25,
            epipolar_overlap: 0.25,
            knn: 10,
        }
    }
}

/// Sanitized matching parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchingSettings {
    pub num_neighbors: usize,
    pub regularizer: Regularizer,
    pub sigma_angle: f64,
    pub min_baseline: f64,
    pub epipolar_overlap: f64,
    pub knn: usize,
}

impl MatchingParams {
    pub fn resolve(&self) -> MatchingSettings {
        let regularizer = if self.sigma_position < 0.0 {
            Regularizer::Fixed(self.sigma_position.abs())
        } else {
            Regularizer::Pixel(self.sigma_position.max(0.1))
        };
        MatchingSettings {
            num_neighbors: self.num_neighbors.max(2),
            regularizer,
            sigma_angle: self.sigma_angle.abs().min(90.0),
            min_baseline: self.min_baseline.max(0.0),
            epipolar_overlap: self.epipolar_overlap.abs().min(0.99),
            knn: self.knn,
        }
    }
}

/// Parameters of the reconstruction stage (graph, clustering, lines).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructParams {
    /// Minimum number of distinct views per cluster (>= 3).
    pub visibility: usize,
    /// Pixel distance for collinear segment links; <= 0 disables them.
    pub collinearity_t: f64,
    /// Apply the diffusion strategy to the affinity graph, if one is installed.
    pub perform_diffusion: bool,
    /// Run the optimizer strategy on the clusters, if one is installed.
    pub use_optimizer: bool,
    /// Iteration cap handed to the optimizer.
    pub max_optimizer_iterations: usize,
}

impl Default for ReconstructParams {
    fn default() -> Self {
        Self {
            visibility: 3,
            collinearity_t: 0.0,
            perform_diffusion: false,
            use_optimizer: false,
            max_optimizer_iterations: 500,
        }
    }
}

impl ReconstructParams {
    pub fn resolved_visibility(&self) -> usize {
        self.visibility.max(3)
    }

    /// Collinearity threshold, or `None` when disabled.
    pub fn resolved_collinearity(&self) -> Option<f64> {
        (self.collinearity_t.is_finite() && self.collinearity_t > 0.0).then_some(self.collinearity_t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_params_are_clamped() {
        let params = MatchingParams {
            num_neighbors: 0,
            sigma_position: 0.01,
            sigma_angle: -120.0,
            min_baseline: -1.0,
            epipolar_overlap: -1.5,
            knn: 0,
        };
        let s = params.resolve();
        assert_eq!(s.num_neighbors, 2);
        assert_eq!(s.regularizer, Regularizer::Pixel(0.1));
        assert_eq!(s.sigma_angle, 90.0);
        assert_eq!(s.min_baseline, 0.0);
        assert_eq!(s.epipolar_overlap, 0.99);
    }

    #[test]
    fn negative_sigma_selects_world_units() {
        let params = MatchingParams {
            sigma_position: -0.05,
            ..Default::default()
        };
        assert_eq!(params.resolve().regularizer, Regularizer::Fixed(0.05));
    }

    #[test]
    fn visibility_and_collinearity_resolution() {
        let params = ReconstructParams {
            visibility: 1,
            collinearity_t: -2.0,
            ..Default::default()
        };
        assert_eq!(params.resolved_visibility(), 3);
        assert_eq!(params.resolved_collinearity(), None);
        let params = ReconstructParams {
            visibility: 5,
            collinearity_t: 1.5,
            ..Default::default()
        };
        assert_eq!(params.resolved_visibility(), 5);
        assert_eq!(params.resolved_collinearity(), Some(1.5));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let params: MatchingParams = serde_json::from_str(r#"{ "knn": 3 }"#).unwrap();
        assert_eq!(params.knn, 3);
        assert_eq!(params.num_neighbors, 10);
    }
}
