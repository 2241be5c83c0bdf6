//! 3D consistency scoring of candidate matches.

pub mod scorer;
pub mod similarity;

pub use scorer::{collect_inverse_matches, filter_view, score_view, EstimatedPosition, FilterOutcome};
pub use similarity::{Hypothesis, SimilarityKernel};

use crate::types::Segment2D;
use std::collections::BTreeMap;

/// Estimated 3D positions keyed by their 2D segment.
pub type EstimateTable = BTreeMap<Segment2D, EstimatedPosition>;

/// Similarities at or below this value do not count as agreement while scoring.
pub const MIN_SIMILARITY_3D: f64 = 0.5;
/// Matches scoring at or below this value are dropped.
pub const MIN_SCORE_3D: f64 = 0.5;
/// The best match of a segment must exceed this score to become its estimate.
pub const MIN_BEST_SCORE_3D: f64 = 0.75;
