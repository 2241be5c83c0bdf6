use super::TimingBreakdown;
use crate::types::ViewId;
use serde::Serialize;

/// Per-view outcome of the matching stage.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewMatchingStats {
    pub view: ViewId,
    pub neighbors: Vec<ViewId>,
    /// Matches found with this view as source (before inverse propagation).
    pub new_matches: usize,
    /// Fraction of segments supported by at least two target views.
    pub valid_fraction: f64,
    /// Matches left after filtering.
    pub remaining_matches: usize,
    pub estimates: usize,
    pub median_depth: f64,
}

/// Result of [`Reconstructor::match_views`](crate::Reconstructor::match_views).
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingReport {
    pub views: usize,
    pub pairs_matched: usize,
    pub total_matches: usize,
    pub estimates: usize,
    pub fundamentals_computed: usize,
    pub per_view: Vec<ViewMatchingStats>,
    pub timing: TimingBreakdown,
}

/// Result of [`Reconstructor::reconstruct`](crate::Reconstructor::reconstruct).
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionReport {
    pub nodes: usize,
    pub edges: usize,
    pub components: usize,
    pub clusters: usize,
    pub lines: usize,
    pub segments: usize,
    pub diffusion_applied: bool,
    pub optimizer_applied: bool,
    pub timing: TimingBreakdown,
}
