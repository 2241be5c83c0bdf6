//! Pluggable compute strategies.
//!
//! The session always carries a working CPU path. Accelerated or external
//! implementations plug in through these traits; each reports whether it can
//! run in the current environment, and an unavailable strategy is skipped
//! with a warning instead of failing the run.

use crate::graph::{AffinityEdge, AffinityGraph};
use crate::lines::LineCluster3D;
use crate::matching::{match_pair, Match, PairMatchParams};
use crate::scoring::{score_view, SimilarityKernel};
use crate::types::ViewId;
use crate::view::View;
use nalgebra::Matrix3;
use std::collections::BTreeMap;

/// Pairwise matching and per-view scoring.
pub trait MatchBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool {
        true
    }

    /// Appends matches of `src` against `tgt` to `lists` (one per source
    /// segment) and returns how many were added.
    fn match_pair(
        &self,
        src: &View,
        tgt: &View,
        f: &Matrix3<f64>,
        params: &PairMatchParams,
        lists: &mut [Vec<Match>],
    ) -> usize;

    /// Scores all lists of `view` in place; returns the valid fraction.
    fn score_view(&self, view: &View, lists: &mut [Vec<Match>], kernel: &SimilarityKernel) -> f64;
}

/// Reference implementation on the CPU (multi-threaded with `parallel`).
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl MatchBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn match_pair(
        &self,
        src: &View,
        tgt: &View,
        f: &Matrix3<f64>,
        params: &PairMatchParams,
        lists: &mut [Vec<Match>],
    ) -> usize {
        match_pair(src, tgt, f, params, lists)
    }

    fn score_view(&self, view: &View, lists: &mut [Vec<Match>], kernel: &SimilarityKernel) -> f64 {
        score_view(view, lists, kernel)
    }
}

/// Replaces the affinity weights before clustering. The result is
/// re-symmetrized by the caller.
pub trait AffinityDiffusion: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool {
        true
    }

    fn diffuse(&self, graph: &AffinityGraph) -> Result<Vec<AffinityEdge>, String>;
}

/// Refines fitted 3D lines against their 2D observations.
///
/// Runs on a copy of the clusters; the session commits the result only on
/// success.
pub trait ClusterOptimizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool {
        true
    }

    fn optimize(
        &self,
        views: &BTreeMap<ViewId, View>,
        clusters: &mut [LineCluster3D],
        max_iterations: usize,
    ) -> Result<(), String>;
}
