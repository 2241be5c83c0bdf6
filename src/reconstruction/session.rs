//! Reconstruction session.
//!
//! `Reconstructor` owns all views and every derived structure (neighbors,
//! matches, estimates, final lines). The two top-level operations clear
//! their outputs before rebuilding them, so re-running with different
//! parameters yields the same state a fresh session would.
//!
//! Matching processes views in ascending id order:
//! 1. match against every neighbor not matched before (pairs are symmetric),
//! 2. score the view's match lists,
//! 3. hand inverse matches to neighbors that have not been processed yet,
//! 4. filter, promote estimates and update the view's median depth.

use super::params::{MatchingParams, MatchingSettings, ReconstructParams};
use crate::backend::{AffinityDiffusion, ClusterOptimizer, CpuBackend, MatchBackend};
use crate::diagnostics::{
    elapsed_ms, MatchingReport, ReconstructionReport, TimingBreakdown, ViewMatchingStats,
};
use crate::error::{ReconError, Result};
use crate::geometry::Camera;
use crate::graph::{segment_graph, AffinityGraph, CLUSTERING_SCALE, MIN_AFFINITY};
use crate::lines::{assemble_lines, clusters_from_components, FinalLine3D, LineCluster3D};
use crate::matching::{FundamentalCache, Match, MatchTable, PairMatchParams};
use crate::neighbors::{select_neighbors, LandmarkIndex, NeighborParams, NeighborSource};
use crate::scoring::{
    collect_inverse_matches, filter_view, EstimateTable, SimilarityKernel, MIN_SIMILARITY_3D,
};
use crate::types::{LineSegment, ViewId};
use crate::view::View;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Everything needed to register one calibrated image.
#[derive(Clone, Debug)]
pub struct ViewInput {
    pub id: ViewId,
    pub camera: Camera,
    pub width: u32,
    pub height: u32,
    /// Rough median scene depth; refined during matching.
    pub median_depth: f64,
    pub segments: Vec<LineSegment>,
    pub neighbors: NeighborSource,
}

pub struct Reconstructor {
    views: BTreeMap<ViewId, View>,
    neighbor_sources: BTreeMap<ViewId, NeighborSource>,
    landmarks: LandmarkIndex,
    neighbors: BTreeMap<ViewId, Vec<ViewId>>,
    fundamentals: FundamentalCache,
    matches: MatchTable,
    estimates: EstimateTable,
    lines: Vec<FinalLine3D>,
    settings: Option<MatchingSettings>,
    backend: Box<dyn MatchBackend>,
    diffusion: Option<Box<dyn AffinityDiffusion>>,
    optimizer: Option<Box<dyn ClusterOptimizer>>,
    cancel: Arc<AtomicBool>,
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconstructor {
    pub fn new() -> Self {
        Self {
            views: BTreeMap::new(),
            neighbor_sources: BTreeMap::new(),
            landmarks: LandmarkIndex::default(),
            neighbors: BTreeMap::new(),
            fundamentals: FundamentalCache::default(),
            matches: BTreeMap::new(),
            estimates: BTreeMap::new(),
            lines: Vec::new(),
            settings: None,
            backend: Box::new(CpuBackend),
            diffusion: None,
            optimizer: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn MatchBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn set_diffusion(&mut self, diffusion: Box<dyn AffinityDiffusion>) {
        self.diffusion = Some(diffusion);
    }

    pub fn set_optimizer(&mut self, optimizer: Box<dyn ClusterOptimizer>) {
        self.optimizer = Some(optimizer);
    }

    /// Shared flag; setting it makes running and future operations return
    /// [`ReconError::Cancelled`] at the next checkpoint until cleared.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn clear_cancel(&self) {
        self.cancel.store(false, Ordering::Relaxed);
    }

    // --- views ----------------------------------------------------------

    /// Registers a view. Rejected inputs leave the session untouched.
    pub fn add_view(&mut self, input: ViewInput) -> Result<()> {
        let id = input.id;
        if self.views.contains_key(&id) {
            log::error!("Session: view {id} already exists, rejecting");
            return Err(ReconError::DuplicateView(id));
        }
        if input.neighbors.is_empty() {
            log::warn!("Session: view {id} has no landmarks or neighbors, rejecting");
            return Err(ReconError::MissingNeighborInfo(id));
        }
        if input.segments.is_empty() {
            log::warn!("Session: view {id} has no segments, rejecting");
            return Err(ReconError::NoSegments(id));
        }
        if !input.camera.is_valid() {
            log::error!("Session: view {id} has an invalid camera, rejecting");
            return Err(ReconError::InvalidCamera(id));
        }

        if self.settings.is_some() {
            log::warn!("Session: view {id} added after matching; matching results discarded");
            self.clear_matching_state();
        }

        if let NeighborSource::Landmarks(ids) = &input.neighbors {
            self.landmarks.insert(id, ids);
        }
        log::debug!("Session: view {id} added with {} segments", input.segments.len());
        let view = View::new(
            id,
            input.camera,
            input.width,
            input.height,
            input.segments,
            input.median_depth,
        );
        self.views.insert(id, view);
        self.neighbor_sources.insert(id, input.neighbors);
        Ok(())
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    pub fn views(&self) -> &BTreeMap<ViewId, View> {
        &self.views
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    /// 2D segments of a registered view.
    pub fn view_segments(&self, id: ViewId) -> Result<&[LineSegment]> {
        self.views
            .get(&id)
            .map(View::segments)
            .ok_or(ReconError::UnknownView(id))
    }

    pub fn neighbors_of(&self, id: ViewId) -> Option<&[ViewId]> {
        self.neighbors.get(&id).map(Vec::as_slice)
    }

    /// Match lists of a view, one per segment.
    pub fn matches_of(&self, id: ViewId) -> Option<&[Vec<Match>]> {
        self.matches.get(&id).map(Vec::as_slice)
    }

    pub fn estimated_positions(&self) -> &EstimateTable {
        &self.estimates
    }

    pub fn fundamentals_computed(&self) -> usize {
        self.fundamentals.computed()
    }

    pub fn lines(&self) -> &[FinalLine3D] {
        &self.lines
    }

    fn clear_matching_state(&mut self) {
        self.neighbors.clear();
        self.matches.clear();
        self.estimates.clear();
        self.lines.clear();
        self.settings = None;
    }

    fn check_cancel(&self, stage: &str) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            log::warn!("Session: cancelled during {stage}");
            return Err(ReconError::Cancelled);
        }
        Ok(())
    }

    // --- matching -------------------------------------------------------

    /// Selects neighbors, matches, scores and filters all views.
    pub fn match_views(&mut self, params: &MatchingParams) -> Result<MatchingReport> {
        let start = Instant::now();
        self.clear_matching_state();
        if self.views.is_empty() {
            log::warn!("Matching: no views registered");
            return Ok(MatchingReport::default());
        }

        let settings = params.resolve();
        let backend = std::mem::replace(&mut self.backend, Box::new(CpuBackend));
        let result = if backend.is_available() {
            self.run_matching(backend.as_ref(), settings)
        } else {
            log::warn!(
                "Matching: backend '{}' unavailable, falling back to cpu",
                backend.name()
            );
            self.run_matching(&CpuBackend, settings)
        };
        self.backend = backend;

        match result {
            Ok(mut report) => {
                self.settings = Some(settings);
                report.timing.total_ms = elapsed_ms(start);
                log::info!(
                    "Matching: {} views, {} pairs, {} matches, {} estimates ({:.1} ms)",
                    report.views,
                    report.pairs_matched,
                    report.total_matches,
                    report.estimates,
                    report.timing.total_ms
                );
                Ok(report)
            }
            Err(err) => {
                self.clear_matching_state();
                Err(err)
            }
        }
    }

    fn run_matching(
        &mut self,
        backend: &dyn MatchBackend,
        settings: MatchingSettings,
    ) -> Result<MatchingReport> {
        let mut timing = TimingBreakdown::default();

        let t = Instant::now();
        self.prepare_views(settings);
        timing.record_since("regularizers", t);

        self.check_cancel("neighbor selection")?;
        let t = Instant::now();
        self.neighbors = self.compute_neighbors(settings);
        timing.record_since("neighbors", t);

        self.matches = self
            .views
            .iter()
            .map(|(&id, v)| (id, vec![Vec::new(); v.num_segments()]))
            .collect();

        let kernel = SimilarityKernel::new(settings.sigma_angle, MIN_SIMILARITY_3D);
        let pair_params = PairMatchParams {
            epipolar_overlap: settings.epipolar_overlap,
            knn: settings.knn,
        };
        let mut matched_pairs: HashSet<(ViewId, ViewId)> = HashSet::new();
        let mut processed: BTreeSet<ViewId> = BTreeSet::new();
        let mut report = MatchingReport {
            views: self.views.len(),
            ..Default::default()
        };

        let ids: Vec<ViewId> = self.views.keys().copied().collect();
        for id in ids {
            self.check_cancel("matching")?;
            let neighbors = self.neighbors.get(&id).cloned().unwrap_or_default();
            let mut stats = ViewMatchingStats {
                view: id,
                ..Default::default()
            };

            // 1. pairwise matching
            let t = Instant::now();
            for &nb in &neighbors {
                let key = (id.min(nb), id.max(nb));
                if !matched_pairs.insert(key) {
                    continue;
                }
                let (Some(src), Some(tgt), Some(lists)) = (
                    self.views.get(&id),
                    self.views.get(&nb),
                    self.matches.get_mut(&id),
                ) else {
                    continue;
                };
                let f = self.fundamentals.get(src, tgt);
                let found = backend.match_pair(src, tgt, &f, &pair_params, lists);
                log::debug!("Matching: {id} -> {nb}: {found} candidates");
                stats.new_matches += found;
                report.pairs_matched += 1;
            }
            timing.accumulate("matching", elapsed_ms(t));
            report.total_matches += stats.new_matches;
            stats.neighbors = neighbors;

            // 2. scoring, 3. inverse propagation
            let t = Instant::now();
            let (Some(view), Some(lists)) = (self.views.get(&id), self.matches.get_mut(&id)) else {
                continue;
            };
            stats.valid_fraction = backend.score_view(view, lists, &kernel);
            let inverses = collect_inverse_matches(lists, &processed);
            timing.accumulate("scoring", elapsed_ms(t));
            for inv in inverses {
                if let Some(list) = self
                    .matches
                    .get_mut(&inv.src.view)
                    .and_then(|lists| lists.get_mut(inv.src.index as usize))
                {
                    list.push(inv);
                }
            }

            // 4. filtering
            let t = Instant::now();
            let (Some(view), Some(lists)) = (self.views.get(&id), self.matches.get_mut(&id)) else {
                continue;
            };
            let outcome = filter_view(view, lists);
            stats.remaining_matches = outcome.remaining_matches;
            stats.estimates = outcome.estimates.len();
            stats.median_depth = outcome.median_depth;
            for est in outcome.estimates {
                self.estimates.insert(est.segment, est);
            }
            if let Some(view) = self.views.get_mut(&id) {
                view.update_median_depth(outcome.median_depth);
            }
            timing.accumulate("filtering", elapsed_ms(t));

            log::info!(
                "Matching: view {id}: {} new matches, {:.1}% valid, {} estimates",
                stats.new_matches,
                stats.valid_fraction * 100.0,
                stats.estimates
            );
            processed.insert(id);
            report.per_view.push(stats);
        }

        report.estimates = self.estimates.len();
        report.fundamentals_computed = self.fundamentals.computed();
        report.timing = timing;
        Ok(report)
    }

    fn prepare_views(&mut self, settings: MatchingSettings) {
        let prepare = |view: &mut View| {
            view.reset_median_depth();
            view.set_regularizer(settings.regularizer);
        };
        #[cfg(feature = "parallel")]
        self.views.par_iter_mut().for_each(|(_, v)| prepare(v));
        #[cfg(not(feature = "parallel"))]
        self.views.iter_mut().for_each(|(_, v)| prepare(v));
    }

    fn compute_neighbors(&self, settings: MatchingSettings) -> BTreeMap<ViewId, Vec<ViewId>> {
        let params = NeighborParams {
            max_neighbors: settings.num_neighbors,
            min_baseline: settings.min_baseline,
        };
        let views = &self.views;
        let landmarks = &self.landmarks;
        let select = |(&id, source): (&ViewId, &NeighborSource)| {
            let selected = select_neighbors(id, source, views, landmarks, params);
            if selected.is_empty() {
                log::warn!("Neighbors: view {id} has no visual neighbors");
            }
            (id, selected)
        };
        #[cfg(feature = "parallel")]
        let selected = self.neighbor_sources.par_iter().map(select).collect();
        #[cfg(not(feature = "parallel"))]
        let selected = self.neighbor_sources.iter().map(select).collect();
        selected
    }

    // --- reconstruction -------------------------------------------------

    /// Builds the affinity graph, clusters it and assembles the final lines.
    pub fn reconstruct(&mut self, params: &ReconstructParams) -> Result<ReconstructionReport> {
        let start = Instant::now();
        self.lines.clear();
        let Some(settings) = self.settings else {
            log::warn!("Reconstruct: views have not been matched");
            return Ok(ReconstructionReport::default());
        };
        if self.estimates.is_empty() {
            log::warn!("Reconstruct: no estimated positions, nothing to cluster");
            return Ok(ReconstructionReport::default());
        }

        let mut report = ReconstructionReport::default();
        let mut timing = TimingBreakdown::default();
        let visibility = params.resolved_visibility();

        self.check_cancel("graph construction")?;
        let t = Instant::now();
        let collinearity = params.resolved_collinearity();
        if let Some(threshold) = collinearity {
            #[cfg(feature = "parallel")]
            self.views.par_iter_mut().for_each(|(_, v)| {
                v.update_collinearity(threshold);
            });
            #[cfg(not(feature = "parallel"))]
            self.views.iter_mut().for_each(|(_, v)| {
                v.update_collinearity(threshold);
            });
        }
        let kernel = SimilarityKernel::new(settings.sigma_angle, MIN_SIMILARITY_3D);
        let mut graph = AffinityGraph::build(
            &self.views,
            &self.matches,
            &self.estimates,
            kernel,
            MIN_AFFINITY,
            collinearity.is_some(),
        );
        timing.record_since("affinity", t);

        if params.perform_diffusion {
            let t = Instant::now();
            report.diffusion_applied = self.apply_diffusion(&mut graph);
            timing.record_since("diffusion", t);
        }
        report.nodes = graph.num_nodes();
        report.edges = graph.edges().len();

        self.check_cancel("clustering")?;
        let t = Instant::now();
        let components = segment_graph(&graph, CLUSTERING_SCALE);
        let mut clusters =
            clusters_from_components(&components, &self.estimates, &self.views, visibility);
        report.components = components.len();
        timing.record_since("clustering", t);

        if params.use_optimizer {
            let t = Instant::now();
            report.optimizer_applied =
                self.apply_optimizer(&mut clusters, params.max_optimizer_iterations);
            timing.record_since("optimizer", t);
        }
        report.clusters = clusters.len();

        self.check_cancel("line assembly")?;
        let t = Instant::now();
        self.lines = assemble_lines(clusters, &self.views);
        timing.record_since("lines", t);

        report.lines = self.lines.len();
        report.segments = self.lines.iter().map(|l| l.segments.len()).sum();
        timing.total_ms = elapsed_ms(start);
        report.timing = timing;
        log::info!(
            "Reconstruct: {} nodes, {} edges, {} clusters, {} lines ({:.1} ms)",
            report.nodes,
            report.edges,
            report.clusters,
            report.lines,
            report.timing.total_ms
        );
        Ok(report)
    }

    fn apply_diffusion(&self, graph: &mut AffinityGraph) -> bool {
        let Some(diffusion) = self.diffusion.as_deref() else {
            log::warn!("Reconstruct: diffusion requested but no strategy installed, skipping");
            return false;
        };
        if !diffusion.is_available() {
            log::warn!("Reconstruct: diffusion '{}' unavailable, skipping", diffusion.name());
            return false;
        }
        match diffusion.diffuse(graph) {
            Ok(edges) => {
                graph.replace_edges(edges);
                true
            }
            Err(err) => {
                log::warn!("Reconstruct: diffusion '{}' failed: {err}", diffusion.name());
                false
            }
        }
    }

    fn apply_optimizer(&self, clusters: &mut Vec<LineCluster3D>, max_iterations: usize) -> bool {
        let Some(optimizer) = self.optimizer.as_deref() else {
            log::warn!("Reconstruct: optimization requested but no optimizer installed, skipping");
            return false;
        };
        if !optimizer.is_available() {
            log::warn!("Reconstruct: optimizer '{}' unavailable, skipping", optimizer.name());
            return false;
        }
        let mut trial = clusters.clone();
        match optimizer.optimize(&self.views, &mut trial, max_iterations) {
            Ok(()) => {
                *clusters = trial;
                true
            }
            Err(err) => {
                log::warn!("Reconstruct: optimizer '{}' failed: {err}", optimizer.name());
                false
            }
        }
    }
}
