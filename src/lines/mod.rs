//! 3D line assembly from clusters of consistent 2D segments.

pub mod fit;
pub mod sweep;

use crate::geometry::Segment3D;
use crate::scoring::EstimateTable;
use crate::types::{Segment2D, ViewId};
use crate::view::View;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub use fit::{build_cluster, fit_line, project_segment_onto_line};
pub use sweep::{sweep_collinear, MIN_SWEEP_VIEWS};

/// A fitted 3D line with the 2D segments supporting it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCluster3D {
    /// Representative segment projected onto the fitted line.
    pub line: Segment3D,
    pub representative: Segment2D,
    pub residuals: Vec<Segment2D>,
}

impl LineCluster3D {
    /// Number of distinct views among the residuals.
    pub fn visibility(&self) -> usize {
        distinct_views(&self.residuals)
    }
}

/// Output line: disjoint collinear 3D segments and their cluster.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalLine3D {
    pub segments: Vec<Segment3D>,
    pub cluster: LineCluster3D,
}

pub fn distinct_views(segments: &[Segment2D]) -> usize {
    segments.iter().map(|s| s.view).collect::<BTreeSet<_>>().len()
}

/// Fits a line to every component seen by at least `visibility` views.
pub fn clusters_from_components(
    components: &[Vec<Segment2D>],
    estimates: &EstimateTable,
    views: &BTreeMap<ViewId, View>,
    visibility: usize,
) -> Vec<LineCluster3D> {
    let eligible: Vec<&Vec<Segment2D>> = components
        .iter()
        .filter(|c| distinct_views(c) >= visibility)
        .collect();

    #[cfg(feature = "parallel")]
    let iter = eligible.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = eligible.iter();

    iter.filter_map(|members| build_cluster(members, estimates, views))
        .collect()
}

/// Sweeps every cluster and keeps segments long enough in the
/// representative view. Lines left without segments are dropped.
pub fn assemble_lines(clusters: Vec<LineCluster3D>, views: &BTreeMap<ViewId, View>) -> Vec<FinalLine3D> {
    #[cfg(feature = "parallel")]
    let iter = clusters.into_par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = clusters.into_iter();

    iter.filter_map(|cluster| {
        let view = views.get(&cluster.representative.view)?;
        let segments: Vec<Segment3D> = sweep_collinear(&cluster, views)
            .into_iter()
            .filter(|s| view.projected_long_enough(s))
            .collect();
        if segments.is_empty() {
            None
        } else {
            Some(FinalLine3D { segments, cluster })
        }
    })
    .collect()
}
