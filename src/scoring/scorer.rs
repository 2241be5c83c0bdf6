//! Per-view 3D consistency scoring and filtering.
//!
//! A match is plausible when the 3D hypotheses of *other* matches of the
//! same source segment (towards different target views) agree with it.
//! Each target view contributes at most once, with its best agreeing
//! hypothesis, so a view with many near-duplicate candidates cannot
//! outvote the others.

use super::similarity::{Hypothesis, SimilarityKernel};
use super::{MIN_BEST_SCORE_3D, MIN_SCORE_3D};
use crate::geometry::{Segment3D, EPS};
use crate::matching::Match;
use crate::types::{Segment2D, ViewId};
use crate::view::View;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Best surviving hypothesis of a 2D segment.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedPosition {
    pub segment: Segment2D,
    pub best: Match,
    pub position: Segment3D,
}

/// Outcome of filtering one view.
#[derive(Clone, Debug, Default)]
pub struct FilterOutcome {
    pub estimates: Vec<EstimatedPosition>,
    pub remaining_matches: usize,
    pub median_depth: f64,
}

/// Scores every match of one source segment in place. Returns `true` when
/// matches scoring above the minimum exist for at least two target views.
pub fn score_segment(view: &View, list: &mut [Match], kernel: &SimilarityKernel) -> bool {
    let hypotheses: Vec<Option<Hypothesis>> =
        list.iter().map(|m| Hypothesis::from_match(view, m)).collect();

    let mut scores = Vec::with_capacity(list.len());
    for (i, m) in list.iter().enumerate() {
        let mut best_per_view: BTreeMap<ViewId, f64> = BTreeMap::new();
        for (j, m2) in list.iter().enumerate() {
            if m2.tgt_view() == m.tgt_view() {
                continue;
            }
            let sim = match (&hypotheses[i], &hypotheses[j]) {
                (Some(h1), Some(h2)) => kernel.truncated(h1, view, h2, view),
                _ => 0.0,
            };
            let best = best_per_view.entry(m2.tgt_view()).or_insert(sim);
            if sim > *best {
                *best = sim;
            }
        }
        scores.push(best_per_view.values().sum::<f64>());
    }

    let mut supported = BTreeSet::new();
    for (m, score) in list.iter_mut().zip(scores) {
        m.score3d = score;
        if score > MIN_SCORE_3D {
            supported.insert(m.tgt_view());
        }
    }
    supported.len() > 1
}

/// Scores all match lists of `view`. Returns the fraction of segments with
/// support from at least two target views.
pub fn score_view(view: &View, lists: &mut [Vec<Match>], kernel: &SimilarityKernel) -> f64 {
    if lists.is_empty() {
        return 0.0;
    }

    #[cfg(feature = "parallel")]
    let iter = lists.par_iter_mut();
    #[cfg(not(feature = "parallel"))]
    let iter = lists.iter_mut();

    let valid = iter
        .map(|list| usize::from(score_segment(view, list, kernel)))
        .sum::<usize>();
    valid as f64 / lists.len() as f64
}

/// Inverse of every positively scored match whose target view has not been
/// processed yet, to be appended to the target's lists.
pub fn collect_inverse_matches(lists: &[Vec<Match>], processed: &BTreeSet<ViewId>) -> Vec<Match> {
    lists
        .iter()
        .flatten()
        .filter(|m| m.score3d > 0.0 && !processed.contains(&m.tgt_view()))
        .map(Match::inverse)
        .collect()
}

/// Drops weak matches and promotes the best survivor of each segment.
///
/// The median depth over the promoted hypotheses' endpoints is returned
/// for the caller to feed back into the view (EPS if nothing survived).
pub fn filter_view(view: &View, lists: &mut [Vec<Match>]) -> FilterOutcome {
    #[cfg(feature = "parallel")]
    let iter = lists.par_iter_mut();
    #[cfg(not(feature = "parallel"))]
    let iter = lists.iter_mut();

    let estimates: Vec<EstimatedPosition> = iter
        .filter_map(|list| {
            list.retain(|m| m.score3d > MIN_SCORE_3D);
            let best = list
                .iter()
                .copied()
                .reduce(|a, b| if b.score3d > a.score3d { b } else { a })?;
            if best.score3d <= MIN_BEST_SCORE_3D {
                return None;
            }
            let position = view.unproject_segment(best.src.index as usize, best.depth_p1, best.depth_p2)?;
            Some(EstimatedPosition {
                segment: best.src,
                best,
                position,
            })
        })
        .collect();

    let mut depths: Vec<f64> = estimates
        .iter()
        .flat_map(|e| [e.best.depth_p1, e.best.depth_p2])
        .collect();
    let median_depth = if depths.is_empty() {
        EPS
    } else {
        depths.sort_by(f64::total_cmp);
        depths[depths.len() / 2]
    };

    FilterOutcome {
        remaining_matches: lists.iter().map(Vec::len).sum(),
        estimates,
        median_depth,
    }
}
