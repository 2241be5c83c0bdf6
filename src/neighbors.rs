//! Visual neighbor selection.
//!
//! Each view is matched only against a bounded set of neighbors. Neighbors
//! are either given explicitly or ranked by the fraction of shared
//! landmarks (sparse SfM points seen by both views), subject to a viewing
//! direction check and a minimum baseline to every accepted neighbor.

use crate::types::ViewId;
use crate::view::View;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Neighbor information supplied with a view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NeighborSource {
    /// Ids of sparse landmarks observed in the view.
    Landmarks(Vec<u32>),
    /// Explicit neighbor view ids, used without scoring.
    Explicit(Vec<ViewId>),
}

impl NeighborSource {
    pub fn is_empty(&self) -> bool {
        match self {
            NeighborSource::Landmarks(ids) => ids.is_empty(),
            NeighborSource::Explicit(ids) => ids.is_empty(),
        }
    }
}

/// Inverted index from landmark id to observing views.
#[derive(Clone, Debug, Default)]
pub struct LandmarkIndex {
    observers: HashMap<u32, BTreeSet<ViewId>>,
    per_view: HashMap<ViewId, BTreeSet<u32>>,
}

impl LandmarkIndex {
    pub fn insert(&mut self, view: ViewId, landmarks: &[u32]) {
        let set = self.per_view.entry(view).or_default();
        for &lm in landmarks {
            if set.insert(lm) {
                self.observers.entry(lm).or_default().insert(view);
            }
        }
    }

    pub fn landmark_count(&self, view: ViewId) -> usize {
        self.per_view.get(&view).map_or(0, BTreeSet::len)
    }

    /// Number of landmarks shared with every other view (ordered by id).
    pub fn common_counts(&self, view: ViewId) -> BTreeMap<ViewId, usize> {
        let mut counts = BTreeMap::new();
        let Some(own) = self.per_view.get(&view) else {
            return counts;
        };
        for lm in own {
            if let Some(observers) = self.observers.get(lm) {
                for &other in observers {
                    if other != view {
                        *counts.entry(other).or_insert(0) += 1;
                    }
                }
            }
        }
        counts
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NeighborParams {
    pub max_neighbors: usize,
    pub min_baseline: f64,
}

/// Selects the visual neighbors of `view`.
///
/// Explicit lists are filtered to existing views and returned in the given
/// order. Landmark-based selection never fails: a view sharing nothing
/// simply has no neighbors.
pub fn select_neighbors(
    view: ViewId,
    source: &NeighborSource,
    views: &BTreeMap<ViewId, View>,
    landmarks: &LandmarkIndex,
    params: NeighborParams,
) -> Vec<ViewId> {
    match source {
        NeighborSource::Explicit(ids) => {
            let mut seen = BTreeSet::new();
            ids.iter()
                .copied()
                .filter(|&id| id != view && views.contains_key(&id) && seen.insert(id))
                .collect()
        }
        NeighborSource::Landmarks(_) => select_by_landmarks(view, views, landmarks, params),
    }
}

fn select_by_landmarks(
    view: ViewId,
    views: &BTreeMap<ViewId, View>,
    landmarks: &LandmarkIndex,
    params: NeighborParams,
) -> Vec<ViewId> {
    let Some(this) = views.get(&view) else {
        return Vec::new();
    };
    let own_count = landmarks.landmark_count(view);

    let mut candidates: Vec<(ViewId, f64)> = landmarks
        .common_counts(view)
        .into_iter()
        .filter_map(|(other, common)| {
            let other_view = views.get(&other)?;
            if this.optical_axis_angle(other_view) >= std::f64::consts::FRAC_PI_2 {
                return None;
            }
            let total = (own_count + landmarks.landmark_count(other)) as f64;
            Some((other, 2.0 * common as f64 / total))
        })
        .collect();
    // Stable: equal scores keep ascending view id order.
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut accepted: Vec<ViewId> = Vec::new();
    for (candidate, score) in candidates {
        if accepted.len() >= params.max_neighbors {
            break;
        }
        let Some(cand_view) = views.get(&candidate) else {
            continue;
        };
        if this.baseline(cand_view) <= params.min_baseline {
            continue;
        }
        let spread = accepted.iter().all(|id| {
            views
                .get(id)
                .map_or(true, |v| v.baseline(cand_view) > params.min_baseline)
        });
        if spread {
            log::debug!("Neighbors: view {view} accepts {candidate} (score {score:.3})");
            accepted.push(candidate);
        }
    }
    accepted
}
