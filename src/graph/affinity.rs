//! Sparse affinity graph over 2D segments that received a 3D estimate.
//!
//! Estimates are processed in parallel. Three independent regions are
//! shared between workers, each behind its own lock:
//! - the local id table (dense node ids handed out on first use),
//! - the registry of already linked segment pairs,
//! - the edge list.
//!
//! Edges are always inserted as a symmetric pair with identical weight.
//! With collinearity enabled, partners of a segment are only visited after a
//! direct match link of that worker succeeded.

use crate::matching::MatchTable;
use crate::scoring::{EstimateTable, Hypothesis, SimilarityKernel};
use crate::types::{Segment2D, ViewId};
use crate::view::View;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Weighted directed half of a symmetric affinity edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AffinityEdge {
    pub i: u32,
    pub j: u32,
    pub w: f64,
}

#[derive(Clone, Debug, Default)]
pub struct AffinityGraph {
    nodes: Vec<Segment2D>,
    ids: HashMap<Segment2D, u32>,
    edges: Vec<AffinityEdge>,
}

#[derive(Default)]
struct LocalIds {
    nodes: Vec<Segment2D>,
    ids: HashMap<Segment2D, u32>,
}

impl LocalIds {
    fn get_or_insert(&mut self, seg: Segment2D) -> u32 {
        if let Some(&id) = self.ids.get(&seg) {
            return id;
        }
        let id = self.nodes.len() as u32;
        self.nodes.push(seg);
        self.ids.insert(seg, id);
        id
    }
}

struct GraphBuilder<'a> {
    views: &'a BTreeMap<ViewId, View>,
    matches: &'a MatchTable,
    estimates: &'a EstimateTable,
    kernel: SimilarityKernel,
    min_affinity: f64,
    use_collinearity: bool,
    local_ids: Mutex<LocalIds>,
    used: Mutex<HashSet<(Segment2D, Segment2D)>>,
    edges: Mutex<Vec<AffinityEdge>>,
}

impl<'a> GraphBuilder<'a> {
    fn similarity(&self, s: Segment2D, t: Segment2D) -> f64 {
        let (Some(es), Some(et)) = (self.estimates.get(&s), self.estimates.get(&t)) else {
            return 0.0;
        };
        let (Some(vs), Some(vt)) = (self.views.get(&s.view), self.views.get(&t.view)) else {
            return 0.0;
        };
        let hs = Hypothesis {
            segment: es.position,
            depths: [es.best.depth_p1, es.best.depth_p2],
        };
        let ht = Hypothesis {
            segment: et.position,
            depths: [et.best.depth_p1, et.best.depth_p2],
        };
        self.kernel.similarity(&hs, vs, &ht, vt)
    }

    /// Registers the unordered pair; `false` if it was linked before.
    fn claim_pair(&self, s: Segment2D, t: Segment2D) -> bool {
        let key = if s < t { (s, t) } else { (t, s) };
        self.used.lock().insert(key)
    }

    fn try_link(&self, s: Segment2D, t: Segment2D) -> bool {
        if s == t {
            return false;
        }
        let w = self.similarity(s, t);
        if w <= self.min_affinity || !self.claim_pair(s, t) {
            return false;
        }
        let (i, j) = {
            let mut ids = self.local_ids.lock();
            (ids.get_or_insert(s), ids.get_or_insert(t))
        };
        let mut edges = self.edges.lock();
        edges.push(AffinityEdge { i, j, w });
        edges.push(AffinityEdge { i: j, j: i, w });
        true
    }

    fn collinear_of(&self, seg: Segment2D) -> impl Iterator<Item = Segment2D> + '_ {
        let partners: &[u32] = if self.use_collinearity {
            self.views
                .get(&seg.view)
                .map(|v| v.collinear_segments(seg.index as usize))
                .unwrap_or(&[])
        } else {
            &[]
        };
        partners.iter().map(move |&c| Segment2D::new(seg.view, c))
    }

    fn process(&self, s: Segment2D) {
        let Some(list) = self
            .matches
            .get(&s.view)
            .and_then(|lists| lists.get(s.index as usize))
        else {
            return;
        };

        // Collinear partners are only visited behind a successful direct link.
        let mut linked = false;
        for m in list {
            if self.try_link(s, m.tgt) {
                linked = true;
                for c in self.collinear_of(m.tgt) {
                    self.try_link(s, c);
                }
            }
        }
        if linked {
            for c in self.collinear_of(s) {
                self.try_link(s, c);
            }
        }
    }
}

impl AffinityGraph {
    /// Builds the graph from the estimated positions and their surviving
    /// matches. `use_collinearity` additionally links collinear partners.
    pub fn build(
        views: &BTreeMap<ViewId, View>,
        matches: &MatchTable,
        estimates: &EstimateTable,
        kernel: SimilarityKernel,
        min_affinity: f64,
        use_collinearity: bool,
    ) -> Self {
        let builder = GraphBuilder {
            views,
            matches,
            estimates,
            kernel,
            min_affinity,
            use_collinearity,
            local_ids: Mutex::new(LocalIds::default()),
            used: Mutex::new(HashSet::new()),
            edges: Mutex::new(Vec::new()),
        };

        let keys: Vec<Segment2D> = estimates.keys().copied().collect();
        #[cfg(feature = "parallel")]
        keys.par_iter().for_each(|&s| builder.process(s));
        #[cfg(not(feature = "parallel"))]
        keys.iter().for_each(|&s| builder.process(s));

        let LocalIds { nodes, ids } = builder.local_ids.into_inner();
        let edges = builder.edges.into_inner();
        log::debug!("Affinity: {} nodes, {} edges", nodes.len(), edges.len());
        Self { nodes, ids, edges }
    }

    /// Graph from explicit nodes (local id = position) and directed edges.
    pub fn from_parts(nodes: Vec<Segment2D>, edges: Vec<AffinityEdge>) -> Self {
        let ids = nodes
            .iter()
            .enumerate()
            .map(|(id, &seg)| (seg, id as u32))
            .collect();
        Self { nodes, ids, edges }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Segment2D] {
        &self.nodes
    }

    pub fn node(&self, id: u32) -> Option<Segment2D> {
        self.nodes.get(id as usize).copied()
    }

    pub fn local_id(&self, seg: &Segment2D) -> Option<u32> {
        self.ids.get(seg).copied()
    }

    pub fn edges(&self) -> &[AffinityEdge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Replaces the edge set (e.g. after diffusion), re-symmetrized with the
    /// minimum of both directions. Edges referring to unknown nodes are dropped.
    pub fn replace_edges(&mut self, edges: Vec<AffinityEdge>) {
        let n = self.nodes.len() as u32;
        let valid: Vec<AffinityEdge> = edges.into_iter().filter(|e| e.i < n && e.j < n).collect();
        self.edges = symmetrize_min(&valid);
    }
}

/// Symmetric edge set where each pair carries `min(w_ij, w_ji)`; pairs
/// present in one direction only are dropped.
pub fn symmetrize_min(edges: &[AffinityEdge]) -> Vec<AffinityEdge> {
    let mut directed: HashMap<(u32, u32), f64> = HashMap::with_capacity(edges.len());
    for e in edges {
        if e.i != e.j {
            directed.insert((e.i, e.j), e.w);
        }
    }
    let mut pairs: Vec<(u32, u32, f64)> = directed
        .iter()
        .filter(|(&(i, j), _)| i < j)
        .filter_map(|(&(i, j), &w)| directed.get(&(j, i)).map(|&w2| (i, j, w.min(w2))))
        .filter(|&(_, _, w)| w > 0.0)
        .collect();
    pairs.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    pairs
        .into_iter()
        .flat_map(|(i, j, w)| [AffinityEdge { i, j, w }, AffinityEdge { i: j, j: i, w }])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Camera, Segment3D};
    use crate::graph::MIN_AFFINITY;
    use crate::matching::Match;
    use crate::scoring::{EstimatedPosition, MIN_SIMILARITY_3D};
    use crate::types::LineSegment;
    use crate::view::Regularizer;
    use nalgebra::{Matrix3, Vector3};
    use std::collections::BTreeSet;

    /// View holding two pieces of one broken image line.
    fn broken_line_view(id: ViewId) -> View {
        let k = Matrix3::new(500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0);
        let cam = Camera::new(k, Matrix3::identity(), Vector3::new(-(id as f64), 0.0, 0.0));
        let segments = vec![
            LineSegment::new([100.0, 200.0], [200.0, 200.0]),
            LineSegment::new([220.0, 200.0], [300.0, 200.0]),
        ];
        let mut v = View::new(id, cam, 640, 480, segments, 5.0);
        v.set_regularizer(Regularizer::Fixed(0.05));
        v.update_collinearity(1.0);
        v
    }

    fn link(src: Segment2D, tgt: Segment2D) -> Match {
        Match {
            src,
            tgt,
            overlap_score: 1.0,
            score3d: 1.0,
            depth_p1: 5.0,
            depth_p2: 5.0,
            depth_q1: 5.0,
            depth_q2: 5.0,
        }
    }

    /// Builds the graph over two broken-line views where every estimated
    /// segment sits on the same 3D line.
    fn build(estimated: &[Segment2D], links: &[(Segment2D, Segment2D)], use_collinearity: bool) -> AffinityGraph {
        let views: BTreeMap<ViewId, View> = (0..2).map(|id| (id, broken_line_view(id))).collect();
        let mut matches: MatchTable = (0..2).map(|id| (id, vec![Vec::new(); 2])).collect();
        for &(s, t) in links {
            if let Some(list) = matches.get_mut(&s.view).and_then(|l| l.get_mut(s.index as usize)) {
                list.push(link(s, t));
            }
        }
        let position = Segment3D::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(1.0, 0.0, 5.0));
        let estimates: EstimateTable = estimated
            .iter()
            .map(|&seg| {
                let best = link(seg, seg);
                (seg, EstimatedPosition { segment: seg, best, position })
            })
            .collect();
        let kernel = SimilarityKernel::new(10.0, MIN_SIMILARITY_3D);
        AffinityGraph::build(&views, &matches, &estimates, kernel, MIN_AFFINITY, use_collinearity)
    }

    fn linked_pairs(graph: &AffinityGraph) -> BTreeSet<(Segment2D, Segment2D)> {
        graph
            .edges()
            .iter()
            .filter_map(|e| Some((graph.node(e.i)?, graph.node(e.j)?)))
            .filter(|(a, b)| a < b)
            .collect()
    }

    #[test]
    fn collinear_partners_follow_a_direct_link() {
        let s = Segment2D::new(0, 0);
        let s_piece = Segment2D::new(0, 1);
        let t = Segment2D::new(1, 0);
        let t_piece = Segment2D::new(1, 1);
        let all = [s, s_piece, t, t_piece];

        let plain = build(&all, &[(s, t)], false);
        assert_eq!(linked_pairs(&plain), BTreeSet::from([(s, t)]));

        let graph = build(&all, &[(s, t)], true);
        assert_eq!(
            linked_pairs(&graph),
            BTreeSet::from([(s, t), (s, t_piece), (s, s_piece)])
        );
        assert_eq!(graph.edges().len(), 6);
    }

    #[test]
    fn failed_direct_link_skips_collinear_partners() {
        let s = Segment2D::new(0, 0);
        let s_piece = Segment2D::new(0, 1);
        let t = Segment2D::new(1, 0);
        let t_piece = Segment2D::new(1, 1);

        // `t` has no estimate, so the only match of `s` cannot be linked.
        let graph = build(&[s, s_piece, t_piece], &[(s, t)], true);
        assert!(graph.is_empty(), "unexpected edges {:?}", graph.edges());
        assert_eq!(graph.num_nodes(), 0);
    }

    #[test]
    fn symmetrize_takes_minimum_and_drops_one_sided() {
        let edges = vec![
            AffinityEdge { i: 0, j: 1, w: 0.9 },
            AffinityEdge { i: 1, j: 0, w: 0.6 },
            AffinityEdge { i: 1, j: 2, w: 0.8 },
        ];
        let sym = symmetrize_min(&edges);
        assert_eq!(sym.len(), 2);
        assert!(sym.iter().all(|e| (e.w - 0.6).abs() < 1e-12));
        assert!(sym.iter().any(|e| e.i == 0 && e.j == 1));
        assert!(sym.iter().any(|e| e.i == 1 && e.j == 0));
    }

    #[test]
    fn replace_edges_discards_unknown_nodes() {
        let mut graph = AffinityGraph {
            nodes: vec![Segment2D::new(0, 0), Segment2D::new(1, 0)],
            ids: HashMap::new(),
            edges: Vec::new(),
        };
        graph.replace_edges(vec![
            AffinityEdge { i: 0, j: 1, w: 0.7 },
            AffinityEdge { i: 1, j: 0, w: 0.7 },
            AffinityEdge { i: 0, j: 5, w: 0.7 },
            AffinityEdge { i: 5, j: 0, w: 0.7 },
        ]);
        assert_eq!(graph.edges().len(), 2);
    }
}
