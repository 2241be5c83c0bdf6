//! Graph segmentation of the affinity graph.
//!
//! Edges are visited from the strongest affinity to the weakest. Each
//! component keeps a threshold `τ = internal + c / size`, where `internal`
//! is the dissimilarity (`1 − w`) of the last edge that merged it. Two
//! components merge when the edge dissimilarity does not exceed either
//! threshold. Small components therefore merge eagerly, large ones only
//! along edges as strong as their internal structure.

use super::affinity::AffinityGraph;
use super::universe::Universe;
use crate::types::Segment2D;
use std::collections::HashMap;

/// Scale of the merge threshold.
pub const CLUSTERING_SCALE: f64 = 3.0;

/// Segments the graph and returns components as sorted lists of segments,
/// ordered by their smallest member. Singletons are included.
pub fn segment_graph(graph: &AffinityGraph, c: f64) -> Vec<Vec<Segment2D>> {
    let n = graph.num_nodes();
    let mut universe = Universe::new(n);
    let mut threshold = vec![c; n];

    let mut edges: Vec<(f64, Segment2D, Segment2D, u32, u32)> = graph
        .edges()
        .iter()
        .filter(|e| e.i < e.j)
        .filter_map(|e| {
            let a = graph.node(e.i)?;
            let b = graph.node(e.j)?;
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            Some((e.w, lo, hi, e.i, e.j))
        })
        .collect();
    // Node ids are assigned in arrival order; break ties on segment identity.
    edges.sort_by(|a, b| b.0.total_cmp(&a.0).then((a.1, a.2).cmp(&(b.1, b.2))));

    for (w, _, _, i, j) in edges {
        let a = universe.find(i);
        let b = universe.find(j);
        if a == b {
            continue;
        }
        let d = 1.0 - w;
        if d <= threshold[a as usize] && d <= threshold[b as usize] {
            let root = universe.join(a, b);
            threshold[root as usize] = d + c / universe.size(root) as f64;
        }
    }

    let mut order: Vec<(Segment2D, u32)> = graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(id, &seg)| (seg, id as u32))
        .collect();
    order.sort();

    let mut slot: HashMap<u32, usize> = HashMap::new();
    let mut components: Vec<Vec<Segment2D>> = Vec::new();
    for (seg, id) in order {
        let root = universe.find(id);
        let idx = *slot.entry(root).or_insert_with(|| {
            components.push(Vec::new());
            components.len() - 1
        });
        components[idx].push(seg);
    }
    components
}
