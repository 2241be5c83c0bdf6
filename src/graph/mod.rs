//! Affinity graph construction and clustering.

pub mod affinity;
pub mod clustering;
pub mod universe;

pub use affinity::{symmetrize_min, AffinityEdge, AffinityGraph};
pub use clustering::{segment_graph, CLUSTERING_SCALE};
pub use universe::Universe;

/// Segment pairs less similar than this are not linked.
pub const MIN_AFFINITY: f64 = 0.25;
