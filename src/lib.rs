#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod detect;
pub mod diagnostics;
pub mod error;
pub mod io;
pub mod reconstruction;
pub mod types;

// Pipeline internals. Public so tools and tests can drive single stages.
pub mod angle;
pub mod backend;
pub mod geometry;
pub mod graph;
pub mod lines;
pub mod matching;
pub mod neighbors;
pub mod scoring;
pub mod view;

// --- High-level re-exports -------------------------------------------------

// Main entry points: the session and its parameters.
pub use crate::error::ReconError;
pub use crate::reconstruction::{MatchingParams, ReconstructParams, Reconstructor, ViewInput};

// Inputs and results.
pub use crate::geometry::{Camera, Segment3D};
pub use crate::lines::{FinalLine3D, LineCluster3D};
pub use crate::neighbors::NeighborSource;
pub use crate::types::{LineSegment, Segment2D, ViewId};

// Reports returned by the session.
pub use crate::diagnostics::{MatchingReport, ReconstructionReport};

// --- Prelude ---------------------------------------------------------------

/// Everything needed to run a reconstruction end to end.
pub mod prelude {
    pub use crate::detect::{GradientLineDetector, SegmentDetector};
    pub use crate::{
        Camera, FinalLine3D, LineSegment, MatchingParams, NeighborSource, ReconError,
        ReconstructParams, Reconstructor, Segment2D, ViewInput,
    };
}
