//! Reconstruction session: the owner of all views and pipeline state.

pub mod params;
pub mod session;

pub use params::{MatchingParams, MatchingSettings, ReconstructParams};
pub use session::{Reconstructor, ViewInput};
