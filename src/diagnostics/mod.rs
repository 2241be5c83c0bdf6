//! Structured reports returned by the top-level operations.
//!
//! Every stage records counts and its wall-clock time so that runs can be
//! compared and dumped as JSON by the tools.

pub mod reports;
pub mod timing;

pub use reports::{MatchingReport, ReconstructionReport, ViewMatchingStats};
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};
