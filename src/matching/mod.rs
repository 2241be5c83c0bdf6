//! Cross-view segment matching.

pub mod fundamental;
pub mod matcher;
pub mod types;

pub use fundamental::FundamentalCache;
pub use matcher::{match_pair, match_segment, triangulation_depths, PairMatchParams};
pub use types::Match;

use crate::types::ViewId;
use std::collections::BTreeMap;

/// Match lists per view, one list per segment of that view.
pub type MatchTable = BTreeMap<ViewId, Vec<Vec<Match>>>;
