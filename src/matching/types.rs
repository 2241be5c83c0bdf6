use crate::types::{Segment2D, ViewId};
use serde::Serialize;

/// Candidate correspondence between a source and a target segment.
///
/// `depth_p*` are the depths of the source endpoints along the source view's
/// rays; `depth_q*` those of the target endpoints along the target view's
/// rays. All four are positive for any accepted match.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub src: Segment2D,
    pub tgt: Segment2D,
    pub overlap_score: f64,
    pub score3d: f64,
    pub depth_p1: f64,
    pub depth_p2: f64,
    pub depth_q1: f64,
    pub depth_q2: f64,
}

impl Match {
    pub fn src_view(&self) -> ViewId {
        self.src.view
    }

    pub fn tgt_view(&self) -> ViewId {
        self.tgt.view
    }

    /// Same correspondence seen from the target view. The 3D score is reset
    /// because it has to be re-established in the target's context.
    pub fn inverse(&self) -> Match {
        Match {
            src: self.tgt,
            tgt: self.src,
            overlap_score: self.overlap_score,
            score3d: 0.0,
            depth_p1: self.depth_q1,
            depth_p2: self.depth_q2,
            depth_q1: self.depth_p1,
            depth_q2: self.depth_p2,
        }
    }
}
