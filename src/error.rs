use crate::types::ViewId;
use thiserror::Error;

/// Structural errors raised by the reconstruction session.
///
/// Geometric degeneracies never surface here; they are handled locally by
/// rejecting the affected candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    #[error("view {0} already exists")]
    DuplicateView(ViewId),

    #[error("view {0} has neither landmarks nor explicit neighbors")]
    MissingNeighborInfo(ViewId),

    #[error("view {0} has no line segments")]
    NoSegments(ViewId),

    #[error("view {0} has a singular or non-finite camera")]
    InvalidCamera(ViewId),

    #[error("unknown view {0}")]
    UnknownView(ViewId),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ReconError>;
