//! Graph construction errors.

use crate::domain::{DomainError, EdgeId, PatternId, RouteId, StopId, VertexId};
use crate::updater::UpdateError;

/// Errors from building or editing the graph.
///
/// These are usage errors: they mean a caller referred to something that
/// does not exist.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// An edge endpoint is not in the vertex arena
    #[error("vertex {0:?} does not exist")]
    MissingVertex(VertexId),

    /// The edge was never added or has been detached
    #[error("edge {0:?} does not exist")]
    UnknownEdge(EdgeId),

    #[error("pattern {0:?} does not exist")]
    UnknownPattern(PatternId),

    /// A pattern refers to a stop with no transit stop vertex
    #[error("stop {0} has no vertex")]
    UnknownStop(StopId),

    /// A network description refers to an undeclared vertex label
    #[error("unknown vertex label {0:?}")]
    UnknownLabel(String),

    /// A pattern's stops and trips do not fit together
    #[error("invalid pattern on route {route}: {reason}")]
    InvalidPattern { route: RouteId, reason: String },

    #[error("UTC offset of {0} seconds is out of range")]
    InvalidOffset(i32),

    #[error("duplicate vertex label {0:?}")]
    DuplicateLabel(String),

    #[error("invalid trip: {0}")]
    InvalidTrip(#[from] UpdateError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("failed to read network description: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed network description: {0}")]
    Json(#[from] serde_json::Error),
}
