//! Search errors.

use crate::domain::VertexId;

/// Error from setting up a search.
///
/// Timeouts and unreachable targets are not errors: they are reported on
/// the search result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    /// Invalid request options
    #[error("invalid routing request: {0}")]
    InvalidRequest(String),

    /// The request names a vertex that is not in the graph
    #[error("vertex {0:?} is not in the graph")]
    UnknownVertex(VertexId),

    #[error("a target vertex is required unless searching in batch mode")]
    MissingTarget,
}
