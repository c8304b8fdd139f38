//! Domain error types.
//!
//! These errors represent validation failures when constructing domain
//! values. They are distinct from graph, search and update errors.

/// Domain-level errors for validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// An identifier was empty
    #[error("{0} identifier must not be empty")]
    EmptyId(&'static str),

    /// Latitude or longitude out of range
    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// Unrecognised traverse mode name
    #[error("unknown traverse mode: {0}")]
    UnknownMode(String),
}
