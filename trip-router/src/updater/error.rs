//! Real-time update and graph writer errors.

use crate::domain::{PatternId, TripId};
use crate::graph::GraphError;
use crate::timetable::ScheduleRelationship;

/// Errors from applying real-time data or running graph writer tasks.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// Times are malformed or decrease along the trip
    #[error("invalid times for trip {trip}: {reason}")]
    InvalidTripTimes { trip: TripId, reason: String },

    /// The update names a trip that is neither scheduled nor added
    #[error("unknown trip {0}")]
    UnknownTrip(TripId),

    /// No pattern serves the route and stops of an added trip
    #[error("no pattern matches added trip {0}")]
    UnknownPattern(TripId),

    #[error("pattern {0:?} does not exist")]
    MissingPattern(PatternId),

    #[error("{relationship:?} updates are not supported (trip {trip})")]
    Unsupported {
        trip: TripId,
        relationship: ScheduleRelationship,
    },

    /// The graph writer has shut down and accepts no more tasks
    #[error("graph writer has stopped")]
    WriterStopped,

    /// A writer task panicked; the panic was contained
    #[error("graph writer task panicked: {0}")]
    TaskPanicked(String),

    #[error("graph edit failed: {0}")]
    Graph(#[source] Box<GraphError>),

    #[error("failed to read trip updates: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed trip updates: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<GraphError> for UpdateError {
    fn from(e: GraphError) -> Self {
        UpdateError::Graph(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let trip = TripId::new("T9").unwrap();
        assert_eq!(UpdateError::UnknownTrip(trip.clone()).to_string(), "unknown trip T9");
        let err = UpdateError::Unsupported {
            trip,
            relationship: ScheduleRelationship::Unscheduled,
        };
        assert_eq!(err.to_string(), "Unscheduled updates are not supported (trip T9)");
        let err: UpdateError = GraphError::UnknownLabel("x".into()).into();
        assert!(err.to_string().contains("unknown vertex label"));
    }
}
