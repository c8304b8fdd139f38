//! Identifier types.
//!
//! Graph elements are addressed by dense integer handles into the graph's
//! arenas. Feed-level identifiers (trips, routes, stops, services, alerts)
//! are cheap-to-clone shared strings.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::DomainError;

macro_rules! arena_handle {
    ($(#[$doc:meta])* $name:ident, $tag:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Returns the handle as an arena index.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Creates a handle from an arena index.
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $tag, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_handle!(
    /// Handle of a vertex in the graph arena.
    VertexId,
    "VertexId"
);

arena_handle!(
    /// Handle of an edge in the graph arena.
    ///
    /// Handles of detached edges are never reused.
    EdgeId,
    "EdgeId"
);

arena_handle!(
    /// Handle of a trip pattern (an ordered stop sequence served by a route).
    PatternId,
    "PatternId"
);

macro_rules! feed_id {
    ($(#[$doc:meta])* $name:ident, $what:literal) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create an identifier, rejecting empty strings.
            pub fn new(s: impl AsRef<str>) -> Result<Self, DomainError> {
                let s = s.as_ref();
                if s.is_empty() {
                    return Err(DomainError::EmptyId($what));
                }
                Ok(Self(Arc::from(s)))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

feed_id!(
    /// Identifier of a scheduled or real-time trip.
    ///
    /// # Examples
    ///
    /// ```
    /// use trip_router::domain::TripId;
    ///
    /// let trip = TripId::new("T100").unwrap();
    /// assert_eq!(trip.as_str(), "T100");
    /// assert!(TripId::new("").is_err());
    /// ```
    TripId,
    "trip"
);

feed_id!(
    /// Identifier of a transit route.
    RouteId,
    "route"
);

feed_id!(
    /// Identifier of a transit stop.
    StopId,
    "stop"
);

feed_id!(
    /// Identifier of a service calendar entry.
    ServiceId,
    "service"
);

feed_id!(
    /// Identifier of a rider alert attached to an edge.
    AlertId,
    "alert"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_handles_round_trip_index() {
        let v = VertexId::from_index(42);
        assert_eq!(v.index(), 42);
        assert_eq!(format!("{v:?}"), "VertexId(42)");
        assert_eq!(v.to_string(), "42");
    }

    #[test]
    fn feed_ids_reject_empty() {
        assert!(RouteId::new("").is_err());
        assert!(StopId::new("S1").is_ok());
    }

    #[test]
    fn feed_ids_clone_shares_storage() {
        let a = TripId::new("T1").unwrap();
        let b = a.clone();
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
    }

    #[test]
    fn feed_ids_serialize_as_plain_strings() {
        let trip = TripId::new("T9").unwrap();
        assert_eq!(serde_json::to_string(&trip).unwrap(), "\"T9\"");
        let back: TripId = serde_json::from_str("\"T9\"").unwrap();
        assert_eq!(back, trip);
    }
}
