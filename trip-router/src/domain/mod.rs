//! Domain types for the trip router.
//!
//! Identifiers, coordinates, traverse modes and service days. Types that
//! carry invariants enforce them at construction time, so code receiving
//! them can trust their validity.

mod coord;
mod error;
mod ids;
mod mode;
mod service_day;

pub use coord::{Coordinate, DistanceLibrary};
pub use error::DomainError;
pub use ids::{AlertId, EdgeId, PatternId, RouteId, ServiceId, StopId, TripId, VertexId};
pub use mode::{TraverseMode, TraverseModeSet};
pub use service_day::{ServiceCalendar, ServiceDay};
