//! Edge kinds.

mod link;
mod street;
mod transit;

pub use link::{StreetTransitLink, TransferEdge};
pub use street::{StreetEdge, TurnRestriction, TurnRestrictionKind};
pub use transit::{FrequencyBoard, PatternDwell, PatternHop, TransitBoardAlight};
