//! Connections between streets and transit stops, and between stops.

use std::sync::Arc;

use crate::domain::TraverseMode;
use crate::graph::{Edge, Successors, Traversable};
use crate::routing::{RoutingContext, State, StateEditor, Terminal};

/// Connects a transit stop to the street network.
#[derive(Debug, Clone, Default)]
pub struct StreetTransitLink;

impl StreetTransitLink {
    /// Seconds and weight to cross a link.
    pub const TRAVERSE_COST: i64 = 1;
}

impl Traversable for StreetTransitLink {
    fn traverse(&self, edge: &Edge, s0: &Arc<State>, ctx: &RoutingContext<'_>) -> Successors {
        if !ctx.request.modes.allows_transit() || s0.is_onboard() {
            return Successors::Empty;
        }
        // Cars stay on the street network.
        if s0.data().non_transit_mode == TraverseMode::Car {
            return Successors::Empty;
        }
        if ctx.request.wheelchair_accessible {
            let accessible = [edge.from(), edge.to()]
                .into_iter()
                .filter_map(|v| ctx.graph.vertex(v))
                .all(|v| v.is_wheelchair_accessible());
            if !accessible {
                return Successors::Empty;
            }
        }
        let mut ed = StateEditor::new(s0, edge, ctx);
        ed.increment_time(Self::TRAVERSE_COST);
        ed.increment_weight(Self::TRAVERSE_COST as f64);
        ed.make_state().into()
    }

    fn terminal(&self) -> Terminal {
        Terminal::Link
    }
}

/// A walking transfer between two transit stops.
#[derive(Debug, Clone)]
pub struct TransferEdge {
    pub distance_m: f64,
    /// Transfers never take less than this many seconds.
    pub min_time: i64,
}

impl TransferEdge {
    fn traverse_with(
        &self,
        edge: &Edge,
        s0: &Arc<State>,
        ctx: &RoutingContext<'_>,
        optimistic: bool,
    ) -> Successors {
        let request = &ctx.request;
        if s0.is_onboard() || s0.data().non_transit_mode == TraverseMode::Car {
            return Successors::Empty;
        }
        if !optimistic
            && request
                .max_walk_distance
                .is_some_and(|max| s0.walk_distance() + self.distance_m > max)
        {
            return Successors::Empty;
        }
        let seconds = (self.distance_m / request.walk_speed).max(self.min_time as f64);
        let mut ed = StateEditor::new(s0, edge, ctx);
        ed.increment_time(seconds.ceil() as i64);
        ed.increment_weight(seconds * request.walk_reluctance);
        ed.increment_walk_distance(self.distance_m);
        ed.set_back_mode(TraverseMode::Walk);
        ed.make_state().into()
    }
}

impl Traversable for TransferEdge {
    fn traverse(&self, edge: &Edge, s0: &Arc<State>, ctx: &RoutingContext<'_>) -> Successors {
        self.traverse_with(edge, s0, ctx, false)
    }

    fn optimistic_traverse(
        &self,
        edge: &Edge,
        s0: &Arc<State>,
        ctx: &RoutingContext<'_>,
    ) -> Successors {
        self.traverse_with(edge, s0, ctx, true)
    }

    fn terminal(&self) -> Terminal {
        Terminal::Transfer
    }
}
