//! Street segments.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{EdgeId, TraverseMode, TraverseModeSet};
use crate::graph::{Edge, Successors, Traversable};
use crate::routing::{RoutingContext, State, StateEditor, Terminal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRestrictionKind {
    /// Turning onto the named edge is forbidden.
    No,
    /// The named edges are the only ones that may follow.
    Only,
}

/// A restriction on which edge may follow a street edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnRestriction {
    pub kind: TurnRestrictionKind,
    pub to: EdgeId,
}

/// A directed piece of street.
#[derive(Debug, Clone)]
pub struct StreetEdge {
    pub name: String,
    pub length_m: f64,
    pub permission: TraverseModeSet,
    pub wheelchair_accessible: bool,
    pub turn_restrictions: Vec<TurnRestriction>,
}

impl StreetEdge {
    pub fn new(name: impl Into<String>, length_m: f64, permission: TraverseModeSet) -> Self {
        Self {
            name: name.into(),
            length_m,
            permission,
            wheelchair_accessible: true,
            turn_restrictions: Vec::new(),
        }
    }

    /// Returns true if a traveler on this edge may continue onto `next`.
    pub fn can_turn_onto(&self, next: EdgeId) -> bool {
        let mut only = self
            .turn_restrictions
            .iter()
            .filter(|r| r.kind == TurnRestrictionKind::Only)
            .peekable();
        let forbidden = self
            .turn_restrictions
            .iter()
            .any(|r| r.kind == TurnRestrictionKind::No && r.to == next);
        !forbidden && (only.peek().is_none() || only.any(|r| r.to == next))
    }

    /// Checks the turn between this edge and the state's back edge, in
    /// travel order.
    fn turn_allowed(&self, edge: &Edge, s0: &State, ctx: &RoutingContext<'_>) -> bool {
        let Some(back) = s0.back_edge().and_then(|id| ctx.graph.edge(id)) else {
            return true;
        };
        if ctx.arrive_by() {
            self.can_turn_onto(back.id())
        } else {
            back.as_street().is_none_or(|street| street.can_turn_onto(edge.id()))
        }
    }

    fn traverse_with(
        &self,
        edge: &Edge,
        s0: &Arc<State>,
        ctx: &RoutingContext<'_>,
        optimistic: bool,
    ) -> Successors {
        let request = &ctx.request;
        let mode = s0.data().non_transit_mode;
        if s0.is_onboard() || !self.permission.contains(mode) {
            return Successors::Empty;
        }
        if request.wheelchair_accessible && !self.wheelchair_accessible {
            return Successors::Empty;
        }
        if !optimistic && !self.turn_allowed(edge, s0, ctx) {
            return Successors::Empty;
        }

        let seconds = self.length_m / request.speed(mode);
        let mut weight = seconds * request.street_reluctance(mode);
        let mut ed = StateEditor::new(s0, edge, ctx);
        if mode != TraverseMode::Car {
            let before = s0.walk_distance();
            let after = before + self.length_m;
            if !optimistic {
                if request.max_walk_distance.is_some_and(|max| after > max) {
                    return Successors::Empty;
                }
                if let Some(limit) = request.soft_walk_limit.filter(|l| after > *l) {
                    if before <= limit {
                        weight += request.soft_walk_penalty;
                    }
                    weight += request.soft_walk_overage_rate * (after - before.max(limit));
                }
            }
            ed.increment_walk_distance(self.length_m);
        }
        ed.increment_time(seconds.ceil() as i64);
        ed.increment_weight(weight);
        ed.set_back_mode(mode);
        ed.make_state().into()
    }
}

impl Traversable for StreetEdge {
    fn traverse(&self, edge: &Edge, s0: &Arc<State>, ctx: &RoutingContext<'_>) -> Successors {
        self.traverse_with(edge, s0, ctx, false)
    }

    /// Ignores turn restrictions and walk limits.
    fn optimistic_traverse(
        &self,
        edge: &Edge,
        s0: &Arc<State>,
        ctx: &RoutingContext<'_>,
    ) -> Successors {
        self.traverse_with(edge, s0, ctx, true)
    }

    fn terminal(&self) -> Terminal {
        Terminal::Street
    }

    fn has_explicit_turn_restrictions(&self) -> bool {
        !self.turn_restrictions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn street() -> StreetEdge {
        StreetEdge::new("Main St", 100.0, TraverseModeSet::walk_only())
    }

    #[test]
    fn unrestricted_turns_are_allowed() {
        assert!(street().can_turn_onto(EdgeId(3)));
    }

    #[test]
    fn no_turn_forbids_one_edge() {
        let mut s = street();
        s.turn_restrictions.push(TurnRestriction {
            kind: TurnRestrictionKind::No,
            to: EdgeId(3),
        });
        assert!(!s.can_turn_onto(EdgeId(3)));
        assert!(s.can_turn_onto(EdgeId(4)));
    }

    #[test]
    fn only_turn_forbids_the_rest() {
        let mut s = street();
        s.turn_restrictions.push(TurnRestriction {
            kind: TurnRestrictionKind::Only,
            to: EdgeId(5),
        });
        assert!(s.can_turn_onto(EdgeId(5)));
        assert!(!s.can_turn_onto(EdgeId(6)));
        assert!(s.has_explicit_turn_restrictions());
    }
}
