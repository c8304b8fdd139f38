//! Directed edges and the traversal contract.

use std::sync::Arc;

use super::edges::{
    FrequencyBoard, PatternDwell, PatternHop, StreetEdge, StreetTransitLink, TransferEdge,
    TransitBoardAlight,
};
use crate::domain::{EdgeId, VertexId};
use crate::routing::{RoutingContext, State, Terminal};

/// Traversal semantics of one edge kind.
///
/// Implementations build successor states through a
/// [`StateEditor`](crate::routing::StateEditor) and return an empty
/// [`Successors`] when the edge cannot be used from `s0`.
pub trait Traversable {
    fn traverse(&self, edge: &Edge, s0: &Arc<State>, ctx: &RoutingContext<'_>) -> Successors;

    /// A relaxed traversal for lower-bound searches. Never produces a
    /// weight greater than [`Traversable::traverse`] would.
    fn optimistic_traverse(
        &self,
        edge: &Edge,
        s0: &Arc<State>,
        ctx: &RoutingContext<'_>,
    ) -> Successors {
        self.traverse(edge, s0, ctx)
    }

    /// How path parsers see this edge when it is crossed forward in time.
    fn terminal(&self) -> Terminal;

    fn has_explicit_turn_restrictions(&self) -> bool {
        false
    }
}

/// The closed set of edge kinds.
#[derive(Debug, Clone)]
pub enum EdgeKind {
    Street(StreetEdge),
    StreetTransitLink(StreetTransitLink),
    Transfer(TransferEdge),
    BoardAlight(TransitBoardAlight),
    FrequencyBoard(FrequencyBoard),
    Hop(PatternHop),
    Dwell(PatternDwell),
}

/// A directed arc between two vertices of the graph.
#[derive(Debug, Clone)]
pub struct Edge {
    id: EdgeId,
    from: VertexId,
    to: VertexId,
    kind: EdgeKind,
}

impl Edge {
    pub(super) fn new(id: EdgeId, from: VertexId, to: VertexId, kind: EdgeKind) -> Self {
        Self { id, from, to, kind }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn from(&self) -> VertexId {
        self.from
    }

    pub fn to(&self) -> VertexId {
        self.to
    }

    pub fn kind(&self) -> &EdgeKind {
        &self.kind
    }

    pub(super) fn kind_mut(&mut self) -> &mut EdgeKind {
        &mut self.kind
    }

    fn traversable(&self) -> &dyn Traversable {
        match &self.kind {
            EdgeKind::Street(e) => e,
            EdgeKind::StreetTransitLink(e) => e,
            EdgeKind::Transfer(e) => e,
            EdgeKind::BoardAlight(e) => e,
            EdgeKind::FrequencyBoard(e) => e,
            EdgeKind::Hop(e) => e,
            EdgeKind::Dwell(e) => e,
        }
    }

    /// Every successor state reachable by crossing this edge from `s0`.
    pub fn traverse(&self, s0: &Arc<State>, ctx: &RoutingContext<'_>) -> Successors {
        self.traversable().traverse(self, s0, ctx)
    }

    pub fn optimistic_traverse(&self, s0: &Arc<State>, ctx: &RoutingContext<'_>) -> Successors {
        self.traversable().optimistic_traverse(self, s0, ctx)
    }

    /// The path-parser terminal for this edge. Crossing an edge backward in
    /// an arrive-by search swaps boarding and alighting.
    pub fn terminal(&self, arrive_by: bool) -> Terminal {
        let terminal = self.traversable().terminal();
        if arrive_by {
            terminal.reversed()
        } else {
            terminal
        }
    }

    pub fn has_explicit_turn_restrictions(&self) -> bool {
        self.traversable().has_explicit_turn_restrictions()
    }

    pub fn as_street(&self) -> Option<&StreetEdge> {
        match &self.kind {
            EdgeKind::Street(e) => Some(e),
            _ => None,
        }
    }
}

/// The successor states produced by one traversal: none, one, or a short
/// bounded run of alternatives.
#[derive(Debug, Default)]
pub enum Successors {
    #[default]
    Empty,
    One(State),
    Many(std::vec::IntoIter<State>),
}

impl Successors {
    pub fn is_empty(&self) -> bool {
        match self {
            Successors::Empty => true,
            Successors::One(_) => false,
            Successors::Many(it) => it.len() == 0,
        }
    }
}

impl Iterator for Successors {
    type Item = State;

    fn next(&mut self) -> Option<State> {
        match std::mem::take(self) {
            Successors::Empty => None,
            Successors::One(state) => Some(state),
            Successors::Many(mut rest) => {
                let next = rest.next();
                *self = Successors::Many(rest);
                next
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Successors::Empty => (0, Some(0)),
            Successors::One(_) => (1, Some(1)),
            Successors::Many(it) => it.size_hint(),
        }
    }
}

impl From<Option<State>> for Successors {
    fn from(state: Option<State>) -> Self {
        match state {
            Some(s) => Successors::One(s),
            None => Successors::Empty,
        }
    }
}

impl FromIterator<State> for Successors {
    fn from_iter<I: IntoIterator<Item = State>>(iter: I) -> Self {
        let mut states: Vec<State> = iter.into_iter().collect();
        match states.len() {
            0 => Successors::Empty,
            1 => states.pop().map_or(Successors::Empty, Successors::One),
            _ => Successors::Many(states.into_iter()),
        }
    }
}
