//! Shortest-path trees.
//!
//! A tree holds the states a search has kept for each vertex. [`add`]
//! decides whether a freshly built state is worth keeping; [`visit`]
//! decides whether a state popped from the queue is still current and
//! should be expanded.
//!
//! [`add`]: ShortestPathTree::add
//! [`visit`]: ShortestPathTree::visit

mod basic;
mod dominance;
mod multi;

use std::sync::Arc;

pub use basic::BasicShortestPathTree;
pub use dominance::{Criterion, DominanceFunction};
pub use multi::MultiShortestPathTree;

use crate::domain::VertexId;

use super::{GraphPath, RoutingContext, SptKind, State};

/// The states kept by a search, keyed by vertex.
pub trait ShortestPathTree {
    /// Offer a new state. Returns true if it was kept and should be queued.
    fn add(&mut self, state: Arc<State>) -> bool;

    /// Returns true if a state popped from the queue should be expanded.
    fn visit(&mut self, state: &Arc<State>) -> bool;

    /// The states kept at `vertex`, in no particular order.
    fn states(&self, vertex: VertexId) -> &[Arc<State>];

    /// The vertices with at least one kept state.
    fn vertices(&self) -> Vec<VertexId>;

    /// The lowest-weight state kept at `vertex`.
    fn state(&self, vertex: VertexId) -> Option<&Arc<State>> {
        self.states(vertex)
            .iter()
            .min_by(|a, b| a.weight().total_cmp(&b.weight()))
    }

    /// Paths to every final state kept at `vertex`, lowest weight first.
    fn paths(&self, vertex: VertexId, optimize: bool, ctx: &RoutingContext<'_>) -> Vec<GraphPath> {
        let mut paths: Vec<GraphPath> = self
            .states(vertex)
            .iter()
            .filter(|s| s.is_final())
            .map(|s| GraphPath::new(Arc::clone(s), optimize, ctx))
            .collect();
        paths.sort_by(|a, b| a.weight().total_cmp(&b.weight()));
        paths
    }

    fn vertex_count(&self) -> usize {
        self.vertices().len()
    }
}

/// An empty tree of the kind the request asks for.
pub fn new_tree(kind: &SptKind) -> Box<dyn ShortestPathTree> {
    match kind {
        SptKind::Basic => Box::new(BasicShortestPathTree::new()),
        SptKind::Multi(dominance) => Box::new(MultiShortestPathTree::new(dominance.clone())),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::domain::TraverseMode;
    use crate::routing::StateData;

    /// A bare off-board state at `vertex`, `elapsed` seconds into a search.
    pub(crate) fn state_at(vertex: u32, weight: f64, elapsed: i64, boardings: u32) -> State {
        State {
            vertex: VertexId(vertex),
            time: elapsed,
            weight,
            walk_distance: 0.0,
            back_state: None,
            back_edge: None,
            back_edge_restricted: false,
            parser_states: Vec::new(),
            data: Arc::new(StateData {
                arrive_by: false,
                start_time: 0,
                non_transit_mode: TraverseMode::Walk,
                back_mode: None,
                trip: None,
                trip_times: None,
                service_day: None,
                pattern: None,
                route: None,
                num_boardings: boardings,
                ever_boarded: boardings > 0,
                last_alighted_time: None,
                initial_wait: 0,
                route_sequence: Vec::new(),
                alerts: BTreeSet::new(),
            }),
        }
    }

    pub(crate) fn state_with(weight: f64, elapsed: i64, boardings: u32) -> State {
        state_at(0, weight, elapsed, boardings)
    }

    #[test]
    fn factory_follows_request() {
        let mut basic = new_tree(&SptKind::Basic);
        assert!(basic.add(Arc::new(state_with(1.0, 0, 0))));
        assert!(!basic.add(Arc::new(state_with(1.0, 5, 1))));

        let pareto = DominanceFunction::new(vec![Criterion::Time, Criterion::Boardings]);
        let mut multi = new_tree(&SptKind::Multi(pareto));
        assert!(multi.add(Arc::new(state_with(1.0, 100, 0))));
        assert!(multi.add(Arc::new(state_with(1.0, 80, 1))));
        assert_eq!(multi.states(VertexId(0)).len(), 2);
        assert_eq!(multi.vertex_count(), 1);
    }
}
