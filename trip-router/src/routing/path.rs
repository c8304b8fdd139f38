//! Paths read back out of a search tree.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{AlertId, EdgeId, RouteId, TripId, VertexId};

use super::{RoutingContext, State};

/// A path through the graph in chronological order, whichever direction
/// the search ran.
#[derive(Debug, Clone)]
pub struct GraphPath {
    states: Vec<Arc<State>>,
    edges: Vec<EdgeId>,
    optimized: bool,
    search_weight: f64,
}

impl GraphPath {
    /// Walk back from `last` to the search origin.
    ///
    /// With `optimize` set, a path that rides transit is re-traversed in the
    /// opposite direction starting from its far end, which pulls the
    /// departure as late as the vehicles allow and drops idle waiting. If
    /// any edge fails to re-traverse, the path is kept as found.
    pub fn new(last: Arc<State>, optimize: bool, ctx: &RoutingContext<'_>) -> Self {
        let path = Self::from_state(Arc::clone(&last));
        if !optimize || last.num_boardings() == 0 {
            return path;
        }
        match reverse_optimize(&last, &path.search_order_edges(), ctx) {
            Some(optimized) if optimized.vertex() == path.search_origin() => {
                let mut optimized = Self::from_state(optimized);
                optimized.optimized = true;
                optimized.search_weight = path.search_weight;
                optimized
            }
            _ => {
                debug!("reverse optimization failed; keeping path as found");
                path
            }
        }
    }

    fn from_state(last: Arc<State>) -> Self {
        let arrive_by = last.arrive_by();
        let mut states: Vec<Arc<State>> = Vec::new();
        let mut cursor = Some(last);
        while let Some(s) = cursor {
            cursor = s.back_state().cloned();
            states.push(s);
        }
        // The back chain runs from the last state searched to the first.
        // Depart-after searches found the path forward in time.
        if !arrive_by {
            states.reverse();
        }
        let edges = if arrive_by {
            states.iter().filter_map(|s| s.back_edge()).collect()
        } else {
            states.iter().skip(1).filter_map(|s| s.back_edge()).collect()
        };
        let search_weight = if arrive_by {
            states.first()
        } else {
            states.last()
        }
        .map_or(0.0, |s| s.weight());
        Self {
            states,
            edges,
            optimized: false,
            search_weight,
        }
    }

    /// Edges in the order the search crossed them.
    fn search_order_edges(&self) -> Vec<EdgeId> {
        let mut edges = self.edges.clone();
        if self.arrive_by() {
            edges.reverse();
        }
        edges
    }

    fn search_origin(&self) -> VertexId {
        let first = if self.arrive_by() {
            self.states.last()
        } else {
            self.states.first()
        };
        first.map_or(VertexId(0), |s| s.vertex())
    }

    fn arrive_by(&self) -> bool {
        self.states.first().is_some_and(|s| s.arrive_by())
    }

    /// States in chronological order.
    pub fn states(&self) -> &[Arc<State>] {
        &self.states
    }

    /// Edges in chronological order.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.states.iter().map(|s| s.vertex())
    }

    /// The state the search ended in, which carries the path's totals.
    fn last_searched(&self) -> Option<&Arc<State>> {
        if self.arrive_by() {
            self.states.first()
        } else {
            self.states.last()
        }
    }

    pub fn start_time(&self) -> i64 {
        self.states.first().map_or(0, |s| s.time())
    }

    pub fn end_time(&self) -> i64 {
        self.states.last().map_or(0, |s| s.time())
    }

    /// Seconds from start to end.
    pub fn duration(&self) -> i64 {
        self.end_time() - self.start_time()
    }

    /// Weight of the path as it now stands. After reverse optimization
    /// this is the cost of the re-traversal.
    pub fn weight(&self) -> f64 {
        self.last_searched().map_or(0.0, |s| s.weight())
    }

    /// Weight of the target state the search found. Unlike [`weight`]
    /// it does not change with reverse optimization, so paths are ranked
    /// on it.
    ///
    /// [`weight`]: Self::weight
    pub fn search_weight(&self) -> f64 {
        self.search_weight
    }

    pub fn walk_distance(&self) -> f64 {
        self.last_searched().map_or(0.0, |s| s.walk_distance())
    }

    pub fn num_boardings(&self) -> u32 {
        self.last_searched().map_or(0, |s| s.num_boardings())
    }

    /// Returns true if the path was reverse-optimized.
    pub fn is_optimized(&self) -> bool {
        self.optimized
    }

    /// Trips ridden, in chronological order.
    pub fn trips(&self) -> Vec<TripId> {
        let mut trips: Vec<TripId> = Vec::new();
        for trip in self.states.iter().filter_map(|s| s.trip()) {
            if trips.last() != Some(trip) {
                trips.push(trip.clone());
            }
        }
        trips
    }

    /// Routes boarded, in chronological order.
    pub fn routes(&self) -> Vec<RouteId> {
        let Some(last) = self.last_searched() else {
            return Vec::new();
        };
        let mut routes = last.data().route_sequence.clone();
        if self.arrive_by() {
            routes.reverse();
        }
        routes
    }

    /// Every alert attached to an edge of the path.
    pub fn alerts(&self) -> BTreeSet<AlertId> {
        self.last_searched()
            .map(|s| s.data().alerts.clone())
            .unwrap_or_default()
    }

    /// Returns true if the path crosses the same edges on the same trips
    /// as `other`.
    pub fn same_route_as(&self, other: &GraphPath) -> bool {
        self.edges == other.edges && self.trips() == other.trips()
    }
}

/// Re-traverse `edges`, given in search order, backward from `last`.
fn reverse_optimize(
    last: &State,
    edges: &[EdgeId],
    ctx: &RoutingContext<'_>,
) -> Option<Arc<State>> {
    let reversed = ctx.reversed();
    let mut state = Arc::new(State::at(last.vertex(), last.time(), &reversed));
    for id in edges.iter().rev() {
        let edge = ctx.graph.edge(*id)?;
        let next = edge
            .traverse(&state, &reversed)
            .min_by(|a, b| a.weight().total_cmp(&b.weight()))?;
        state = Arc::new(next);
    }
    Some(state)
}
