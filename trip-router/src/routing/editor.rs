//! Building successor states.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::domain::{PatternId, RouteId, ServiceDay, TraverseMode};
use crate::graph::Edge;
use crate::timetable::TripTimes;

use super::{RoutingContext, State, StateData};

/// Builds the state reached by crossing one edge from one parent state.
///
/// The editor infers the direction of traversal from which endpoint of the
/// edge the parent sits on. Increments must be non-negative; time moves
/// forward in depart-after searches and backward in arrive-by searches.
/// Any violation, or an active patch blocking the edge, makes
/// [`StateEditor::make_state`] return `None`.
///
/// Field setters clone the shared [`StateData`] the first time a value
/// actually changes, and never again for the same editor.
pub struct StateEditor<'a, 'g> {
    parent: &'a Arc<State>,
    edge: &'a Edge,
    ctx: &'a RoutingContext<'g>,
    child: State,
    arrive_by: bool,
    defective: bool,
    blocked: bool,
}

impl<'a, 'g> StateEditor<'a, 'g> {
    pub fn new(parent: &'a Arc<State>, edge: &'a Edge, ctx: &'a RoutingContext<'g>) -> Self {
        let arrive_by = ctx.request.arrive_by;
        let forward_end = (!arrive_by && parent.vertex == edge.from()).then_some(edge.to());
        let backward_end = (arrive_by && parent.vertex == edge.to()).then_some(edge.from());
        let next = forward_end.or(backward_end);
        let defective = next.is_none() || parent.data.arrive_by != arrive_by;
        if defective {
            warn!(
                edge = ?edge.id(),
                vertex = ?parent.vertex,
                arrive_by,
                "edge does not continue the search from this state"
            );
        }

        let mut child = State {
            vertex: next.unwrap_or(parent.vertex),
            time: parent.time,
            weight: parent.weight,
            walk_distance: parent.walk_distance,
            back_state: Some(Arc::clone(parent)),
            back_edge: Some(edge.id()),
            back_edge_restricted: edge.has_explicit_turn_restrictions(),
            parser_states: parent.parser_states.clone(),
            data: Arc::clone(&parent.data),
        };

        let mut blocked = false;
        for patch in ctx.graph.patches(edge.id()) {
            if !patch.is_active(parent.time) {
                continue;
            }
            blocked |= patch.blocks_traversal;
            if !child.data.alerts.contains(&patch.alert) {
                Arc::make_mut(&mut child.data).alerts.insert(patch.alert.clone());
            }
        }

        Self {
            parent,
            edge,
            ctx,
            child,
            arrive_by,
            defective,
            blocked,
        }
    }

    pub fn parent(&self) -> &State {
        self.parent
    }

    pub fn arrive_by(&self) -> bool {
        self.arrive_by
    }

    pub fn time(&self) -> i64 {
        self.child.time
    }

    pub fn weight(&self) -> f64 {
        self.child.weight
    }

    pub fn walk_distance(&self) -> f64 {
        self.child.walk_distance
    }

    /// Advance the clock by `seconds` in the direction of the search.
    pub fn increment_time(&mut self, seconds: i64) {
        if seconds < 0 {
            warn!(seconds, edge = ?self.edge.id(), "negative time increment");
            self.defective = true;
            return;
        }
        self.child.time += if self.arrive_by { -seconds } else { seconds };
    }

    /// Set the clock to an absolute time, such as a vehicle's departure.
    pub fn set_time(&mut self, time: i64) {
        self.child.time = time;
    }

    pub fn increment_weight(&mut self, weight: f64) {
        if !(weight >= 0.0) {
            warn!(weight, edge = ?self.edge.id(), "weight increment is negative or NaN");
            self.defective = true;
            return;
        }
        self.child.weight += weight;
    }

    pub fn increment_walk_distance(&mut self, metres: f64) {
        if !(metres >= 0.0) {
            warn!(metres, edge = ?self.edge.id(), "negative walk distance increment");
            self.defective = true;
            return;
        }
        self.child.walk_distance += metres;
    }

    fn data_mut(&mut self) -> &mut StateData {
        Arc::make_mut(&mut self.child.data)
    }

    pub fn set_non_transit_mode(&mut self, mode: TraverseMode) {
        if self.child.data.non_transit_mode != mode {
            self.data_mut().non_transit_mode = mode;
        }
    }

    pub fn set_back_mode(&mut self, mode: TraverseMode) {
        if self.child.data.back_mode != Some(mode) {
            self.data_mut().back_mode = Some(mode);
        }
    }

    pub fn set_initial_wait(&mut self, seconds: i64) {
        if self.child.data.initial_wait != seconds {
            self.data_mut().initial_wait = seconds;
        }
    }

    /// Step on board a vehicle of `pattern`. `trip` is absent in
    /// lower-bound searches that do not pick a concrete trip.
    pub fn board(
        &mut self,
        pattern: PatternId,
        route: &RouteId,
        mode: TraverseMode,
        trip: Option<(Arc<TripTimes>, ServiceDay)>,
    ) {
        let data = self.data_mut();
        match trip {
            Some((times, day)) => {
                data.trip = Some(times.trip_id().clone());
                data.trip_times = Some(times);
                data.service_day = Some(day);
            }
            None => {
                data.trip = None;
                data.trip_times = None;
                data.service_day = None;
            }
        }
        data.pattern = Some(pattern);
        data.route = Some(route.clone());
        data.num_boardings += 1;
        data.ever_boarded = true;
        data.route_sequence.push(route.clone());
        data.back_mode = Some(mode);
    }

    /// Step off a vehicle, recording when.
    pub fn alight(&mut self, mode: TraverseMode) {
        let time = self.child.time;
        let data = self.data_mut();
        data.trip = None;
        data.trip_times = None;
        data.pattern = None;
        data.route = None;
        data.last_alighted_time = Some(time);
        data.back_mode = Some(mode);
    }

    /// Finish the state. Consumes the editor.
    ///
    /// Returns `None` if the traversal was defective or blocked, if time
    /// moved against the search direction, or if a path parser rejects the
    /// edge.
    pub fn make_state(mut self) -> Option<State> {
        if self.defective {
            return None;
        }
        if self.blocked {
            trace!(edge = ?self.edge.id(), "edge blocked by patch");
            return None;
        }
        let backwards = if self.arrive_by {
            self.child.time > self.parent.time
        } else {
            self.child.time < self.parent.time
        };
        if backwards {
            trace!(
                edge = ?self.edge.id(),
                from = self.parent.time,
                to = self.child.time,
                "time moved against the search direction"
            );
            return None;
        }

        let terminal = self.edge.terminal(self.arrive_by);
        for (i, parser) in self.ctx.path_parsers.iter().enumerate() {
            let current = self.child.parser_states.get(i).copied()?;
            self.child.parser_states[i] = parser.transition(current, terminal)?;
        }
        Some(self.child)
    }
}
