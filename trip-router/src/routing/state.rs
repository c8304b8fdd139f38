//! Search states.
//!
//! A [`State`] records one way of reaching a vertex: when, at what
//! accumulated weight, and by which edge from which predecessor. States
//! are immutable once built. The less frequently changing fields live in
//! a [`StateData`] block shared by reference between a state and its
//! successors until one of them changes a field.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::{
    AlertId, EdgeId, PatternId, RouteId, ServiceDay, TraverseMode, TripId, VertexId,
};
use crate::timetable::TripTimes;

use super::RoutingContext;

/// Fields shared between a state and its successors.
#[derive(Debug, Clone, PartialEq)]
pub struct StateData {
    pub arrive_by: bool,
    /// Time the search started, in epoch seconds.
    pub start_time: i64,
    /// The street mode in use when not on board a vehicle.
    pub non_transit_mode: TraverseMode,
    /// Mode of the edge that produced this state.
    pub back_mode: Option<TraverseMode>,
    pub trip: Option<TripId>,
    pub trip_times: Option<Arc<TripTimes>>,
    pub service_day: Option<ServiceDay>,
    pub pattern: Option<PatternId>,
    pub route: Option<RouteId>,
    pub num_boardings: u32,
    pub ever_boarded: bool,
    /// Time of the last transit edge left, in search order.
    pub last_alighted_time: Option<i64>,
    /// Seconds waited before the first boarding.
    pub initial_wait: i64,
    /// Routes boarded, in search order.
    pub route_sequence: Vec<RouteId>,
    pub alerts: BTreeSet<AlertId>,
}

/// One way of having reached a vertex during a search.
#[derive(Debug, Clone)]
pub struct State {
    pub(super) vertex: VertexId,
    pub(super) time: i64,
    pub(super) weight: f64,
    pub(super) walk_distance: f64,
    pub(super) back_state: Option<Arc<State>>,
    pub(super) back_edge: Option<EdgeId>,
    pub(super) back_edge_restricted: bool,
    pub(super) parser_states: Vec<usize>,
    pub(super) data: Arc<StateData>,
}

impl State {
    /// The initial state of a search in `ctx`, at its origin and request
    /// time.
    pub fn initial(ctx: &RoutingContext<'_>) -> Self {
        Self::at(ctx.origin, ctx.request.date_time, ctx)
    }

    /// An initial state at `vertex` and `time`.
    pub fn at(vertex: VertexId, time: i64, ctx: &RoutingContext<'_>) -> Self {
        Self {
            vertex,
            time,
            weight: 0.0,
            walk_distance: 0.0,
            back_state: None,
            back_edge: None,
            back_edge_restricted: false,
            parser_states: ctx.path_parsers.iter().map(|p| p.initial_state()).collect(),
            data: Arc::new(StateData {
                arrive_by: ctx.request.arrive_by,
                start_time: time,
                non_transit_mode: ctx.request.modes.primary_street_mode(),
                back_mode: None,
                trip: None,
                trip_times: None,
                service_day: None,
                pattern: None,
                route: None,
                num_boardings: 0,
                ever_boarded: false,
                last_alighted_time: None,
                initial_wait: 0,
                route_sequence: Vec::new(),
                alerts: BTreeSet::new(),
            }),
        }
    }

    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    /// Epoch seconds.
    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn walk_distance(&self) -> f64 {
        self.walk_distance
    }

    pub fn back_state(&self) -> Option<&Arc<State>> {
        self.back_state.as_ref()
    }

    pub fn back_edge(&self) -> Option<EdgeId> {
        self.back_edge
    }

    /// Returns true if the edge that produced this state carries explicit
    /// turn restrictions.
    pub fn back_edge_restricted(&self) -> bool {
        self.back_edge_restricted
    }

    pub fn data(&self) -> &StateData {
        &self.data
    }

    /// Returns true if this state shares its data block with `other`.
    pub fn shares_data_with(&self, other: &State) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn arrive_by(&self) -> bool {
        self.data.arrive_by
    }

    /// Seconds since the search started, always non-negative.
    pub fn elapsed_seconds(&self) -> i64 {
        (self.time - self.data.start_time).abs()
    }

    pub fn num_boardings(&self) -> u32 {
        self.data.num_boardings
    }

    pub fn trip(&self) -> Option<&TripId> {
        self.data.trip.as_ref()
    }

    /// Returns true while riding a transit vehicle.
    pub fn is_onboard(&self) -> bool {
        self.data.pattern.is_some()
    }

    /// Returns true if a path may end in this state.
    pub fn is_final(&self) -> bool {
        !self.is_onboard()
    }

    /// Returns true if every path parser of `ctx` is in an accepting state.
    pub fn all_path_parsers_accept(&self, ctx: &RoutingContext<'_>) -> bool {
        ctx.path_parsers
            .iter()
            .zip(&self.parser_states)
            .all(|(p, s)| p.is_accept_state(*s))
    }

    /// This state and its predecessors, back to the search origin.
    pub fn back_chain(&self) -> impl Iterator<Item = &State> {
        std::iter::successors(Some(self), |s| s.back_state.as_deref())
    }
}
