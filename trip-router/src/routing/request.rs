//! Routing request options.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{RouteId, TraverseMode, TraverseModeSet, TripId, VertexId};

use super::SearchError;
use super::spt::DominanceFunction;

/// Which shortest-path tree a search keeps.
#[derive(Debug, Clone, PartialEq)]
pub enum SptKind {
    /// One state per vertex, the lowest weight.
    Basic,
    /// A Pareto set of states per vertex under the given criteria.
    Multi(DominanceFunction),
}

/// Which remaining-weight heuristic guides A*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    /// Straight-line distance at optimistic speeds.
    #[default]
    Euclidean,
    /// A reverse lower-bound search from the target, run incrementally.
    LowerBound,
    /// Always zero; A* degrades to Dijkstra.
    Trivial,
}

/// What the search optimizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeType {
    /// Generalized cost as configured.
    #[default]
    Quick,
    /// Like `Quick`, with a heavy extra penalty on every transfer.
    Transfers,
}

/// Options for one routing request.
///
/// Read-only for the duration of a search. Times are epoch seconds,
/// distances metres, speeds metres per second and weights generalized
/// seconds.
#[derive(Debug, Clone)]
pub struct RoutingRequest {
    pub from: VertexId,
    /// Required unless `batch` is set.
    pub to: Option<VertexId>,
    pub date_time: i64,
    /// Search backward from `to`, arriving no later than `date_time`.
    pub arrive_by: bool,
    pub modes: TraverseModeSet,

    /// Hard limit on walking per itinerary.
    pub max_walk_distance: Option<f64>,
    /// Walking beyond this distance is penalized but allowed.
    pub soft_walk_limit: Option<f64>,
    /// Added once when the soft walk limit is first exceeded.
    pub soft_walk_penalty: f64,
    /// Added per metre walked beyond the soft limit.
    pub soft_walk_overage_rate: f64,

    pub walk_speed: f64,
    pub bike_speed: f64,
    pub car_speed: f64,
    pub walk_reluctance: f64,
    pub wait_reluctance: f64,
    /// Scales `wait_reluctance` for the wait before the first boarding.
    pub wait_at_beginning_factor: f64,
    pub board_cost: f64,
    pub transfer_penalty: f64,
    /// Minimum seconds between alighting and boarding the next vehicle.
    pub min_transfer_time: i64,
    pub max_transfers: u32,
    pub num_itineraries: usize,

    pub wheelchair_accessible: bool,
    pub banned_routes: HashSet<RouteId>,
    pub banned_trips: HashSet<TripId>,
    pub optimize: OptimizeType,
    /// Re-traverse found transit paths backward to remove idle waiting.
    pub reverse_optimize: bool,

    pub heuristic: HeuristicKind,
    pub heuristic_weight: f64,
    /// Upper bound on transit vehicle speed used by the heuristics.
    pub max_transit_speed: f64,
    /// Upper bound on street speed used by the heuristics. Derived from
    /// the allowed modes when unset.
    pub street_speed_upper_bound: Option<f64>,

    pub max_weight: f64,
    /// No state later than this (earlier, when arriving by) is kept.
    pub worst_time: Option<i64>,
    pub timeout: Option<Duration>,
    /// Stop once popped weights exceed this multiple of the best found.
    pub oversearch_multiplier: f64,
    /// One-to-many search with no fixed target.
    pub batch: bool,
    pub spt: SptKind,
    pub ignore_realtime: bool,
}

impl RoutingRequest {
    /// Extra weight per transfer when optimizing for fewer transfers.
    pub const TRANSFERS_PENALTY: f64 = 1800.0;

    /// A point-to-point request with default options.
    ///
    /// # Examples
    ///
    /// ```
    /// use trip_router::domain::VertexId;
    /// use trip_router::routing::RoutingRequest;
    ///
    /// let request = RoutingRequest::new(VertexId(0), VertexId(7), 1_710_489_600);
    /// assert_eq!(request.oversearch_multiplier, 4.0);
    /// assert!(request.validate().is_ok());
    /// ```
    pub fn new(from: VertexId, to: VertexId, date_time: i64) -> Self {
        Self {
            to: Some(to),
            ..Self::base(from, date_time)
        }
    }

    /// A one-to-many request from `from` with no target.
    pub fn batch(from: VertexId, date_time: i64) -> Self {
        Self {
            batch: true,
            heuristic: HeuristicKind::Trivial,
            ..Self::base(from, date_time)
        }
    }

    fn base(from: VertexId, date_time: i64) -> Self {
        Self {
            from,
            to: None,
            date_time,
            arrive_by: false,
            modes: TraverseModeSet::walk_and_transit(),
            max_walk_distance: None,
            soft_walk_limit: None,
            soft_walk_penalty: 60.0,
            soft_walk_overage_rate: 5.0,
            walk_speed: 1.33,
            bike_speed: 5.0,
            car_speed: 15.0,
            walk_reluctance: 2.0,
            wait_reluctance: 1.0,
            wait_at_beginning_factor: 0.4,
            board_cost: 600.0,
            transfer_penalty: 0.0,
            min_transfer_time: 0,
            max_transfers: 4,
            num_itineraries: 3,
            wheelchair_accessible: false,
            banned_routes: HashSet::new(),
            banned_trips: HashSet::new(),
            optimize: OptimizeType::Quick,
            reverse_optimize: true,
            heuristic: HeuristicKind::Euclidean,
            heuristic_weight: 1.0,
            max_transit_speed: 40.0,
            street_speed_upper_bound: None,
            max_weight: f64::INFINITY,
            worst_time: None,
            timeout: None,
            oversearch_multiplier: 4.0,
            batch: false,
            spt: SptKind::Multi(DominanceFunction::minimum_weight()),
            ignore_realtime: false,
        }
    }

    /// Check the options are usable.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !self.batch && self.to.is_none() {
            return Err(SearchError::MissingTarget);
        }
        for (name, speed) in [
            ("walk_speed", self.walk_speed),
            ("bike_speed", self.bike_speed),
            ("car_speed", self.car_speed),
            ("max_transit_speed", self.max_transit_speed),
        ] {
            if !(speed > 0.0) {
                return Err(SearchError::InvalidRequest(format!("{name} must be positive")));
            }
        }
        if self.oversearch_multiplier < 1.0 {
            return Err(SearchError::InvalidRequest(
                "oversearch_multiplier must be at least 1".to_string(),
            ));
        }
        if self.heuristic_weight < 0.0 || self.max_walk_distance.is_some_and(|d| d < 0.0) {
            return Err(SearchError::InvalidRequest(
                "limits and weights must not be negative".to_string(),
            ));
        }
        if self.modes.is_empty() {
            return Err(SearchError::InvalidRequest("no modes allowed".to_string()));
        }
        Ok(())
    }

    /// Travel speed in `mode`, in metres per second.
    pub fn speed(&self, mode: TraverseMode) -> f64 {
        match mode {
            TraverseMode::Walk => self.walk_speed,
            TraverseMode::Bicycle => self.bike_speed,
            TraverseMode::Car => self.car_speed,
            _ => self.max_transit_speed,
        }
    }

    /// Weight per second spent moving along streets in `mode`.
    pub fn street_reluctance(&self, mode: TraverseMode) -> f64 {
        match mode {
            TraverseMode::Walk => self.walk_reluctance,
            _ => 1.0,
        }
    }

    /// The fastest any allowed street mode can go.
    pub fn street_speed_bound(&self) -> f64 {
        self.street_speed_upper_bound.unwrap_or_else(|| {
            self.modes
                .iter()
                .filter(|m| m.is_street())
                .map(|m| self.speed(m))
                .fold(self.walk_speed, f64::max)
        })
    }

    /// The lowest street reluctance any allowed mode has.
    pub fn min_street_reluctance(&self) -> f64 {
        self.walk_reluctance.min(1.0)
    }

    /// Weight added for each boarding after the first.
    pub fn effective_transfer_penalty(&self) -> f64 {
        match self.optimize {
            OptimizeType::Quick => self.transfer_penalty,
            OptimizeType::Transfers => self.transfer_penalty + Self::TRANSFERS_PENALTY,
        }
    }

    /// The same request searching in the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            arrive_by: !self.arrive_by,
            ..self.clone()
        }
    }
}
