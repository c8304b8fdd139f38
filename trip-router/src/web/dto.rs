//! Data transfer objects for web requests and responses.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::config::RouterConfig;
use crate::domain::{RouteId, TraverseModeSet, VertexId};
use crate::router::{Itinerary, Leg, Plan};
use crate::routing::{HeuristicKind, OptimizeType, RoutingRequest};

/// Request to plan a trip.
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    /// Origin vertex label or stop id
    pub from: String,

    /// Destination vertex label or stop id
    pub to: String,

    /// Departure time, or arrival time when `arrive_by` is set (RFC 3339)
    pub time: DateTime<FixedOffset>,

    #[serde(default)]
    pub arrive_by: bool,

    /// Allowed modes, e.g. ["WALK", "BUS"] (defaults to walk and transit)
    pub modes: Option<TraverseModeSet>,

    /// Hard walking limit in metres
    pub max_walk_distance: Option<f64>,

    /// Walking speed in metres per second
    pub walk_speed: Option<f64>,

    pub num_itineraries: Option<usize>,

    #[serde(default)]
    pub wheelchair: bool,

    #[serde(default)]
    pub banned_routes: Vec<RouteId>,

    #[serde(default)]
    pub optimize: OptimizeType,

    pub heuristic: Option<HeuristicKind>,

    /// Search timeout in milliseconds (defaults to the router's)
    pub timeout_ms: Option<u64>,

    /// Plan on the published schedule only
    #[serde(default)]
    pub ignore_realtime: bool,
}

impl PlanRequest {
    /// Build a routing request between the resolved endpoints.
    pub fn into_request(self, from: VertexId, to: VertexId, config: &RouterConfig) -> RoutingRequest {
        let mut request = RoutingRequest::new(from, to, self.time.timestamp());
        request.num_itineraries = config.num_itineraries;
        config.apply_defaults(&mut request);

        request.arrive_by = self.arrive_by;
        if let Some(modes) = self.modes {
            request.modes = modes;
        }
        request.max_walk_distance = self.max_walk_distance;
        if let Some(speed) = self.walk_speed {
            request.walk_speed = speed;
        }
        if let Some(n) = self.num_itineraries {
            request.num_itineraries = n;
        }
        request.wheelchair_accessible = self.wheelchair;
        request.banned_routes = self.banned_routes.into_iter().collect();
        request.optimize = self.optimize;
        if let Some(heuristic) = self.heuristic {
            request.heuristic = heuristic;
        }
        if let Some(ms) = self.timeout_ms {
            request.timeout = Some(std::time::Duration::from_millis(ms));
        }
        request.ignore_realtime = self.ignore_realtime;
        request
    }
}

/// A leg of an itinerary.
#[derive(Debug, Serialize)]
pub struct LegResult {
    pub from: String,
    pub to: String,

    /// Start of the leg (RFC 3339, network local time)
    pub departure: String,

    /// End of the leg (RFC 3339, network local time)
    pub arrival: String,

    /// Trip ridden, absent for street legs
    pub trip: Option<String>,

    /// Metres travelled on streets
    pub distance: f64,
}

/// An itinerary in plan results.
#[derive(Debug, Serialize)]
pub struct ItineraryResult {
    pub departure: String,
    pub arrival: String,
    pub duration_secs: i64,

    /// Generalized cost the search minimized
    pub weight: f64,

    pub walk_distance: f64,
    pub boardings: u32,
    pub routes: Vec<String>,
    pub alerts: Vec<String>,
    pub legs: Vec<LegResult>,
}

/// Response for trip planning.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    /// Itineraries, best first
    pub itineraries: Vec<ItineraryResult>,

    /// The search timed out before finishing
    pub aborted: bool,

    /// Number of states the searches expanded
    pub states_visited: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

impl LegResult {
    pub fn from_leg(leg: &Leg, tz: FixedOffset) -> Self {
        Self {
            from: leg.from.clone(),
            to: leg.to.clone(),
            departure: format_time(leg.start_time, tz),
            arrival: format_time(leg.end_time, tz),
            trip: leg.trip.as_ref().map(|t| t.to_string()),
            distance: leg.street_distance,
        }
    }
}

impl ItineraryResult {
    pub fn from_itinerary(itinerary: &Itinerary, tz: FixedOffset) -> Self {
        Self {
            departure: format_time(itinerary.start_time, tz),
            arrival: format_time(itinerary.end_time, tz),
            duration_secs: itinerary.duration,
            weight: itinerary.weight,
            walk_distance: itinerary.walk_distance,
            boardings: itinerary.boardings,
            routes: itinerary.routes.iter().map(|r| r.to_string()).collect(),
            alerts: itinerary.alerts.iter().map(|a| a.to_string()).collect(),
            legs: itinerary
                .legs
                .iter()
                .map(|l| LegResult::from_leg(l, tz))
                .collect(),
        }
    }
}

impl PlanResponse {
    pub fn from_plan(plan: &Plan, tz: FixedOffset) -> Self {
        Self {
            itineraries: plan
                .itineraries
                .iter()
                .map(|i| ItineraryResult::from_itinerary(i, tz))
                .collect(),
            aborted: plan.aborted,
            states_visited: plan.states_visited,
        }
    }
}

fn format_time(epoch: i64, tz: FixedOffset) -> String {
    DateTime::from_timestamp(epoch, 0)
        .map(|t| t.with_timezone(&tz).to_rfc3339())
        .unwrap_or_else(|| epoch.to_string())
}
