//! Entry point for planning against a live graph.

use std::sync::Arc;

use chrono::FixedOffset;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::config::RouterConfig;
use crate::domain::{AlertId, RouteId, TripId, VertexId};
use crate::graph::{EdgeKind, Graph, GraphSummary, VertexKind};
use crate::routing::{
    GraphPath, GraphPathFinder, RoutingContext, RoutingRequest, SearchError, StopDistanceCache,
};
use crate::timetable::TimetableSnapshotSource;

/// A stretch of an itinerary on foot (or bike, or car) or aboard one trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    /// Label of the first vertex.
    pub from: String,
    /// Label of the last vertex.
    pub to: String,
    pub start_time: i64,
    pub end_time: i64,
    /// Set for legs aboard a vehicle.
    pub trip: Option<TripId>,
    /// Metres travelled on streets during the leg.
    pub street_distance: f64,
}

/// One path, resolved against the graph it was found in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Itinerary {
    pub start_time: i64,
    pub end_time: i64,
    pub duration: i64,
    pub weight: f64,
    pub walk_distance: f64,
    pub boardings: u32,
    pub trips: Vec<TripId>,
    pub routes: Vec<RouteId>,
    pub alerts: Vec<AlertId>,
    pub legs: Vec<Leg>,
    pub optimized: bool,
}

/// Answer to one plan request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub itineraries: Vec<Itinerary>,
    /// The search timed out; the itineraries are what was found first.
    pub aborted: bool,
    pub searches: usize,
    pub states_visited: usize,
}

/// Owns a graph and its real-time timetables and answers plan requests
/// against them.
///
/// Cloning is cheap and every clone shares the same graph.
#[derive(Clone)]
pub struct Router {
    graph: Arc<RwLock<Graph>>,
    snapshots: Arc<TimetableSnapshotSource>,
    config: Arc<RouterConfig>,
    stop_distances: StopDistanceCache,
}

impl Router {
    pub fn new(graph: Graph, config: RouterConfig) -> Self {
        let snapshots = TimetableSnapshotSource::new()
            .with_max_snapshot_frequency(config.snapshot_interval())
            .with_purge_expired_data(config.purge_expired_data);
        Self {
            graph: Arc::new(RwLock::new(graph)),
            snapshots: Arc::new(snapshots),
            stop_distances: config.distance_cache(),
            config: Arc::new(config),
        }
    }

    /// The shared graph, for handing to a
    /// [`GraphUpdaterManager`](crate::updater::GraphUpdaterManager).
    pub fn graph(&self) -> &Arc<RwLock<Graph>> {
        &self.graph
    }

    pub fn snapshots(&self) -> &Arc<TimetableSnapshotSource> {
        &self.snapshots
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn time_zone(&self) -> FixedOffset {
        self.graph.read().time_zone()
    }

    pub fn summary(&self) -> GraphSummary {
        self.graph.read().summary()
    }

    /// Find a vertex by its label or, for stops, by stop id.
    pub fn resolve(&self, label: &str) -> Option<VertexId> {
        self.graph.read().vertex_by_label(label)
    }

    /// Plan itineraries for `request`.
    ///
    /// Blocks for the length of the search, holding the graph's read lock
    /// so no writer task runs underneath it. Call from a blocking context.
    pub fn plan(&self, request: RoutingRequest) -> Result<Plan, SearchError> {
        let graph = self.graph.read();
        let snapshot = (!request.ignore_realtime).then(|| self.snapshots.timetable_snapshot());
        let ctx = RoutingContext::new(&graph, request, snapshot)?
            .with_stop_distance_cache(self.stop_distances.clone());
        let found = GraphPathFinder::new(&ctx).find_paths();
        debug!(
            itineraries = found.paths.len(),
            aborted = found.aborted,
            "plan finished"
        );
        Ok(Plan {
            itineraries: found
                .paths
                .iter()
                .map(|p| itinerary(&graph, p))
                .collect(),
            aborted: found.aborted,
            searches: found.searches,
            states_visited: found.states_visited,
        })
    }
}

fn itinerary(graph: &Graph, path: &GraphPath) -> Itinerary {
    Itinerary {
        start_time: path.start_time(),
        end_time: path.end_time(),
        duration: path.duration(),
        weight: path.search_weight(),
        walk_distance: path.walk_distance(),
        boardings: path.num_boardings(),
        trips: path.trips(),
        routes: path.routes(),
        alerts: path.alerts().into_iter().collect(),
        legs: legs(graph, path),
        optimized: path.is_optimized(),
    }
}

fn on_vehicle(graph: &Graph, v: VertexId) -> bool {
    graph.vertex(v).is_some_and(|v| {
        matches!(
            v.kind(),
            VertexKind::PatternDepart { .. } | VertexKind::PatternArrive { .. }
        )
    })
}

fn label(graph: &Graph, v: VertexId) -> String {
    graph
        .vertex(v)
        .map_or_else(|| v.to_string(), |v| v.label().to_string())
}

/// Split a path into runs of street edges and runs of edges touching
/// pattern vertices. Each transit run starts and ends at a stop.
fn legs(graph: &Graph, path: &GraphPath) -> Vec<Leg> {
    let states = path.states();
    let mut legs = Vec::new();
    let mut start = 0;
    while start < path.edges().len() {
        let transit = |i: usize| {
            path.edges()
                .get(i)
                .and_then(|e| graph.edge(*e))
                .is_some_and(|e| on_vehicle(graph, e.from()) || on_vehicle(graph, e.to()))
        };
        let kind = transit(start);
        let mut end = start;
        while end + 1 < path.edges().len() && transit(end + 1) == kind {
            end += 1;
        }

        let run = &states[start..=end + 1];
        let street_distance: f64 = path.edges()[start..=end]
            .iter()
            .filter_map(|e| graph.edge(*e))
            .filter_map(|e| match e.kind() {
                EdgeKind::Street(street) => Some(street.length_m),
                _ => None,
            })
            .sum();
        // Vehicle times are those seen at the pattern vertices, not the
        // wait at the platform.
        let (first, last) = if kind && run.len() > 2 {
            (&run[1], &run[run.len() - 2])
        } else {
            (&run[0], &run[run.len() - 1])
        };
        legs.push(Leg {
            from: label(graph, run[0].vertex()),
            to: label(graph, run[run.len() - 1].vertex()),
            start_time: first.time(),
            end_time: last.time(),
            trip: if kind {
                run.iter().find_map(|s| s.trip().cloned())
            } else {
                None
            },
            street_distance,
        });
        start = end + 1;
    }
    legs
}
