//! Per-search context.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::{DistanceLibrary, PatternId, ServiceDay, VertexId};
use crate::graph::Graph;
use crate::timetable::{Timetable, TimetableSnapshot, TripTimes};

use super::{DfaPathParser, PathParser, RoutingRequest, SearchError};

/// Cache of distances from a vertex to its nearest transit stop, shared
/// across searches.
pub type StopDistanceCache = moka::sync::Cache<VertexId, f64>;

/// Everything a search reads: the graph, the request, the timetable
/// snapshot taken when the search began, and helpers.
///
/// `origin` and `target` are in search order: an arrive-by search starts
/// at the request's destination.
#[derive(Clone)]
pub struct RoutingContext<'g> {
    pub graph: &'g Graph,
    pub request: RoutingRequest,
    pub origin: VertexId,
    pub target: Option<VertexId>,
    pub snapshot: Option<Arc<TimetableSnapshot>>,
    pub service_days: Vec<ServiceDay>,
    pub path_parsers: Vec<Arc<dyn PathParser>>,
    pub distance: DistanceLibrary,
    pub stop_distances: Option<StopDistanceCache>,
}

impl<'g> RoutingContext<'g> {
    /// Set up a search of `graph`.
    ///
    /// `snapshot` is taken once here and used for the whole search. When
    /// the request allows transit the basic board/ride/alight path parser
    /// is installed.
    pub fn new(
        graph: &'g Graph,
        request: RoutingRequest,
        snapshot: Option<Arc<TimetableSnapshot>>,
    ) -> Result<Self, SearchError> {
        request.validate()?;
        for v in std::iter::once(request.from).chain(request.to) {
            if graph.vertex(v).is_none() {
                return Err(SearchError::UnknownVertex(v));
            }
        }
        let (origin, target) = match (request.arrive_by, request.to) {
            (true, Some(to)) => (to, Some(request.from)),
            (_, to) => (request.from, to),
        };
        let service_days =
            ServiceDay::around(request.date_time, graph.time_zone(), graph.calendar());
        let path_parsers: Vec<Arc<dyn PathParser>> = if request.modes.allows_transit() {
            vec![Arc::new(DfaPathParser::basic())]
        } else {
            Vec::new()
        };
        Ok(Self {
            graph,
            request,
            origin,
            target,
            snapshot,
            service_days,
            path_parsers,
            distance: DistanceLibrary::default(),
            stop_distances: None,
        })
    }

    pub fn with_path_parsers(mut self, parsers: Vec<Arc<dyn PathParser>>) -> Self {
        self.path_parsers = parsers;
        self
    }

    pub fn with_stop_distance_cache(mut self, cache: StopDistanceCache) -> Self {
        self.stop_distances = Some(cache);
        self
    }

    pub fn arrive_by(&self) -> bool {
        self.request.arrive_by
    }

    /// The timetable of `pattern` on `date`: the real-time version from the
    /// snapshot if there is one, otherwise the schedule.
    pub fn timetable(&self, pattern: PatternId, date: NaiveDate) -> Option<Arc<Timetable>> {
        if !self.request.ignore_realtime {
            if let Some(tt) = self.snapshot.as_ref().and_then(|s| s.resolve(pattern, date)) {
                return Some(Arc::clone(tt));
            }
        }
        self.graph.pattern(pattern).map(|p| Arc::clone(&p.scheduled))
    }

    /// Returns true if the request lets the rider take this trip.
    pub fn trip_acceptable(&self, times: &TripTimes, with_bike: bool) -> bool {
        let trip = times.trip();
        !self.request.banned_trips.contains(&trip.id)
            && !self.request.banned_routes.contains(&trip.route)
            && (!self.request.wheelchair_accessible || trip.wheelchair_accessible)
            && (!with_bike || trip.bikes_allowed)
    }

    /// The same search run in the opposite direction between the same
    /// endpoints, sharing this context's snapshot.
    pub fn reversed(&self) -> Self {
        let mut reversed = self.clone();
        reversed.request = self.request.reversed();
        if let Some(target) = self.target {
            reversed.origin = target;
            reversed.target = Some(self.origin);
        }
        reversed
    }

    /// A context for a reverse lower-bound search from `target` with every
    /// limit that could only add weight relaxed.
    pub fn lower_bound_context(&self, target: VertexId) -> Self {
        let mut request = self.request.reversed();
        request.max_walk_distance = None;
        request.soft_walk_limit = None;
        request.max_transfers = u32::MAX;
        request.wheelchair_accessible = false;
        request.banned_routes.clear();
        request.banned_trips.clear();
        request.batch = true;
        Self {
            request,
            origin: target,
            target: None,
            path_parsers: Vec::new(),
            ..self.clone()
        }
    }
}
