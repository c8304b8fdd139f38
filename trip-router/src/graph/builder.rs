//! Programmatic graph construction.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};

use super::edges::{
    FrequencyBoard, PatternDwell, PatternHop, StreetEdge, StreetTransitLink, TransferEdge,
    TransitBoardAlight, TurnRestriction,
};
use super::{Edge, EdgeKind, Graph, GraphError, VertexKind};
use crate::domain::{
    Coordinate, DistanceLibrary, EdgeId, PatternId, RouteId, ServiceId, StopId, TraverseMode,
    TraverseModeSet, VertexId,
};
use crate::timetable::{FrequencyEntry, Timetable, TripPattern, TripTimes};

/// Builds a [`Graph`] from streets, stops and trip patterns.
///
/// Each pattern is expanded into its own vertices and edges: a departure
/// vertex for every stop but the last, an arrival vertex for every stop
/// but the first, hop edges between them, dwell edges at intermediate
/// stops, and board and alight edges to the stops' vertices.
///
/// # Examples
///
/// ```
/// use trip_router::domain::{Coordinate, TraverseModeSet};
/// use trip_router::graph::GraphBuilder;
///
/// let mut b = GraphBuilder::default();
/// let a = b.intersection("a", Coordinate::new(0.0, 0.0).unwrap()).unwrap();
/// let c = b.intersection("c", Coordinate::new(0.0, 0.001).unwrap()).unwrap();
/// b.street_pair(a, c, "High St", TraverseModeSet::walk_only()).unwrap();
/// let graph = b.build();
/// assert_eq!(graph.summary().edges, 2);
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
    distance: DistanceLibrary,
}

impl GraphBuilder {
    pub fn new(time_zone: FixedOffset) -> Self {
        Self {
            graph: Graph::new(time_zone),
            distance: DistanceLibrary::default(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Declare that `service` runs on `date`.
    pub fn service(&mut self, service: ServiceId, date: NaiveDate) -> &mut Self {
        self.graph.calendar_mut().add(service, date);
        self
    }

    pub fn intersection(
        &mut self,
        label: impl Into<String>,
        coordinate: Coordinate,
    ) -> Result<VertexId, GraphError> {
        self.graph
            .add_vertex(label, coordinate, VertexKind::Intersection)
    }

    /// A transit stop vertex, labelled with the stop id.
    pub fn stop(
        &mut self,
        stop: StopId,
        coordinate: Coordinate,
        wheelchair_boarding: bool,
    ) -> Result<VertexId, GraphError> {
        let label = stop.to_string();
        self.graph.add_vertex(
            label,
            coordinate,
            VertexKind::TransitStop {
                stop,
                wheelchair_boarding,
            },
        )
    }

    pub fn street(
        &mut self,
        from: VertexId,
        to: VertexId,
        street: StreetEdge,
    ) -> Result<EdgeId, GraphError> {
        self.graph.add_edge(from, to, EdgeKind::Street(street))
    }

    /// Replace the turn restrictions of a street edge.
    pub fn restrict_turns(
        &mut self,
        street: EdgeId,
        restrictions: Vec<TurnRestriction>,
    ) -> Result<(), GraphError> {
        match self.graph.edge_mut(street).map(Edge::kind_mut) {
            Some(EdgeKind::Street(s)) => {
                s.turn_restrictions = restrictions;
                Ok(())
            }
            _ => Err(GraphError::UnknownEdge(street)),
        }
    }

    /// Two street edges, one each way, as long as the great-circle distance
    /// between the endpoints.
    pub fn street_pair(
        &mut self,
        a: VertexId,
        b: VertexId,
        name: &str,
        permission: TraverseModeSet,
    ) -> Result<(EdgeId, EdgeId), GraphError> {
        let length = self.distance_between(a, b)?;
        let there = self.street(a, b, StreetEdge::new(name, length, permission))?;
        let back = self.street(b, a, StreetEdge::new(name, length, permission))?;
        Ok((there, back))
    }

    /// Link edges both ways between a street vertex and a stop vertex.
    pub fn link(&mut self, street: VertexId, stop: VertexId) -> Result<(EdgeId, EdgeId), GraphError> {
        let kind = || EdgeKind::StreetTransitLink(StreetTransitLink);
        let to_stop = self.graph.add_edge(street, stop, kind())?;
        let to_street = self.graph.add_edge(stop, street, kind())?;
        Ok((to_stop, to_street))
    }

    /// A one-way walking transfer between two stop vertices.
    pub fn transfer(
        &mut self,
        from: VertexId,
        to: VertexId,
        min_time: i64,
    ) -> Result<EdgeId, GraphError> {
        let distance_m = self.distance_between(from, to)?;
        self.graph.add_edge(
            from,
            to,
            EdgeKind::Transfer(TransferEdge {
                distance_m,
                min_time,
            }),
        )
    }

    /// Add a pattern of `route` over `stops` with scheduled `trips` and
    /// headway-based `frequencies`.
    pub fn pattern(
        &mut self,
        route: RouteId,
        mode: TraverseMode,
        stops: Vec<StopId>,
        trips: Vec<TripTimes>,
        frequencies: Vec<(TripTimes, FrequencyWindow)>,
    ) -> Result<PatternId, GraphError> {
        let stop_vertices = stops
            .iter()
            .map(|s| {
                self.graph
                    .stop_vertex(s)
                    .ok_or_else(|| GraphError::UnknownStop(s.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let n = stops.len();
        if n < 2 {
            return Err(invalid_pattern(&route, "a pattern needs at least two stops"));
        }
        let all_times = trips.iter().chain(frequencies.iter().map(|(t, _)| t));
        if all_times.clone().any(|t| t.num_stops() != n) {
            return Err(invalid_pattern(&route, "trip stop count differs from pattern"));
        }
        if all_times.clone().any(|t| t.trip().route != route) {
            return Err(invalid_pattern(&route, "trip belongs to another route"));
        }

        let id = self.graph.next_pattern_id();
        let mut timetable = Timetable::new(id);
        for times in trips {
            timetable.add_trip_times(times);
        }
        let frequency_based = !frequencies.is_empty();
        for (times, window) in frequencies {
            timetable.add_frequency_entry(FrequencyEntry {
                trip_times: Arc::new(times),
                start: window.start,
                end: window.end,
                headway: window.headway,
                exact_times: window.exact_times,
            });
        }
        self.graph
            .add_pattern(TripPattern::new(id, route, mode, stops, timetable))?;

        let mut depart = Vec::with_capacity(n);
        let mut arrive = Vec::with_capacity(n);
        for (i, stop) in stop_vertices.iter().enumerate() {
            let coordinate = self.coordinate(*stop)?;
            let d = (i + 1 < n)
                .then(|| {
                    self.graph.add_vertex(
                        format!("{id:?}:{i}:depart"),
                        coordinate,
                        VertexKind::PatternDepart {
                            pattern: id,
                            stop_index: i,
                        },
                    )
                })
                .transpose()?;
            let a = (i > 0)
                .then(|| {
                    self.graph.add_vertex(
                        format!("{id:?}:{i}:arrive"),
                        coordinate,
                        VertexKind::PatternArrive {
                            pattern: id,
                            stop_index: i,
                        },
                    )
                })
                .transpose()?;
            depart.push(d);
            arrive.push(a);
        }

        for (i, stop) in stop_vertices.iter().copied().enumerate() {
            if let Some(d) = depart[i] {
                self.board_alight(id, i, true, stop, d, frequency_based)?;
                if let Some(next) = arrive[i + 1] {
                    self.graph.add_edge(
                        d,
                        next,
                        EdgeKind::Hop(PatternHop {
                            pattern: id,
                            stop_index: i,
                        }),
                    )?;
                }
            }
            if let Some(a) = arrive[i] {
                self.board_alight(id, i, false, a, stop, frequency_based)?;
            }
            if let (Some(a), Some(d)) = (arrive[i], depart[i]) {
                self.graph.add_edge(
                    a,
                    d,
                    EdgeKind::Dwell(PatternDwell {
                        pattern: id,
                        stop_index: i,
                    }),
                )?;
            }
        }
        Ok(id)
    }

    fn board_alight(
        &mut self,
        pattern: PatternId,
        stop_index: usize,
        boarding: bool,
        from: VertexId,
        to: VertexId,
        frequency_based: bool,
    ) -> Result<(), GraphError> {
        self.graph.add_edge(
            from,
            to,
            EdgeKind::BoardAlight(TransitBoardAlight {
                pattern,
                stop_index,
                boarding,
            }),
        )?;
        if frequency_based {
            self.graph.add_edge(
                from,
                to,
                EdgeKind::FrequencyBoard(FrequencyBoard {
                    pattern,
                    stop_index,
                    boarding,
                }),
            )?;
        }
        Ok(())
    }

    fn coordinate(&self, v: VertexId) -> Result<Coordinate, GraphError> {
        self.graph
            .vertex(v)
            .map(|v| v.coordinate())
            .ok_or(GraphError::MissingVertex(v))
    }

    fn distance_between(&self, a: VertexId, b: VertexId) -> Result<f64, GraphError> {
        Ok(self.distance.distance(self.coordinate(a)?, self.coordinate(b)?))
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

/// When a headway-based trip template repeats, in seconds after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyWindow {
    pub start: i32,
    pub end: i32,
    pub headway: i32,
    pub exact_times: bool,
}

fn invalid_pattern(route: &RouteId, reason: &str) -> GraphError {
    GraphError::InvalidPattern {
        route: route.clone(),
        reason: reason.to_string(),
    }
}
