//! The search graph.
//!
//! Vertices, edges and trip patterns live in arenas owned by [`Graph`] and
//! are addressed by integer handles. Edges store the handles of their
//! endpoints; vertices store the handles of their edges. Nothing refers to
//! anything else by pointer, so the whole graph can be shared behind one
//! reader/writer lock.
//!
//! After construction the only structural edits are attaching and
//! detaching edges and attaching patches, all made by the single graph
//! writer (see [`crate::updater`]).

mod builder;
mod description;
mod edge;
pub mod edges;
mod error;
mod vertex;

use std::collections::HashMap;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

pub use builder::{FrequencyWindow, GraphBuilder};
pub use description::NetworkDescription;
pub use edge::{Edge, EdgeKind, Successors, Traversable};
pub use error::GraphError;
pub use vertex::{Vertex, VertexKind};

use crate::domain::{
    AlertId, Coordinate, EdgeId, PatternId, RouteId, ServiceCalendar, StopId, TripId, VertexId,
};
use crate::timetable::TripPattern;

/// A temporary modification attached to an edge, such as a closure or a
/// rider alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPatch {
    pub alert: AlertId,
    /// Whether the edge may not be used while the patch is active.
    #[serde(default)]
    pub blocks_traversal: bool,
    /// Epoch seconds from which the patch applies.
    #[serde(default)]
    pub start: Option<i64>,
    /// Epoch seconds until which the patch applies, exclusive.
    #[serde(default)]
    pub end: Option<i64>,
}

impl GraphPatch {
    /// Returns true if the patch applies at epoch second `t`.
    pub fn is_active(&self, t: i64) -> bool {
        self.start.is_none_or(|s| t >= s) && self.end.is_none_or(|e| t < e)
    }
}

/// Counts describing a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub vertices: usize,
    pub edges: usize,
    pub transit_stops: usize,
    pub patterns: usize,
    pub trips: usize,
}

/// Arena of vertices, edges and trip patterns.
#[derive(Debug)]
pub struct Graph {
    vertices: Vec<Vertex>,
    /// Detached edges leave a hole so handles are never reused.
    edges: Vec<Option<Edge>>,
    patterns: Vec<TripPattern>,
    labels: HashMap<String, VertexId>,
    stops: HashMap<StopId, VertexId>,
    trips: HashMap<TripId, PatternId>,
    patches: HashMap<EdgeId, Vec<GraphPatch>>,
    calendar: ServiceCalendar,
    time_zone: FixedOffset,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl Graph {
    /// An empty graph whose service days start at midnight in `time_zone`.
    pub fn new(time_zone: FixedOffset) -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            patterns: Vec::new(),
            labels: HashMap::new(),
            stops: HashMap::new(),
            trips: HashMap::new(),
            patches: HashMap::new(),
            calendar: ServiceCalendar::new(),
            time_zone,
        }
    }

    pub fn time_zone(&self) -> FixedOffset {
        self.time_zone
    }

    pub fn calendar(&self) -> &ServiceCalendar {
        &self.calendar
    }

    pub fn calendar_mut(&mut self) -> &mut ServiceCalendar {
        &mut self.calendar
    }

    /// Add a vertex with a unique label.
    pub fn add_vertex(
        &mut self,
        label: impl Into<String>,
        coordinate: Coordinate,
        kind: VertexKind,
    ) -> Result<VertexId, GraphError> {
        let label = label.into();
        if self.labels.contains_key(&label) {
            return Err(GraphError::DuplicateLabel(label));
        }
        let id = VertexId::from_index(self.vertices.len());
        if let VertexKind::TransitStop { stop, .. } = &kind {
            if self.stops.contains_key(stop) {
                return Err(GraphError::DuplicateLabel(stop.to_string()));
            }
            self.stops.insert(stop.clone(), id);
        }
        self.labels.insert(label.clone(), id);
        self.vertices.push(Vertex::new(id, label, coordinate, kind));
        Ok(id)
    }

    /// Attach a new edge between two existing vertices.
    pub fn add_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        kind: EdgeKind,
    ) -> Result<EdgeId, GraphError> {
        for v in [from, to] {
            if self.vertex(v).is_none() {
                return Err(GraphError::MissingVertex(v));
            }
        }
        let id = EdgeId::from_index(self.edges.len());
        self.edges.push(Some(Edge::new(id, from, to, kind)));
        self.vertices[from.index()].outgoing.push(id);
        self.vertices[to.index()].incoming.push(id);
        Ok(id)
    }

    /// Remove an edge from both of its endpoints and return it. Any patches
    /// on the edge go with it.
    pub fn detach_edge(&mut self, id: EdgeId) -> Result<Edge, GraphError> {
        let edge = self
            .edges
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(GraphError::UnknownEdge(id))?;
        self.vertices[edge.from().index()].outgoing.retain(|e| *e != id);
        self.vertices[edge.to().index()].incoming.retain(|e| *e != id);
        self.patches.remove(&id);
        Ok(edge)
    }

    /// Register a pattern. Its handle must be the next free one, see
    /// [`Graph::next_pattern_id`].
    pub fn add_pattern(&mut self, pattern: TripPattern) -> Result<PatternId, GraphError> {
        let id = self.next_pattern_id();
        if pattern.id != id {
            return Err(GraphError::UnknownPattern(pattern.id));
        }
        let scheduled = &pattern.scheduled;
        let trips = scheduled
            .trip_times()
            .iter()
            .map(|t| t.trip_id())
            .chain(scheduled.frequency_entries().iter().map(|e| e.trip_times.trip_id()));
        for trip in trips {
            self.trips.insert(trip.clone(), id);
        }
        self.patterns.push(pattern);
        Ok(id)
    }

    /// The handle the next [`Graph::add_pattern`] call must use.
    pub fn next_pattern_id(&self) -> PatternId {
        PatternId::from_index(self.patterns.len())
    }

    /// Attach a patch to an edge.
    pub fn add_patch(&mut self, edge: EdgeId, patch: GraphPatch) -> Result<(), GraphError> {
        if self.edge(edge).is_none() {
            return Err(GraphError::UnknownEdge(edge));
        }
        self.patches.entry(edge).or_default().push(patch);
        Ok(())
    }

    /// Remove every patch carrying `alert`. Returns how many were removed.
    pub fn remove_patches(&mut self, alert: &AlertId) -> usize {
        let mut removed = 0;
        self.patches.retain(|_, patches| {
            let before = patches.len();
            patches.retain(|p| &p.alert != alert);
            removed += before - patches.len();
            !patches.is_empty()
        });
        removed
    }

    /// Patches attached to `edge`.
    pub fn patches(&self, edge: EdgeId) -> &[GraphPatch] {
        self.patches.get(&edge).map_or(&[], Vec::as_slice)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    /// An attached edge.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn pattern(&self, id: PatternId) -> Option<&TripPattern> {
        self.patterns.get(id.index())
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter()
    }

    /// Attached edges.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().flatten()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &TripPattern> {
        self.patterns.iter()
    }

    /// Edges leaving `v`.
    pub fn outgoing(&self, v: VertexId) -> impl Iterator<Item = &Edge> {
        self.vertex(v)
            .into_iter()
            .flat_map(|v| v.outgoing())
            .filter_map(|e| self.edge(*e))
    }

    /// Edges arriving at `v`.
    pub fn incoming(&self, v: VertexId) -> impl Iterator<Item = &Edge> {
        self.vertex(v)
            .into_iter()
            .flat_map(|v| v.incoming())
            .filter_map(|e| self.edge(*e))
    }

    /// Edges a search leaving `v` may take: outgoing edges forward in time,
    /// incoming edges in an arrive-by search.
    pub fn edges_from(&self, v: VertexId, arrive_by: bool) -> Box<dyn Iterator<Item = &Edge> + '_> {
        if arrive_by {
            Box::new(self.incoming(v))
        } else {
            Box::new(self.outgoing(v))
        }
    }

    pub fn transit_stops(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter().filter(|v| v.is_transit_stop())
    }

    pub fn stop_vertex(&self, stop: &StopId) -> Option<VertexId> {
        self.stops.get(stop).copied()
    }

    pub fn vertex_by_label(&self, label: &str) -> Option<VertexId> {
        self.labels.get(label).copied()
    }

    /// The pattern a scheduled trip belongs to.
    pub fn trip_pattern(&self, trip: &TripId) -> Option<PatternId> {
        self.trips.get(trip).copied()
    }

    /// A pattern of `route` serving exactly `stops`, in order.
    pub fn find_pattern(&self, route: &RouteId, stops: &[StopId]) -> Option<PatternId> {
        self.patterns
            .iter()
            .find(|p| &p.route == route && p.stops == stops)
            .map(|p| p.id)
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            vertices: self.vertices.len(),
            edges: self.edges().count(),
            transit_stops: self.stops.len(),
            patterns: self.patterns.len(),
            trips: self.trips.len(),
        }
    }
}
