//! Graph vertices.

use crate::domain::{Coordinate, EdgeId, PatternId, StopId, VertexId};

/// What a vertex stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexKind {
    /// A street intersection or any other point on the street network.
    Intersection,
    /// A transit stop, connected to streets and to the stop's patterns.
    TransitStop { stop: StopId, wheelchair_boarding: bool },
    /// Where vehicles of a pattern leave the stop at `stop_index`.
    PatternDepart { pattern: PatternId, stop_index: usize },
    /// Where vehicles of a pattern arrive at the stop at `stop_index`.
    PatternArrive { pattern: PatternId, stop_index: usize },
}

/// A point in the search graph.
///
/// Vertices never change after construction apart from their edge lists,
/// which only the graph writer edits.
#[derive(Debug, Clone)]
pub struct Vertex {
    id: VertexId,
    label: String,
    coordinate: Coordinate,
    kind: VertexKind,
    pub(super) incoming: Vec<EdgeId>,
    pub(super) outgoing: Vec<EdgeId>,
}

impl Vertex {
    pub(super) fn new(id: VertexId, label: String, coordinate: Coordinate, kind: VertexKind) -> Self {
        Self {
            id,
            label,
            coordinate,
            kind,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn kind(&self) -> &VertexKind {
        &self.kind
    }

    /// Edges arriving at this vertex.
    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }

    /// Edges leaving this vertex.
    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }

    pub fn is_transit_stop(&self) -> bool {
        matches!(self.kind, VertexKind::TransitStop { .. })
    }

    /// Returns false only for stops known to be inaccessible by wheelchair.
    pub fn is_wheelchair_accessible(&self) -> bool {
        match self.kind {
            VertexKind::TransitStop {
                wheelchair_boarding,
                ..
            } => wheelchair_boarding,
            _ => true,
        }
    }
}
