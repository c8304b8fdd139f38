use std::collections::HashMap;
use std::slice;
use std::sync::Arc;

use crate::domain::VertexId;
use crate::routing::State;

use super::ShortestPathTree;

/// Keeps the single lowest-weight state per vertex.
///
/// On a tie the state already in the tree wins. A vertex whose kept state
/// arrived over a turn-restricted edge stays open: a worse state arriving
/// by another edge may still be expanded, because the restriction makes
/// the two continue differently.
#[derive(Debug, Default)]
pub struct BasicShortestPathTree {
    states: HashMap<VertexId, Arc<State>>,
}

impl BasicShortestPathTree {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShortestPathTree for BasicShortestPathTree {
    fn add(&mut self, state: Arc<State>) -> bool {
        match self.states.get(&state.vertex()) {
            Some(existing) if state.weight() >= existing.weight() => {
                existing.back_edge_restricted()
            }
            _ => {
                self.states.insert(state.vertex(), state);
                true
            }
        }
    }

    fn visit(&mut self, state: &Arc<State>) -> bool {
        self.states
            .get(&state.vertex())
            .is_some_and(|existing| Arc::ptr_eq(existing, state) || existing.back_edge_restricted())
    }

    fn states(&self, vertex: VertexId) -> &[Arc<State>] {
        self.states.get(&vertex).map_or(&[], slice::from_ref)
    }

    fn vertices(&self) -> Vec<VertexId> {
        self.states.keys().copied().collect()
    }

    fn state(&self, vertex: VertexId) -> Option<&Arc<State>> {
        self.states.get(&vertex)
    }

    fn vertex_count(&self) -> usize {
        self.states.len()
    }
}
