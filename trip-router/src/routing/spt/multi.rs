use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::domain::VertexId;
use crate::routing::State;

use super::{DominanceFunction, ShortestPathTree};

/// Keeps a set of mutually non-dominated states per vertex.
///
/// A new state is rejected if any kept state is comparable and no worse in
/// every criterion, so the incumbent wins ties. Otherwise it is kept and
/// every state it strictly dominates is dropped.
#[derive(Debug)]
pub struct MultiShortestPathTree {
    dominance: DominanceFunction,
    states: HashMap<VertexId, Vec<Arc<State>>>,
}

impl MultiShortestPathTree {
    pub fn new(dominance: DominanceFunction) -> Self {
        Self {
            dominance,
            states: HashMap::new(),
        }
    }

    pub fn dominance(&self) -> &DominanceFunction {
        &self.dominance
    }
}

impl ShortestPathTree for MultiShortestPathTree {
    fn add(&mut self, state: Arc<State>) -> bool {
        let kept = self.states.entry(state.vertex()).or_default();
        if kept
            .iter()
            .any(|existing| self.dominance.better_or_equal(existing, &state))
        {
            return false;
        }
        let before = kept.len();
        kept.retain(|existing| !self.dominance.dominates(&state, existing));
        if kept.len() < before {
            trace!(
                vertex = ?state.vertex(),
                dropped = before - kept.len(),
                "dominated states dropped"
            );
        }
        kept.push(state);
        true
    }

    fn visit(&mut self, state: &Arc<State>) -> bool {
        self.states
            .get(&state.vertex())
            .is_some_and(|kept| kept.iter().any(|s| Arc::ptr_eq(s, state)))
    }

    fn states(&self, vertex: VertexId) -> &[Arc<State>] {
        self.states.get(&vertex).map_or(&[], Vec::as_slice)
    }

    fn vertices(&self) -> Vec<VertexId> {
        self.states
            .iter()
            .filter(|(_, kept)| !kept.is_empty())
            .map(|(v, _)| *v)
            .collect()
    }
}
