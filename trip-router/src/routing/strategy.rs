//! Pluggable search strategies.
//!
//! Plain closures implement each trait, so callers rarely need a named
//! type.

use std::collections::HashSet;

use crate::domain::VertexId;
use crate::graph::Edge;

use super::State;

/// Decides when a search should stop, given the state just popped.
pub trait SearchTerminationStrategy {
    fn should_terminate(&mut self, current: &State) -> bool;
}

impl<F> SearchTerminationStrategy for F
where
    F: FnMut(&State) -> bool,
{
    fn should_terminate(&mut self, current: &State) -> bool {
        self(current)
    }
}

/// Decides whether to skip an edge when expanding a state.
pub trait SkipEdgeStrategy {
    fn should_skip_edge(&self, current: &State, edge: &Edge) -> bool;
}

impl<F> SkipEdgeStrategy for F
where
    F: Fn(&State, &Edge) -> bool,
{
    fn should_skip_edge(&self, current: &State, edge: &Edge) -> bool {
        self(current, edge)
    }
}

/// Decides whether to discard a state produced by a traversal.
pub trait SkipTraverseResultStrategy {
    fn should_skip_result(&self, result: &State) -> bool;
}

impl<F> SkipTraverseResultStrategy for F
where
    F: Fn(&State) -> bool,
{
    fn should_skip_result(&self, result: &State) -> bool {
        self(result)
    }
}

/// Stops once every one of a set of targets has been reached by a final
/// state.
#[derive(Debug, Clone)]
pub struct MultiTargetTerminationStrategy {
    remaining: HashSet<VertexId>,
}

impl MultiTargetTerminationStrategy {
    pub fn new(targets: impl IntoIterator<Item = VertexId>) -> Self {
        Self {
            remaining: targets.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl SearchTerminationStrategy for MultiTargetTerminationStrategy {
    fn should_terminate(&mut self, current: &State) -> bool {
        if current.is_final() {
            self.remaining.remove(&current.vertex());
        }
        self.remaining.is_empty()
    }
}
