//! Remaining-weight heuristics for A*.
//!
//! Every heuristic here is admissible: it never overestimates the weight
//! still needed to reach the target, so A* stays optimal.

mod euclidean;
mod lower_bound;

use std::time::Instant;

pub use euclidean::EuclideanHeuristic;
pub use lower_bound::LowerBoundHeuristic;

use crate::domain::VertexId;

use super::{HeuristicKind, RoutingContext, State};

/// Estimates the weight remaining from a state to the target.
pub trait RemainingWeightHeuristic {
    /// Prepare for a search starting at `initial`. Returns false if
    /// `deadline` passed before preparation finished; the search should
    /// then give up.
    fn initialize(
        &mut self,
        initial: &State,
        target: Option<VertexId>,
        deadline: Option<Instant>,
    ) -> bool;

    /// Remaining weight for a depart-after search.
    fn compute_forward_weight(&self, state: &State, target: Option<VertexId>) -> f64;

    /// Remaining weight for an arrive-by search.
    fn compute_reverse_weight(&self, state: &State, target: Option<VertexId>) -> f64 {
        self.compute_forward_weight(state, target)
    }

    /// Called once per main-search iteration to let incremental
    /// heuristics make progress.
    fn do_some_work(&mut self) {}

    /// Drop anything computed for the previous search.
    fn reset(&mut self) {}
}

/// Always zero. A* with this heuristic is Dijkstra's algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrivialHeuristic;

impl RemainingWeightHeuristic for TrivialHeuristic {
    fn initialize(&mut self, _: &State, _: Option<VertexId>, _: Option<Instant>) -> bool {
        true
    }

    fn compute_forward_weight(&self, _: &State, _: Option<VertexId>) -> f64 {
        0.0
    }
}

/// The heuristic the request asks for. Batch searches always get the
/// trivial one.
pub fn heuristic_for<'c, 'g>(
    ctx: &'c RoutingContext<'g>,
) -> Box<dyn RemainingWeightHeuristic + 'c> {
    if ctx.request.batch {
        return Box::new(TrivialHeuristic);
    }
    match ctx.request.heuristic {
        HeuristicKind::Trivial => Box::new(TrivialHeuristic),
        HeuristicKind::Euclidean => Box::new(EuclideanHeuristic::new(ctx)),
        HeuristicKind::LowerBound => Box::new(LowerBoundHeuristic::new(ctx)),
    }
}
