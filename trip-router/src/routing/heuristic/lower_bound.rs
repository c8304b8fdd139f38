use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, warn};

use crate::domain::VertexId;
use crate::routing::{DijkstraRun, RoutingContext, SptKind, State};

use super::RemainingWeightHeuristic;

/// States the background search expands on each main-search iteration.
const STATES_PER_ITERATION: usize = 100;

/// Exact remaining weights under relaxed rules, from a reverse search
/// outward from the target.
///
/// The reverse search crosses every edge optimistically: no waiting, the
/// best running time of any trip, no walk limits or turn restrictions.
/// Initialization runs it until the main search's origin is settled; the
/// rest is done a little at a time alongside the main search. A vertex not
/// yet settled is estimated at the reverse search's frontier weight, which
/// bounds every vertex still to come.
pub struct LowerBoundHeuristic<'g> {
    /// The main search's context.
    base: RoutingContext<'g>,
    /// The relaxed reverse context, once a target is known.
    ctx: RoutingContext<'g>,
    run: Option<DijkstraRun>,
    settled: HashMap<VertexId, f64>,
}

impl<'g> LowerBoundHeuristic<'g> {
    pub fn new(ctx: &RoutingContext<'g>) -> Self {
        Self {
            base: ctx.clone(),
            ctx: ctx.clone(),
            run: None,
            settled: HashMap::new(),
        }
    }

    fn expand(&mut self, max_states: usize, deadline: Option<Instant>) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        for _ in 0..max_states {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return;
            }
            let Some(state) = run.step(&self.ctx, None, None) else {
                return;
            };
            self.settled.entry(state.vertex()).or_insert(state.weight());
        }
    }

    fn estimate(&self, vertex: VertexId) -> f64 {
        if let Some(w) = self.settled.get(&vertex) {
            return *w;
        }
        match &self.run {
            Some(run) => run.frontier().unwrap_or(f64::INFINITY),
            None => 0.0,
        }
    }
}

impl RemainingWeightHeuristic for LowerBoundHeuristic<'_> {
    fn initialize(
        &mut self,
        initial: &State,
        target: Option<VertexId>,
        deadline: Option<Instant>,
    ) -> bool {
        self.reset();
        let Some(target) = target else {
            return true;
        };
        self.ctx = self.base.lower_bound_context(target);
        let start = State::at(target, initial.time(), &self.ctx);
        self.run = Some(DijkstraRun::new(start, &SptKind::Basic, true));

        let origin = initial.vertex();
        while !self.settled.contains_key(&origin) {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(settled = self.settled.len(), "lower bound initialization timed out");
                return false;
            }
            let before = self.settled.len();
            self.expand(STATES_PER_ITERATION, deadline);
            if self.run.as_ref().is_none_or(DijkstraRun::is_exhausted) && before == self.settled.len() {
                break;
            }
        }
        debug!(
            settled = self.settled.len(),
            origin_bound = self.estimate(origin),
            "lower bound initialized"
        );
        true
    }

    fn compute_forward_weight(&self, state: &State, _: Option<VertexId>) -> f64 {
        self.estimate(state.vertex())
    }

    fn do_some_work(&mut self) {
        self.expand(STATES_PER_ITERATION, None);
    }

    fn reset(&mut self) {
        self.run = None;
        self.settled.clear();
    }
}
