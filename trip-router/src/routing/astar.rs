//! Best-first search toward a target.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace, warn};

use super::heuristic::{RemainingWeightHeuristic, heuristic_for};
use super::spt::{ShortestPathTree, new_tree};
use super::{
    RoutingContext, SearchTerminationStrategy, SkipEdgeStrategy, SkipTraverseResultStrategy,
    State, StateQueue,
};

/// What one search produced.
pub struct SearchOutcome {
    pub spt: Box<dyn ShortestPathTree>,
    /// Final states at the target that every path parser accepts, in the
    /// order they were found.
    pub target_states: Vec<Arc<State>>,
    /// The search hit its deadline. Whatever was found so far is kept.
    pub aborted: bool,
    pub states_visited: usize,
    pub best_weight: Option<f64>,
}

impl SearchOutcome {
    fn empty(spt: Box<dyn ShortestPathTree>, aborted: bool) -> Self {
        Self {
            spt,
            target_states: Vec::new(),
            aborted,
            states_visited: 0,
            best_weight: None,
        }
    }
}

/// A* over the search graph.
///
/// States are popped in order of weight plus the heuristic's estimate of
/// the weight remaining. Each target state found is recorded; the search
/// keeps going until the request's itinerary count is reached, a popped
/// state's weight exceeds the oversearch multiple of the best found, the
/// queue empties, a strategy stops it, or the deadline passes.
///
/// # Examples
///
/// ```
/// use trip_router::domain::{Coordinate, TraverseModeSet};
/// use trip_router::graph::GraphBuilder;
/// use trip_router::routing::{GenericAStar, RoutingContext, RoutingRequest};
///
/// let mut b = GraphBuilder::default();
/// let a = b.intersection("a", Coordinate::new(0.0, 0.0).unwrap()).unwrap();
/// let z = b.intersection("z", Coordinate::new(0.0, 0.001).unwrap()).unwrap();
/// b.street_pair(a, z, "High St", TraverseModeSet::walk_only()).unwrap();
/// let graph = b.build();
///
/// let mut request = RoutingRequest::new(a, z, 1_710_489_600);
/// request.modes = TraverseModeSet::walk_only();
/// let ctx = RoutingContext::new(&graph, request, None).unwrap();
/// let outcome = GenericAStar::new(&ctx).search();
/// assert_eq!(outcome.target_states.len(), 1);
/// assert!(!outcome.aborted);
/// ```
pub struct GenericAStar<'c, 'g> {
    ctx: &'c RoutingContext<'g>,
    termination: Option<Box<dyn SearchTerminationStrategy + 'c>>,
    skip_edge: Option<Box<dyn SkipEdgeStrategy + 'c>>,
    skip_result: Option<Box<dyn SkipTraverseResultStrategy + 'c>>,
    deadline: Option<Instant>,
}

impl<'c, 'g> GenericAStar<'c, 'g> {
    pub fn new(ctx: &'c RoutingContext<'g>) -> Self {
        Self {
            ctx,
            termination: None,
            skip_edge: None,
            skip_result: None,
            deadline: None,
        }
    }

    pub fn with_termination(mut self, strategy: impl SearchTerminationStrategy + 'c) -> Self {
        self.termination = Some(Box::new(strategy));
        self
    }

    pub fn with_skip_edge(mut self, strategy: impl SkipEdgeStrategy + 'c) -> Self {
        self.skip_edge = Some(Box::new(strategy));
        self
    }

    pub fn with_skip_result(mut self, strategy: impl SkipTraverseResultStrategy + 'c) -> Self {
        self.skip_result = Some(Box::new(strategy));
        self
    }

    /// Abort at `deadline` instead of after the request's timeout.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Search with the heuristic the request names.
    pub fn search(&mut self) -> SearchOutcome {
        let mut heuristic = heuristic_for(self.ctx);
        self.search_with(heuristic.as_mut())
    }

    pub fn search_with(&mut self, heuristic: &mut dyn RemainingWeightHeuristic) -> SearchOutcome {
        let ctx = self.ctx;
        let request = &ctx.request;
        let deadline = self
            .deadline
            .or_else(|| request.timeout.map(|t| Instant::now() + t));
        let timed_out = || deadline.is_some_and(|d| Instant::now() >= d);

        let initial = Arc::new(State::initial(ctx));
        let mut spt = new_tree(&request.spt);
        if !heuristic.initialize(&initial, ctx.target, deadline) {
            warn!(origin = ?ctx.origin, "heuristic initialization timed out; search aborted");
            return SearchOutcome::empty(spt, true);
        }

        let estimate = |h: &dyn RemainingWeightHeuristic, s: &State| {
            let remaining = if ctx.arrive_by() {
                h.compute_reverse_weight(s, ctx.target)
            } else {
                h.compute_forward_weight(s, ctx.target)
            };
            remaining * request.heuristic_weight
        };

        let mut queue = StateQueue::new();
        let key = estimate(heuristic, &initial);
        spt.add(Arc::clone(&initial));
        queue.insert(initial, key);

        let mut outcome = SearchOutcome::empty(spt, false);
        loop {
            if timed_out() {
                warn!(
                    states_visited = outcome.states_visited,
                    found = outcome.target_states.len(),
                    "search timed out"
                );
                outcome.aborted = true;
                break;
            }
            heuristic.do_some_work();
            let Some((u, _)) = queue.pop() else {
                break;
            };
            if !outcome.spt.visit(&u) {
                continue;
            }
            if let Some(best) = outcome.best_weight {
                if u.weight() > best * request.oversearch_multiplier {
                    debug!(weight = u.weight(), best, "oversearch limit reached");
                    break;
                }
            }
            outcome.states_visited += 1;
            trace!(vertex = ?u.vertex(), weight = u.weight(), time = u.time(), "visiting");

            if let Some(termination) = self.termination.as_mut() {
                if termination.should_terminate(&u) {
                    debug!(vertex = ?u.vertex(), "termination strategy fired");
                    break;
                }
            }

            if !request.batch
                && Some(u.vertex()) == ctx.target
                && u.is_final()
                && u.all_path_parsers_accept(ctx)
            {
                debug!(weight = u.weight(), "target reached");
                outcome.best_weight = Some(outcome.best_weight.map_or(u.weight(), |b| b.min(u.weight())));
                outcome.target_states.push(u);
                if outcome.target_states.len() >= request.num_itineraries {
                    break;
                }
                continue;
            }

            for edge in ctx.graph.edges_from(u.vertex(), ctx.arrive_by()) {
                if self
                    .skip_edge
                    .as_ref()
                    .is_some_and(|s| s.should_skip_edge(&u, edge))
                {
                    continue;
                }
                for v in edge.traverse(&u, ctx) {
                    if self
                        .skip_result
                        .as_ref()
                        .is_some_and(|s| s.should_skip_result(&v))
                    {
                        continue;
                    }
                    let beyond_worst_time = request.worst_time.is_some_and(|worst| {
                        if ctx.arrive_by() {
                            v.time() < worst
                        } else {
                            v.time() > worst
                        }
                    });
                    if beyond_worst_time {
                        continue;
                    }
                    let remaining = estimate(heuristic, &v);
                    if !remaining.is_finite() || remaining < 0.0 {
                        continue;
                    }
                    let key = v.weight() + remaining;
                    if key > request.max_weight {
                        continue;
                    }
                    let v = Arc::new(v);
                    if outcome.spt.add(Arc::clone(&v)) {
                        queue.insert(v, key);
                    }
                }
            }
        }

        debug!(
            states_visited = outcome.states_visited,
            found = outcome.target_states.len(),
            aborted = outcome.aborted,
            "a* search finished"
        );
        outcome
    }
}
