//! Plain best-first search with no target and no heuristic.

use std::sync::Arc;

use tracing::debug;

use super::spt::{ShortestPathTree, new_tree};
use super::{
    RoutingContext, SearchTerminationStrategy, SkipEdgeStrategy, SkipTraverseResultStrategy,
    SptKind, State, StateQueue,
};

/// A Dijkstra search that can be advanced one state at a time.
///
/// Holds no borrow of the context, so it can live inside a heuristic that
/// interleaves its work with another search.
pub struct DijkstraRun {
    queue: StateQueue,
    spt: Box<dyn ShortestPathTree>,
    optimistic: bool,
    states_visited: usize,
}

impl DijkstraRun {
    /// Start from `initial`. With `optimistic` set edges are crossed with
    /// their relaxed lower-bound traversal.
    pub fn new(initial: State, kind: &SptKind, optimistic: bool) -> Self {
        let mut spt = new_tree(kind);
        let mut queue = StateQueue::new();
        let initial = Arc::new(initial);
        if spt.add(Arc::clone(&initial)) {
            queue.insert(initial, 0.0);
        }
        Self {
            queue,
            spt,
            optimistic,
            states_visited: 0,
        }
    }

    /// Pop and expand the next current state, returning it. `None` once the
    /// queue is exhausted.
    pub fn step(
        &mut self,
        ctx: &RoutingContext<'_>,
        skip_edge: Option<&dyn SkipEdgeStrategy>,
        skip_result: Option<&dyn SkipTraverseResultStrategy>,
    ) -> Option<Arc<State>> {
        loop {
            let (state, _) = self.queue.pop()?;
            if !self.spt.visit(&state) {
                continue;
            }
            self.states_visited += 1;
            for edge in ctx.graph.edges_from(state.vertex(), ctx.arrive_by()) {
                if skip_edge.is_some_and(|s| s.should_skip_edge(&state, edge)) {
                    continue;
                }
                let successors = if self.optimistic {
                    edge.optimistic_traverse(&state, ctx)
                } else {
                    edge.traverse(&state, ctx)
                };
                for next in successors {
                    if next.weight() > ctx.request.max_weight
                        || skip_result.is_some_and(|s| s.should_skip_result(&next))
                    {
                        continue;
                    }
                    let next = Arc::new(next);
                    if self.spt.add(Arc::clone(&next)) {
                        let key = next.weight();
                        self.queue.insert(next, key);
                    }
                }
            }
            return Some(state);
        }
    }

    /// The lowest key still queued: a lower bound on the weight of every
    /// state not yet popped.
    pub fn frontier(&self) -> Option<f64> {
        self.queue.peek_key()
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn states_visited(&self) -> usize {
        self.states_visited
    }

    pub fn spt(&self) -> &dyn ShortestPathTree {
        self.spt.as_ref()
    }

    pub fn into_spt(self) -> Box<dyn ShortestPathTree> {
        self.spt
    }
}

/// Dijkstra's algorithm over the search graph, with pluggable termination
/// and pruning.
///
/// Used for one-to-many searches and as the engine of lower-bound
/// heuristics.
pub struct GenericDijkstra<'c, 'g> {
    ctx: &'c RoutingContext<'g>,
    termination: Option<Box<dyn SearchTerminationStrategy + 'c>>,
    skip_edge: Option<Box<dyn SkipEdgeStrategy + 'c>>,
    skip_result: Option<Box<dyn SkipTraverseResultStrategy + 'c>>,
    optimistic: bool,
}

impl<'c, 'g> GenericDijkstra<'c, 'g> {
    pub fn new(ctx: &'c RoutingContext<'g>) -> Self {
        Self {
            ctx,
            termination: None,
            skip_edge: None,
            skip_result: None,
            optimistic: false,
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

    /// Cross edges with their relaxed lower-bound traversal.
    pub fn optimistic(mut self, optimistic: bool) -> Self {
        self.optimistic = optimistic;
        self
    }

    /// Search from the context's origin.
    pub fn search(&mut self) -> Box<dyn ShortestPathTree> {
        self.search_from(State::initial(self.ctx))
    }

    /// Search from `initial` until the queue empties or the termination
    /// strategy fires.
    pub fn search_from(&mut self, initial: State) -> Box<dyn ShortestPathTree> {
        let mut run = DijkstraRun::new(initial, &self.ctx.request.spt, self.optimistic);
        while let Some(state) = run.step(
            self.ctx,
            self.skip_edge.as_deref(),
            self.skip_result.as_deref(),
        ) {
            if let Some(termination) = self.termination.as_mut() {
                if termination.should_terminate(&state) {
                    debug!(vertex = ?state.vertex(), "termination strategy fired");
                    break;
                }
            }
        }
        debug!(
            states_visited = run.states_visited(),
            vertices = run.spt().vertex_count(),
            "dijkstra search finished"
        );
        run.into_spt()
    }
}
