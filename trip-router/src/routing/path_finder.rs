//! Finding several distinct itineraries.

use std::time::Instant;

use tracing::{debug, info};

use super::{GenericAStar, GraphPath, RoutingContext};

/// The paths found for one request.
#[derive(Debug, Clone, Default)]
pub struct PathSearchResult {
    /// Distinct paths, lowest weight first.
    pub paths: Vec<GraphPath>,
    /// A search hit the deadline; the paths are whatever was found first.
    pub aborted: bool,
    /// Number of A* searches run.
    pub searches: usize,
    pub states_visited: usize,
}

/// Runs repeated A* searches until enough distinct paths are found.
///
/// After each search the trips of the paths it found are banned, so the
/// next search has to find something else. Stops when the itinerary count
/// is reached, a search finds nothing new, or the deadline passes.
pub struct GraphPathFinder<'c, 'g> {
    ctx: &'c RoutingContext<'g>,
}

impl<'c, 'g> GraphPathFinder<'c, 'g> {
    pub fn new(ctx: &'c RoutingContext<'g>) -> Self {
        Self { ctx }
    }

    pub fn find_paths(&self) -> PathSearchResult {
        let wanted = self.ctx.request.num_itineraries.max(1);
        let deadline = self.ctx.request.timeout.map(|t| Instant::now() + t);
        let mut ctx = self.ctx.clone();
        let mut result = PathSearchResult::default();

        while result.paths.len() < wanted {
            let outcome = {
                let mut astar = GenericAStar::new(&ctx);
                if let Some(deadline) = deadline {
                    astar = astar.with_deadline(deadline);
                }
                astar.search()
            };
            result.searches += 1;
            result.states_visited += outcome.states_visited;
            result.aborted |= outcome.aborted;

            let mut fresh = 0;
            let mut bannable = false;
            for state in outcome.target_states {
                let path = GraphPath::new(state, ctx.request.reverse_optimize, &ctx);
                if result.paths.iter().any(|p| p.same_route_as(&path)) {
                    continue;
                }
                let trips = path.trips();
                bannable |= !trips.is_empty();
                ctx.request.banned_trips.extend(trips);
                result.paths.push(path);
                fresh += 1;
            }
            debug!(search = result.searches, fresh, "path search round finished");
            if fresh == 0 || !bannable || result.aborted {
                break;
            }
        }

        result
            .paths
            .sort_by(|a, b| a.search_weight().total_cmp(&b.search_weight()));
        result.paths.truncate(wanted);
        info!(
            paths = result.paths.len(),
            searches = result.searches,
            states_visited = result.states_visited,
            aborted = result.aborted,
            "paths found"
        );
        result
    }
}
