use std::time::Instant;

use tracing::trace;

use crate::domain::{Coordinate, VertexId};
use crate::routing::{RoutingContext, State};

use super::RemainingWeightHeuristic;

/// Straight-line distance to the target, costed at the cheapest rate any
/// allowed mode could manage.
///
/// For transit searches the estimate is the lesser of travelling the
/// whole way on the street and a transit journey that boards at least
/// once, rides at the optimistic transit speed and walks from the stop
/// nearest the target.
///
/// Admissible as long as street lengths are no shorter than the straight
/// line between their ends, vehicles never beat `max_transit_speed`, and
/// stops sit where the street vertices they link to are.
pub struct EuclideanHeuristic<'c, 'g> {
    ctx: &'c RoutingContext<'g>,
    target: Option<Coordinate>,
    /// Metres from the target to its nearest transit stop.
    egress_m: f64,
    street_per_metre: f64,
    transit_per_metre: f64,
}

impl<'c, 'g> EuclideanHeuristic<'c, 'g> {
    pub fn new(ctx: &'c RoutingContext<'g>) -> Self {
        let request = &ctx.request;
        let street_per_metre = request.min_street_reluctance() / request.street_speed_bound();
        Self {
            ctx,
            target: None,
            egress_m: 0.0,
            street_per_metre,
            transit_per_metre: street_per_metre.min(1.0 / request.max_transit_speed),
        }
    }

    fn nearest_stop_distance(&self, vertex: VertexId, at: Coordinate) -> f64 {
        let compute = || {
            self.ctx
                .graph
                .transit_stops()
                .map(|stop| self.ctx.distance.distance(at, stop.coordinate()))
                .fold(f64::INFINITY, f64::min)
        };
        match &self.ctx.stop_distances {
            Some(cache) => cache.get_with(vertex, compute),
            None => compute(),
        }
    }
}

impl RemainingWeightHeuristic for EuclideanHeuristic<'_, '_> {
    fn initialize(
        &mut self,
        _: &State,
        target: Option<VertexId>,
        _: Option<Instant>,
    ) -> bool {
        let Some((id, at)) = target
            .and_then(|t| self.ctx.graph.vertex(t))
            .map(|v| (v.id(), v.coordinate()))
        else {
            self.target = None;
            return true;
        };
        self.target = Some(at);
        self.egress_m = if self.ctx.request.modes.allows_transit() {
            self.nearest_stop_distance(id, at)
        } else {
            0.0
        };
        trace!(target = ?id, egress_m = self.egress_m, "euclidean heuristic ready");
        true
    }

    fn compute_forward_weight(&self, state: &State, _: Option<VertexId>) -> f64 {
        let (Some(target), Some(here)) = (self.target, self.ctx.graph.vertex(state.vertex()))
        else {
            return 0.0;
        };
        let d = self.ctx.distance.distance(here.coordinate(), target);
        if !self.ctx.request.modes.allows_transit() {
            return d * self.street_per_metre;
        }
        if state.is_onboard() {
            return d * self.transit_per_metre;
        }
        let by_street = d * self.street_per_metre;
        if !self.egress_m.is_finite() {
            return by_street;
        }
        let by_transit = self.ctx.request.board_cost
            + self.egress_m * self.street_per_metre
            + (d - self.egress_m).max(0.0) * self.transit_per_metre;
        by_street.min(by_transit)
    }

    fn reset(&mut self) {
        self.target = None;
        self.egress_m = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TraverseModeSet;
    use crate::graph::{Graph, GraphBuilder, VertexKind};
    use crate::routing::RoutingRequest;

    fn graph() -> (Graph, VertexId, VertexId) {
        let mut b = GraphBuilder::default();
        let a = b
            .intersection("a", Coordinate::new(0.0, 0.0).unwrap())
            .unwrap();
        let z = b
            .intersection("z", Coordinate::new(0.0, 0.01).unwrap())
            .unwrap();
        (b.build(), a, z)
    }

    #[test]
    fn walk_only_estimate_is_distance_over_speed() {
        let (g, a, z) = graph();
        let mut request = RoutingRequest::new(a, z, 0);
        request.modes = TraverseModeSet::walk_only();
        let ctx = RoutingContext::new(&g, request, None).unwrap();
        let mut h = EuclideanHeuristic::new(&ctx);
        let s0 = State::initial(&ctx);
        assert!(h.initialize(&s0, ctx.target, None));

        let d = ctx.distance.distance(
            g.vertex(a).unwrap().coordinate(),
            g.vertex(z).unwrap().coordinate(),
        );
        let expected = d * ctx.request.min_street_reluctance() / ctx.request.walk_speed;
        assert!((h.compute_forward_weight(&s0, ctx.target) - expected).abs() < 1e-9);
        assert_eq!(g.vertex(a).map(|v| v.kind().clone()), Some(VertexKind::Intersection));
    }

    #[test]
    fn no_stops_falls_back_to_street() {
        let (g, a, z) = graph();
        let ctx = RoutingContext::new(&g, RoutingRequest::new(a, z, 0), None).unwrap();
        let mut h = EuclideanHeuristic::new(&ctx);
        let s0 = State::initial(&ctx);
        h.initialize(&s0, ctx.target, None);
        let w = h.compute_forward_weight(&s0, ctx.target);
        assert!(w.is_finite() && w > 0.0);
    }

    #[test]
    fn zero_at_target() {
        let (g, a, z) = graph();
        let ctx = RoutingContext::new(&g, RoutingRequest::new(z, a, 0), None).unwrap();
        let mut h = EuclideanHeuristic::new(&ctx);
        let at_target = State::at(a, 0, &ctx);
        h.initialize(&at_target, ctx.target, None);
        assert_eq!(h.compute_forward_weight(&at_target, ctx.target), 0.0);
    }
}
