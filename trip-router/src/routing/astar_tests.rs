//! Search behaviour on small hand-built networks.

use std::sync::Arc;
use std::time::Instant;

use proptest::prelude::*;

use super::spt::tests::state_at;
use super::*;
use crate::domain::{Coordinate, RouteId, StopId, TraverseMode, TraverseModeSet, TripId, VertexId};
use crate::graph::edges::StreetEdge;
use crate::graph::{EdgeKind, FrequencyWindow, Graph, GraphBuilder};
use crate::timetable::{Trip, TripTimes};

/// 2024-03-15T00:00:00Z.
const MIDNIGHT: i64 = 1_710_460_800;

fn coord(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).unwrap()
}

fn walk_request(from: VertexId, to: VertexId) -> RoutingRequest {
    let mut request = RoutingRequest::new(from, to, MIDNIGHT + 8 * 3600);
    request.modes = TraverseModeSet::walk_only();
    request
}

/// Two vertices joined by one street whose traversal weighs exactly 5.
fn single_edge() -> (Graph, VertexId, VertexId) {
    let mut b = GraphBuilder::default();
    let a = b.intersection("a", coord(0.0, 0.0)).unwrap();
    let z = b.intersection("z", coord(0.0, 0.0)).unwrap();
    b.street(a, z, StreetEdge::new("e", 5.0, TraverseModeSet::walk_only()))
        .unwrap();
    (b.build(), a, z)
}

struct Transit {
    graph: Graph,
    home: VertexId,
    work: VertexId,
}

fn trip(id: &str, route: &RouteId) -> Trip {
    Trip {
        id: TripId::new(id).unwrap(),
        route: route.clone(),
        service: None,
        wheelchair_accessible: true,
        bikes_allowed: false,
    }
}

/// Home and work 5.5 km apart, with a direct street and a bus between
/// stops next to each. Buses leave at 08:00 and 08:30 and take 10 minutes.
fn transit() -> Transit {
    let mut b = GraphBuilder::default();
    let home = b.intersection("home", coord(0.0, 0.0)).unwrap();
    let near_home = b.intersection("near-home", coord(0.0, 0.001)).unwrap();
    let near_work = b.intersection("near-work", coord(0.0, 0.049)).unwrap();
    let work = b.intersection("work", coord(0.0, 0.05)).unwrap();
    let walk = TraverseModeSet::walk_only();
    b.street_pair(home, near_home, "Home Rd", walk).unwrap();
    b.street_pair(near_home, near_work, "Long Rd", walk).unwrap();
    b.street_pair(near_work, work, "Work Rd", walk).unwrap();

    let s1 = StopId::new("S1").unwrap();
    let s2 = StopId::new("S2").unwrap();
    let v1 = b.stop(s1.clone(), coord(0.0, 0.001), true).unwrap();
    let v2 = b.stop(s2.clone(), coord(0.0, 0.049), true).unwrap();
    b.link(near_home, v1).unwrap();
    b.link(near_work, v2).unwrap();

    let route = RouteId::new("R1").unwrap();
    let trips = [("T1", 8 * 3600), ("T2", 8 * 3600 + 1800)]
        .into_iter()
        .map(|(id, dep)| TripTimes::new(trip(id, &route), vec![dep, dep + 600], vec![dep, dep + 600]).unwrap())
        .collect();
    b.pattern(route, TraverseMode::Bus, vec![s1, s2], trips, Vec::new())
        .unwrap();
    Transit {
        graph: b.build(),
        home,
        work,
    }
}

#[test]
fn dijkstra_finds_the_single_edge() {
    let (g, a, z) = single_edge();
    let mut request = RoutingRequest::batch(a, MIDNIGHT);
    request.modes = TraverseModeSet::walk_only();
    request.walk_speed = 1.0;
    request.walk_reluctance = 1.0;
    let ctx = RoutingContext::new(&g, request, None).unwrap();

    let spt = GenericDijkstra::new(&ctx).search();
    let paths = spt.paths(z, false, &ctx);
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].weight(), 5.0);
    assert_eq!(paths[0].edges().len(), 1);
    assert_eq!(paths[0].duration(), 5);
}

#[test]
fn negative_increments_produce_no_state() {
    let (g, a, z) = single_edge();
    let ctx = RoutingContext::new(&g, walk_request(a, z), None).unwrap();
    let s0 = Arc::new(State::initial(&ctx));
    let edge = g.outgoing(a).next().unwrap();

    let mut ed = StateEditor::new(&s0, edge, &ctx);
    ed.increment_weight(-1.0);
    assert!(ed.make_state().is_none());

    let mut ed = StateEditor::new(&s0, edge, &ctx);
    ed.set_time(s0.time() - 10);
    assert!(ed.make_state().is_none());

    let mut ed = StateEditor::new(&s0, edge, &ctx);
    ed.increment_time(3);
    ed.increment_weight(2.0);
    let s1 = ed.make_state().unwrap();
    assert_eq!(s1.vertex(), z);
    assert!(s1.shares_data_with(&s0));
}

#[test]
fn editor_copies_data_only_on_change() {
    let (g, a, z) = single_edge();
    let ctx = RoutingContext::new(&g, walk_request(a, z), None).unwrap();
    let s0 = Arc::new(State::initial(&ctx));
    let edge = g.outgoing(a).next().unwrap();

    let mut ed = StateEditor::new(&s0, edge, &ctx);
    ed.set_back_mode(TraverseMode::Walk);
    let s1 = ed.make_state().unwrap();
    assert!(!s1.shares_data_with(&s0));
    assert_eq!(s0.data().back_mode, None);
}

#[test]
fn wrong_endpoint_produces_no_state() {
    let (g, a, z) = single_edge();
    let ctx = RoutingContext::new(&g, walk_request(a, z), None).unwrap();
    let at_z = Arc::new(State::at(z, MIDNIGHT, &ctx));
    let edge = g.outgoing(a).next().unwrap();
    assert!(edge.traverse(&at_z, &ctx).next().is_none());
}

#[test]
fn past_deadline_aborts_but_returns() {
    let t = transit();
    let ctx = RoutingContext::new(&t.graph, RoutingRequest::new(t.home, t.work, MIDNIGHT), None)
        .unwrap();
    let outcome = GenericAStar::new(&ctx).with_deadline(Instant::now()).search();
    assert!(outcome.aborted);
    assert!(outcome.states_visited <= 1);
    assert!(outcome.target_states.is_empty());
}

#[test]
fn unreachable_target_gives_empty_result() {
    let mut b = GraphBuilder::default();
    let a = b.intersection("a", coord(0.0, 0.0)).unwrap();
    let z = b.intersection("z", coord(0.0, 0.01)).unwrap();
    let g = b.build();
    let ctx = RoutingContext::new(&g, walk_request(a, z), None).unwrap();
    let outcome = GenericAStar::new(&ctx).search();
    assert!(!outcome.aborted);
    assert!(outcome.target_states.is_empty());
    assert!(outcome.spt.state(a).is_some());
}

#[test]
fn origin_is_target() {
    let (g, a, _) = single_edge();
    let ctx = RoutingContext::new(&g, walk_request(a, a), None).unwrap();
    let outcome = GenericAStar::new(&ctx).search();
    assert_eq!(outcome.target_states.len(), 1);
    let path = GraphPath::new(Arc::clone(&outcome.target_states[0]), true, &ctx);
    assert!(path.edges().is_empty());
    assert_eq!(path.weight(), 0.0);
}

#[test]
fn takes_the_first_bus() {
    let t = transit();
    let mut request = RoutingRequest::new(t.home, t.work, MIDNIGHT + 8 * 3600 - 300);
    request.reverse_optimize = false;
    let ctx = RoutingContext::new(&t.graph, request, None).unwrap();
    let outcome = GenericAStar::new(&ctx).search();
    let best = outcome
        .target_states
        .iter()
        .min_by(|a, b| a.weight().total_cmp(&b.weight()))
        .unwrap();
    let path = GraphPath::new(Arc::clone(best), false, &ctx);
    assert_eq!(path.trips(), vec![TripId::new("T1").unwrap()]);
    assert_eq!(path.num_boardings(), 1);
    assert_eq!(path.start_time(), MIDNIGHT + 8 * 3600 - 300);
    assert!(path.end_time() > MIDNIGHT + 8 * 3600 + 600);
    assert_eq!(path.routes(), vec![RouteId::new("R1").unwrap()]);
}

#[test]
fn reverse_optimization_removes_the_initial_wait() {
    let t = transit();
    let depart = MIDNIGHT + 8 * 3600 - 300;
    let ctx = RoutingContext::new(&t.graph, RoutingRequest::new(t.home, t.work, depart), None)
        .unwrap();
    let outcome = GenericAStar::new(&ctx).search();
    let best = Arc::clone(&outcome.target_states[0]);

    let as_found = GraphPath::new(Arc::clone(&best), false, &ctx);
    let optimized = GraphPath::new(Arc::clone(&best), true, &ctx);
    assert!(optimized.is_optimized());
    assert!(optimized.start_time() > as_found.start_time());
    assert_eq!(optimized.end_time(), as_found.end_time());
    assert_eq!(optimized.trips(), as_found.trips());
    assert_eq!(optimized.edges(), as_found.edges());
    assert_eq!(as_found.search_weight(), as_found.weight());
    assert_eq!(optimized.search_weight(), best.weight());
}

#[test]
fn arrive_by_takes_the_last_bus_that_makes_it() {
    let t = transit();
    let mut request = RoutingRequest::new(t.home, t.work, MIDNIGHT + 9 * 3600);
    request.arrive_by = true;
    let ctx = RoutingContext::new(&t.graph, request, None).unwrap();
    let result = GraphPathFinder::new(&ctx).find_paths();
    let path = &result.paths[0];
    assert_eq!(path.trips(), vec![TripId::new("T2").unwrap()]);
    assert!(path.end_time() <= MIDNIGHT + 9 * 3600);
    assert_eq!(path.vertices().next(), Some(t.home));
    assert_eq!(path.vertices().last(), Some(t.work));
}

#[test]
fn path_finder_bans_used_trips() {
    let t = transit();
    let mut request = RoutingRequest::new(t.home, t.work, MIDNIGHT + 8 * 3600 - 300);
    request.num_itineraries = 2;
    let ctx = RoutingContext::new(&t.graph, request, None).unwrap();
    let result = GraphPathFinder::new(&ctx).find_paths();
    assert_eq!(result.paths.len(), 2);
    assert!(result.searches >= 2);
    assert_ne!(result.paths[0].trips(), result.paths[1].trips());
    assert!(result.paths[0].search_weight() <= result.paths[1].search_weight());
}

#[test]
fn paths_rank_on_the_weight_the_search_found() {
    let t = transit();
    let depart = MIDNIGHT + 8 * 3600 - 300;
    let mut request = RoutingRequest::new(t.home, t.work, depart);
    request.num_itineraries = 3;
    let ctx = RoutingContext::new(&t.graph, request.clone(), None).unwrap();
    let result = GraphPathFinder::new(&ctx).find_paths();
    assert!(result.paths.len() >= 2);
    assert!(
        result
            .paths
            .windows(2)
            .all(|w| w[0].search_weight() <= w[1].search_weight())
    );

    // Each ranked weight is what a plain search reports for that path.
    request.reverse_optimize = false;
    let plain_ctx = RoutingContext::new(&t.graph, request, None).unwrap();
    let plain = GraphPathFinder::new(&plain_ctx).find_paths();
    let ranked: Vec<f64> = result.paths.iter().map(|p| p.search_weight()).collect();
    let unoptimized: Vec<f64> = plain.paths.iter().map(|p| p.weight()).collect();
    assert_eq!(ranked, unoptimized);
    assert!(result.paths.iter().any(|p| p.is_optimized()));
}

#[test]
fn banned_route_falls_back_to_walking() {
    let t = transit();
    let mut request = RoutingRequest::new(t.home, t.work, MIDNIGHT + 8 * 3600 - 300);
    request.banned_routes.insert(RouteId::new("R1").unwrap());
    let ctx = RoutingContext::new(&t.graph, request, None).unwrap();
    let result = GraphPathFinder::new(&ctx).find_paths();
    assert_eq!(result.paths.len(), 1);
    assert!(result.paths[0].trips().is_empty());
    assert!(result.paths[0].walk_distance() > 5000.0);
}

#[test]
fn heuristics_agree_on_the_best_transit_path() {
    let t = transit();
    let weights: Vec<f64> = [
        HeuristicKind::Trivial,
        HeuristicKind::Euclidean,
        HeuristicKind::LowerBound,
    ]
    .into_iter()
    .map(|kind| {
        let mut request = RoutingRequest::new(t.home, t.work, MIDNIGHT + 8 * 3600 - 300);
        request.heuristic = kind;
        let ctx = RoutingContext::new(&t.graph, request, None).unwrap();
        let outcome = GenericAStar::new(&ctx).search();
        outcome.best_weight.unwrap()
    })
    .collect();
    assert!((weights[0] - weights[1]).abs() < 1e-6, "{weights:?}");
    assert!((weights[0] - weights[2]).abs() < 1e-6, "{weights:?}");
}

#[test]
fn oversearch_stops_expansion() {
    // A short spoke to the target and long dead-end spokes.
    let mut b = GraphBuilder::default();
    let hub = b.intersection("hub", coord(0.0, 0.0)).unwrap();
    let target = b.intersection("target", coord(0.0, 0.0)).unwrap();
    b.street(hub, target, StreetEdge::new("short", 10.0, TraverseModeSet::walk_only()))
        .unwrap();
    for (i, length) in [20.0, 35.0, 80.0, 200.0].into_iter().enumerate() {
        let end = b.intersection(format!("end{i}"), coord(0.0, 0.0)).unwrap();
        b.street(hub, end, StreetEdge::new("spoke", length, TraverseModeSet::walk_only()))
            .unwrap();
    }
    let g = b.build();
    let mut request = walk_request(hub, target);
    request.walk_speed = 1.0;
    request.walk_reluctance = 1.0;
    request.heuristic = HeuristicKind::Trivial;
    request.num_itineraries = 5;
    let ctx = RoutingContext::new(&g, request, None).unwrap();

    let mut visited = Vec::new();
    let outcome = {
        let mut astar = GenericAStar::new(&ctx).with_termination(|s: &State| {
            visited.push(s.weight());
            false
        });
        astar.search()
    };
    let best = outcome.best_weight.unwrap();
    assert_eq!(best, 10.0);
    assert!(visited.iter().all(|w| *w <= 4.0 * best), "{visited:?}");
    assert!(visited.contains(&35.0));
    assert!(!visited.contains(&80.0));
}

#[test]
fn multi_target_termination_stops_dijkstra() {
    let t = transit();
    let mut request = RoutingRequest::batch(t.home, MIDNIGHT + 8 * 3600 - 300);
    request.modes = TraverseModeSet::walk_only();
    let ctx = RoutingContext::new(&t.graph, request, None).unwrap();
    let near = t.graph.vertex_by_label("near-home").unwrap();
    let spt = GenericDijkstra::new(&ctx)
        .with_termination(MultiTargetTerminationStrategy::new([near]))
        .search();
    assert!(spt.state(near).is_some());
    assert!(spt.state(t.work).is_none());
}

#[test]
fn skip_edge_strategy_prunes() {
    let (g, a, z) = single_edge();
    let mut request = RoutingRequest::batch(a, MIDNIGHT);
    request.modes = TraverseModeSet::walk_only();
    let ctx = RoutingContext::new(&g, request, None).unwrap();
    let spt = GenericDijkstra::new(&ctx)
        .with_skip_edge(|_: &State, _: &crate::graph::Edge| true)
        .search();
    assert!(spt.state(z).is_none());
    assert_eq!(spt.vertex_count(), 1);
}

/// Two stops served by one headway-based route with two templates: F1
/// leaves S1 at 08:00 and F2 at 08:20, each taking 10 minutes to S2.
fn frequency_service() -> (Graph, VertexId, VertexId) {
    let mut b = GraphBuilder::default();
    let s1 = StopId::new("S1").unwrap();
    let s2 = StopId::new("S2").unwrap();
    let v1 = b.stop(s1.clone(), coord(0.0, 0.0), true).unwrap();
    let v2 = b.stop(s2.clone(), coord(0.0, 0.05), true).unwrap();
    let route = RouteId::new("R").unwrap();
    let runs = [("F1", 8 * 3600), ("F2", 8 * 3600 + 1200)]
        .into_iter()
        .map(|(id, start)| {
            let template = TripTimes::new(trip(id, &route), vec![0, 600], vec![0, 600]).unwrap();
            let window = FrequencyWindow {
                start,
                end: start + 3600,
                headway: 3600,
                exact_times: true,
            };
            (template, window)
        })
        .collect();
    b.pattern(route, TraverseMode::Bus, vec![s1, s2], Vec::new(), runs)
        .unwrap();
    (b.build(), v1, v2)
}

#[test]
fn frequency_board_yields_one_state_per_departure() {
    let (g, s1, s2) = frequency_service();
    let depart = MIDNIGHT + 8 * 3600 - 300;
    let ctx = RoutingContext::new(&g, RoutingRequest::new(s1, s2, depart), None).unwrap();
    let s0 = Arc::new(State::initial(&ctx));
    let edge = g
        .outgoing(s1)
        .find(|e| matches!(e.kind(), EdgeKind::FrequencyBoard(_)))
        .unwrap();

    let mut boarded: Vec<State> = edge.traverse(&s0, &ctx).collect();
    boarded.sort_by_key(|s| s.time());
    let found: Vec<(&str, i64)> = boarded
        .iter()
        .map(|s| (s.trip().unwrap().as_str(), s.time() - MIDNIGHT))
        .collect();
    // Today's runs, then tomorrow's.
    assert_eq!(
        found,
        vec![
            ("F1", 8 * 3600),
            ("F2", 8 * 3600 + 1200),
            ("F1", 86_400 + 8 * 3600),
            ("F2", 86_400 + 8 * 3600 + 1200),
        ]
    );
    for s in &boarded {
        assert!(s.time() >= s0.time());
        assert!(s.weight() > s0.weight());
        assert!(s.is_onboard());
        assert_eq!(s.num_boardings(), 1);
    }
    assert!(boarded[0].weight() < boarded[1].weight());
}

#[test]
fn search_rides_the_earlier_frequency_departure() {
    let (g, s1, s2) = frequency_service();
    let mut request = RoutingRequest::new(s1, s2, MIDNIGHT + 8 * 3600 - 300);
    request.reverse_optimize = false;
    let ctx = RoutingContext::new(&g, request, None).unwrap();
    let outcome = GenericAStar::new(&ctx).search();
    let best = outcome
        .target_states
        .iter()
        .min_by(|a, b| a.weight().total_cmp(&b.weight()))
        .unwrap();
    let path = GraphPath::new(Arc::clone(best), false, &ctx);
    assert_eq!(path.trips(), vec![TripId::new("F1").unwrap()]);
    assert_eq!(path.end_time(), MIDNIGHT + 8 * 3600 + 600);
}

/// Claims every state is already past the target.
struct Negative;

impl RemainingWeightHeuristic for Negative {
    fn initialize(&mut self, _: &State, _: Option<VertexId>, _: Option<Instant>) -> bool {
        true
    }

    fn compute_forward_weight(&self, _: &State, _: Option<VertexId>) -> f64 {
        -1.0
    }
}

#[test]
fn negative_estimates_drop_successors() {
    let (g, a, z) = single_edge();
    let ctx = RoutingContext::new(&g, walk_request(a, z), None).unwrap();

    let outcome = GenericAStar::new(&ctx).search_with(&mut Negative);
    assert!(outcome.target_states.is_empty());
    assert!(outcome.spt.state(z).is_none());

    let outcome = GenericAStar::new(&ctx).search_with(&mut TrivialHeuristic);
    assert_eq!(outcome.target_states.len(), 1);
}

/// A walkable grid of `n` by `n` intersections 100 m apart, with each
/// street `stretch` times as long as the straight line.
fn grid(n: usize, stretch: &[f64]) -> Graph {
    let mut b = GraphBuilder::default();
    let step = 0.0009;
    let ids: Vec<Vec<VertexId>> = (0..n)
        .map(|r| {
            (0..n)
                .map(|c| {
                    b.intersection(format!("{r},{c}"), coord(r as f64 * step, c as f64 * step))
                        .unwrap()
                })
                .collect()
        })
        .collect();
    let straight = b
        .graph()
        .vertex(ids[0][0])
        .zip(b.graph().vertex(ids[0][1.min(n - 1)]))
        .map_or(100.0, |(x, y)| {
            crate::domain::DistanceLibrary::default().distance(x.coordinate(), y.coordinate())
        });
    let mut k = 0;
    for r in 0..n {
        for c in 0..n {
            for (dr, dc) in [(0, 1), (1, 0)] {
                let (r2, c2) = (r + dr, c + dc);
                if r2 >= n || c2 >= n {
                    continue;
                }
                let length = straight * stretch[k % stretch.len()];
                k += 1;
                for (x, y) in [(ids[r][c], ids[r2][c2]), (ids[r2][c2], ids[r][c])] {
                    b.street(x, y, StreetEdge::new("grid", length, TraverseModeSet::walk_only()))
                        .unwrap();
                }
            }
        }
    }
    b.build()
}

fn corner(g: &Graph, r: usize, c: usize) -> VertexId {
    g.vertex_by_label(&format!("{r},{c}")).unwrap()
}

proptest! {
    #[test]
    fn astar_matches_dijkstra(
        n in 2usize..5,
        stretch in prop::collection::vec(1.01f64..3.0, 1..24),
        heuristic in prop_oneof![
            Just(HeuristicKind::Euclidean),
            Just(HeuristicKind::LowerBound),
        ],
    ) {
        let g = grid(n, &stretch);
        let (from, to) = (corner(&g, 0, 0), corner(&g, n - 1, n - 1));

        let mut request = walk_request(from, to);
        request.heuristic = heuristic;
        let ctx = RoutingContext::new(&g, request, None).unwrap();
        let astar = GenericAStar::new(&ctx).search();

        let mut batch = RoutingRequest::batch(from, MIDNIGHT + 8 * 3600);
        batch.modes = TraverseModeSet::walk_only();
        let batch_ctx = RoutingContext::new(&g, batch, None).unwrap();
        let spt = GenericDijkstra::new(&batch_ctx).search();

        let expected = spt.state(to).map(|s| s.weight()).unwrap();
        let found = astar.best_weight.unwrap();
        prop_assert!((expected - found).abs() < 1e-6, "dijkstra {} a* {}", expected, found);
    }

    #[test]
    fn weights_and_times_move_with_the_search(
        n in 2usize..5,
        stretch in prop::collection::vec(1.01f64..3.0, 1..24),
        arrive_by in any::<bool>(),
    ) {
        let g = grid(n, &stretch);
        let mut request = RoutingRequest::batch(corner(&g, 0, 0), MIDNIGHT + 8 * 3600);
        request.modes = TraverseModeSet::walk_only();
        request.arrive_by = arrive_by;
        let ctx = RoutingContext::new(&g, request, None).unwrap();
        let spt = GenericDijkstra::new(&ctx).search();

        for v in spt.vertices() {
            for s in spt.states(v) {
                if let Some(back) = s.back_state() {
                    prop_assert!(s.weight() >= back.weight());
                    if arrive_by {
                        prop_assert!(s.time() <= back.time());
                    } else {
                        prop_assert!(s.time() >= back.time());
                    }
                }
            }
        }
    }

    #[test]
    fn pareto_tree_keeps_no_dominated_state(
        offers in prop::collection::vec((0.0f64..100.0, 0i64..100, 0u32..4), 1..40),
    ) {
        let dominance = DominanceFunction::pareto();
        let mut spt = MultiShortestPathTree::new(dominance.clone());
        for (weight, elapsed, boardings) in offers {
            spt.add(Arc::new(state_at(0, weight, elapsed, boardings)));
        }
        let kept = spt.states(VertexId(0));
        prop_assert!(!kept.is_empty());
        for (i, a) in kept.iter().enumerate() {
            for (j, b) in kept.iter().enumerate() {
                if i != j {
                    prop_assert!(!dominance.dominates(a, b));
                }
            }
        }
    }
}
