//! Boarding, riding and alighting transit vehicles.
//!
//! A board/alight edge behaves in one of two ways depending on its role and
//! the search direction. Boarding in a depart-after search and alighting in
//! an arrive-by search both *enter* transit: they look up a trip in the
//! timetables of every service day of the search and pay for the wait.
//! The other two cases *leave* transit and clear the trip.

use std::sync::Arc;

use crate::domain::{PatternId, ServiceDay, TraverseMode};
use crate::graph::{Edge, Successors, Traversable};
use crate::routing::{RoutingContext, State, StateEditor, Terminal};
use crate::timetable::{TripMatch, TripPattern, TripTimes};

fn enters_transit(boarding: bool, arrive_by: bool) -> bool {
    boarding != arrive_by
}

/// Checks that apply to every way of entering `pattern`.
fn may_enter<'c>(
    pattern: PatternId,
    s0: &State,
    ctx: &'c RoutingContext<'_>,
) -> Option<&'c TripPattern> {
    let request = &ctx.request;
    if s0.is_onboard() {
        return None;
    }
    let pattern = ctx.graph.pattern(pattern)?;
    if !request.modes.contains(pattern.mode) || request.banned_routes.contains(&pattern.route) {
        return None;
    }
    (s0.num_boardings() <= request.max_transfers).then_some(pattern)
}

/// The time from which a vehicle may be caught, honouring the minimum
/// transfer time since the last vehicle was left.
fn earliest_catch(s0: &State, ctx: &RoutingContext<'_>) -> i64 {
    let slack = ctx.request.min_transfer_time;
    match s0.data().last_alighted_time {
        Some(last) if ctx.arrive_by() => s0.time().min(last - slack),
        Some(last) => s0.time().max(last + slack),
        None => s0.time(),
    }
}

/// The state reached by catching `found` on `day`.
fn board_trip(
    edge: &Edge,
    s0: &Arc<State>,
    ctx: &RoutingContext<'_>,
    pattern: &TripPattern,
    found: TripMatch,
    day: &ServiceDay,
) -> Option<State> {
    let request = &ctx.request;
    let wait = (found.time - s0.time()).abs();
    let mut ed = StateEditor::new(s0, edge, ctx);
    ed.set_time(found.time);
    let transfer = s0.data().ever_boarded;
    let reluctance = if transfer {
        request.wait_reluctance
    } else {
        request.wait_reluctance * request.wait_at_beginning_factor
    };
    let mut weight = wait as f64 * reluctance + request.board_cost;
    if transfer {
        weight += request.effective_transfer_penalty();
    } else {
        ed.set_initial_wait(wait);
    }
    ed.increment_weight(weight);
    ed.board(
        pattern.id,
        &pattern.route,
        pattern.mode,
        Some((found.trip_times, day.clone())),
    );
    ed.make_state()
}

/// Entering a pattern in a lower-bound search: no timetable lookup, no
/// waiting, only the boarding cost.
fn board_optimistic(
    edge: &Edge,
    s0: &Arc<State>,
    ctx: &RoutingContext<'_>,
    pattern: PatternId,
) -> Successors {
    let Some(pattern) = may_enter(pattern, s0, ctx) else {
        return Successors::Empty;
    };
    let mut ed = StateEditor::new(s0, edge, ctx);
    ed.increment_weight(ctx.request.board_cost);
    ed.board(pattern.id, &pattern.route, pattern.mode, None);
    ed.make_state().into()
}

/// Stepping off the vehicle at `stop_index`.
fn leave(
    edge: &Edge,
    s0: &Arc<State>,
    ctx: &RoutingContext<'_>,
    pattern: PatternId,
    stop_index: usize,
) -> Successors {
    let data = s0.data();
    if data.pattern != Some(pattern) {
        return Successors::Empty;
    }
    if let Some(times) = &data.trip_times {
        // Leaving backward in time means boarding here in travel order.
        let allowed = if ctx.arrive_by() {
            times.can_board(stop_index)
        } else {
            times.can_alight(stop_index)
        };
        if !allowed {
            return Successors::Empty;
        }
    }
    let mode = ctx
        .graph
        .pattern(pattern)
        .map_or(TraverseMode::Bus, |p| p.mode);
    let mut ed = StateEditor::new(s0, edge, ctx);
    ed.alight(mode);
    ed.make_state().into()
}

/// Boards or alights vehicles of a pattern with fixed trips.
#[derive(Debug, Clone)]
pub struct TransitBoardAlight {
    pub pattern: PatternId,
    pub stop_index: usize,
    pub boarding: bool,
}

impl TransitBoardAlight {
    /// The best trip across all service days: the soonest departure when
    /// boarding forward, the latest arrival when alighting backward.
    fn best_trip(
        &self,
        s0: &State,
        ctx: &RoutingContext<'_>,
        time: i64,
    ) -> Option<(TripMatch, ServiceDay)> {
        let forward = !ctx.arrive_by();
        let with_bike = s0.data().non_transit_mode == TraverseMode::Bicycle;
        let mut best: Option<(TripMatch, ServiceDay)> = None;
        for day in &ctx.service_days {
            let Some(timetable) = ctx.timetable(self.pattern, day.date()) else {
                continue;
            };
            let found = timetable.next_trip(self.stop_index, day, time, forward, |tt| {
                ctx.trip_acceptable(tt, with_bike)
            });
            let Some(found) = found else {
                continue;
            };
            let better = best.as_ref().is_none_or(|(b, _)| {
                if forward {
                    found.time < b.time
                } else {
                    found.time > b.time
                }
            });
            if better {
                best = Some((found, day.clone()));
            }
        }
        best
    }
}

impl Traversable for TransitBoardAlight {
    fn traverse(&self, edge: &Edge, s0: &Arc<State>, ctx: &RoutingContext<'_>) -> Successors {
        if !enters_transit(self.boarding, ctx.arrive_by()) {
            return leave(edge, s0, ctx, self.pattern, self.stop_index);
        }
        let Some(pattern) = may_enter(self.pattern, s0, ctx) else {
            return Successors::Empty;
        };
        let time = earliest_catch(s0, ctx);
        match self.best_trip(s0, ctx, time) {
            Some((found, day)) => board_trip(edge, s0, ctx, pattern, found, &day).into(),
            None => Successors::Empty,
        }
    }

    fn optimistic_traverse(
        &self,
        edge: &Edge,
        s0: &Arc<State>,
        ctx: &RoutingContext<'_>,
    ) -> Successors {
        if enters_transit(self.boarding, ctx.arrive_by()) {
            board_optimistic(edge, s0, ctx, self.pattern)
        } else {
            leave(edge, s0, ctx, self.pattern, self.stop_index)
        }
    }

    fn terminal(&self) -> Terminal {
        if self.boarding {
            Terminal::Board
        } else {
            Terminal::Alight
        }
    }
}

/// Boards or alights vehicles of a headway-based pattern.
///
/// Entering yields one successor per frequency entry that can be caught;
/// leaving is handled by the pattern's [`TransitBoardAlight`] edges.
#[derive(Debug, Clone)]
pub struct FrequencyBoard {
    pub pattern: PatternId,
    pub stop_index: usize,
    pub boarding: bool,
}

impl Traversable for FrequencyBoard {
    fn traverse(&self, edge: &Edge, s0: &Arc<State>, ctx: &RoutingContext<'_>) -> Successors {
        if !enters_transit(self.boarding, ctx.arrive_by()) {
            return Successors::Empty;
        }
        let Some(pattern) = may_enter(self.pattern, s0, ctx) else {
            return Successors::Empty;
        };
        let forward = !ctx.arrive_by();
        let with_bike = s0.data().non_transit_mode == TraverseMode::Bicycle;
        let time = earliest_catch(s0, ctx);
        ctx.service_days
            .iter()
            .flat_map(|day| {
                let runs = ctx
                    .timetable(self.pattern, day.date())
                    .map(|tt| {
                        tt.frequency_trips(self.stop_index, day, time, forward, |t| {
                            ctx.trip_acceptable(t, with_bike)
                        })
                    })
                    .unwrap_or_default();
                runs.into_iter().map(move |found| (found, day))
            })
            .filter_map(|(found, day)| board_trip(edge, s0, ctx, pattern, found, day))
            .collect()
    }

    fn optimistic_traverse(
        &self,
        edge: &Edge,
        s0: &Arc<State>,
        ctx: &RoutingContext<'_>,
    ) -> Successors {
        if enters_transit(self.boarding, ctx.arrive_by()) {
            board_optimistic(edge, s0, ctx, self.pattern)
        } else {
            Successors::Empty
        }
    }

    fn terminal(&self) -> Terminal {
        if self.boarding {
            Terminal::Board
        } else {
            Terminal::Alight
        }
    }
}

/// Riding from one stop of a pattern to the next.
#[derive(Debug, Clone)]
pub struct PatternHop {
    pub pattern: PatternId,
    /// The stop the hop leaves from.
    pub stop_index: usize,
}

/// Staying on board while the vehicle stands at a stop.
#[derive(Debug, Clone)]
pub struct PatternDwell {
    pub pattern: PatternId,
    pub stop_index: usize,
}

/// Advance an on-board state by `seconds` of riding.
fn ride(
    edge: &Edge,
    s0: &Arc<State>,
    ctx: &RoutingContext<'_>,
    pattern: PatternId,
    seconds: impl FnOnce(Option<&TripTimes>) -> Option<i32>,
) -> Successors {
    let data = s0.data();
    if data.pattern != Some(pattern) {
        return Successors::Empty;
    }
    let Some(seconds) = seconds(data.trip_times.as_deref()).filter(|s| *s >= 0) else {
        return Successors::Empty;
    };
    let mut ed = StateEditor::new(s0, edge, ctx);
    ed.increment_time(i64::from(seconds));
    ed.increment_weight(f64::from(seconds));
    ed.make_state().into()
}

impl Traversable for PatternHop {
    fn traverse(&self, edge: &Edge, s0: &Arc<State>, ctx: &RoutingContext<'_>) -> Successors {
        ride(edge, s0, ctx, self.pattern, |tt| {
            tt.map(|t| t.running_time(self.stop_index))
        })
    }

    /// Uses the shortest running time of any trip on the pattern.
    fn optimistic_traverse(
        &self,
        edge: &Edge,
        s0: &Arc<State>,
        ctx: &RoutingContext<'_>,
    ) -> Successors {
        let best = ctx
            .graph
            .pattern(self.pattern)
            .map(|p| p.best_running_time(self.stop_index));
        ride(edge, s0, ctx, self.pattern, |_| best)
    }

    fn terminal(&self) -> Terminal {
        Terminal::Ride
    }
}

impl Traversable for PatternDwell {
    fn traverse(&self, edge: &Edge, s0: &Arc<State>, ctx: &RoutingContext<'_>) -> Successors {
        ride(edge, s0, ctx, self.pattern, |tt| {
            tt.map(|t| t.dwell_time(self.stop_index))
        })
    }

    fn optimistic_traverse(
        &self,
        edge: &Edge,
        s0: &Arc<State>,
        ctx: &RoutingContext<'_>,
    ) -> Successors {
        let best = ctx
            .graph
            .pattern(self.pattern)
            .map(|p| p.best_dwell_time(self.stop_index));
        ride(edge, s0, ctx, self.pattern, |_| best)
    }

    fn terminal(&self) -> Terminal {
        Terminal::Ride
    }
}
