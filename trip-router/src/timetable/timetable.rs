//! Timetables and trip patterns.

use std::sync::Arc;

use chrono::NaiveDate;

use super::{FrequencyEntry, TripTimes};
use crate::domain::{PatternId, RouteId, ServiceDay, StopId, TraverseMode, TripId};

/// A trip found in a timetable, with the absolute time at which it departs
/// (boarding) or arrives (alighting) at the requested stop.
#[derive(Debug, Clone)]
pub struct TripMatch {
    pub trip_times: Arc<TripTimes>,
    pub time: i64,
}

/// All trips of one pattern, either as scheduled or as updated in real time
/// for one service date.
#[derive(Debug, Clone, PartialEq)]
pub struct Timetable {
    pattern: PatternId,
    service_date: Option<NaiveDate>,
    trip_times: Vec<Arc<TripTimes>>,
    frequency_entries: Vec<FrequencyEntry>,
}

impl Timetable {
    /// An empty scheduled timetable.
    pub fn new(pattern: PatternId) -> Self {
        Self {
            pattern,
            service_date: None,
            trip_times: Vec::new(),
            frequency_entries: Vec::new(),
        }
    }

    /// A copy of this timetable that applies only to `date`.
    pub fn for_date(&self, date: NaiveDate) -> Self {
        Self {
            service_date: Some(date),
            ..self.clone()
        }
    }

    pub fn pattern(&self) -> PatternId {
        self.pattern
    }

    pub fn service_date(&self) -> Option<NaiveDate> {
        self.service_date
    }

    pub fn trip_times(&self) -> &[Arc<TripTimes>] {
        &self.trip_times
    }

    pub fn frequency_entries(&self) -> &[FrequencyEntry] {
        &self.frequency_entries
    }

    pub fn add_trip_times(&mut self, times: TripTimes) {
        self.trip_times.push(Arc::new(times));
    }

    pub fn add_frequency_entry(&mut self, entry: FrequencyEntry) {
        self.frequency_entries.push(entry);
    }

    /// Position of `trip` among this timetable's scheduled trips.
    pub fn trip_index(&self, trip: &TripId) -> Option<usize> {
        self.trip_times.iter().position(|t| t.trip_id() == trip)
    }

    /// Replace the times of the trip at `index`.
    pub fn set_trip_times(&mut self, index: usize, times: TripTimes) {
        self.trip_times[index] = Arc::new(times);
    }

    fn runs_on(&self, times: &TripTimes, day: &ServiceDay) -> bool {
        if self.service_date.is_some_and(|d| d != day.date()) {
            return false;
        }
        times.trip().service.as_ref().is_none_or(|s| day.serves(s))
    }

    /// Find the best scheduled trip at `stop` on `day`.
    ///
    /// When `boarding`, the trip departing soonest at or after `time`;
    /// otherwise the trip arriving latest at or before `time`. Trips
    /// rejected by `accept` are ignored.
    pub fn next_trip(
        &self,
        stop: usize,
        day: &ServiceDay,
        time: i64,
        boarding: bool,
        accept: impl Fn(&TripTimes) -> bool,
    ) -> Option<TripMatch> {
        let candidates = self.trip_times.iter().filter(|tt| {
            let times: &TripTimes = tt;
            self.runs_on(times, day) && accept(times)
        });
        let found = if boarding {
            candidates
                .filter(|tt| tt.can_board(stop))
                .map(|tt| (tt, day.time(tt.departure_time(stop))))
                .filter(|(_, t)| *t >= time)
                .min_by_key(|(_, t)| *t)
        } else {
            candidates
                .filter(|tt| tt.can_alight(stop))
                .map(|tt| (tt, day.time(tt.arrival_time(stop))))
                .filter(|(_, t)| *t <= time)
                .max_by_key(|(_, t)| *t)
        };
        found.map(|(tt, t)| TripMatch {
            trip_times: Arc::clone(tt),
            time: t,
        })
    }

    /// One candidate per frequency entry running on `day`: the next
    /// departure from `stop` (boarding) or the previous arrival at it.
    pub fn frequency_trips(
        &self,
        stop: usize,
        day: &ServiceDay,
        time: i64,
        boarding: bool,
        accept: impl Fn(&TripTimes) -> bool,
    ) -> Vec<TripMatch> {
        let Ok(local) = i32::try_from(day.seconds_since_midnight(time)) else {
            return Vec::new();
        };
        self.frequency_entries
            .iter()
            .filter(|e| self.runs_on(&e.trip_times, day) && accept(&*e.trip_times))
            .filter_map(|e| {
                let found = if boarding {
                    e.trip_times
                        .can_board(stop)
                        .then(|| e.next_departure_time(stop, local))
                        .flatten()
                } else {
                    e.trip_times
                        .can_alight(stop)
                        .then(|| e.prev_arrival_time(stop, local))
                        .flatten()
                };
                found.map(|(t, _)| TripMatch {
                    trip_times: Arc::clone(&e.trip_times),
                    time: day.time(t),
                })
            })
            .collect()
    }
}

/// An ordered sequence of stops served by one route, with the trips that
/// serve it.
#[derive(Debug, Clone)]
pub struct TripPattern {
    pub id: PatternId,
    pub route: RouteId,
    pub mode: TraverseMode,
    pub stops: Vec<StopId>,
    pub scheduled: Arc<Timetable>,
    best_running: Vec<i32>,
    best_dwell: Vec<i32>,
}

impl TripPattern {
    pub fn new(
        id: PatternId,
        route: RouteId,
        mode: TraverseMode,
        stops: Vec<StopId>,
        scheduled: Timetable,
    ) -> Self {
        let templates: Vec<&TripTimes> = scheduled
            .trip_times()
            .iter()
            .map(|t| &**t)
            .chain(scheduled.frequency_entries().iter().map(|e| &*e.trip_times))
            .collect();
        let hops = stops.len().saturating_sub(1);
        let best_running = (0..hops)
            .map(|i| templates.iter().map(|t| t.running_time(i)).min().unwrap_or(0))
            .collect();
        let best_dwell = (0..stops.len())
            .map(|i| templates.iter().map(|t| t.dwell_time(i)).min().unwrap_or(0))
            .collect();
        Self {
            id,
            route,
            mode,
            stops,
            scheduled: Arc::new(scheduled),
            best_running,
            best_dwell,
        }
    }

    /// Shortest scheduled running time from stop `hop` to the next stop.
    pub fn best_running_time(&self, hop: usize) -> i32 {
        self.best_running.get(hop).copied().unwrap_or(0).max(0)
    }

    /// Shortest scheduled dwell at stop `stop`.
    pub fn best_dwell_time(&self, stop: usize) -> i32 {
        self.best_dwell.get(stop).copied().unwrap_or(0).max(0)
    }

    /// Returns true if the pattern runs on headways rather than fixed trips.
    pub fn is_frequency_based(&self) -> bool {
        !self.scheduled.frequency_entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ServiceCalendar, ServiceId};
    use crate::timetable::Trip;
    use chrono::FixedOffset;

    fn trip(id: &str, service: &str) -> Trip {
        Trip {
            id: TripId::new(id).unwrap(),
            route: RouteId::new("R").unwrap(),
            service: Some(ServiceId::new(service).unwrap()),
            wheelchair_accessible: id != "T3",
            bikes_allowed: false,
        }
    }

    fn day() -> ServiceDay {
        let mut cal = ServiceCalendar::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        cal.add(ServiceId::new("WK").unwrap(), date);
        ServiceDay::new(date, FixedOffset::east_opt(0).unwrap(), &cal)
    }

    fn timetable() -> Timetable {
        let mut tt = Timetable::new(PatternId(0));
        for (id, dep) in [("T1", 28_800), ("T2", 30_600), ("T3", 32_400)] {
            let times = TripTimes::new(trip(id, "WK"), vec![dep, dep + 600], vec![dep, dep + 600]);
            tt.add_trip_times(times.unwrap());
        }
        let sunday = TripTimes::new(trip("S1", "SUN"), vec![29_000, 29_600], vec![29_000, 29_600]);
        tt.add_trip_times(sunday.unwrap());
        tt
    }

    #[test]
    fn boards_next_departure() {
        let sd = day();
        let tt = timetable();
        let found = tt.next_trip(0, &sd, sd.time(28_900), true, |_| true).unwrap();
        assert_eq!(found.trip_times.trip_id().as_str(), "T2");
        assert_eq!(found.time, sd.time(30_600));
    }

    #[test]
    fn skips_services_not_running() {
        let sd = day();
        let tt = timetable();
        let found = tt.next_trip(0, &sd, sd.time(28_900), true, |_| true).unwrap();
        assert_ne!(found.trip_times.trip_id().as_str(), "S1");
    }

    #[test]
    fn alights_previous_arrival() {
        let sd = day();
        let tt = timetable();
        let found = tt.next_trip(1, &sd, sd.time(32_000), false, |_| true).unwrap();
        assert_eq!(found.trip_times.trip_id().as_str(), "T2");
        assert_eq!(found.time, sd.time(31_200));
    }

    #[test]
    fn filter_rejects_trips() {
        let sd = day();
        let tt = timetable();
        let found = tt.next_trip(0, &sd, sd.time(31_000), true, |t| t.trip().wheelchair_accessible);
        assert!(found.is_none());
    }

    #[test]
    fn pattern_lower_bounds() {
        let tt = timetable();
        let pattern = TripPattern::new(
            PatternId(0),
            RouteId::new("R").unwrap(),
            TraverseMode::Bus,
            vec![StopId::new("A").unwrap(), StopId::new("B").unwrap()],
            tt,
        );
        assert_eq!(pattern.best_running_time(0), 600);
        assert_eq!(pattern.best_dwell_time(1), 0);
        assert!(!pattern.is_frequency_based());
    }
}
