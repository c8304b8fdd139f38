//! Headway-based service.

use std::sync::Arc;

use super::TripTimes;

/// A trip template that repeats every `headway` seconds between `start`
/// and `end` (seconds after midnight, measured at the first stop).
///
/// With `exact_times` the departures fall exactly on the headway grid;
/// otherwise riders are assumed to wait a full headway.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyEntry {
    pub trip_times: Arc<TripTimes>,
    pub start: i32,
    pub end: i32,
    pub headway: i32,
    pub exact_times: bool,
}

impl FrequencyEntry {
    fn departure_offset(&self, stop: usize) -> i32 {
        self.trip_times.departure_time(stop) - self.trip_times.departure_time(0)
    }

    fn arrival_offset(&self, stop: usize) -> i32 {
        self.trip_times.arrival_time(stop) - self.trip_times.departure_time(0)
    }

    /// Earliest departure from `stop` at or after `t`, in seconds after
    /// midnight, along with the time the run left its first stop.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use trip_router::domain::{RouteId, TripId};
    /// # use trip_router::timetable::{FrequencyEntry, Trip, TripTimes};
    /// # let trip = Trip {
    /// #     id: TripId::new("F").unwrap(),
    /// #     route: RouteId::new("R").unwrap(),
    /// #     service: None,
    /// #     wheelchair_accessible: false,
    /// #     bikes_allowed: false,
    /// # };
    /// let template = TripTimes::new(trip, vec![0, 300], vec![0, 300]).unwrap();
    /// let entry = FrequencyEntry {
    ///     trip_times: Arc::new(template),
    ///     start: 3600,
    ///     end: 7200,
    ///     headway: 600,
    ///     exact_times: true,
    /// };
    /// assert_eq!(entry.next_departure_time(0, 3700), Some((4200, 4200)));
    /// assert_eq!(entry.next_departure_time(0, 7200), None);
    /// ```
    pub fn next_departure_time(&self, stop: usize, t: i32) -> Option<(i32, i32)> {
        let offset = self.departure_offset(stop);
        let first = self.start + offset;
        let last = self.end + offset;
        if self.exact_times {
            let waited = (t - first).max(0);
            let runs = (waited + self.headway - 1) / self.headway;
            let run_start = self.start + runs * self.headway;
            (run_start < self.end).then_some((run_start + offset, run_start))
        } else {
            let from = t.max(first);
            (from < last).then(|| {
                let departure = from + self.headway;
                (departure, departure - offset)
            })
        }
    }

    /// Latest arrival at `stop` at or before `t`, in seconds after
    /// midnight, along with the time the run left its first stop.
    pub fn prev_arrival_time(&self, stop: usize, t: i32) -> Option<(i32, i32)> {
        let offset = self.arrival_offset(stop);
        let first = self.start + offset;
        let last = self.end + offset;
        if self.exact_times {
            if t < first {
                return None;
            }
            let runs = ((t - first) / self.headway).min((self.end - 1 - self.start) / self.headway);
            let run_start = self.start + runs * self.headway;
            Some((run_start + offset, run_start))
        } else {
            let until = t.min(last);
            (until > first).then(|| {
                let arrival = until - self.headway;
                (arrival, arrival - offset)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RouteId, TripId};
    use crate::timetable::Trip;

    fn entry(exact: bool) -> FrequencyEntry {
        let trip = Trip {
            id: TripId::new("F").unwrap(),
            route: RouteId::new("R").unwrap(),
            service: None,
            wheelchair_accessible: false,
            bikes_allowed: false,
        };
        FrequencyEntry {
            trip_times: Arc::new(TripTimes::new(trip, vec![0, 300, 600], vec![0, 360, 600]).unwrap()),
            start: 3600,
            end: 7200,
            headway: 900,
            exact_times: exact,
        }
    }

    #[test]
    fn exact_departures_follow_grid() {
        let e = entry(true);
        assert_eq!(e.next_departure_time(0, 0), Some((3600, 3600)));
        assert_eq!(e.next_departure_time(0, 3601), Some((4500, 4500)));
        // stop 1 departs 360 s into each run
        assert_eq!(e.next_departure_time(1, 4000), Some((4860, 4500)));
        assert_eq!(e.next_departure_time(0, 6301), None);
    }

    #[test]
    fn inexact_departures_wait_a_headway() {
        let e = entry(false);
        assert_eq!(e.next_departure_time(0, 4000), Some((4900, 4900)));
        assert_eq!(e.next_departure_time(0, 0), Some((4500, 4500)));
        assert_eq!(e.next_departure_time(0, 7200), None);
    }

    #[test]
    fn exact_arrivals_follow_grid() {
        let e = entry(true);
        // stop 2 arrives 600 s into each run
        assert_eq!(e.prev_arrival_time(2, 5000), Some((4200, 3600)));
        assert_eq!(e.prev_arrival_time(2, 5100), Some((5100, 4500)));
        assert_eq!(e.prev_arrival_time(2, 4000), None);
        // the last run starts at 6300
        assert_eq!(e.prev_arrival_time(2, 20_000), Some((6900, 6300)));
    }

    #[test]
    fn inexact_arrivals_wait_a_headway() {
        let e = entry(false);
        assert_eq!(e.prev_arrival_time(2, 6000), Some((5100, 4500)));
        assert_eq!(e.prev_arrival_time(2, 4200), None);
    }
}
