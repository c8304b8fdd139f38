//! Decoded real-time trip updates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::TripTimes;
use crate::domain::{RouteId, StopId, TripId};
use crate::updater::UpdateError;

/// How an update relates to the published schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleRelationship {
    /// Delays or skips on a scheduled trip.
    Scheduled,
    /// A trip that is not in the schedule.
    Added,
    /// A trip running without a fixed schedule.
    Unscheduled,
    /// A scheduled trip that does not run.
    Canceled,
    /// A scheduled trip whose times are replaced wholesale.
    Replacement,
}

/// Changes at one stop of a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopTimeUpdate {
    /// Position of the stop in the trip's pattern.
    pub stop_sequence: usize,
    #[serde(default)]
    pub arrival_delay: Option<i32>,
    #[serde(default)]
    pub departure_delay: Option<i32>,
    /// Absolute arrival, in seconds after the service day's midnight.
    #[serde(default)]
    pub arrival_time: Option<i32>,
    #[serde(default)]
    pub departure_time: Option<i32>,
    #[serde(default)]
    pub skipped: bool,
}

impl StopTimeUpdate {
    /// A delay applied to both arrival and departure.
    pub fn delay(stop_sequence: usize, seconds: i32) -> Self {
        Self {
            stop_sequence,
            arrival_delay: Some(seconds),
            departure_delay: Some(seconds),
            arrival_time: None,
            departure_time: None,
            skipped: false,
        }
    }

    /// Absolute arrival and departure times.
    pub fn at(stop_sequence: usize, arrival: i32, departure: i32) -> Self {
        Self {
            stop_sequence,
            arrival_delay: None,
            departure_delay: None,
            arrival_time: Some(arrival),
            departure_time: Some(departure),
            skipped: false,
        }
    }

    /// The stop is not served.
    pub fn skip(stop_sequence: usize) -> Self {
        Self {
            skipped: true,
            ..Self::delay(stop_sequence, 0)
        }
    }

    fn arrival(&self, scheduled: i32) -> Option<i32> {
        self.arrival_time
            .or_else(|| self.arrival_delay.map(|d| scheduled + d))
    }

    fn departure(&self, scheduled: i32) -> Option<i32> {
        self.departure_time
            .or_else(|| self.departure_delay.map(|d| scheduled + d))
    }
}

/// One trip's worth of real-time information, already decoded from
/// whatever feed format carried it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripUpdate {
    pub trip_id: TripId,
    /// Required for added trips, to find their pattern.
    #[serde(default)]
    pub route_id: Option<RouteId>,
    pub service_date: NaiveDate,
    pub relationship: ScheduleRelationship,
    #[serde(default)]
    pub stop_time_updates: Vec<StopTimeUpdate>,
    /// Stop sequence of added or replacement trips.
    #[serde(default)]
    pub stops: Vec<StopId>,
    #[serde(default)]
    pub wheelchair_accessible: bool,
}

impl TripUpdate {
    /// Apply this update's per-stop changes to `times`, propagating the
    /// last known delay to later stops without their own update.
    pub fn apply_to(&self, times: &mut TripTimes) -> Result<(), UpdateError> {
        let n = times.num_stops();
        let mut updated = vec![false; n];
        for u in &self.stop_time_updates {
            if u.stop_sequence >= n {
                return Err(UpdateError::InvalidTripTimes {
                    trip: self.trip_id.clone(),
                    reason: format!("stop sequence {} out of range", u.stop_sequence),
                });
            }
            let stop = u.stop_sequence;
            if u.skipped {
                times.skip_stop(stop);
                continue;
            }
            let arrival = u.arrival(times.scheduled_arrival_time(stop));
            let departure = u.departure(times.scheduled_departure_time(stop));
            let dwell = times.scheduled_departure_time(stop) - times.scheduled_arrival_time(stop);
            let (arrival, departure) = match (arrival, departure) {
                (Some(a), Some(d)) => (a, d),
                (Some(a), None) => (a, a + dwell),
                (None, Some(d)) => (d - dwell, d),
                (None, None) => continue,
            };
            times.update_arrival_time(stop, arrival);
            times.update_departure_time(stop, departure);
            updated[stop] = true;
        }
        if updated.iter().any(|u| *u) {
            times.propagate_delay(&updated);
        }
        times.validate()
    }

    /// Absolute arrival and departure times for an added or replacement
    /// trip. Every stop must carry both times.
    pub fn absolute_times(&self) -> Result<(Vec<i32>, Vec<i32>), UpdateError> {
        let mut updates: Vec<&StopTimeUpdate> = self.stop_time_updates.iter().collect();
        updates.sort_by_key(|u| u.stop_sequence);
        let mut arrivals = Vec::with_capacity(updates.len());
        let mut departures = Vec::with_capacity(updates.len());
        for (expected, u) in updates.into_iter().enumerate() {
            let times = (u.stop_sequence == expected)
                .then_some(())
                .and(u.arrival_time.zip(u.departure_time));
            let Some((a, d)) = times else {
                return Err(UpdateError::InvalidTripTimes {
                    trip: self.trip_id.clone(),
                    reason: format!("stop {expected} lacks absolute times"),
                });
            };
            arrivals.push(a);
            departures.push(d);
        }
        Ok((arrivals, departures))
    }
}
