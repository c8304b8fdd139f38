//! Per-trip stop times, scheduled and real-time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{RouteId, ServiceId, TripId};
use crate::updater::UpdateError;

/// Static description of one trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub route: RouteId,
    /// Service calendar entry. Trips without one run on every day their
    /// timetable applies to: every day for the schedule, one day for a
    /// real-time timetable.
    pub service: Option<ServiceId>,
    #[serde(default)]
    pub wheelchair_accessible: bool,
    #[serde(default)]
    pub bikes_allowed: bool,
}

/// Whether a trip's times come from the schedule or from real-time data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealTimeState {
    #[default]
    Scheduled,
    Updated,
    Canceled,
    Added,
    Modified,
}

/// Arrival and departure times of one trip at each stop of its pattern, in
/// seconds after the midnight of the service day.
#[derive(Debug, Clone, PartialEq)]
pub struct TripTimes {
    trip: Arc<Trip>,
    scheduled_arrivals: Arc<[i32]>,
    scheduled_departures: Arc<[i32]>,
    arrivals: Option<Vec<i32>>,
    departures: Option<Vec<i32>>,
    skipped: Option<Vec<bool>>,
    state: RealTimeState,
}

impl TripTimes {
    /// Build scheduled trip times. Arrivals and departures must have the
    /// same length and never decrease along the trip.
    ///
    /// # Examples
    ///
    /// ```
    /// use trip_router::domain::{RouteId, TripId};
    /// use trip_router::timetable::{Trip, TripTimes};
    ///
    /// let trip = Trip {
    ///     id: TripId::new("T1").unwrap(),
    ///     route: RouteId::new("R1").unwrap(),
    ///     service: None,
    ///     wheelchair_accessible: true,
    ///     bikes_allowed: false,
    /// };
    /// let times = TripTimes::new(trip, vec![0, 600], vec![60, 660]).unwrap();
    /// assert_eq!(times.running_time(0), 540);
    /// assert!(TripTimes::new(times.trip().clone(), vec![0], vec![0, 1]).is_err());
    /// ```
    pub fn new(trip: Trip, arrivals: Vec<i32>, departures: Vec<i32>) -> Result<Self, UpdateError> {
        let times = Self {
            trip: Arc::new(trip),
            scheduled_arrivals: arrivals.into(),
            scheduled_departures: departures.into(),
            arrivals: None,
            departures: None,
            skipped: None,
            state: RealTimeState::Scheduled,
        };
        times.validate()?;
        Ok(times)
    }

    /// Trip times for a trip added in real time: its scheduled times are its
    /// real-time times.
    pub fn added(trip: Trip, arrivals: Vec<i32>, departures: Vec<i32>) -> Result<Self, UpdateError> {
        let mut times = Self::new(trip, arrivals, departures)?;
        times.state = RealTimeState::Added;
        Ok(times)
    }

    pub fn trip(&self) -> &Trip {
        &self.trip
    }

    pub fn trip_id(&self) -> &TripId {
        &self.trip.id
    }

    pub fn num_stops(&self) -> usize {
        self.scheduled_arrivals.len()
    }

    pub fn state(&self) -> RealTimeState {
        self.state
    }

    pub fn is_canceled(&self) -> bool {
        self.state == RealTimeState::Canceled
    }

    pub fn arrival_time(&self, stop: usize) -> i32 {
        match &self.arrivals {
            Some(a) => a[stop],
            None => self.scheduled_arrivals[stop],
        }
    }

    pub fn departure_time(&self, stop: usize) -> i32 {
        match &self.departures {
            Some(d) => d[stop],
            None => self.scheduled_departures[stop],
        }
    }

    pub fn scheduled_arrival_time(&self, stop: usize) -> i32 {
        self.scheduled_arrivals[stop]
    }

    pub fn scheduled_departure_time(&self, stop: usize) -> i32 {
        self.scheduled_departures[stop]
    }

    pub fn arrival_delay(&self, stop: usize) -> i32 {
        self.arrival_time(stop) - self.scheduled_arrival_time(stop)
    }

    pub fn departure_delay(&self, stop: usize) -> i32 {
        self.departure_time(stop) - self.scheduled_departure_time(stop)
    }

    /// Seconds between departing `stop` and arriving at the next stop.
    pub fn running_time(&self, stop: usize) -> i32 {
        self.arrival_time(stop + 1) - self.departure_time(stop)
    }

    /// Seconds spent standing at `stop`.
    pub fn dwell_time(&self, stop: usize) -> i32 {
        self.departure_time(stop) - self.arrival_time(stop)
    }

    pub fn is_skipped(&self, stop: usize) -> bool {
        self.skipped.as_ref().is_some_and(|s| s[stop])
    }

    /// Passengers may board at `stop`: not the last stop, not skipped, and
    /// the trip is running.
    pub fn can_board(&self, stop: usize) -> bool {
        stop + 1 < self.num_stops() && !self.is_skipped(stop) && !self.is_canceled()
    }

    /// Passengers may alight at `stop`: not the first stop, and not skipped.
    pub fn can_alight(&self, stop: usize) -> bool {
        stop > 0 && stop < self.num_stops() && !self.is_skipped(stop)
    }

    /// Marks the whole trip as canceled.
    pub fn cancel(&mut self) {
        self.state = RealTimeState::Canceled;
    }

    fn ensure_realtime(&mut self) {
        if self.arrivals.is_none() {
            self.arrivals = Some(self.scheduled_arrivals.to_vec());
        }
        if self.departures.is_none() {
            self.departures = Some(self.scheduled_departures.to_vec());
        }
        if self.state == RealTimeState::Scheduled {
            self.state = RealTimeState::Updated;
        }
    }

    /// Set the real-time arrival at `stop` to `time`.
    pub fn update_arrival_time(&mut self, stop: usize, time: i32) {
        self.ensure_realtime();
        if let Some(a) = &mut self.arrivals {
            a[stop] = time;
        }
    }

    /// Set the real-time departure at `stop` to `time`.
    pub fn update_departure_time(&mut self, stop: usize, time: i32) {
        self.ensure_realtime();
        if let Some(d) = &mut self.departures {
            d[stop] = time;
        }
    }

    /// Mark `stop` as not served.
    pub fn skip_stop(&mut self, stop: usize) {
        self.ensure_realtime();
        let n = self.num_stops();
        self.skipped.get_or_insert_with(|| vec![false; n])[stop] = true;
        self.state = RealTimeState::Modified;
    }

    /// Carry the last known delay forward to every stop after `from` that
    /// has no update of its own.
    ///
    /// `updated` flags the stops that received explicit times.
    pub fn propagate_delay(&mut self, updated: &[bool]) {
        self.ensure_realtime();
        let mut delay: Option<i32> = None;
        for stop in 0..self.num_stops() {
            if updated.get(stop).copied().unwrap_or(false) {
                delay = Some(self.departure_delay(stop));
                continue;
            }
            if let Some(d) = delay {
                let arrival = self.scheduled_arrival_time(stop) + d;
                let departure = self.scheduled_departure_time(stop) + d;
                self.update_arrival_time(stop, arrival);
                self.update_departure_time(stop, departure);
            }
        }
    }

    /// Returns an error if times decrease anywhere along the trip.
    pub fn validate(&self) -> Result<(), UpdateError> {
        if self.scheduled_arrivals.len() != self.scheduled_departures.len() {
            return Err(UpdateError::InvalidTripTimes {
                trip: self.trip.id.clone(),
                reason: "arrival and departure counts differ".to_string(),
            });
        }
        if self.num_stops() < 2 {
            return Err(UpdateError::InvalidTripTimes {
                trip: self.trip.id.clone(),
                reason: "a trip needs at least two stops".to_string(),
            });
        }
        let mut previous = i32::MIN;
        for stop in 0..self.num_stops() {
            let (arrival, departure) = (self.arrival_time(stop), self.departure_time(stop));
            if arrival < previous || departure < arrival {
                return Err(UpdateError::InvalidTripTimes {
                    trip: self.trip.id.clone(),
                    reason: format!("times decrease at stop {stop}"),
                });
            }
            previous = departure;
        }
        Ok(())
    }
}
