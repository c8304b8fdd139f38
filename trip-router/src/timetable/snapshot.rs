//! Real-time timetables: a mutable buffer and immutable published
//! snapshots.
//!
//! Updaters write into the buffer. Searches read a [`TimetableSnapshot`]
//! obtained once when the search starts. A snapshot is an
//! `Arc<TimetableSnapshot>` that nothing can mutate, and a new one is
//! published at most once per minimum interval, so bursts of updates do not
//! turn into a burst of copies.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{ScheduleRelationship, Timetable, Trip, TripTimes, TripUpdate};
use crate::domain::{PatternId, TripId};
use crate::graph::Graph;
use crate::updater::UpdateError;

/// Default minimum time between two published snapshots.
pub const DEFAULT_MAX_SNAPSHOT_FREQUENCY: Duration = Duration::from_millis(1000);

/// Real-time timetables by pattern and service date.
#[derive(Debug, Clone, Default)]
pub struct TimetableSnapshot {
    timetables: HashMap<PatternId, BTreeMap<NaiveDate, Arc<Timetable>>>,
    /// Patterns of trips that are not in the schedule.
    added_trips: HashMap<TripId, PatternId>,
    dirty: bool,
}

impl TimetableSnapshot {
    /// The real-time timetable of `pattern` on `date`, if there is one.
    pub fn resolve(&self, pattern: PatternId, date: NaiveDate) -> Option<&Arc<Timetable>> {
        self.timetables.get(&pattern)?.get(&date)
    }

    /// Number of real-time timetables held.
    pub fn len(&self) -> usize {
        self.timetables.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The pattern of a trip added in real time.
    pub fn added_trip_pattern(&self, trip: &TripId) -> Option<PatternId> {
        self.added_trips.get(trip).copied()
    }

    /// The timetable of `pattern` on `date` as it currently stands, falling
    /// back to the schedule.
    fn current(&self, scheduled: &Timetable, date: NaiveDate) -> Timetable {
        match self.resolve(scheduled.pattern(), date) {
            Some(tt) => Timetable::clone(tt),
            None => scheduled.for_date(date),
        }
    }

    fn store(&mut self, timetable: Timetable) {
        let Some(date) = timetable.service_date() else {
            return;
        };
        self.timetables
            .entry(timetable.pattern())
            .or_default()
            .insert(date, Arc::new(timetable));
        self.dirty = true;
    }

    /// Drop timetables for dates before `before`. Returns how many went.
    pub fn purge_expired(&mut self, before: NaiveDate) -> usize {
        let mut purged = 0;
        self.timetables.retain(|_, dates| {
            let kept = dates.split_off(&before);
            purged += dates.len();
            *dates = kept;
            !dates.is_empty()
        });
        if purged > 0 {
            self.dirty = true;
        }
        purged
    }
}

/// Outcome of applying one batch of trip updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,
}

#[derive(Debug)]
struct Published {
    snapshot: Arc<TimetableSnapshot>,
    at: Option<Instant>,
}

/// Owns the real-time buffer and hands out snapshots of it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trip_router::timetable::TimetableSnapshotSource;
///
/// let source = TimetableSnapshotSource::new();
/// let a = source.timetable_snapshot();
/// let b = source.timetable_snapshot();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug)]
pub struct TimetableSnapshotSource {
    buffer: Mutex<TimetableSnapshot>,
    published: Mutex<Published>,
    max_snapshot_frequency: Duration,
    purge_expired_data: bool,
}

impl Default for TimetableSnapshotSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimetableSnapshotSource {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(TimetableSnapshot::default()),
            published: Mutex::new(Published {
                snapshot: Arc::new(TimetableSnapshot::default()),
                at: None,
            }),
            max_snapshot_frequency: DEFAULT_MAX_SNAPSHOT_FREQUENCY,
            purge_expired_data: false,
        }
    }

    pub fn with_max_snapshot_frequency(mut self, interval: Duration) -> Self {
        self.max_snapshot_frequency = interval;
        self
    }

    /// Drop timetables for service dates before yesterday after every batch.
    pub fn with_purge_expired_data(mut self, purge: bool) -> Self {
        self.purge_expired_data = purge;
        self
    }

    /// The current snapshot.
    ///
    /// Commits the buffer first if it has changed and the last commit is
    /// at least the minimum interval old; otherwise returns the previously
    /// published snapshot, which callers may compare by pointer.
    pub fn timetable_snapshot(&self) -> Arc<TimetableSnapshot> {
        let mut published = self.published.lock();
        let due = published
            .at
            .is_none_or(|at| at.elapsed() >= self.max_snapshot_frequency);
        if due {
            self.commit_locked(&mut published);
        }
        Arc::clone(&published.snapshot)
    }

    /// Publish the buffer now if it has changed, ignoring the interval.
    pub fn commit(&self) -> Arc<TimetableSnapshot> {
        let mut published = self.published.lock();
        self.commit_locked(&mut published);
        Arc::clone(&published.snapshot)
    }

    fn commit_locked(&self, published: &mut Published) {
        let mut buffer = self.buffer.lock();
        if !buffer.dirty {
            return;
        }
        buffer.dirty = false;
        let snapshot = TimetableSnapshot::clone(&buffer);
        debug!(timetables = snapshot.len(), "published timetable snapshot");
        published.snapshot = Arc::new(snapshot);
        published.at = Some(Instant::now());
    }

    /// Apply a batch of decoded updates to the buffer.
    ///
    /// An update that cannot be applied is logged and skipped; the rest of
    /// the batch still goes through.
    pub fn apply_trip_updates(&self, graph: &Graph, updates: &[TripUpdate]) -> ApplyReport {
        let mut buffer = self.buffer.lock();
        let mut report = ApplyReport::default();
        for update in updates {
            match apply_one(&mut buffer, graph, update) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!(trip = %update.trip_id, date = %update.service_date, error = %e, "skipping trip update");
                    report.skipped += 1;
                }
            }
        }
        if self.purge_expired_data {
            let today = Utc::now().with_timezone(&graph.time_zone()).date_naive();
            if let Some(yesterday) = today.checked_sub_days(Days::new(1)) {
                let purged = buffer.purge_expired(yesterday);
                if purged > 0 {
                    info!(purged, "purged expired real-time timetables");
                }
            }
        }
        debug!(applied = report.applied, skipped = report.skipped, "applied trip updates");
        report
    }
}

fn apply_one(buffer: &mut TimetableSnapshot, graph: &Graph, update: &TripUpdate) -> Result<(), UpdateError> {
    let date = update.service_date;
    match update.relationship {
        ScheduleRelationship::Unscheduled => Err(UpdateError::Unsupported {
            trip: update.trip_id.clone(),
            relationship: update.relationship,
        }),
        ScheduleRelationship::Added => {
            let (route, pattern) = update
                .route_id
                .as_ref()
                .and_then(|r| graph.find_pattern(r, &update.stops).map(|p| (r, p)))
                .ok_or_else(|| UpdateError::UnknownPattern(update.trip_id.clone()))?;
            if graph.trip_pattern(&update.trip_id).is_some() {
                return Err(UpdateError::InvalidTripTimes {
                    trip: update.trip_id.clone(),
                    reason: "added trip is already scheduled".to_string(),
                });
            }
            let (arrivals, departures) = update.absolute_times()?;
            let trip = Trip {
                id: update.trip_id.clone(),
                route: route.clone(),
                service: None,
                wheelchair_accessible: update.wheelchair_accessible,
                bikes_allowed: false,
            };
            let times = TripTimes::added(trip, arrivals, departures)?;
            let scheduled = scheduled_timetable(graph, pattern)?;
            if times.num_stops() != scheduled_stops(graph, pattern) {
                return Err(UpdateError::InvalidTripTimes {
                    trip: update.trip_id.clone(),
                    reason: "stop count differs from pattern".to_string(),
                });
            }
            let mut timetable = buffer.current(scheduled, date);
            match timetable.trip_index(&update.trip_id) {
                Some(i) => timetable.set_trip_times(i, times),
                None => timetable.add_trip_times(times),
            }
            buffer.store(timetable);
            buffer.added_trips.insert(update.trip_id.clone(), pattern);
            Ok(())
        }
        ScheduleRelationship::Scheduled
        | ScheduleRelationship::Canceled
        | ScheduleRelationship::Replacement => {
            let pattern = graph
                .trip_pattern(&update.trip_id)
                .or_else(|| buffer.added_trip_pattern(&update.trip_id))
                .ok_or_else(|| UpdateError::UnknownTrip(update.trip_id.clone()))?;
            let scheduled = scheduled_timetable(graph, pattern)?;
            let mut timetable = buffer.current(scheduled, date);
            let index = timetable
                .trip_index(&update.trip_id)
                .ok_or_else(|| UpdateError::UnknownTrip(update.trip_id.clone()))?;
            let mut times = TripTimes::clone(&timetable.trip_times()[index]);
            match update.relationship {
                ScheduleRelationship::Canceled => times.cancel(),
                ScheduleRelationship::Replacement => replace_times(update, &mut times)?,
                _ => update.apply_to(&mut times)?,
            }
            timetable.set_trip_times(index, times);
            buffer.store(timetable);
            Ok(())
        }
    }
}

fn scheduled_timetable(graph: &Graph, pattern: PatternId) -> Result<&Timetable, UpdateError> {
    graph
        .pattern(pattern)
        .map(|p| &*p.scheduled)
        .ok_or(UpdateError::MissingPattern(pattern))
}

fn scheduled_stops(graph: &Graph, pattern: PatternId) -> usize {
    graph.pattern(pattern).map_or(0, |p| p.stops.len())
}

fn replace_times(update: &TripUpdate, times: &mut TripTimes) -> Result<(), UpdateError> {
    let (arrivals, departures) = update.absolute_times()?;
    if arrivals.len() != times.num_stops() {
        return Err(UpdateError::InvalidTripTimes {
            trip: update.trip_id.clone(),
            reason: "replacement must give times for every stop".to_string(),
        });
    }
    for (stop, (a, d)) in arrivals.into_iter().zip(departures).enumerate() {
        times.update_arrival_time(stop, a);
        times.update_departure_time(stop, d);
    }
    times.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, RouteId, StopId, TraverseMode};
    use crate::graph::GraphBuilder;
    use crate::timetable::{RealTimeState, StopTimeUpdate};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn stops() -> Vec<StopId> {
        ["A", "B", "C"].iter().map(|s| StopId::new(s).unwrap()).collect()
    }

    fn graph() -> Graph {
        let mut b = GraphBuilder::default();
        for (i, s) in stops().into_iter().enumerate() {
            b.stop(s, Coordinate::new(0.0, i as f64 * 0.01).unwrap(), true)
                .unwrap();
        }
        let route = RouteId::new("R").unwrap();
        let trip = Trip {
            id: TripId::new("T1").unwrap(),
            route: route.clone(),
            service: None,
            wheelchair_accessible: true,
            bikes_allowed: false,
        };
        let times =
            TripTimes::new(trip, vec![3600, 4200, 4800], vec![3600, 4200, 4800]).unwrap();
        b.pattern(route, TraverseMode::Bus, stops(), vec![times], Vec::new())
            .unwrap();
        b.build()
    }

    fn update(trip: &str, relationship: ScheduleRelationship) -> TripUpdate {
        TripUpdate {
            trip_id: TripId::new(trip).unwrap(),
            route_id: None,
            service_date: date(),
            relationship,
            stop_time_updates: Vec::new(),
            stops: Vec::new(),
            wheelchair_accessible: true,
        }
    }

    fn delay(seconds: i32) -> TripUpdate {
        TripUpdate {
            stop_time_updates: vec![StopTimeUpdate::delay(0, seconds)],
            ..update("T1", ScheduleRelationship::Scheduled)
        }
    }

    #[test]
    fn snapshots_within_the_interval_are_identical() {
        let g = graph();
        let source = TimetableSnapshotSource::new();
        source.apply_trip_updates(&g, &[delay(60)]);
        let first = source.timetable_snapshot();
        source.apply_trip_updates(&g, &[delay(120)]);
        let second = source.timetable_snapshot();
        assert!(Arc::ptr_eq(&first, &second));

        let tt = first.resolve(PatternId(0), date()).unwrap();
        assert_eq!(tt.trip_times()[0].departure_time(0), 3660);
    }

    #[test]
    fn a_new_snapshot_follows_once_the_interval_passes() {
        let g = graph();
        let source =
            TimetableSnapshotSource::new().with_max_snapshot_frequency(Duration::from_millis(10));
        source.apply_trip_updates(&g, &[delay(60)]);
        let first = source.timetable_snapshot();
        source.apply_trip_updates(&g, &[delay(120)]);
        std::thread::sleep(Duration::from_millis(20));
        let second = source.timetable_snapshot();
        assert!(!Arc::ptr_eq(&first, &second));

        // The earlier snapshot is unchanged.
        let old = first.resolve(PatternId(0), date()).unwrap();
        let new = second.resolve(PatternId(0), date()).unwrap();
        assert_eq!(old.trip_times()[0].departure_time(0), 3660);
        assert_eq!(new.trip_times()[0].departure_time(0), 3720);
    }

    #[test]
    fn clean_buffer_is_not_republished() {
        let g = graph();
        let source =
            TimetableSnapshotSource::new().with_max_snapshot_frequency(Duration::ZERO);
        source.apply_trip_updates(&g, &[delay(60)]);
        let first = source.timetable_snapshot();
        let second = source.timetable_snapshot();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn bad_updates_are_skipped_without_aborting_the_batch() {
        let g = graph();
        let source = TimetableSnapshotSource::new();
        let report = source.apply_trip_updates(
            &g,
            &[
                update("nope", ScheduleRelationship::Scheduled),
                update("T1", ScheduleRelationship::Unscheduled),
                update("T1", ScheduleRelationship::Canceled),
            ],
        );
        assert_eq!(report, ApplyReport { applied: 1, skipped: 2 });
        let snapshot = source.commit();
        let tt = snapshot.resolve(PatternId(0), date()).unwrap();
        assert_eq!(tt.trip_times()[0].state(), RealTimeState::Canceled);
    }

    #[test]
    fn added_trips_join_the_matching_pattern_on_their_date() {
        let g = graph();
        let source = TimetableSnapshotSource::new();
        let added = TripUpdate {
            route_id: Some(RouteId::new("R").unwrap()),
            stops: stops(),
            stop_time_updates: vec![
                StopTimeUpdate::at(0, 7200, 7200),
                StopTimeUpdate::at(1, 7800, 7800),
                StopTimeUpdate::at(2, 8400, 8400),
            ],
            ..update("X1", ScheduleRelationship::Added)
        };
        assert_eq!(source.apply_trip_updates(&g, &[added]).applied, 1);

        let snapshot = source.commit();
        let tt = snapshot.resolve(PatternId(0), date()).unwrap();
        assert_eq!(tt.trip_times().len(), 2);
        assert_eq!(snapshot.added_trip_pattern(&TripId::new("X1").unwrap()), Some(PatternId(0)));
        assert!(snapshot.resolve(PatternId(0), date().succ_opt().unwrap()).is_none());

        // Updates to the added trip now resolve.
        let later = TripUpdate {
            stop_time_updates: vec![StopTimeUpdate::delay(1, 30)],
            ..update("X1", ScheduleRelationship::Scheduled)
        };
        assert_eq!(source.apply_trip_updates(&g, &[later]).applied, 1);
    }

    #[test]
    fn replacement_rewrites_every_stop() {
        let g = graph();
        let source = TimetableSnapshotSource::new();
        let replacement = TripUpdate {
            stop_time_updates: vec![
                StopTimeUpdate::at(0, 3700, 3700),
                StopTimeUpdate::at(1, 4400, 4460),
                StopTimeUpdate::at(2, 5000, 5000),
            ],
            ..update("T1", ScheduleRelationship::Replacement)
        };
        assert_eq!(source.apply_trip_updates(&g, &[replacement]).applied, 1);
        let snapshot = source.commit();
        let times = &snapshot.resolve(PatternId(0), date()).unwrap().trip_times()[0];
        assert_eq!(times.departure_time(1), 4460);
        assert_eq!(times.scheduled_departure_time(1), 4200);
    }

    #[test]
    fn purge_drops_old_dates() {
        let g = graph();
        let source = TimetableSnapshotSource::new();
        source.apply_trip_updates(&g, &[delay(60)]);
        let mut snapshot = TimetableSnapshot::clone(&source.commit());
        assert_eq!(snapshot.purge_expired(date()), 0);
        assert_eq!(snapshot.purge_expired(date().succ_opt().unwrap()), 1);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn purging_source_forgets_past_service_dates() {
        let g = graph();
        let source = TimetableSnapshotSource::new().with_purge_expired_data(true);
        let report = source.apply_trip_updates(&g, &[delay(60)]);
        assert_eq!(report.applied, 1);
        assert!(source.commit().is_empty());
    }
}
