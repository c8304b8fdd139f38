//! Scheduled and real-time timetables.
//!
//! A [`TripPattern`] carries its scheduled [`Timetable`]. Real-time updates
//! never touch it: they produce dated copies held in a
//! [`TimetableSnapshot`], which searches consult first.

mod frequency;
mod snapshot;
#[allow(clippy::module_inception)]
mod timetable;
mod trip_times;
mod update;

pub use frequency::FrequencyEntry;
pub use snapshot::{
    ApplyReport, DEFAULT_MAX_SNAPSHOT_FREQUENCY, TimetableSnapshot, TimetableSnapshotSource,
};
pub use timetable::{Timetable, TripMatch, TripPattern};
pub use trip_times::{RealTimeState, Trip, TripTimes};
pub use update::{ScheduleRelationship, StopTimeUpdate, TripUpdate};
