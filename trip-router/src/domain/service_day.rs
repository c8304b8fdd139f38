//! Service days and the service calendar.
//!
//! Timetables store times as seconds after the midnight of their service
//! date, which may exceed 24 hours for trips that run past midnight. A
//! `ServiceDay` anchors those offsets to absolute epoch seconds and knows
//! which services run on its date.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, FixedOffset, NaiveDate, TimeZone};

use super::ServiceId;

/// Which services run on which dates.
#[derive(Debug, Clone, Default)]
pub struct ServiceCalendar {
    by_date: HashMap<NaiveDate, HashSet<ServiceId>>,
}

impl ServiceCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `service` as running on `date`.
    pub fn add(&mut self, service: ServiceId, date: NaiveDate) {
        self.by_date.entry(date).or_default().insert(service);
    }

    /// Services running on `date`.
    pub fn services_on(&self, date: NaiveDate) -> HashSet<ServiceId> {
        self.by_date.get(&date).cloned().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

/// One calendar day of service, anchored in absolute time.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDay {
    date: NaiveDate,
    midnight: i64,
    services: Arc<HashSet<ServiceId>>,
}

impl ServiceDay {
    /// Build the service day for `date` in the feed's time zone.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{FixedOffset, NaiveDate};
    /// use trip_router::domain::{ServiceCalendar, ServiceDay};
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    /// let utc = FixedOffset::east_opt(0).unwrap();
    /// let day = ServiceDay::new(date, utc, &ServiceCalendar::new());
    /// assert_eq!(day.midnight(), 1_710_460_800);
    /// assert_eq!(day.seconds_since_midnight(1_710_460_800 + 3600), 3600);
    /// ```
    pub fn new(date: NaiveDate, tz: FixedOffset, calendar: &ServiceCalendar) -> Self {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .and_then(|dt| tz.from_local_datetime(&dt).single())
            .map(|dt| dt.timestamp())
            .unwrap_or_default();
        Self {
            date,
            midnight,
            services: Arc::new(calendar.services_on(date)),
        }
    }

    /// The service days a search at `time` may need: yesterday, today and
    /// tomorrow relative to the local date of `time`.
    pub fn around(time: i64, tz: FixedOffset, calendar: &ServiceCalendar) -> Vec<ServiceDay> {
        let Some(local) = tz.timestamp_opt(time, 0).single().map(|dt| dt.date_naive()) else {
            return Vec::new();
        };
        [-1, 0, 1]
            .into_iter()
            .filter_map(|offset| local.checked_add_signed(Duration::days(offset)))
            .map(|date| ServiceDay::new(date, tz, calendar))
            .collect()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Epoch seconds of this day's midnight.
    pub fn midnight(&self) -> i64 {
        self.midnight
    }

    /// Converts an absolute time to seconds after this day's midnight.
    pub fn seconds_since_midnight(&self, time: i64) -> i64 {
        time - self.midnight
    }

    /// Converts seconds after this day's midnight to an absolute time.
    pub fn time(&self, seconds_since_midnight: i32) -> i64 {
        self.midnight + i64::from(seconds_since_midnight)
    }

    /// Returns true if `service` runs on this day.
    pub fn serves(&self, service: &ServiceId) -> bool {
        self.services.contains(service)
    }

    /// Returns true if any service runs on this day.
    pub fn any_service(&self) -> bool {
        !self.services.is_empty()
    }
}
