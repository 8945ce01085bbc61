// --- File: crates/slotkeeper_booking/src/hours.rs ---
//! Opening hours in the business's own time zone.
//!
//! A business day runs from `open_hour` to `close_hour` local time on working
//! weekdays. All conversions to instants go through the configured IANA zone,
//! so a day's window is correct across DST changes.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use slotkeeper_common::models::TimeSlot;
use slotkeeper_common::{config_error, SlotkeeperError};
use slotkeeper_config::BusinessConfig;

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, PartialEq)]
pub struct BusinessHours {
    timezone: Tz,
    open_hour: u32,
    close_hour: u32,
    scan_interval: Duration,
    working_days: Vec<Weekday>,
}

impl BusinessHours {
    /// Open every day of the week.
    pub fn new(
        timezone: Tz,
        open_hour: u32,
        close_hour: u32,
        scan_interval_minutes: i64,
    ) -> Result<Self, SlotkeeperError> {
        if open_hour >= close_hour || close_hour > 24 {
            return Err(config_error(format!(
                "business hours must satisfy open_hour < close_hour <= 24, got {}..{}",
                open_hour, close_hour
            )));
        }
        let scan_interval = Duration::try_minutes(scan_interval_minutes)
            .filter(|step| *step > Duration::zero())
            .ok_or_else(|| {
                config_error(format!(
                    "scan_interval_minutes must be positive, got {}",
                    scan_interval_minutes
                ))
            })?;
        Ok(Self {
            timezone,
            open_hour,
            close_hour,
            scan_interval,
            working_days: ALL_DAYS.to_vec(),
        })
    }

    pub fn with_working_days(mut self, days: &[Weekday]) -> Self {
        self.working_days = days.to_vec();
        self
    }

    pub fn from_config(config: &BusinessConfig) -> Result<Self, SlotkeeperError> {
        let timezone: Tz = config
            .timezone
            .parse()
            .map_err(|e| config_error(format!("unknown timezone {:?}: {}", config.timezone, e)))?;
        let hours = Self::new(
            timezone,
            config.open_hour,
            config.close_hour,
            config.scan_interval_minutes,
        )?;
        if config.working_days.is_empty() {
            return Ok(hours);
        }
        let days = config
            .working_days
            .iter()
            .map(|name| {
                name.parse::<Weekday>()
                    .map_err(|_| config_error(format!("unknown weekday {:?}", name)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hours.with_working_days(&days))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn scan_interval(&self) -> Duration {
        self.scan_interval
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&date.weekday())
    }

    /// The calendar day an instant falls on, in business time.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    /// `[open, close)` of `date`, or `None` when the business is closed that day.
    pub fn day_window(&self, date: NaiveDate) -> Option<TimeSlot> {
        if !self.is_working_day(date) {
            return None;
        }
        let open = self.local_instant(date, self.open_hour)?;
        let close = self.local_instant(date, self.close_hour)?;
        Some(TimeSlot::new(open, close))
    }

    /// Whether `[start, end)` lies within the opening hours of `start`'s local day.
    pub fn contains(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        match self.day_window(self.local_date(start)) {
            Some(window) => start >= window.start && end <= window.end,
            None => false,
        }
    }

    fn local_instant(&self, date: NaiveDate, hour: u32) -> Option<DateTime<Utc>> {
        let naive = date.and_hms_opt(0, 0, 0)? + Duration::hours(i64::from(hour));
        // A wall-clock hour skipped by a DST jump resolves to the next valid hour.
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
    }
}
