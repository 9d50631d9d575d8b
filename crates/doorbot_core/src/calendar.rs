//! Calendar-day projection in the configured time zone.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::DoorbotError;

pub const DEFAULT_TIME_ZONE: &str = "America/New_York";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    tz: Tz,
}

impl Calendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    /// Calendar day of `instant` in this zone.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// The calendar day preceding the day of `instant`. Independent of how
    /// many hours that day had.
    pub fn day_before(&self, instant: DateTime<Utc>) -> Option<NaiveDate> {
        self.date_of(instant).pred_opt()
    }

    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz)
    }

    /// Interpret a wall-clock time in this zone.
    ///
    /// Ambiguous times (clocks going back) resolve to the earlier instant;
    /// times skipped by a forward transition are rejected.
    pub fn from_local(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, DoorbotError> {
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| {
                DoorbotError::InvalidInput(format!("{local} does not exist in {}", self.tz))
            })
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(chrono_tz::America::New_York)
    }
}

impl FromStr for Calendar {
    type Err = DoorbotError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| DoorbotError::UnknownTimeZone(name.to_string()))
    }
}
