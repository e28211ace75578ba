//! Calendar-day normalization.
//!
//! Every other component compares days, never instants. A [`Calendar`] turns
//! a UTC timestamp into the [`CalendarDay`] it falls on in the reference zone,
//! discarding time-of-day.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, FixedOffset, Local, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A date with no time component.
///
/// Serialized as `YYYY-MM-DD`, which also sorts chronologically as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| Error::invalid(format!("{year:04}-{month:02}-{day:02} is not a calendar date")))
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// The following day.
    pub fn succ(&self) -> Result<Self> {
        self.0
            .succ_opt()
            .map(Self)
            .ok_or_else(|| Error::invalid("day after the last representable date"))
    }

    /// The preceding day.
    pub fn pred(&self) -> Result<Self> {
        self.0
            .pred_opt()
            .map(Self)
            .ok_or_else(|| Error::invalid("day before the first representable date"))
    }

    pub fn minus_days(&self, days: u32) -> Result<Self> {
        self.0
            .checked_sub_days(Days::new(u64::from(days)))
            .map(Self)
            .ok_or_else(|| Error::invalid(format!("{self} minus {days} days is out of range")))
    }

    pub fn plus_days(&self, days: u32) -> Result<Self> {
        self.0
            .checked_add_days(Days::new(u64::from(days)))
            .map(Self)
            .ok_or_else(|| Error::invalid(format!("{self} plus {days} days is out of range")))
    }
}

impl From<NaiveDate> for CalendarDay {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for CalendarDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| Error::invalid(format!("'{s}' is not a YYYY-MM-DD date: {e}")))
    }
}

/// The reference timezone used to cut timestamps into days.
///
/// `Local` follows the host zone. `Fixed` pins an offset, which keeps tests
/// independent of the machine they run on. No DST-aware zone database is
/// consulted beyond what the host provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Calendar {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl Calendar {
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self::Fixed(offset)
    }

    /// The calendar day `ts` falls on in this zone.
    pub fn day_of(&self, ts: DateTime<Utc>) -> CalendarDay {
        match self {
            Self::Local => CalendarDay(ts.with_timezone(&Local).date_naive()),
            Self::Fixed(offset) => CalendarDay(ts.with_timezone(offset).date_naive()),
        }
    }

    /// Normalize a unix timestamp in seconds.
    pub fn day_of_timestamp(&self, secs: i64) -> Result<CalendarDay> {
        DateTime::from_timestamp(secs, 0)
            .map(|ts| self.day_of(ts))
            .ok_or_else(|| Error::invalid(format!("timestamp {secs} is out of range")))
    }

    /// Normalize an RFC 3339 timestamp string.
    pub fn day_of_rfc3339(&self, s: &str) -> Result<CalendarDay> {
        DateTime::parse_from_rfc3339(s)
            .map(|ts| self.day_of(ts.with_timezone(&Utc)))
            .map_err(|e| Error::invalid(format!("'{s}' is not an RFC 3339 timestamp: {e}")))
    }

    pub fn today(&self, now: DateTime<Utc>) -> CalendarDay {
        self.day_of(now)
    }

    pub fn yesterday(&self, now: DateTime<Utc>) -> Result<CalendarDay> {
        self.today(now).pred()
    }

    pub fn is_today(&self, day: CalendarDay, now: DateTime<Utc>) -> bool {
        day == self.today(now)
    }

    pub fn is_yesterday(&self, day: CalendarDay, now: DateTime<Utc>) -> bool {
        self.yesterday(now).map(|y| y == day).unwrap_or(false)
    }
}
