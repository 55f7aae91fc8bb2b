//! Calendar types for period attribution
//!
//! Accrual entries are attributed to the month they were earned in, not the
//! moment they were written. This module provides:
//! - `MonthKey`: a calendar month with ordering and arithmetic that crosses
//!   year boundaries
//! - `DateRange`: an inclusive date span
//! - `Clock`: the source of "today" for sweeps, pinned to the business timezone

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Invalid month key: {0}")]
    InvalidMonthKey(String),

    #[error("Date out of supported range")]
    DateOutOfRange,
}

/// A calendar month, displayed and parsed as `YYYY-MM`
///
/// Field order matters: the derived ordering compares year first, so
/// `2024-12 < 2025-01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Creates a month key, validating the month number
    pub fn new(year: i32, month: u32) -> Result<Self, TemporalError> {
        if !(1..=12).contains(&month) {
            return Err(TemporalError::InvalidMonthKey(format!("{}-{}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months since year zero; the basis for all offset arithmetic
    fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: (ordinal.rem_euclid(12) + 1) as u32,
        }
    }

    /// Shifts by `months`, which may be negative
    pub fn offset(&self, months: i32) -> Self {
        Self::from_ordinal(self.ordinal() + months as i64)
    }

    /// The following month (December rolls into January of the next year)
    pub fn succ(&self) -> Self {
        self.offset(1)
    }

    /// The preceding month
    pub fn pred(&self) -> Self {
        self.offset(-1)
    }

    /// Signed number of months from `self` to `other`
    pub fn months_until(&self, other: MonthKey) -> i64 {
        other.ordinal() - self.ordinal()
    }

    /// First calendar day of the month
    pub fn first_day(&self) -> NaiveDate {
        // month is validated on construction, day 1 always exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day of the month
    pub fn last_day(&self) -> NaiveDate {
        self.succ()
            .first_day()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    /// Number of days in the month
    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    /// Returns true if `date` falls inside this month
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Inclusive range of months from `self` through `end`; empty when `end < self`
    pub fn through(&self, end: MonthKey) -> MonthRange {
        MonthRange {
            next: *self,
            end,
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| TemporalError::InvalidMonthKey(s.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| TemporalError::InvalidMonthKey(s.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| TemporalError::InvalidMonthKey(s.to_string()))?;
        MonthKey::new(year, month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Iterator over an inclusive run of months
#[derive(Debug, Clone)]
pub struct MonthRange {
    next: MonthKey,
    end: MonthKey,
}

impl Iterator for MonthRange {
    type Item = MonthKey;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.end {
            return None;
        }
        let current = self.next;
        self.next = current.succ();
        Some(current)
    }
}

/// Inclusive date span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn start_month(&self) -> MonthKey {
        MonthKey::from_date(self.start)
    }

    pub fn end_month(&self) -> MonthKey {
        MonthKey::from_date(self.end)
    }
}

/// Adds calendar months to a date, clamping to the end of shorter months
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, TemporalError> {
    date.checked_add_months(Months::new(months))
        .ok_or(TemporalError::DateOutOfRange)
}

/// Subtracts calendar months from a date, clamping to the end of shorter months
pub fn sub_months(date: NaiveDate, months: u32) -> Result<NaiveDate, TemporalError> {
    date.checked_sub_months(Months::new(months))
        .ok_or(TemporalError::DateOutOfRange)
}

/// Timezone wrapper for the business calendar
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Tz::from_str(&s)
            .map(Timezone)
            .map_err(|_| serde::de::Error::custom(format!("Invalid timezone: {}", s)))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// The local calendar date at the given instant
    pub fn date_at(&self, utc: DateTime<Utc>) -> NaiveDate {
        utc.with_timezone(&self.0).date_naive()
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

/// Source of the current time
///
/// Sweeps decide which months are "current" and which are "future" through
/// this trait so tests can pin the calendar.
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current business date
    fn today(&self) -> NaiveDate;

    /// Month containing the current business date
    fn current_month(&self) -> MonthKey {
        MonthKey::from_date(self.today())
    }
}

/// Wall clock evaluated in the business timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    timezone: Timezone,
}

impl SystemClock {
    pub fn new(timezone: Timezone) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        self.timezone.date_at(Utc::now())
    }
}

/// Clock frozen at a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
    timezone: Timezone,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            timezone: Timezone::default(),
        }
    }

    /// Clock frozen at midday UTC on `date`
    pub fn on(date: NaiveDate) -> Self {
        let now = date
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self::new(now)
    }

    pub fn with_timezone(mut self, timezone: Timezone) -> Self {
        self.timezone = timezone;
        self
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.timezone.date_at(self.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_key_rolls_over_year() {
        let dec = MonthKey::new(2024, 12).unwrap();
        assert_eq!(dec.succ(), MonthKey::new(2025, 1).unwrap());
        assert_eq!(MonthKey::new(2025, 1).unwrap().pred(), dec);
    }

    #[test]
    fn test_month_key_last_day_handles_leap_year() {
        assert_eq!(MonthKey::new(2024, 2).unwrap().last_day(), ymd(2024, 2, 29));
        assert_eq!(MonthKey::new(2025, 2).unwrap().days_in_month(), 28);
        assert_eq!(MonthKey::new(2025, 12).unwrap().last_day(), ymd(2025, 12, 31));
    }

    #[test]
    fn test_month_key_display_round_trip() {
        let key: MonthKey = "2025-07".parse().unwrap();
        assert_eq!(key.to_string(), "2025-07");
        assert!("2025-13".parse::<MonthKey>().is_err());
        assert!("july".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_month_range_across_year_boundary() {
        let start = MonthKey::new(2024, 11).unwrap();
        let end = MonthKey::new(2025, 2).unwrap();
        let months: Vec<String> = start.through(end).map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2024-11", "2024-12", "2025-01", "2025-02"]);
        assert_eq!(end.through(start).count(), 0);
    }

    #[test]
    fn test_fixed_clock_respects_timezone() {
        let instant = ymd(2025, 6, 30).and_hms_opt(23, 30, 0).unwrap().and_utc();
        let clock = FixedClock::new(instant)
            .with_timezone(Timezone::new(chrono_tz::Africa::Harare));
        assert_eq!(clock.today(), ymd(2025, 7, 1));
        assert_eq!(clock.current_month(), MonthKey::new(2025, 7).unwrap());
    }
}
