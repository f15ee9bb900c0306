//! Trading calendar providers.
//!
//! A provider answers one question: which dates in a range are trading
//! sessions. The trading-date index queries it exactly once per run.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use minuteup_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Source of valid trading dates.
pub trait TradingCalendar {
    /// Trading dates within `[start, end]` inclusive, ascending.
    ///
    /// Weekends and holidays are never returned.
    fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>>;
}

impl<T: TradingCalendar + ?Sized> TradingCalendar for &T {
    fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        (**self).trading_dates(start, end)
    }
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(Error::calendar(format!("range start {start} is after end {end}")));
    }
    Ok(())
}

/// Monday–Friday calendar with an optional holiday list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekdayCalendar {
    /// Weekdays that are not trading sessions.
    pub holidays: BTreeSet<NaiveDate>,
}

impl WeekdayCalendar {
    /// Every weekday is a trading day.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude the given dates.
    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Whether `date` is a trading day.
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }
}

impl TradingCalendar for WeekdayCalendar {
    fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        check_range(start, end)?;
        Ok(start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_trading_day(*d))
            .collect())
    }
}

/// Calendar backed by an explicit list of trading dates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixedCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl FixedCalendar {
    /// Build from any collection of dates; duplicates collapse.
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// Number of known trading dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the calendar holds no dates.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl TradingCalendar for FixedCalendar {
    fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        check_range(start, end)?;
        Ok(self.dates.range(start..=end).copied().collect())
    }
}
