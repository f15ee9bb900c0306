//! Session windows and bucket flooring.

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Shape of a session window, derived from the ordering of its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// `start < end`: the session opens and closes on the same day.
    Regular,
    /// `start > end`: the session wraps past midnight (e.g. 22:00–06:00).
    Overnight,
    /// `start == end`: every minute of the day is in session.
    FullDay,
}

/// Daily time-of-day range during which bars are eligible for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    /// Session open (inclusive).
    pub start: NaiveTime,
    /// Session close (exclusive).
    pub end: NaiveTime,
}

impl SessionWindow {
    /// Create a session window.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Session open at 00:00 and close at 00:00.
    pub fn full_day() -> Self {
        Self::new(NaiveTime::MIN, NaiveTime::MIN)
    }

    /// Classify the window.
    #[inline]
    pub fn kind(&self) -> SessionKind {
        if self.start < self.end {
            SessionKind::Regular
        } else if self.start > self.end {
            SessionKind::Overnight
        } else {
            SessionKind::FullDay
        }
    }

    /// Whether a bar opening at `time` belongs to the session.
    #[inline]
    pub fn contains(&self, time: NaiveTime) -> bool {
        match self.kind() {
            SessionKind::Regular => time >= self.start && time < self.end,
            SessionKind::Overnight => time >= self.start || time < self.end,
            SessionKind::FullDay => true,
        }
    }

    /// Offset from midnight of the last bucket that opens before the close.
    ///
    /// Negative when the close is earlier than one bucket width past
    /// midnight; adding it to a date then lands on the previous day.
    pub fn last_open_offset(&self, width_minutes: u32) -> Duration {
        let end = Duration::seconds(i64::from(self.end.num_seconds_from_midnight()));
        end - Duration::minutes(i64::from(width_minutes))
    }
}

/// Floor a time-of-day to the start of its bucket.
///
/// Flooring happens within the hour, so widths that do not divide 60 give
/// bucket boundaries that are not contiguous across hour lines.
#[inline]
pub fn bucket_floor(time: NaiveTime, width_minutes: u32) -> NaiveTime {
    let minute = time.minute();
    let floored = minute - minute % width_minutes.max(1);
    time.with_minute(floored)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}
