//! Trading-date attribution index.
//!
//! Every aggregated bucket becomes one pseudo end-of-day record. The index
//! assigns trading dates to bucket timestamps by walking backward from an
//! anchor date one bucket width at a time, pairing each step with the next
//! older trading date from the calendar.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use minuteup_core::config::{AggregationConfig, AttributionConfig};
use minuteup_core::{Config, Error, Result, SessionKind, SessionWindow};
use tracing::{info, warn};

use crate::provider::TradingCalendar;

/// Cursor that walks bucket timestamps backward from the anchor date.
struct BackwardCursor {
    at: NaiveDateTime,
    width: Duration,
    last_open: Duration,
    session: SessionWindow,
    skip_weekends: bool,
}

impl BackwardCursor {
    fn last_open_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + self.last_open
    }

    /// Step back one bucket, snapping out of closed hours and weekends.
    fn step_back(&mut self) {
        let mut next = self.at - self.width;
        let time = next.time();

        match self.session.kind() {
            SessionKind::Regular => {
                if time < self.session.start {
                    next = self.last_open_on(next.date() - Duration::days(1));
                } else if time >= self.session.end {
                    next = self.last_open_on(next.date());
                }
            }
            SessionKind::Overnight => {
                if time < self.session.start && time > self.session.end {
                    next = self.last_open_on(next.date());
                }
            }
            SessionKind::FullDay => {}
        }

        self.at = self.skip_weekend(next);
    }

    fn skip_weekend(&self, at: NaiveDateTime) -> NaiveDateTime {
        if !self.skip_weekends {
            return at;
        }
        match at.weekday() {
            Weekday::Sun => self.last_open_on(at.date() - Duration::days(2)),
            Weekday::Sat => self.last_open_on(at.date() - Duration::days(1)),
            _ => at,
        }
    }
}

/// Immutable map from bucket timestamp to attributed trading date.
///
/// Built once per run; safe to share across threads.
#[derive(Debug, Clone)]
pub struct TradingDateIndex {
    entries: BTreeMap<NaiveDateTime, NaiveDateTime>,
    width_minutes: u32,
    session: SessionWindow,
}

impl TradingDateIndex {
    /// Build the index from the run configuration.
    pub fn from_config<C>(config: &Config, calendar: &C) -> Result<Self>
    where
        C: TradingCalendar + ?Sized,
    {
        Self::build(&config.aggregation, &config.attribution, calendar)
    }

    /// Build the index, querying `calendar` once for
    /// `[calendar_start, anchor_date]`.
    pub fn build<C>(
        aggregation: &AggregationConfig,
        attribution: &AttributionConfig,
        calendar: &C,
    ) -> Result<Self>
    where
        C: TradingCalendar + ?Sized,
    {
        if aggregation.width_minutes == 0 {
            return Err(Error::config("bucket width must be at least one minute"));
        }

        let session = aggregation.session();
        let anchor = attribution.anchor_date;
        let dates = calendar.trading_dates(attribution.calendar_start, anchor)?;
        if dates.is_empty() {
            warn!(%anchor, "calendar returned no trading dates; index is empty");
        }

        let mut cursor = BackwardCursor {
            at: NaiveDateTime::MIN,
            width: Duration::minutes(i64::from(aggregation.width_minutes)),
            last_open: session.last_open_offset(aggregation.width_minutes),
            session,
            skip_weekends: attribution.skip_weekends,
        };
        // A weekend anchor would otherwise seed a Saturday or Sunday key.
        cursor.at = cursor.skip_weekend(cursor.last_open_on(anchor - Duration::days(1)));

        let mut entries = BTreeMap::new();
        for trading_date in dates.iter().rev() {
            let previous = entries.insert(cursor.at, trading_date.and_time(session.end));
            debug_assert!(previous.is_none(), "cursor revisited {}", cursor.at);
            cursor.step_back();
        }

        let index = Self {
            entries,
            width_minutes: aggregation.width_minutes,
            session,
        };
        if let (Some(earliest), Some(latest)) = (index.earliest_bucket(), index.latest_bucket()) {
            info!(
                entries = index.len(),
                %earliest,
                %latest,
                width = aggregation.width_minutes,
                "trading-date index built"
            );
        }
        Ok(index)
    }

    /// Trading date (with session close time) for a bucket.
    pub fn attribute(&self, date: NaiveDate, time: NaiveTime) -> Result<NaiveDateTime> {
        self.get(date.and_time(time))
            .ok_or(Error::TradingDateNotFound { date, time })
    }

    /// Lookup by bucket timestamp.
    pub fn get(&self, bucket: NaiveDateTime) -> Option<NaiveDateTime> {
        self.entries.get(&bucket).copied()
    }

    /// Bucket timestamps, ascending.
    pub fn buckets(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.entries.keys().copied()
    }

    /// Bucket timestamps in `[from, to)`, ascending.
    pub fn buckets_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> Vec<NaiveDateTime> {
        self.entries.range(from..to).map(|(k, _)| *k).collect()
    }

    /// Oldest indexed bucket.
    pub fn earliest_bucket(&self) -> Option<NaiveDateTime> {
        self.entries.keys().next().copied()
    }

    /// Most recent indexed bucket.
    pub fn latest_bucket(&self) -> Option<NaiveDateTime> {
        self.entries.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bucket width the index was built for.
    pub fn width_minutes(&self) -> u32 {
        self.width_minutes
    }

    /// Session the index was built for.
    pub fn session(&self) -> SessionWindow {
        self.session
    }
}
