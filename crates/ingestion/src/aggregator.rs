//! N-minute bar aggregation from one-minute bars.
//!
//! Streams minute bars through a session filter and folds them into
//! fixed-width buckets anchored to the top of the hour.

use minuteup_core::{bucket_floor, AggregatedBar, MinuteBar, SessionWindow};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use tracing::debug;

/// A bucket that was just finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedBucket {
    /// The finished bar.
    pub bar: AggregatedBar,
    /// Split ratio of the bar that opened the next bucket.
    ///
    /// `None` when the bucket was closed by [`BarAggregator::flush`].
    pub next_split: Option<Decimal>,
}

impl ClosedBucket {
    /// Whether the next bucket opened with a different split ratio.
    #[inline]
    pub fn split_changed(&self) -> bool {
        self.next_split.is_some_and(|next| next != self.bar.split)
    }
}

/// Counters collected while aggregating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    /// Minute bars handed to `process`.
    pub bars_seen: u64,
    /// Minute bars dropped by the session filter.
    pub bars_out_of_session: u64,
    /// Buckets finalized, including the flushed one.
    pub buckets_closed: u64,
}

/// A bucket that's currently being built.
#[derive(Debug, Clone)]
struct BucketInProgress {
    date: NaiveDate,
    time: NaiveTime,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    split: Decimal,
    secondary: Decimal,
    dividend: Decimal,
}

impl BucketInProgress {
    fn new(bar: &MinuteBar, width_minutes: u32) -> Self {
        Self {
            date: bar.date,
            time: bucket_floor(bar.time, width_minutes),
            open: bar.open,
            high: Decimal::MIN,
            low: Decimal::MAX,
            close: bar.close,
            volume: Decimal::ZERO,
            split: bar.split,
            secondary: bar.secondary,
            dividend: bar.dividend,
        }
    }

    fn add_bar(&mut self, bar: &MinuteBar) {
        self.high = self.high.max(bar.high);
        self.low = self.low.min(bar.low);
        self.close = bar.close;
        self.volume += bar.volume;
        self.split = bar.split;
        self.secondary = self.secondary.max(bar.secondary);
        self.dividend = self.dividend.max(bar.dividend);
    }

    fn to_bar(&self) -> AggregatedBar {
        AggregatedBar {
            date: self.date,
            time: self.time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            split: self.split,
            secondary: self.secondary,
            dividend: self.dividend,
        }
    }
}

/// Stateful reducer turning a minute-bar stream into N-minute bars.
///
/// Bars must arrive in non-decreasing (date, time) order. Call
/// [`process`](Self::process) once per bar and [`flush`](Self::flush) once
/// at the end of the stream.
pub struct BarAggregator {
    width_minutes: u32,
    session: SessionWindow,
    /// `Some` once the first in-session bar has been seen.
    current: Option<BucketInProgress>,
    stats: AggregatorStats,
}

impl BarAggregator {
    /// Create an aggregator for the given bucket width and session.
    pub fn new(width_minutes: u32, session: SessionWindow) -> Self {
        Self {
            width_minutes: width_minutes.max(1),
            session,
            current: None,
            stats: AggregatorStats::default(),
        }
    }

    /// Bucket width in minutes.
    pub fn width_minutes(&self) -> u32 {
        self.width_minutes
    }

    /// Session window applied before bucketing.
    pub fn session(&self) -> SessionWindow {
        self.session
    }

    /// Whether `bar` opens a new bucket relative to the one in progress.
    ///
    /// The distance must exceed the width: a bar exactly one width past the
    /// key still folds into the current bucket. The minute distance goes negative across midnight, so the date clause
    /// is what forces the transition on a day change.
    fn is_new_bucket(&self, bar: &MinuteBar) -> bool {
        match &self.current {
            None => true,
            Some(bucket) => {
                let elapsed = (bar.time - bucket.time).num_minutes();
                elapsed > i64::from(self.width_minutes) || bar.date > bucket.date
            }
        }
    }

    /// Feed one minute bar.
    ///
    /// Returns the bucket this bar closed, if any. Out-of-session bars are
    /// dropped without touching the bucket in progress.
    pub fn process(&mut self, bar: &MinuteBar) -> Option<ClosedBucket> {
        self.stats.bars_seen += 1;

        if !self.session.contains(bar.time) {
            self.stats.bars_out_of_session += 1;
            return None;
        }

        let mut closed = None;
        if self.is_new_bucket(bar) {
            if let Some(done) = self.current.take() {
                closed = Some(self.close_bucket(&done, Some(bar.split)));
            }
            self.current = Some(BucketInProgress::new(bar, self.width_minutes));
        }

        if let Some(bucket) = self.current.as_mut() {
            bucket.add_bar(bar);
        }

        closed
    }

    /// Finalize the bucket in progress. A second call returns `None`.
    pub fn flush(&mut self) -> Option<ClosedBucket> {
        let done = self.current.take()?;
        Some(self.close_bucket(&done, None))
    }

    fn close_bucket(&mut self, bucket: &BucketInProgress, next_split: Option<Decimal>) -> ClosedBucket {
        self.stats.buckets_closed += 1;
        let bar = bucket.to_bar();
        debug!(date = %bar.date, time = %bar.time, volume = %bar.volume, "bucket closed");
        ClosedBucket { bar, next_split }
    }

    /// Snapshot of the bucket in progress, if any.
    pub fn current(&self) -> Option<AggregatedBar> {
        self.current.as_ref().map(BucketInProgress::to_bar)
    }

    /// Aggregation counters.
    pub fn stats(&self) -> &AggregatorStats {
        &self.stats
    }

    /// Run a whole stream through the aggregator, flushing at the end.
    pub fn aggregate<'a, I>(&mut self, bars: I) -> Vec<AggregatedBar>
    where
        I: IntoIterator<Item = &'a MinuteBar>,
    {
        let mut out: Vec<AggregatedBar> = bars
            .into_iter()
            .filter_map(|bar| self.process(bar))
            .map(|closed| closed.bar)
            .collect();
        out.extend(self.flush().map(|closed| closed.bar));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn regular_session() -> SessionWindow {
        SessionWindow::new(hm(9, 30), hm(16, 0))
    }

    fn make_bar(date: NaiveDate, time: NaiveTime, price: Decimal) -> MinuteBar {
        MinuteBar::new(date, time, price, price, price, price, dec!(100))
    }

    fn make_ohlc(date: NaiveDate, time: NaiveTime, o: Decimal, h: Decimal, l: Decimal, c: Decimal) -> MinuteBar {
        MinuteBar::new(date, time, o, h, l, c, dec!(100))
    }

    #[test]
    fn test_single_bar_bucket() {
        let mut agg = BarAggregator::new(30, regular_session());
        assert!(agg.process(&make_ohlc(day(4), hm(9, 47), dec!(10), dec!(11), dec!(9), dec!(10.5))).is_none());

        let closed = agg.flush().unwrap();
        assert_eq!(closed.bar.time, hm(9, 30));
        assert_eq!(closed.bar.open, dec!(10));
        assert_eq!(closed.bar.high, dec!(11));
        assert_eq!(closed.bar.low, dec!(9));
        assert_eq!(closed.bar.close, dec!(10.5));
        assert_eq!(closed.bar.volume, dec!(100));
        assert_eq!(closed.next_split, None);
    }

    #[test]
    fn test_boundary_minute_folds_into_open_bucket() {
        // 09:30 open=100, 09:45 low=99, 10:00 close=102.2, 10:15 high=105.
        let mut agg = BarAggregator::new(30, regular_session());
        let bars = vec![
            make_ohlc(day(4), hm(9, 30), dec!(100), dec!(100.5), dec!(100), dec!(100.2)),
            make_ohlc(day(4), hm(9, 45), dec!(100.2), dec!(100.3), dec!(99), dec!(99.5)),
            make_ohlc(day(4), hm(9, 59), dec!(99.5), dec!(102.1), dec!(99.4), dec!(102)),
            make_ohlc(day(4), hm(10, 0), dec!(102), dec!(102.5), dec!(101.8), dec!(102.2)),
            make_ohlc(day(4), hm(10, 15), dec!(102.2), dec!(105), dec!(102), dec!(104)),
        ];

        let out = agg.aggregate(&bars);
        assert_eq!(out.len(), 2);

        // 10:00 is exactly one width from the key, so it still belongs to 09:30.
        assert_eq!(out[0].time, hm(9, 30));
        assert_eq!(out[0].open, dec!(100));
        assert_eq!(out[0].high, dec!(102.5));
        assert_eq!(out[0].low, dec!(99));
        assert_eq!(out[0].close, dec!(102.2));
        assert_eq!(out[0].volume, dec!(400));

        assert_eq!(out[1].time, hm(10, 0));
        assert_eq!(out[1].open, dec!(102.2));
        assert_eq!(out[1].high, dec!(105));
        assert_eq!(out[1].close, dec!(104));
    }

    #[test]
    fn test_exact_width_distance_stays_in_bucket() {
        let mut agg = BarAggregator::new(30, regular_session());
        let mut first = make_bar(day(4), hm(9, 30), dec!(1));
        first.volume = dec!(10);
        let mut second = make_bar(day(4), hm(10, 0), dec!(1));
        second.volume = dec!(20);

        let out = agg.aggregate(&[first, second]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].time, hm(9, 30));
        assert_eq!(out[0].volume, dec!(30));
    }

    #[test]
    fn test_out_of_session_bar_leaves_state_unchanged() {
        let mut agg = BarAggregator::new(30, regular_session());
        agg.process(&make_bar(day(4), hm(9, 31), dec!(50)));
        let before = agg.current();

        assert!(agg.process(&make_bar(day(4), hm(16, 5), dec!(999))).is_none());
        assert!(agg.process(&make_bar(day(4), hm(9, 0), dec!(1))).is_none());

        assert_eq!(agg.current(), before);
        assert_eq!(agg.stats().bars_out_of_session, 2);
    }

    #[test]
    fn test_out_of_session_bar_does_not_start_bucket() {
        let mut agg = BarAggregator::new(30, regular_session());
        assert!(agg.process(&make_bar(day(4), hm(8, 0), dec!(1))).is_none());
        assert!(agg.current().is_none());
        assert!(agg.flush().is_none());
    }

    #[test]
    fn test_flush_idempotent() {
        let mut agg = BarAggregator::new(30, regular_session());
        agg.process(&make_bar(day(4), hm(10, 0), dec!(5)));

        assert!(agg.flush().is_some());
        assert!(agg.flush().is_none());
        assert_eq!(agg.stats().buckets_closed, 1);
    }

    #[test]
    fn test_overnight_session_date_change_forces_new_bucket() {
        // 23:50 and 00:10 are the same session but different calendar dates.
        let mut agg = BarAggregator::new(30, SessionWindow::new(hm(22, 0), hm(6, 0)));
        assert!(agg.process(&make_bar(day(4), hm(23, 50), dec!(10))).is_none());

        let closed = agg.process(&make_bar(day(5), hm(0, 10), dec!(11))).unwrap();
        assert_eq!(closed.bar.date, day(4));
        assert_eq!(closed.bar.time, hm(23, 30));

        let last = agg.flush().unwrap();
        assert_eq!(last.bar.date, day(5));
        assert_eq!(last.bar.time, hm(0, 0));
    }

    #[test]
    fn test_minute_distance_alone_misses_midnight() {
        // Same bucket floor (00:00) on consecutive days: only the date clause splits them.
        let mut agg = BarAggregator::new(60, SessionWindow::full_day());
        agg.process(&make_bar(day(4), hm(0, 0), dec!(1)));
        let closed = agg.process(&make_bar(day(5), hm(0, 10), dec!(2)));
        assert!(closed.is_some());
    }

    #[test]
    fn test_split_last_write_wins_and_maxima() {
        let mut agg = BarAggregator::new(30, regular_session());
        agg.process(&make_bar(day(4), hm(10, 0), dec!(1)).with_corporate_actions(dec!(1), dec!(3), dec!(0)));
        agg.process(&make_bar(day(4), hm(10, 1), dec!(1)).with_corporate_actions(dec!(0.5), dec!(7), dec!(0.25)));
        agg.process(&make_bar(day(4), hm(10, 2), dec!(1)).with_corporate_actions(dec!(0.75), dec!(2), dec!(0.25)));

        let bar = agg.flush().unwrap().bar;
        assert_eq!(bar.split, dec!(0.75));
        assert_eq!(bar.secondary, dec!(7));
        // A dividend repeated on every minute of its ex-date is not summed.
        assert_eq!(bar.dividend, dec!(0.25));
    }

    #[test]
    fn test_next_split_reports_incoming_ratio() {
        let mut agg = BarAggregator::new(30, regular_session());
        agg.process(&make_bar(day(4), hm(10, 0), dec!(1)));
        let closed = agg
            .process(&make_bar(day(4), hm(10, 31), dec!(1)).with_corporate_actions(dec!(0.5), dec!(0), dec!(0)))
            .unwrap();
        assert_eq!(closed.next_split, Some(dec!(0.5)));
        assert!(closed.split_changed());
    }

    #[test]
    fn test_width_not_dividing_sixty_floors_within_hour() {
        let mut agg = BarAggregator::new(45, SessionWindow::full_day());
        let bars: Vec<MinuteBar> = (0..120)
            .map(|i| {
                let t = hm(9, 0) + Duration::minutes(i);
                make_bar(day(4), t, dec!(1))
            })
            .collect();
        let out = agg.aggregate(&bars);
        let times: Vec<NaiveTime> = out.iter().map(|b| b.time).collect();
        // 09:46 floors to 09:45, but 10:31 floors to 10:00 within its own hour.
        assert_eq!(times, vec![hm(9, 0), hm(9, 45), hm(10, 0), hm(10, 45)]);
        let volumes: Vec<Decimal> = out.iter().map(|b| b.volume).collect();
        assert_eq!(volumes, vec![dec!(4600), dec!(4500), dec!(1500), dec!(1400)]);
    }

    proptest! {
        #[test]
        fn prop_volume_conserved_and_bounds_hold(
            volumes in prop::collection::vec(0u64..1_000_000, 1..30),
            prices in prop::collection::vec(1u32..10_000, 30),
        ) {
            let mut agg = BarAggregator::new(30, SessionWindow::full_day());
            let bars: Vec<MinuteBar> = volumes
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let p = Decimal::new(i64::from(prices[i]), 2);
                    let mut bar = make_ohlc(day(4), hm(10, i as u32), p, p + dec!(0.5), p - dec!(0.5), p);
                    bar.volume = Decimal::new(*v as i64, 3);
                    bar
                })
                .collect();

            let out = agg.aggregate(&bars);
            prop_assert_eq!(out.len(), 1);

            let expected: Decimal = bars.iter().map(|b| b.volume).sum();
            prop_assert_eq!(out[0].volume, expected);
            for bar in &bars {
                prop_assert!(out[0].high >= bar.high);
                prop_assert!(out[0].low <= bar.low);
            }
            if bars.len() == 1 {
                prop_assert_eq!(out[0].high, bars[0].high);
                prop_assert_eq!(out[0].low, bars[0].low);
            }
        }
    }
}
