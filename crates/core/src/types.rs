//! Core data types for the minuteup system.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Instrument identifier attached to every emitted record.
pub type InstrumentId = i64;

/// Fixed-point price type.
pub type Price = Decimal;

/// Render a time-of-day as hour (no padding) followed by two-digit minutes.
///
/// 09:30 → `930`, 16:00 → `1600`, 00:05 → `005`.
#[inline]
pub fn format_hmm(time: NaiveTime) -> String {
    format!("{}{:02}", time.hour(), time.minute())
}

/// A single one-minute bar from the source feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinuteBar {
    /// Calendar date.
    pub date: NaiveDate,
    /// Bar open time-of-day.
    pub time: NaiveTime,
    /// Open price.
    pub open: Price,
    /// High price.
    pub high: Price,
    /// Low price.
    pub low: Price,
    /// Close price.
    pub close: Price,
    /// Volume (may be fractional in the source).
    pub volume: Decimal,
    /// Cumulative split ratio.
    pub split: Decimal,
    /// Secondary pass-through field.
    pub secondary: Decimal,
    /// Dividend amount, zero when absent.
    pub dividend: Decimal,
}

impl MinuteBar {
    /// Create a bar without corporate-action fields (ratio 1, no dividend).
    pub fn new(
        date: NaiveDate,
        time: NaiveTime,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Decimal,
    ) -> Self {
        Self {
            date,
            time,
            open,
            high,
            low,
            close,
            volume,
            split: Decimal::ONE,
            secondary: Decimal::ZERO,
            dividend: Decimal::ZERO,
        }
    }

    /// Set the corporate-action fields.
    pub fn with_corporate_actions(mut self, split: Decimal, secondary: Decimal, dividend: Decimal) -> Self {
        self.split = split;
        self.secondary = secondary;
        self.dividend = dividend;
        self
    }

    /// Date and time combined.
    #[inline]
    pub fn timestamp(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// An N-minute bar produced by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBar {
    /// Bucket open date.
    pub date: NaiveDate,
    /// Bucket open time, floored to the bucket boundary.
    pub time: NaiveTime,
    /// First open in the bucket.
    pub open: Price,
    /// Highest high.
    pub high: Price,
    /// Lowest low.
    pub low: Price,
    /// Last close.
    pub close: Price,
    /// Sum of constituent volumes.
    pub volume: Decimal,
    /// Split ratio of the last constituent.
    pub split: Decimal,
    /// Max of the secondary field.
    pub secondary: Decimal,
    /// Max of the dividend field.
    pub dividend: Decimal,
}

impl AggregatedBar {
    /// Bucket key: open date and floored open time.
    #[inline]
    pub fn timestamp(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Fields for the aggregation-mode output row.
    pub fn csv_record(&self) -> Vec<String> {
        vec![
            self.date.format("%Y%m%d").to_string(),
            format_hmm(self.time),
            self.open.to_string(),
            self.high.to_string(),
            self.low.to_string(),
            self.close.to_string(),
            self.volume.normalize().to_string(),
            self.split.to_string(),
            self.secondary.to_string(),
            self.dividend.to_string(),
        ]
    }
}

/// Pseudo end-of-day record synthesized from one aggregated bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EodRecord {
    pub instrument_id: InstrumentId,
    /// Trading date combined with the session close.
    pub trading_date: NaiveDateTime,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    /// Volume divided by 100, truncated. The last two digits are dropped.
    pub volume_hundreds: i64,
}

/// Share split attributed to a trading date, in smallest integer terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitEvent {
    pub instrument_id: InstrumentId,
    pub trading_date: NaiveDateTime,
    pub old_shares: i64,
    pub new_shares: i64,
}

impl SplitEvent {
    /// `old/new` rendering used by the attribution output.
    pub fn ratio_string(&self) -> String {
        format!("{}/{}", self.old_shares, self.new_shares)
    }
}

/// Dividend attributed to a trading date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub instrument_id: InstrumentId,
    pub trading_date: NaiveDateTime,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_format_hmm() {
        assert_eq!(format_hmm(hm(9, 30)), "930");
        assert_eq!(format_hmm(hm(16, 0)), "1600");
        assert_eq!(format_hmm(hm(0, 5)), "005");
    }

    #[test]
    fn test_minute_bar_defaults() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bar = MinuteBar::new(date, hm(9, 30), dec!(1), dec!(2), dec!(0.5), dec!(1.5), dec!(100));
        assert_eq!(bar.split, Decimal::ONE);
        assert_eq!(bar.dividend, Decimal::ZERO);
        assert_eq!(bar.timestamp(), date.and_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn test_aggregated_csv_record() {
        let bar = AggregatedBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            time: hm(9, 30),
            open: dec!(100.25),
            high: dec!(101),
            low: dec!(99.5),
            close: dec!(100.75),
            volume: dec!(1500.00),
            split: dec!(1),
            secondary: dec!(0),
            dividend: dec!(0.12),
        };
        assert_eq!(
            bar.csv_record(),
            vec!["20240102", "930", "100.25", "101", "99.5", "100.75", "1500", "1", "0", "0.12"]
        );
    }

    #[test]
    fn test_split_ratio_string() {
        let split = SplitEvent {
            instrument_id: 7,
            trading_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(16, 0, 0).unwrap(),
            old_shares: 2,
            new_shares: 1,
        };
        assert_eq!(split.ratio_string(), "2/1");
    }
}
