//! Corporate-action sinks and attribution-mode row rendering.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use minuteup_core::{format_hmm, DividendEvent, EodRecord, SplitEvent};
use serde::{Deserialize, Serialize};

/// Rendered in place of an absent split or dividend.
pub const NOT_APPLICABLE: &str = "NA";

/// Destination for emitted records.
///
/// Writes are fire-and-forget. Each stream is ordered by trading date;
/// no ordering holds across the three streams.
pub trait CorporateActionSink {
    /// Append a pseudo end-of-day record.
    fn save_eod(&mut self, record: EodRecord);

    /// Append a split record.
    fn save_split(&mut self, event: SplitEvent);

    /// Append a dividend record.
    fn save_dividend(&mut self, event: DividendEvent);
}

impl<S: CorporateActionSink + ?Sized> CorporateActionSink for &mut S {
    fn save_eod(&mut self, record: EodRecord) {
        (**self).save_eod(record);
    }

    fn save_split(&mut self, event: SplitEvent) {
        (**self).save_split(event);
    }

    fn save_dividend(&mut self, event: DividendEvent) {
        (**self).save_dividend(event);
    }
}

/// Sink that keeps every record in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub eod: Vec<EodRecord>,
    pub splits: Vec<SplitEvent>,
    pub dividends: Vec<DividendEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the three streams on trading date, one row per EOD record.
    pub fn rows(&self) -> Vec<EodRow> {
        let splits: HashMap<NaiveDateTime, &SplitEvent> =
            self.splits.iter().map(|s| (s.trading_date, s)).collect();
        let dividends: HashMap<NaiveDateTime, &DividendEvent> =
            self.dividends.iter().map(|d| (d.trading_date, d)).collect();

        self.eod
            .iter()
            .map(|record| EodRow {
                eod: record.clone(),
                split: splits.get(&record.trading_date).map(|s| (*s).clone()),
                dividend: dividends.get(&record.trading_date).map(|d| (*d).clone()),
            })
            .collect()
    }
}

impl CorporateActionSink for MemorySink {
    fn save_eod(&mut self, record: EodRecord) {
        self.eod.push(record);
    }

    fn save_split(&mut self, event: SplitEvent) {
        self.splits.push(event);
    }

    fn save_dividend(&mut self, event: DividendEvent) {
        self.dividends.push(event);
    }
}

/// One attribution-mode output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EodRow {
    pub eod: EodRecord,
    pub split: Option<SplitEvent>,
    pub dividend: Option<DividendEvent>,
}

impl EodRow {
    /// `yyyy-MM-dd,hmm,open,high,low,close,volume_hundreds,split,dividend`.
    pub fn csv_record(&self) -> Vec<String> {
        let eod = &self.eod;
        vec![
            eod.trading_date.format("%Y-%m-%d").to_string(),
            format_hmm(eod.trading_date.time()),
            eod.open.to_string(),
            eod.high.to_string(),
            eod.low.to_string(),
            eod.close.to_string(),
            eod.volume_hundreds.to_string(),
            self.split
                .as_ref()
                .map_or_else(|| NOT_APPLICABLE.to_string(), SplitEvent::ratio_string),
            self.dividend
                .as_ref()
                .map_or_else(|| NOT_APPLICABLE.to_string(), |d| d.amount.to_string()),
        ]
    }
}
