//! Split and dividend emission at bucket boundaries.
//!
//! Every finalized bucket yields one pseudo end-of-day record. Split changes
//! are detected when the next bucket opens, but the split record is only
//! written at the following finalization, attributed to the trading date of
//! the bucket whose ratio changed.

use std::sync::Arc;

use chrono::NaiveDateTime;
use minuteup_calendar::TradingDateIndex;
use minuteup_core::{DividendEvent, EodRecord, Error, InstrumentId, Result, SplitEvent};
use minuteup_ingestion::ClosedBucket;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::ratio::reduce_split;
use crate::sink::CorporateActionSink;

/// Emission counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitterStats {
    pub eod_records: u64,
    pub splits: u64,
    pub dividends: u64,
}

/// Split change seen at a transition, waiting for the next finalization.
#[derive(Debug, Clone)]
struct PendingSplit {
    old: Decimal,
    new: Decimal,
    trading_date: NaiveDateTime,
}

/// Volume divided by 100, truncated toward zero.
pub fn volume_in_hundreds(volume: Decimal) -> Result<i64> {
    (volume / Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .ok_or_else(|| Error::conversion(format!("volume {volume} does not fit in i64 hundreds")))
}

/// Turns closed buckets into EOD, split and dividend records.
pub struct CorporateActionEmitter {
    instrument_id: InstrumentId,
    index: Arc<TradingDateIndex>,
    pending_split: Option<PendingSplit>,
    stats: EmitterStats,
}

impl CorporateActionEmitter {
    /// Create an emitter for one instrument.
    pub fn new(instrument_id: InstrumentId, index: Arc<TradingDateIndex>) -> Self {
        Self {
            instrument_id,
            index,
            pending_split: None,
            stats: EmitterStats::default(),
        }
    }

    /// Handle a finalized bucket.
    ///
    /// Fails without writing anything when the bucket has no trading date.
    pub fn on_bucket_closed<S>(&mut self, closed: &ClosedBucket, sink: &mut S) -> Result<()>
    where
        S: CorporateActionSink + ?Sized,
    {
        let bar = &closed.bar;
        let trading_date = self.index.attribute(bar.date, bar.time)?;
        let volume_hundreds = volume_in_hundreds(bar.volume)?;

        let split = match self.pending_split.take() {
            Some(pending) => {
                let (old_shares, new_shares) = reduce_split(pending.old, pending.new)?;
                Some(SplitEvent {
                    instrument_id: self.instrument_id,
                    trading_date: pending.trading_date,
                    old_shares,
                    new_shares,
                })
            }
            None => None,
        };

        sink.save_eod(EodRecord {
            instrument_id: self.instrument_id,
            trading_date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume_hundreds,
        });
        self.stats.eod_records += 1;

        if let Some(event) = split {
            debug!(trading_date = %event.trading_date, ratio = %event.ratio_string(), "split emitted");
            sink.save_split(event);
            self.stats.splits += 1;
        }

        if !bar.dividend.is_zero() {
            sink.save_dividend(DividendEvent {
                instrument_id: self.instrument_id,
                trading_date,
                amount: bar.dividend,
            });
            self.stats.dividends += 1;
        }

        if let (true, Some(next)) = (closed.split_changed(), closed.next_split) {
            debug!(%trading_date, old = %bar.split, new = %next, "split ratio change detected");
            self.pending_split = Some(PendingSplit {
                old: bar.split,
                new: next,
                trading_date,
            });
        }

        Ok(())
    }

    /// Whether a detected split is waiting to be written.
    pub fn has_pending_split(&self) -> bool {
        self.pending_split.is_some()
    }

    pub fn stats(&self) -> &EmitterStats {
        &self.stats
    }
}
