//! Minute bars in, pseudo end-of-day records out.

use std::sync::Arc;

use minuteup_calendar::TradingDateIndex;
use minuteup_core::{Config, InstrumentId, MinuteBar, Result, SessionWindow};
use minuteup_ingestion::{AggregatorStats, BarAggregator};
use serde::Serialize;
use tracing::info;

use crate::emitter::{CorporateActionEmitter, EmitterStats};
use crate::sink::CorporateActionSink;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub bars_seen: u64,
    pub bars_out_of_session: u64,
    pub buckets_closed: u64,
    pub eod_records: u64,
    pub splits: u64,
    pub dividends: u64,
}

impl RunSummary {
    fn collect(aggregator: &AggregatorStats, emitter: &EmitterStats) -> Self {
        Self {
            bars_seen: aggregator.bars_seen,
            bars_out_of_session: aggregator.bars_out_of_session,
            buckets_closed: aggregator.buckets_closed,
            eod_records: emitter.eod_records,
            splits: emitter.splits,
            dividends: emitter.dividends,
        }
    }
}

/// Streams one instrument's minute bars through aggregation and emission.
pub struct PseudoEodConverter {
    aggregator: BarAggregator,
    emitter: CorporateActionEmitter,
}

impl PseudoEodConverter {
    pub fn new(
        instrument_id: InstrumentId,
        width_minutes: u32,
        session: SessionWindow,
        index: Arc<TradingDateIndex>,
    ) -> Self {
        Self {
            aggregator: BarAggregator::new(width_minutes, session),
            emitter: CorporateActionEmitter::new(instrument_id, index),
        }
    }

    /// Converter for the configured instrument and aggregation settings.
    pub fn from_config(config: &Config, index: Arc<TradingDateIndex>) -> Self {
        Self::new(
            config.instrument.id,
            config.aggregation.width_minutes,
            config.aggregation.session(),
            index,
        )
    }

    /// Feed one minute bar, emitting for any bucket it closes.
    pub fn process<S>(&mut self, bar: &MinuteBar, sink: &mut S) -> Result<()>
    where
        S: CorporateActionSink + ?Sized,
    {
        match self.aggregator.process(bar) {
            Some(closed) => self.emitter.on_bucket_closed(&closed, sink),
            None => Ok(()),
        }
    }

    /// Finalize the bucket in progress at end of stream.
    pub fn flush<S>(&mut self, sink: &mut S) -> Result<()>
    where
        S: CorporateActionSink + ?Sized,
    {
        match self.aggregator.flush() {
            Some(closed) => self.emitter.on_bucket_closed(&closed, sink),
            None => Ok(()),
        }
    }

    /// Drain `bars` into `sink`, then flush.
    ///
    /// Stops at the first read or attribution error.
    pub fn run<I, S>(&mut self, bars: I, sink: &mut S) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<MinuteBar>>,
        S: CorporateActionSink + ?Sized,
    {
        for bar in bars {
            self.process(&bar?, sink)?;
        }
        self.flush(sink)?;

        let summary = self.summary();
        info!(
            bars = summary.bars_seen,
            skipped = summary.bars_out_of_session,
            eod = summary.eod_records,
            splits = summary.splits,
            dividends = summary.dividends,
            "conversion complete"
        );
        Ok(summary)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::collect(self.aggregator.stats(), self.emitter.stats())
    }
}
