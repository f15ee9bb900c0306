//! Minute-bar record parsing.
//!
//! Reads header-less delimited records of the form
//! `yyyyMMdd,hmm,open,high,low,close[,p5,p6],volume[,split,secondary,dividend]`.
//!
//! Feeds with six price columns carry OHLC first; the two trailing price
//! columns are validated and dropped.

use std::io;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use csv::StringRecord;
use minuteup_core::{Error, MinuteBar, Result};
use rust_decimal::Decimal;

/// Date and time columns.
const STAMP_FIELDS: usize = 2;
/// Split, secondary and dividend columns.
const AUX_FIELDS: usize = 3;

/// Column positions for one of the accepted record shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    prices: usize,
    auxiliary: bool,
}

impl Layout {
    /// Four or six prices, then volume, then zero or three auxiliaries.
    fn for_len(len: usize) -> Option<Self> {
        [4, 6]
            .into_iter()
            .flat_map(|prices| [(prices, false), (prices, true)])
            .map(|(prices, auxiliary)| Layout { prices, auxiliary })
            .find(|layout| layout.len() == len)
    }

    fn len(&self) -> usize {
        STAMP_FIELDS + self.prices + 1 + if self.auxiliary { AUX_FIELDS } else { 0 }
    }

    fn volume(&self) -> usize {
        STAMP_FIELDS + self.prices
    }
}

/// Parse an 8-digit `yyyyMMdd` date.
pub fn parse_date(field: &str, line: u64) -> Result<NaiveDate> {
    let field = field.trim();
    if field.len() != 8 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::parse(line, format!("invalid date '{field}'")));
    }
    NaiveDate::parse_from_str(field, "%Y%m%d")
        .map_err(|e| Error::parse(line, format!("invalid date '{field}': {e}")))
}

/// Parse a 1–4 digit `hmm` time, left-padding with zeros to `HHMM`.
pub fn parse_time(field: &str, line: u64) -> Result<NaiveTime> {
    let field = field.trim();
    if field.is_empty() || field.len() > 4 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::parse(line, format!("invalid time '{field}'")));
    }
    let padded = format!("{field:0>4}");
    NaiveTime::parse_from_str(&padded, "%H%M")
        .map_err(|e| Error::parse(line, format!("invalid time '{field}': {e}")))
}

/// Parse a plain decimal field.
pub fn parse_decimal(field: &str, name: &str, line: u64) -> Result<Decimal> {
    let field = field.trim();
    Decimal::from_str(field).map_err(|e| Error::parse(line, format!("invalid {name} '{field}': {e}")))
}

/// Parse a volume field; scientific notation (`1.5E+3`) is accepted.
pub fn parse_volume(field: &str, line: u64) -> Result<Decimal> {
    let field = field.trim();
    let parsed = if field.contains(['e', 'E']) {
        Decimal::from_scientific(field)
    } else {
        Decimal::from_str(field)
    };
    parsed.map_err(|e| Error::parse(line, format!("invalid volume '{field}': {e}")))
}

/// Convert one record into a [`MinuteBar`].
pub fn parse_record(record: &StringRecord, line: u64) -> Result<MinuteBar> {
    let layout = Layout::for_len(record.len()).ok_or_else(|| {
        Error::parse(
            line,
            format!("expected 7, 9, 10 or 12 fields, found {}", record.len()),
        )
    })?;

    let bar = MinuteBar::new(
        parse_date(&record[0], line)?,
        parse_time(&record[1], line)?,
        parse_decimal(&record[2], "open", line)?,
        parse_decimal(&record[3], "high", line)?,
        parse_decimal(&record[4], "low", line)?,
        parse_decimal(&record[5], "close", line)?,
        parse_volume(&record[layout.volume()], line)?,
    );
    for column in STAMP_FIELDS + 4..layout.volume() {
        parse_decimal(&record[column], "price", line)?;
    }

    if layout.auxiliary {
        let aux = layout.volume() + 1;
        Ok(bar.with_corporate_actions(
            parse_decimal(&record[aux], "split", line)?,
            parse_decimal(&record[aux + 1], "secondary", line)?,
            parse_decimal(&record[aux + 2], "dividend", line)?,
        ))
    } else {
        Ok(bar)
    }
}

/// Streaming reader of minute bars.
///
/// Yields `Err` once for the first malformed record and then stops: a run
/// must not resume mid-bucket after skipping data.
pub struct MinuteBarReader<R: io::Read> {
    reader: csv::Reader<R>,
    record: StringRecord,
    failed: bool,
}

impl<R: io::Read> MinuteBarReader<R> {
    /// Wrap a byte source.
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(source);
        Self {
            reader,
            record: StringRecord::new(),
            failed: false,
        }
    }

    fn read_next(&mut self) -> Result<Option<MinuteBar>> {
        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        let line = self.record.position().map_or(0, |p| p.line());
        parse_record(&self.record, line).map(Some)
    }
}

impl MinuteBarReader<std::fs::File> {
    /// Open a file of minute bars.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(std::fs::File::open(path)?))
    }
}

impl<R: io::Read> Iterator for MinuteBarReader<R> {
    type Item = Result<MinuteBar>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_next() {
            Ok(bar) => bar.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
