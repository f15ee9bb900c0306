//! Error types for the minuteup system.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the minuteup system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input record.
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line of the offending record (0 when unknown).
        line: u64,
        message: String,
    },

    /// A bucket timestamp has no entry in the trading-date index.
    ///
    /// Either the bucket predates the earliest calendar date, or the
    /// aggregator and the index were built with different session/width
    /// parameters.
    #[error("No trading date attributed to bucket {date} {time}")]
    TradingDateNotFound {
        /// Bucket open date.
        date: NaiveDate,
        /// Bucket open time-of-day.
        time: NaiveTime,
    },

    /// Trading calendar provider failure.
    #[error("Calendar error: {0}")]
    Calendar(String),

    /// Decimal value does not fit the target integer type.
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reader/writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a parse error for the given record line.
    pub fn parse(line: u64, msg: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: msg.into(),
        }
    }

    /// Create a calendar error.
    pub fn calendar(msg: impl Into<String>) -> Self {
        Error::Calendar(msg.into())
    }

    /// Create a conversion error.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Error::Conversion(msg.into())
    }
}
