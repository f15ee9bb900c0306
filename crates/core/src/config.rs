//! Configuration structures for the minuteup system.

use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::session::SessionWindow;
use crate::types::InstrumentId;

/// Minutes in one day; the upper bound for a bucket width.
const MINUTES_PER_DAY: u32 = 24 * 60;

/// Main configuration for one conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Instrument configuration.
    pub instrument: InstrumentConfig,
    /// Bucketing and session configuration.
    pub aggregation: AggregationConfig,
    /// Trading-date attribution configuration.
    pub attribution: AttributionConfig,
}

impl Config {
    /// Parse a configuration from JSON text. Missing sections take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject configurations the algorithms cannot run with.
    ///
    /// Widths that do not divide 60 are accepted; buckets then restart at
    /// every hour line.
    pub fn validate(&self) -> Result<()> {
        let width = self.aggregation.width_minutes;
        if width == 0 {
            return Err(Error::config("bucket width must be at least one minute"));
        }
        if width > MINUTES_PER_DAY {
            return Err(Error::config(format!(
                "bucket width of {width} minutes exceeds one day"
            )));
        }
        if 60 % width != 0 {
            warn!(width, "bucket width does not divide 60; boundaries restart every hour");
        }
        if self.attribution.calendar_start > self.attribution.anchor_date {
            return Err(Error::config(format!(
                "calendar start {} is after anchor date {}",
                self.attribution.calendar_start, self.attribution.anchor_date
            )));
        }
        Ok(())
    }
}

/// Instrument-specific configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Identifier stamped on every emitted record.
    pub id: InstrumentId,
    /// Trading symbol, informational only.
    pub symbol: String,
}

/// Bucket width and session window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Bucket width in minutes; valid widths divide 60.
    pub width_minutes: u32,
    /// Session open (inclusive).
    pub session_start: NaiveTime,
    /// Session close (exclusive). Equal to the open for a 24h session.
    pub session_end: NaiveTime,
}

impl AggregationConfig {
    /// Session window described by this configuration.
    pub fn session(&self) -> SessionWindow {
        SessionWindow::new(self.session_start, self.session_end)
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            width_minutes: 30,
            session_start: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            session_end: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Trading-date attribution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    /// Most recent date of the attribution walk; bucket keys start the day before.
    pub anchor_date: NaiveDate,
    /// Earliest date requested from the calendar provider.
    pub calendar_start: NaiveDate,
    /// Move cursors landing on Saturday/Sunday back to Friday.
    pub skip_weekends: bool,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            anchor_date: chrono::Local::now().date_naive(),
            calendar_start: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN),
            skip_weekends: true,
        }
    }
}
