//! minuteup command-line driver.
//!
//! Usage:
//!   minuteup aggregate <input> [--width 30] [--output bars.csv]
//!   minuteup eod <input> --anchor 2024-03-15 [--holidays holidays.json]

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use minuteup_calendar::{TradingDateIndex, WeekdayCalendar};
use minuteup_core::Config;
use minuteup_eod::{MemorySink, PseudoEodConverter};
use minuteup_ingestion::{BarAggregator, MinuteBarReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "minuteup")]
#[command(about = "Aggregate one-minute bars and attribute them to trading dates")]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write N-minute bars
    Aggregate {
        /// Minute-bar input file
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        aggregation: AggregationArgs,
    },

    /// Write pseudo end-of-day rows with split and dividend columns
    Eod {
        /// Minute-bar input file
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        aggregation: AggregationArgs,

        #[command(flatten)]
        attribution: AttributionArgs,
    },
}

#[derive(Args, Debug, Default)]
struct AggregationArgs {
    /// Bucket width in minutes
    #[arg(long)]
    width: Option<u32>,

    /// Session open, e.g. 09:30
    #[arg(long, value_parser = parse_clock)]
    session_start: Option<NaiveTime>,

    /// Session close, e.g. 16:00
    #[arg(long, value_parser = parse_clock)]
    session_end: Option<NaiveTime>,
}

#[derive(Args, Debug, Default)]
struct AttributionArgs {
    /// Instrument identifier stamped on every row
    #[arg(long)]
    instrument_id: Option<i64>,

    /// Most recent date of the attribution walk
    #[arg(long)]
    anchor: Option<NaiveDate>,

    /// Earliest calendar date to request
    #[arg(long)]
    calendar_start: Option<NaiveDate>,

    /// JSON file of the form {"holidays": ["2024-07-04", ...]}
    #[arg(long)]
    holidays: Option<PathBuf>,

    /// Keep Saturday/Sunday cursor positions
    #[arg(long)]
    no_weekend_skip: bool,
}

/// `HH:MM` or `HH:MM:SS`.
fn parse_clock(value: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| format!("invalid time '{value}': {e}"))
}

impl AggregationArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(width) = self.width {
            config.aggregation.width_minutes = width;
        }
        if let Some(start) = self.session_start {
            config.aggregation.session_start = start;
        }
        if let Some(end) = self.session_end {
            config.aggregation.session_end = end;
        }
    }
}

impl AttributionArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(id) = self.instrument_id {
            config.instrument.id = id;
        }
        if let Some(anchor) = self.anchor {
            config.attribution.anchor_date = anchor;
        }
        if let Some(start) = self.calendar_start {
            config.attribution.calendar_start = start;
        }
        if self.no_weekend_skip {
            config.attribution.skip_weekends = false;
        }
    }

    fn calendar(&self) -> Result<WeekdayCalendar> {
        match &self.holidays {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading holidays from {}", path.display()))?;
                serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
            }
            None => Ok(WeekdayCalendar::new()),
        }
    }
}

fn base_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn open_output(path: Option<&Path>) -> Result<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match path {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    Ok(csv::WriterBuilder::new().has_headers(false).from_writer(sink))
}

fn open_input(path: &Path) -> Result<MinuteBarReader<File>> {
    MinuteBarReader::from_path(path).with_context(|| format!("opening {}", path.display()))
}

fn run_aggregate(config: &Config, input: &Path, output: Option<&Path>) -> Result<()> {
    let mut aggregator = BarAggregator::new(config.aggregation.width_minutes, config.aggregation.session());
    let mut writer = open_output(output)?;

    for bar in open_input(input)? {
        if let Some(closed) = aggregator.process(&bar?) {
            writer.write_record(closed.bar.csv_record())?;
        }
    }
    if let Some(closed) = aggregator.flush() {
        writer.write_record(closed.bar.csv_record())?;
    }
    writer.flush()?;

    let stats = aggregator.stats();
    info!(
        bars = stats.bars_seen,
        skipped = stats.bars_out_of_session,
        buckets = stats.buckets_closed,
        "aggregation complete"
    );
    Ok(())
}

fn run_eod(config: &Config, calendar: &WeekdayCalendar, input: &Path, output: Option<&Path>) -> Result<()> {
    let index = Arc::new(
        TradingDateIndex::from_config(config, calendar).context("building trading-date index")?,
    );
    let mut converter = PseudoEodConverter::from_config(config, index);
    let mut sink = MemorySink::new();
    converter
        .run(open_input(input)?, &mut sink)
        .with_context(|| format!("converting {}", input.display()))?;

    let mut writer = open_output(output)?;
    for row in sink.rows() {
        writer.write_record(row.csv_record())?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = base_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Aggregate { input, output, aggregation } => {
            aggregation.apply(&mut config);
            config.validate()?;
            run_aggregate(&config, &input, output.as_deref())
        }
        Commands::Eod { input, output, aggregation, attribution } => {
            aggregation.apply(&mut config);
            attribution.apply(&mut config);
            config.validate()?;
            let calendar = attribution.calendar()?;
            run_eod(&config, &calendar, &input, output.as_deref())
        }
    }
}
