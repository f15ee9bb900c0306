//! Data ingestion and aggregation for the minuteup system.
//!
//! This crate handles:
//! - Minute-bar record parsing
//! - Session filtering
//! - N-minute bar aggregation

pub mod aggregator;
pub mod reader;

pub use aggregator::{AggregatorStats, BarAggregator, ClosedBucket};
pub use reader::MinuteBarReader;
