//! Pseudo end-of-day generation for the minuteup system.
//!
//! This crate provides:
//! - Split ratio reduction
//! - The corporate-action sink interface and an in-memory sink
//! - Split/dividend emission at bucket boundaries
//! - The converter wiring aggregator, index and emitter together

pub mod converter;
pub mod emitter;
pub mod ratio;
pub mod sink;

pub use converter::{PseudoEodConverter, RunSummary};
pub use emitter::{volume_in_hundreds, CorporateActionEmitter, EmitterStats};
pub use ratio::{gcd, reduce_split};
pub use sink::{CorporateActionSink, EodRow, MemorySink, NOT_APPLICABLE};
