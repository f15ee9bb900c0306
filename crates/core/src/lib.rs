//! Core types and configuration for the minuteup system.
//!
//! This crate provides shared types used across all other crates:
//! - Bar and corporate-action record types
//! - Session windows and bucket flooring
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod session;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use session::{bucket_floor, SessionKind, SessionWindow};
pub use types::*;
