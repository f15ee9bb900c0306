//! Trading calendars and trading-date attribution for the minuteup system.
//!
//! This crate handles:
//! - The trading calendar provider interface
//! - Weekday and fixed-list calendars
//! - The trading-date index mapping bucket timestamps to trading dates

pub mod provider;
pub mod trading_date;

pub use provider::{FixedCalendar, TradingCalendar, WeekdayCalendar};
pub use trading_date::TradingDateIndex;
