//! Shared domain types for the statrelay service.

pub mod config;
mod error;
mod timeframe;
mod types;

pub use error::Error;
pub use timeframe::{Duration, TimeUnit, Timeframe};
pub use types::{Dataset, Point};
