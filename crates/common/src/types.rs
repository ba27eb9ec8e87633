//! Dataset types shared across the service.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Timeframe;

/// A single sample: Unix timestamp in seconds and a measured value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub time: i64,
    pub value: f64,
}

/// A named, time-ordered series of points for one timeframe.
///
/// Points are ascending in time, as returned by the upstream provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    /// The timeframe the points were fetched for.
    pub timeframe: Timeframe,
    pub points: Vec<Point>,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.name, self.timeframe)?;
        for p in &self.points {
            writeln!(f, "{:.6} {}", p.value, p.time)?;
        }
        Ok(())
    }
}
