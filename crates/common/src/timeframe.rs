//! Time-range specifications for stat queries.
//!
//! A [`Timeframe`] pairs a total span with a sampling interval, e.g.
//! "1 hour of data at 1-minute resolution". Two textual surfaces describe
//! the same value: a spaced form (`"1 hour @ 1 minute"`) and a compact form
//! (`"1h1m"`). Unit codes are case-significant: `m` is a minute, `M` a month.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::Error;

static COMPACT_TIMEFRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)([a-zA-Z]+)([0-9]+)([a-zA-Z]+)$").unwrap());

static COMPACT_DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)([a-zA-Z]+)$").unwrap());

/// Granularity unit of a duration or sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(v: &str) -> Result<Self, Error> {
        match v {
            "m" | "minute" | "minutes" => Ok(TimeUnit::Minute),
            "h" | "hour" | "hours" => Ok(TimeUnit::Hour),
            "d" | "day" | "days" => Ok(TimeUnit::Day),
            "w" | "week" | "weeks" => Ok(TimeUnit::Week),
            "M" | "month" | "months" => Ok(TimeUnit::Month),
            "y" | "year" | "years" => Ok(TimeUnit::Year),
            _ => Err(Error::Parse(format!("unknown time unit: {v}"))),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeUnit::Minute => "m",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
            TimeUnit::Week => "w",
            TimeUnit::Month => "M",
            TimeUnit::Year => "y",
        })
    }
}

/// A standalone span such as "2 weeks".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    pub value: u32,
    pub unit: TimeUnit,
}

impl FromStr for Duration {
    type Err = Error;

    /// Accepts `<int> <unit>` or the compact `<int><unit>` form.
    fn from_str(v: &str) -> Result<Self, Error> {
        let parts: Vec<&str> = v.split(' ').collect();
        if parts.len() == 2 {
            return Ok(Duration {
                value: parse_value(parts[0])?,
                unit: parts[1].parse()?,
            });
        }

        let caps = COMPACT_DURATION_RE
            .captures(v)
            .ok_or_else(|| Error::Parse(format!("invalid duration: {v:?}")))?;

        Ok(Duration {
            value: parse_value(&caps[1])?,
            unit: caps[2].parse()?,
        })
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// Total span + sampling interval, with an optional anchor instant.
///
/// Without `start` the window ends "now"; the cache treats all no-start
/// requests for the same span/interval as one entry regardless of when
/// "now" was, bounded only by the cache TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeframe {
    pub duration_value: u32,
    pub duration_unit: TimeUnit,
    pub interval_value: u32,
    pub interval_unit: TimeUnit,
    /// Late-bound anchor, set from the request's `start` parameter.
    pub start: Option<DateTime<Utc>>,
}

impl Timeframe {
    /// Canonical compact rendering, e.g. `1h1m`. Also the upstream `t`
    /// query value.
    pub fn compact(&self) -> String {
        format!(
            "{}{}{}{}",
            self.duration_value, self.duration_unit, self.interval_value, self.interval_unit
        )
    }
}

impl Default for Timeframe {
    /// One hour of data sampled at one-minute intervals, ending now.
    fn default() -> Self {
        Timeframe {
            duration_value: 1,
            duration_unit: TimeUnit::Hour,
            interval_value: 1,
            interval_unit: TimeUnit::Minute,
            start: None,
        }
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    /// Accepts `<int> <unit> @ <int> <unit>` (five space-separated tokens,
    /// the middle one positional filler) or the compact
    /// `<int><unit><int><unit>` form.
    fn from_str(v: &str) -> Result<Self, Error> {
        let parts: Vec<&str> = v.split(' ').collect();
        if parts.len() == 5 {
            return Ok(Timeframe {
                duration_value: parse_value(parts[0])?,
                duration_unit: parts[1].parse()?,
                interval_value: parse_value(parts[3])?,
                interval_unit: parts[4].parse()?,
                start: None,
            });
        }

        let caps = COMPACT_TIMEFRAME_RE
            .captures(v)
            .ok_or_else(|| Error::Parse(format!("invalid timeframe: {v:?}")))?;

        Ok(Timeframe {
            duration_value: parse_value(&caps[1])?,
            duration_unit: caps[2].parse()?,
            interval_value: parse_value(&caps[3])?,
            interval_unit: caps[4].parse()?,
            start: None,
        })
    }
}

impl fmt::Display for Timeframe {
    /// Cache-key rendering: `1h@1m`, with `-<unix-seconds>` appended when
    /// the timeframe is anchored.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}@{}{}",
            self.duration_value, self.duration_unit, self.interval_value, self.interval_unit
        )?;
        if let Some(start) = self.start {
            write!(f, "-{}", start.timestamp())?;
        }
        Ok(())
    }
}

fn parse_value(raw: &str) -> Result<u32, Error> {
    raw.parse::<u32>()
        .map_err(|_| Error::Parse(format!("invalid number: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_accepts_both_surfaces_and_rejects_malformed_input() {
        for (value, ok) in [
            ("1 hour @ 1 minute", true),
            ("1 hour @ 1 minut", false),
            ("1 week @ 1 minute", true),
            ("1 week@ 1 minute", false),
            ("13w13m", true),
            ("1w1m", true),
            ("1M1m", true),
            ("13w13m13d", false),
            ("x hour @ 1 minute", false),
            ("1 hour @ x minute", false),
            ("", false),
        ] {
            assert_eq!(value.parse::<Timeframe>().is_ok(), ok, "{value:?}");
        }
    }

    #[test]
    fn spaced_and_compact_forms_parse_identically() {
        let spaced: Timeframe = "1 hour @ 1 minute".parse().unwrap();
        let compact: Timeframe = "1h1m".parse().unwrap();
        assert_eq!(spaced, compact);
    }

    #[test]
    fn compact_rendering_round_trips() {
        for (input, compact) in [
            ("1 hour @ 1 minute", "1h1m"),
            ("13w13m", "13w13m"),
            ("2 months @ 1 day", "2M1d"),
            ("1M1m", "1M1m"),
        ] {
            let tf: Timeframe = input.parse().unwrap();
            assert_eq!(tf.compact(), compact);
            assert_eq!(tf.compact().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn month_and_minute_are_distinct_units() {
        let a: Timeframe = "1 month @ 1 minute".parse().unwrap();
        let b: Timeframe = "1 minute @ 1 month".parse().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.duration_unit, TimeUnit::Month);
        assert_eq!(a.interval_unit, TimeUnit::Minute);
        assert_eq!(a.compact(), "1M1m");
        assert_eq!(b.compact(), "1m1M");
    }

    #[test]
    fn unit_words_are_case_sensitive() {
        assert_eq!("minutes".parse::<TimeUnit>().unwrap(), TimeUnit::Minute);
        assert_eq!("M".parse::<TimeUnit>().unwrap(), TimeUnit::Month);
        assert_eq!("year".parse::<TimeUnit>().unwrap(), TimeUnit::Year);
        assert!("Minutes".parse::<TimeUnit>().is_err());
        assert!("H".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn display_appends_start_when_anchored() {
        let mut tf: Timeframe = "1h1m".parse().unwrap();
        assert_eq!(tf.to_string(), "1h@1m");

        tf.start = DateTime::from_timestamp(1700000000, 0);
        assert_eq!(tf.to_string(), "1h@1m-1700000000");
    }

    #[test]
    fn anchored_and_unanchored_timeframes_differ() {
        let plain: Timeframe = "1h1m".parse().unwrap();
        let mut anchored = plain.clone();
        anchored.start = DateTime::from_timestamp(1700000000, 0);
        assert_ne!(plain, anchored);
    }

    #[test]
    fn default_timeframe_is_one_hour_at_one_minute() {
        let tf = Timeframe::default();
        assert_eq!(tf, "1 hour @ 1 minute".parse().unwrap());
        assert!(tf.start.is_none());
    }

    #[test]
    fn durations_parse_in_both_forms() {
        for (value, ok) in [
            ("1 hour", true),
            ("3d", true),
            ("2 weeks", true),
            ("1 lightyear", false),
            ("d3", false),
            ("3", false),
            ("", false),
        ] {
            assert_eq!(value.parse::<Duration>().is_ok(), ok, "{value:?}");
        }

        let spaced: Duration = "2 weeks".parse().unwrap();
        assert_eq!(
            spaced,
            Duration {
                value: 2,
                unit: TimeUnit::Week
            }
        );
        assert_eq!(spaced.to_string(), "2w");
        assert_eq!("2w".parse::<Duration>().unwrap(), spaced);
    }
}
