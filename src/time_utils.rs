//! CF style time axis handling.
//!
//! Time coordinates are stored on disk as numeric offsets with a units
//! attribute such as "hours since 2010-08-01 14:00:00". The types here
//! parse and format that convention and convert offsets to and from
//! `chrono` timestamps.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::EftsError;

/// Time step of an axis, as named in CF units strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeStep {
    Seconds,
    Minutes,
    #[default]
    Hours,
    Days,
}

impl TimeStep {
    pub fn unit_name(&self) -> &'static str {
        match self {
            TimeStep::Seconds => "seconds",
            TimeStep::Minutes => "minutes",
            TimeStep::Hours => "hours",
            TimeStep::Days => "days",
        }
    }

    /// Length of one step in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            TimeStep::Seconds => 1,
            TimeStep::Minutes => 60,
            TimeStep::Hours => 3600,
            TimeStep::Days => 86400,
        }
    }

    pub fn parse(name: &str) -> Result<Self, EftsError> {
        match name.trim_end_matches('s').to_ascii_lowercase().as_str() {
            "second" => Ok(TimeStep::Seconds),
            "minute" => Ok(TimeStep::Minutes),
            "hour" => Ok(TimeStep::Hours),
            "day" => Ok(TimeStep::Days),
            _ => Err(EftsError::InvalidTimeUnits(name.to_string())),
        }
    }
}

impl fmt::Display for TimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unit_name())
    }
}

/// Units of a time axis: a step size and an origin timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    pub step: TimeStep,
    pub origin: DateTime<Utc>,
}

impl TimeUnits {
    pub fn new(step: TimeStep, origin: DateTime<Utc>) -> Self {
        Self { step, origin }
    }

    /// Parse a units string such as "hours since 2010-08-01 14:00:00".
    ///
    /// The origin accepts a date with optional time, a 'T' separator,
    /// and an optional trailing "UTC".
    pub fn parse(units: &str) -> Result<Self, EftsError> {
        let (step_str, origin_str) = units
            .split_once(" since ")
            .ok_or_else(|| EftsError::InvalidTimeUnits(units.to_string()))?;
        let step = TimeStep::parse(step_str.trim())?;
        let origin = parse_origin(origin_str.trim())
            .ok_or_else(|| EftsError::InvalidTimeUnits(units.to_string()))?;
        Ok(Self { step, origin })
    }

    /// Convert numeric offsets to timestamps.
    pub fn decode(&self, values: &[f64]) -> Vec<DateTime<Utc>> {
        values
            .iter()
            .map(|v| {
                let millis = v * self.step.seconds() as f64 * 1000.0;
                self.origin + Duration::milliseconds(millis.round() as i64)
            })
            .collect()
    }

    /// Convert timestamps to numeric offsets from the origin.
    pub fn encode(&self, times: &[DateTime<Utc>]) -> Vec<f64> {
        times
            .iter()
            .map(|t| {
                let millis = (*t - self.origin).num_milliseconds() as f64;
                millis / 1000.0 / self.step.seconds() as f64
            })
            .collect()
    }
}

impl fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} since {}",
            self.step,
            self.origin.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

fn parse_origin(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim_end_matches(" UTC").trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Units string of the lead time axis, which is relative to each issue
/// time rather than to a fixed origin.
pub fn lead_time_units(step: TimeStep) -> String {
    format!("{} since time", step)
}

/// Parse the step of a lead time units string such as "hours since time".
pub fn parse_lead_time_step(units: &str) -> Result<TimeStep, EftsError> {
    let first = units
        .split_whitespace()
        .next()
        .ok_or_else(|| EftsError::InvalidTimeUnits(units.to_string()))?;
    TimeStep::parse(first)
}

/// Units and values defining the time dimension of a data set.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeDimInfo {
    pub units: TimeUnits,
    pub values: Vec<f64>,
}

impl TimeDimInfo {
    pub fn decode(&self) -> Vec<DateTime<Utc>> {
        self.units.decode(&self.values)
    }
}

/// Define a regular time axis of `n` steps starting at `from`.
pub fn create_time_info(from: DateTime<Utc>, n: usize, step: TimeStep) -> TimeDimInfo {
    TimeDimInfo {
        units: TimeUnits::new(step, from),
        values: (0..n).map(|i| i as f64).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units_round_trip() {
        let units = TimeUnits::parse("hours since 2010-08-01 14:00:00").unwrap();
        assert_eq!(units.step, TimeStep::Hours);
        assert_eq!(units.to_string(), "hours since 2010-08-01 14:00:00");
    }

    #[test]
    fn parse_units_date_only_origin() {
        let units = TimeUnits::parse("days since 2010-01-01").unwrap();
        assert_eq!(units.step, TimeStep::Days);
        assert_eq!(
            units.origin,
            Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn parse_units_rejects_garbage() {
        assert!(TimeUnits::parse("fortnights since 2010-01-01").is_err());
        assert!(TimeUnits::parse("hours after 2010-01-01").is_err());
        assert!(TimeUnits::parse("hours since someday").is_err());
    }

    #[test]
    fn decode_encode_round_trip() {
        let units = TimeUnits::parse("days since 2010-01-01 00:00:00").unwrap();
        let values: Vec<f64> = (0..31).map(|i| i as f64).collect();
        let times = units.decode(&values);
        assert_eq!(times[0], Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(
            times[30],
            Utc.with_ymd_and_hms(2010, 1, 31, 0, 0, 0).unwrap()
        );
        assert_eq!(units.encode(&times), values);
    }

    #[test]
    fn create_time_info_is_zero_based() {
        let from = Utc.with_ymd_and_hms(2010, 8, 1, 14, 0, 0).unwrap();
        let info = create_time_info(from, 12, TimeStep::Hours);
        assert_eq!(info.values.len(), 12);
        assert_eq!(info.values[0], 0.0);
        let decoded = info.decode();
        assert_eq!(decoded[0], from);
        assert_eq!(decoded[11], from + Duration::hours(11));
    }

    #[test]
    fn lead_time_step_parsing() {
        assert_eq!(
            parse_lead_time_step("hours since time").unwrap(),
            TimeStep::Hours
        );
        assert_eq!(lead_time_units(TimeStep::Days), "days since time");
    }
}
