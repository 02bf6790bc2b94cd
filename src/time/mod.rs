//! Time Axis
//!
//! CF-style `"<unit> since <timestamp>"` decoding under the calendars used by
//! the ensemble, and the regular daily/monthly sequences a file is expected to
//! carry.

mod calendar;

pub use calendar::Calendar;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::naming::{Frequency, YearRange};
use crate::store::Dataset;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Name of the time coordinate variable and dimension
pub const TIME: &str = "time";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeAxisError {
    #[error("time variable not found")]
    MissingVariable,

    #[error("time variable has no 'units' attribute")]
    MissingUnits,

    #[error("cannot parse time units '{0}'")]
    BadUnits(String),

    #[error("unknown calendar '{0}'")]
    UnknownCalendar(String),

    #[error("time values unreadable: {0}")]
    Unreadable(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// A calendar instant. Field order makes the derived ordering chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub second_of_day: u32,
}

impl CalendarDateTime {
    pub fn date(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            second_of_day: 0,
        }
    }

    pub fn start_of_year(year: i32) -> Self {
        Self::date(year, 1, 1)
    }
}

impl std::fmt::Display for CalendarDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.second_of_day;
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year,
            self.month,
            self.day,
            s / 3600,
            (s / 60) % 60,
            s % 60
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Days => 86_400.0,
            TimeUnit::Hours => 3_600.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Seconds => 1.0,
        }
    }
}

lazy_static! {
    static ref UNITS_RE: Regex = Regex::new(
        r"(?i)^\s*(days?|hours?|hrs?|minutes?|mins?|seconds?|secs?|s)\s+since\s+(-?\d{1,4})-(\d{1,2})-(\d{1,2})(?:[ T](\d{1,2}):(\d{1,2})(?::(\d{1,2})(?:\.\d+)?)?)?\s*(?:Z|UTC)?\s*$"
    )
    .expect("valid time units regex");
}

/// Parsed `units` attribute of a time coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: CalendarDateTime,
}

impl TimeUnits {
    pub fn parse(units: &str, calendar: Calendar) -> Result<Self, TimeAxisError> {
        let bad = || TimeAxisError::BadUnits(units.to_string());
        let caps = UNITS_RE.captures(units).ok_or_else(bad)?;

        let unit = match caps[1].to_ascii_lowercase().as_str() {
            "day" | "days" => TimeUnit::Days,
            "hour" | "hours" | "hr" | "hrs" => TimeUnit::Hours,
            "minute" | "minutes" | "min" | "mins" => TimeUnit::Minutes,
            _ => TimeUnit::Seconds,
        };

        let num = |i: usize| -> Result<i64, TimeAxisError> {
            caps.get(i)
                .map(|m| m.as_str().parse::<i64>().map_err(|_| bad()))
                .unwrap_or(Ok(0))
        };
        let (year, month, day) = (num(2)? as i32, num(3)? as u32, num(4)? as u32);
        let (hour, minute, second) = (num(5)?, num(6)?, num(7)?);
        if hour > 23 || minute > 59 || second > 59 {
            return Err(bad());
        }
        if !calendar.is_valid_date(year, month, day) {
            return Err(TimeAxisError::InvalidDate(format!(
                "reference date {:04}-{:02}-{:02} under {} calendar",
                year, month, day, calendar
            )));
        }

        Ok(Self {
            unit,
            epoch: CalendarDateTime {
                year,
                month,
                day,
                second_of_day: (hour * 3600 + minute * 60 + second) as u32,
            },
        })
    }
}

/// Convert raw offsets into calendar instants, rounding to the nearest second.
pub fn decode_offsets(
    values: &[f64],
    units: &TimeUnits,
    calendar: Calendar,
) -> Result<Vec<CalendarDateTime>, TimeAxisError> {
    let epoch_day = calendar.day_number(units.epoch.year, units.epoch.month, units.epoch.day);
    values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return Err(TimeAxisError::Unreadable(format!("non-finite offset {}", v)));
            }
            let out_of_range =
                || TimeAxisError::Unreadable(format!("offset {} is outside the representable dates", v));
            let offset = (v * units.unit.seconds()).round();
            if offset.abs() >= i64::MAX as f64 {
                return Err(out_of_range());
            }
            let secs = (units.epoch.second_of_day as i64)
                .checked_add(offset as i64)
                .ok_or_else(out_of_range)?;
            let day = epoch_day
                .checked_add(secs.div_euclid(SECONDS_PER_DAY))
                .ok_or_else(out_of_range)?;
            let (year, month, day) = calendar.from_day_number(day).ok_or_else(out_of_range)?;
            Ok(CalendarDateTime {
                year,
                month,
                day,
                second_of_day: secs.rem_euclid(SECONDS_PER_DAY) as u32,
            })
        })
        .collect()
}

/// A decoded time coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    pub calendar: Calendar,
    pub units: TimeUnits,
    pub times: Vec<CalendarDateTime>,
}

impl TimeAxis {
    /// Read and decode the `time` variable of an open dataset
    pub fn read(dataset: &dyn Dataset) -> Result<Self, TimeAxisError> {
        if !dataset.variable_status(TIME).is_present() {
            return Err(TimeAxisError::MissingVariable);
        }
        let calendar = match dataset.attribute(TIME, "calendar") {
            Some(value) => Calendar::parse(&value.to_string())?,
            None => Calendar::Standard,
        };
        let units = dataset
            .attribute(TIME, "units")
            .ok_or(TimeAxisError::MissingUnits)?
            .to_string();
        let units = TimeUnits::parse(&units, calendar)?;
        let raw = dataset
            .read_values(TIME, None)
            .map_err(|e| TimeAxisError::Unreadable(e.to_string()))?;
        let offsets: Vec<f64> = raw.iter().copied().collect();
        let times = decode_offsets(&offsets, &units, calendar)?;
        Ok(Self {
            calendar,
            units,
            times,
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Indices of timesteps in `[start, end)`
    pub fn indices_between(&self, start: &CalendarDateTime, end: &CalendarDateTime) -> Vec<usize> {
        self.times
            .iter()
            .enumerate()
            .filter(|(_, t)| *t >= start && *t < end)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Number of timesteps a file of `frequency` covering `years` should hold.
/// `None` for fixed-frequency files.
pub fn expected_length(frequency: Frequency, years: YearRange, calendar: Calendar) -> Option<usize> {
    match frequency {
        Frequency::Daily => Some(years.years().map(|y| calendar.days_in_year(y) as usize).sum()),
        Frequency::Monthly => Some(12 * years.year_count()),
        Frequency::Fixed => None,
    }
}

/// Regular sequence a file is expected to carry: every day at 00:00, or the
/// first of every month.
pub fn expected_sequence(
    frequency: Frequency,
    years: YearRange,
    calendar: Calendar,
) -> Vec<CalendarDateTime> {
    let mut seq = Vec::new();
    match frequency {
        Frequency::Daily => {
            for year in years.years() {
                for month in 1..=12 {
                    for day in 1..=calendar.days_in_month(year, month) {
                        seq.push(CalendarDateTime::date(year, month, day));
                    }
                }
            }
        }
        Frequency::Monthly => {
            for year in years.years() {
                for month in 1..=12 {
                    seq.push(CalendarDateTime::date(year, month, 1));
                }
            }
        }
        Frequency::Fixed => {}
    }
    seq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        let u = TimeUnits::parse("days since 1979-01-01 00:00:00", Calendar::Standard).unwrap();
        assert_eq!(u.unit, TimeUnit::Days);
        assert_eq!(u.epoch, CalendarDateTime::date(1979, 1, 1));

        let u = TimeUnits::parse("Hours since 1900-1-1T06:30Z", Calendar::Standard).unwrap();
        assert_eq!(u.unit, TimeUnit::Hours);
        assert_eq!(u.epoch.second_of_day, 6 * 3600 + 30 * 60);
    }

    #[test]
    fn test_parse_units_rejects_garbage() {
        assert!(matches!(
            TimeUnits::parse("fortnights after lunch", Calendar::Standard),
            Err(TimeAxisError::BadUnits(_))
        ));
        assert!(matches!(
            TimeUnits::parse("days since 1979-02-30", Calendar::Standard),
            Err(TimeAxisError::InvalidDate(_))
        ));
        assert!(TimeUnits::parse("days since 1979-02-30", Calendar::Day360).is_ok());
    }

    #[test]
    fn test_decode_standard() {
        let u = TimeUnits::parse("days since 1980-02-28", Calendar::Standard).unwrap();
        let t = decode_offsets(&[0.0, 1.0, 2.0, 0.5], &u, Calendar::Standard).unwrap();
        assert_eq!(t[1], CalendarDateTime::date(1980, 2, 29));
        assert_eq!(t[2], CalendarDateTime::date(1980, 3, 1));
        assert_eq!(t[3].second_of_day, 43_200);
    }

    #[test]
    fn test_decode_noleap_skips_feb_29() {
        let u = TimeUnits::parse("days since 1980-02-28", Calendar::NoLeap).unwrap();
        let t = decode_offsets(&[1.0], &u, Calendar::NoLeap).unwrap();
        assert_eq!(t[0], CalendarDateTime::date(1980, 3, 1));
    }

    #[test]
    fn test_decode_360_day() {
        let u = TimeUnits::parse("hours since 2000-01-30", Calendar::Day360).unwrap();
        let t = decode_offsets(&[24.0, -24.0 * 30.0], &u, Calendar::Day360).unwrap();
        assert_eq!(t[0], CalendarDateTime::date(2000, 2, 1));
        assert_eq!(t[1], CalendarDateTime::date(1999, 12, 30));
    }

    #[test]
    fn test_decode_rejects_nan() {
        let u = TimeUnits::parse("days since 1980-01-01", Calendar::Standard).unwrap();
        assert!(decode_offsets(&[f64::NAN], &u, Calendar::Standard).is_err());
    }

    #[test]
    fn test_decode_rejects_offsets_beyond_any_date() {
        let u = TimeUnits::parse("hours since 1900-01-01 06:30", Calendar::Standard).unwrap();
        for huge in [1e30, -1e30, 1e15] {
            assert!(matches!(
                decode_offsets(&[huge], &u, Calendar::Standard),
                Err(TimeAxisError::Unreadable(_))
            ));
        }
        let u = TimeUnits::parse("days since 2000-01-01", Calendar::Day360).unwrap();
        assert!(decode_offsets(&[1e17], &u, Calendar::Day360).is_err());
    }

    #[test]
    fn test_expected_lengths() {
        let leap = YearRange::new(1980, 1980).unwrap();
        let span = YearRange::new(1979, 1981).unwrap();
        assert_eq!(expected_length(Frequency::Daily, leap, Calendar::Standard), Some(366));
        assert_eq!(expected_length(Frequency::Daily, leap, Calendar::NoLeap), Some(365));
        assert_eq!(expected_length(Frequency::Daily, span, Calendar::Standard), Some(1096));
        assert_eq!(expected_length(Frequency::Monthly, span, Calendar::Standard), Some(36));
        assert_eq!(expected_length(Frequency::Fixed, span, Calendar::Standard), None);
        assert_eq!(expected_sequence(Frequency::Daily, span, Calendar::Standard).len(), 1096);
    }

    #[test]
    fn test_indices_between_is_half_open() {
        let u = TimeUnits::parse("days since 1980-12-30", Calendar::Standard).unwrap();
        let axis = TimeAxis {
            calendar: Calendar::Standard,
            units: u,
            times: decode_offsets(&[0.0, 1.0, 2.0, 3.0], &u, Calendar::Standard).unwrap(),
        };
        let idx = axis.indices_between(
            &CalendarDateTime::start_of_year(1980),
            &CalendarDateTime::start_of_year(1981),
        );
        assert_eq!(idx, vec![0, 1]);
    }
}
