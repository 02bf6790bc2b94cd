use chrono::{Datelike, NaiveDate};

use super::TimeAxisError;

const CUMULATIVE_365: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
const CUMULATIVE_366: [u32; 12] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];

/// CF calendars. `Standard` is treated as proleptic Gregorian throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Calendar {
    Standard,
    NoLeap,
    AllLeap,
    Day360,
}

impl Calendar {
    pub fn parse(name: &str) -> Result<Self, TimeAxisError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" | "proleptic_gregorian" => Ok(Calendar::Standard),
            "noleap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            other => Err(TimeAxisError::UnknownCalendar(other.to_string())),
        }
    }

    pub fn is_leap(&self, year: i32) -> bool {
        match self {
            Calendar::Standard => NaiveDate::from_ymd_opt(year, 2, 29).is_some(),
            Calendar::AllLeap => true,
            Calendar::NoLeap | Calendar::Day360 => false,
        }
    }

    pub fn days_in_year(&self, year: i32) -> u32 {
        match self {
            Calendar::Day360 => 360,
            _ if self.is_leap(year) => 366,
            _ => 365,
        }
    }

    pub fn days_in_month(&self, year: i32, month: u32) -> u32 {
        match (self, month) {
            (Calendar::Day360, _) => 30,
            (_, 2) if self.is_leap(year) => 29,
            (_, 2) => 28,
            (_, 4 | 6 | 9 | 11) => 30,
            _ => 31,
        }
    }

    pub fn is_valid_date(&self, year: i32, month: u32, day: u32) -> bool {
        (1..=12).contains(&month) && day >= 1 && day <= self.days_in_month(year, month)
    }

    /// Continuous day count; only differences between two results are meaningful.
    pub(crate) fn day_number(&self, year: i32, month: u32, day: u32) -> i64 {
        match self {
            Calendar::Standard => NaiveDate::from_ymd_opt(year, month, day)
                .map(|d| d.num_days_from_ce() as i64)
                .unwrap_or_default(),
            Calendar::Day360 => {
                year as i64 * 360 + (month as i64 - 1) * 30 + (day as i64 - 1)
            }
            Calendar::NoLeap | Calendar::AllLeap => {
                let cumulative = self.cumulative_days();
                year as i64 * self.days_in_year(year) as i64
                    + cumulative[(month - 1) as usize] as i64
                    + (day as i64 - 1)
            }
        }
    }

    /// Inverse of [`Calendar::day_number`]; `None` when the year does not fit an `i32`
    /// or the date lies outside what chrono represents.
    pub(crate) fn from_day_number(&self, n: i64) -> Option<(i32, u32, u32)> {
        match self {
            Calendar::Standard => {
                let d = NaiveDate::from_num_days_from_ce_opt(i32::try_from(n).ok()?)?;
                Some((d.year(), d.month(), d.day()))
            }
            Calendar::Day360 => {
                let year = i32::try_from(n.div_euclid(360)).ok()?;
                let rem = n.rem_euclid(360);
                Some((year, (rem / 30) as u32 + 1, (rem % 30) as u32 + 1))
            }
            Calendar::NoLeap | Calendar::AllLeap => {
                let len = self.days_in_year(0) as i64;
                let year = i32::try_from(n.div_euclid(len)).ok()?;
                let rem = n.rem_euclid(len) as u32;
                let cumulative = self.cumulative_days();
                let month = cumulative.iter().rposition(|&c| c <= rem).unwrap_or(0);
                Some((year, month as u32 + 1, rem - cumulative[month] + 1))
            }
        }
    }

    fn cumulative_days(&self) -> &'static [u32; 12] {
        match self {
            Calendar::AllLeap => &CUMULATIVE_366,
            _ => &CUMULATIVE_365,
        }
    }
}

impl std::fmt::Display for Calendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Calendar::Standard => "standard",
            Calendar::NoLeap => "noleap",
            Calendar::AllLeap => "all_leap",
            Calendar::Day360 => "360_day",
        };
        f.write_str(name)
    }
}
