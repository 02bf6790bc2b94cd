//! Coordinate arrays and the time axis against their reference values.

use crate::naming::{Domain, FileDescriptor, Frequency};
use crate::report::DiagnosticReport;
use crate::store::{Dataset, LAT, LON};
use crate::time::{expected_sequence, CalendarDateTime, TimeAxis, TimeAxisError};

/// Compare `lat` and `lon` with the domain reference grid
pub fn check_grid(
    dataset: &dyn Dataset,
    domain: Domain,
    epsilon: f64,
    report: &mut DiagnosticReport,
    tag: &str,
) {
    let references = [
        (LAT, domain.reference_lats()),
        (LON, domain.reference_lons()),
    ];
    for (name, reference) in references {
        let values = match dataset.read_values(name, None) {
            Ok(v) => v,
            Err(e) => {
                report.error(format!("{} coords: Could not read {}: {}", tag, name, e));
                continue;
            }
        };
        if values.len() != reference.len() {
            report.error(format!(
                "{} coords: {} has {} values while the {} grid has {}",
                tag,
                name,
                values.len(),
                domain,
                reference.len()
            ));
            continue;
        }

        let mut mismatched = 0;
        let mut max_dev: f64 = 0.0;
        for (v, r) in values.iter().zip(&reference) {
            let dev = (v - r).abs();
            if dev.is_nan() || dev > epsilon {
                mismatched += 1;
                max_dev = max_dev.max(if dev.is_nan() { f64::INFINITY } else { dev });
            }
        }
        if mismatched > 0 {
            report.error(format!(
                "{} coords: {} differs from the {} grid at {} points (max deviation {:e})",
                tag, name, domain, mismatched, max_dev
            ));
        } else {
            report.status(format!("{} coords: {} matches the {} grid", tag, name, domain));
        }
    }
}

/// Component-wise disagreement between a decoded axis and its expected sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeMismatch {
    pub checked: usize,
    pub year_month: usize,
    pub day: usize,
}

/// Compare `actual` against `expected` position by position. Sampled mode
/// only looks at the first and last position both sequences share.
pub fn compare_times(
    actual: &[CalendarDateTime],
    expected: &[CalendarDateTime],
    full: bool,
) -> TimeMismatch {
    let n = actual.len().min(expected.len());
    let positions: Vec<usize> = match n {
        0 => Vec::new(),
        1 => vec![0],
        _ if full => (0..n).collect(),
        _ => vec![0, n - 1],
    };

    let mut mismatch = TimeMismatch {
        checked: positions.len(),
        ..Default::default()
    };
    for i in positions {
        let (a, e) = (&actual[i], &expected[i]);
        if a.year != e.year || a.month != e.month {
            mismatch.year_month += 1;
        }
        if a.day != e.day {
            mismatch.day += 1;
        }
    }
    mismatch
}

/// Decode the time axis and compare it with the regular sequence the file's
/// frequency and year range imply.
pub fn check_time(
    dataset: &dyn Dataset,
    descriptor: &FileDescriptor,
    full: bool,
    report: &mut DiagnosticReport,
    tag: &str,
) {
    if let Err(e) = try_check_time(dataset, descriptor, full, report, tag) {
        report.error(format!(
            "{} time: Could not check time information ({}), check time variable and units attributes",
            tag, e
        ));
    }
}

fn try_check_time(
    dataset: &dyn Dataset,
    descriptor: &FileDescriptor,
    full: bool,
    report: &mut DiagnosticReport,
    tag: &str,
) -> Result<(), TimeAxisError> {
    let frequency = descriptor.frequency();
    let Some(years) = descriptor.years() else {
        return Ok(());
    };
    if frequency == Frequency::Fixed {
        return Ok(());
    }

    let axis = TimeAxis::read(dataset)?;
    if axis.is_empty() {
        return Err(TimeAxisError::Unreadable("time axis is empty".to_string()));
    }
    let expected = expected_sequence(frequency, years, axis.calendar);
    let mismatch = compare_times(&axis.times, &expected, full);
    let start = expected.first().map(|t| t.to_string()).unwrap_or_default();

    if mismatch.year_month > 0 {
        report.error(format!(
            "{} time: Found {} of {} checked time values with year/month different from the {} sequence starting {}",
            tag, mismatch.year_month, mismatch.checked, frequency, start
        ));
    }
    let day_checked = frequency == Frequency::Daily;
    if day_checked && mismatch.day > 0 {
        report.error(format!(
            "{} time: Found {} of {} checked time values with day different from the {} sequence starting {}",
            tag, mismatch.day, mismatch.checked, frequency, start
        ));
    }
    if mismatch.year_month == 0 && (!day_checked || mismatch.day == 0) {
        report.status(format!(
            "{} time: time variable check OK ({} points, {} calendar)",
            tag, mismatch.checked, axis.calendar
        ));
    }
    Ok(())
}
