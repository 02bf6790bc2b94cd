//! Dimension sizes against what the descriptor implies.

use crate::naming::FileDescriptor;
use crate::report::DiagnosticReport;
use crate::store::{Dataset, LAT, LEVELS, LON};
use crate::time::{expected_length, Calendar, TIME};

/// Expected length of a dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedLen {
    Exactly(usize),
    AnyPositive,
}

/// Dimensions a file must declare, with their expected lengths
pub fn expected_dimensions(
    descriptor: &FileDescriptor,
    calendar: Calendar,
) -> Vec<(&'static str, ExpectedLen)> {
    let domain = descriptor.domain();
    let mut dims = Vec::with_capacity(4);
    let time_len = descriptor
        .years()
        .and_then(|years| expected_length(descriptor.frequency(), years, calendar));
    if let Some(n) = time_len {
        dims.push((TIME, ExpectedLen::Exactly(n)));
    }
    dims.push((LAT, ExpectedLen::Exactly(domain.nlat())));
    dims.push((LON, ExpectedLen::Exactly(domain.nlon())));
    if descriptor.variable().is_layered() {
        dims.push((LEVELS, ExpectedLen::AnyPositive));
    }
    dims
}

pub fn check_dimensions(
    dataset: &dyn Dataset,
    descriptor: &FileDescriptor,
    calendar: Calendar,
    report: &mut DiagnosticReport,
    tag: &str,
) {
    for (name, expected) in expected_dimensions(descriptor, calendar) {
        let Some(found) = dataset.dimension_len(name) else {
            report.error(format!("{} dims: Dimension {} was not found", tag, name));
            continue;
        };
        match expected {
            ExpectedLen::Exactly(n) if found != n => report.error(format!(
                "{} dims: Dimension {} has {} while it should have {} elements",
                tag, name, found, n
            )),
            ExpectedLen::AnyPositive if found == 0 => report.error(format!(
                "{} dims: Dimension {} is empty",
                tag, name
            )),
            _ => report.status(format!(
                "{} dims: Found dimension {} with correct {} elements",
                tag, name, found
            )),
        }
    }
}
