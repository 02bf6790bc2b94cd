//! Structural Validation
//!
//! Per-file checks that do not depend on physical plausibility:
//! - dimension sizes implied by frequency, years and domain
//! - required metadata attributes
//! - coordinate arrays and the decoded time axis
//!
//! Findings go into the report tagged with the file name. Only a file name
//! that cannot be decoded stops the run.

pub mod attributes;
pub mod coords;
pub mod dims;

pub use attributes::check_attributes;
pub use coords::{check_grid, check_time, compare_times, TimeMismatch};
pub use dims::check_dimensions;

use std::path::Path;
use tracing::info;

use crate::error::QcResult;
use crate::naming::{FileDescriptor, Frequency, YearBounds};
use crate::report::DiagnosticReport;
use crate::store::{Availability, DatasetStore};
use crate::time::{Calendar, TIME};

/// Knobs of the structural checks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckOptions {
    /// Compare every timestep instead of the first and last
    pub full_time_check: bool,
    /// Tolerance on coordinate values, in degrees
    pub coordinate_epsilon: f64,
    pub bounds: YearBounds,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            full_time_check: false,
            coordinate_epsilon: 1e-6,
            bounds: YearBounds::default(),
        }
    }
}

pub struct StructuralValidator<S> {
    store: S,
    options: CheckOptions,
}

impl<S: DatasetStore> StructuralValidator<S> {
    pub fn new(store: S, options: CheckOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Run every structural check on one file.
    pub fn validate_file(&self, path: &Path, report: &mut DiagnosticReport) -> QcResult<()> {
        let descriptor = FileDescriptor::decode(path)?;
        let tag = descriptor.encode();
        info!("Checking {}", tag);

        match self.store.probe(path) {
            Availability::Present => {}
            Availability::Absent => {
                report.warning(format!("{} File not present, skipping checks", tag));
                return Ok(());
            }
            Availability::Unreadable(reason) => {
                report.warning(format!("{} Could not open file ({}), skipping checks", tag, reason));
                return Ok(());
            }
        }
        let dataset = match self.store.open(path) {
            Ok(ds) => ds,
            Err(e) => {
                report.warning(format!("{} Could not open file ({}), skipping checks", tag, e));
                return Ok(());
            }
        };

        if let Some(years) = descriptor.years() {
            if !self.options.bounds.admits(&years) {
                report.error(format!(
                    "{} Years {} are outside the expected {}-{}",
                    tag, years, self.options.bounds.min, self.options.bounds.max
                ));
            }
        }

        // an unparseable calendar is reported by the time check
        let calendar = dataset
            .attribute(TIME, "calendar")
            .and_then(|c| Calendar::parse(&c.to_string()).ok())
            .unwrap_or(Calendar::Standard);

        check_dimensions(dataset.as_ref(), &descriptor, calendar, report, &tag);
        check_attributes(dataset.as_ref(), &descriptor, report, &tag);
        check_grid(
            dataset.as_ref(),
            descriptor.domain(),
            self.options.coordinate_epsilon,
            report,
            &tag,
        );
        if descriptor.frequency() != Frequency::Fixed {
            check_time(
                dataset.as_ref(),
                &descriptor,
                self.options.full_time_check,
                report,
                &tag,
            );
        }
        Ok(())
    }
}
