//! Balance Evaluation
//!
//! Conservation checks composed from several variables of one year. Both
//! evaluators run in a single pass: load every component, derive, reduce to
//! global means, emit. A component that cannot be loaded is zeroed with a
//! Warning and the evaluation carries on.

pub mod energy;
pub mod water;

pub use energy::EnergyBalance;
pub use water::WaterBalance;

use tracing::debug;

use crate::error::QcResult;
use crate::grid::{AreaWeightedAggregator, FieldStats, GridField};
use crate::loader::{LoadError, TimeWindow, VariableLoader};
use crate::naming::{FileLayout, Frequency, Variable};
use crate::report::DiagnosticReport;
use crate::store::DatasetStore;
use crate::time::{CalendarDateTime, SECONDS_PER_DAY};

/// Closure tolerance on the water residual, kg m-2 s-1
pub const RESIDUAL_TOLERANCE: f64 = 5e-6;

/// Latent heat of fusion, J kg-1
pub const LATENT_HEAT_FUSION: f64 = 3.337e5;

/// A named term of a balance with its area-weighted global mean
#[derive(Debug, Clone)]
pub struct BalanceComponent {
    pub name: String,
    pub field: GridField,
    pub global_mean: f64,
}

/// Everything one evaluation produced
#[derive(Debug, Clone, Default)]
pub struct BalanceOutcome {
    pub components: Vec<BalanceComponent>,
    /// Statistics of the NET residual, when the balance checks closure
    pub residual: Option<FieldStats>,
}

impl BalanceOutcome {
    pub fn component(&self, name: &str) -> Option<&BalanceComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn global_mean(&self, name: &str) -> Option<f64> {
        self.component(name).map(|c| c.global_mean)
    }
}

/// Shared services of the evaluators for one run
pub struct BalanceContext<'a, S> {
    pub loader: &'a VariableLoader<S>,
    pub layout: &'a FileLayout,
    pub aggregator: &'a AreaWeightedAggregator,
    /// Residual tolerance in kg m-2 s-1
    pub residual_tolerance: f64,
}

impl<'a, S: DatasetStore> BalanceContext<'a, S> {
    pub fn new(
        loader: &'a VariableLoader<S>,
        layout: &'a FileLayout,
        aggregator: &'a AreaWeightedAggregator,
    ) -> Self {
        Self {
            loader,
            layout,
            aggregator,
            residual_tolerance: RESIDUAL_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.residual_tolerance = tolerance;
        self
    }

    pub fn zero(&self) -> GridField {
        GridField::zeros(self.aggregator.shape())
    }

    fn usable(&self, field: GridField, variable: Variable, report: &mut DiagnosticReport, tag: &str) -> GridField {
        if field.shape() == self.aggregator.shape() {
            return field;
        }
        report.warning(format!(
            "{} {} has grid {:?} but the cell areas are {:?}, setting to zero",
            tag,
            variable,
            field.shape(),
            self.aggregator.shape()
        ));
        self.zero()
    }

    /// Temporal mean of a monthly variable over `year`, in file units
    pub fn monthly_mean(
        &self,
        variable: Variable,
        year: i32,
        report: &mut DiagnosticReport,
        tag: &str,
    ) -> GridField {
        let path = match self.layout.path_for(variable, Frequency::Monthly, year) {
            Ok(p) => p,
            Err(e) => {
                report.warning(format!("{} {}: {}, setting to zero", tag, variable, e));
                return self.zero();
            }
        };
        let loaded = self
            .loader
            .load(&path, variable.as_str(), &TimeWindow::year(year), report, tag)
            .and_then(|l| {
                if l.time_len() == 0 {
                    debug!("{} has no timesteps in {}", variable, year);
                    return Err(LoadError::EmptyWindow { path: path.clone() });
                }
                l.temporal_mean()
            });
        match loaded {
            Ok(field) => self.usable(field, variable, report, tag),
            Err(e) => {
                report.warning(format!("{} {}: {}, setting to zero", tag, variable, e));
                self.zero()
            }
        }
    }

    /// `-(last - first) / ndays` of a daily storage variable over `year`,
    /// in file units per day
    pub fn storage_change(
        &self,
        variable: Variable,
        year: i32,
        report: &mut DiagnosticReport,
        tag: &str,
    ) -> GridField {
        let path = match self.layout.path_for(variable, Frequency::Daily, year) {
            Ok(p) => p,
            Err(e) => {
                report.warning(format!("{} {}: {}, setting to zero", tag, variable, e));
                return self.zero();
            }
        };
        let endpoints = self.loader.load_endpoints(
            &path,
            variable.as_str(),
            CalendarDateTime::start_of_year(year),
            CalendarDateTime::start_of_year(year + 1),
            report,
            tag,
        );
        let change = endpoints.map_err(|e| e.to_string()).and_then(|ends| {
            let delta = ends.first.sub(&ends.last).map_err(|e| e.to_string())?;
            Ok(delta.scaled(1.0 / ends.ndays as f64))
        });
        match change {
            Ok(field) => self.usable(field, variable, report, tag),
            Err(e) => {
                report.warning(format!("{} {}: {}, setting to zero", tag, variable, e));
                self.zero()
            }
        }
    }

    pub fn component(&self, name: &str, field: GridField) -> QcResult<BalanceComponent> {
        let global_mean = self.aggregator.weighted_mean(&field)?;
        Ok(BalanceComponent {
            name: name.to_string(),
            field,
            global_mean,
        })
    }

    /// Water-flux tolerance in mm day-1
    pub fn daily_tolerance(&self) -> f64 {
        self.residual_tolerance * SECONDS_PER_DAY as f64
    }
}

/// `a / b`, or `n/a` when the reference is zero
pub fn ratio(value: f64, reference: f64) -> String {
    if reference == 0.0 {
        "n/a".to_string()
    } else {
        format!("{:.6}", value / reference)
    }
}

/// Data line comparing a component against a reference component
pub fn global_mean_line(
    tag: &str,
    component: &BalanceComponent,
    units: &str,
    reference: &BalanceComponent,
) -> String {
    format!(
        "{} Global mean of {} {:.6} ({}) with {}/{} {}",
        tag,
        component.name,
        component.global_mean,
        units,
        component.name,
        reference.name,
        ratio(component.global_mean, reference.global_mean)
    )
}

/// One conservation check over one year
pub trait BalanceEvaluator {
    /// Prefix of every report line, e.g. `WB`
    fn label(&self) -> &'static str;

    fn evaluate<S: DatasetStore>(
        &self,
        ctx: &BalanceContext<'_, S>,
        year: i32,
        report: &mut DiagnosticReport,
    ) -> QcResult<BalanceOutcome>;
}
