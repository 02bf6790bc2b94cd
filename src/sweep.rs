//! Validation Sweep
//!
//! Walks the validation matrix over every year range of a run: structural
//! checks per file, then the water and energy balances per year. Everything
//! lands in one run report, and in split form in one report per check
//! category and period.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::balance::{BalanceContext, BalanceEvaluator, EnergyBalance, WaterBalance};
use crate::checks::StructuralValidator;
use crate::config::ValidationConfig;
use crate::error::QcResult;
use crate::grid::AreaWeightedAggregator;
use crate::loader::VariableLoader;
use crate::naming::{FileLayout, Frequency, Variable};
use crate::report::DiagnosticReport;
use crate::store::DatasetStore;

/// One (variable, frequency) pair of the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixCell {
    pub variable: Variable,
    pub frequency: Frequency,
}

impl MatrixCell {
    pub fn new(variable: Variable, frequency: Frequency) -> Self {
        Self { variable, frequency }
    }
}

/// The (variable, frequency) pairs whose files a run checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationMatrix {
    cells: Vec<MatrixCell>,
}

impl ValidationMatrix {
    pub fn new(cells: Vec<MatrixCell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[MatrixCell] {
        &self.cells
    }

    pub fn fixed(&self) -> impl Iterator<Item = &MatrixCell> {
        self.cells.iter().filter(|c| c.frequency == Frequency::Fixed)
    }

    pub fn time_varying(&self) -> impl Iterator<Item = &MatrixCell> {
        self.cells.iter().filter(|c| c.frequency != Frequency::Fixed)
    }
}

impl Default for ValidationMatrix {
    fn default() -> Self {
        use Variable::*;
        let monthly = [
            Precip, Rainf, Evap, Runoff, Qs, Qsb, Qrec, Qsm, ECanop, TVeg, ESoil, EWater, SWnet,
            LWnet, Qh, Qle,
        ];
        let daily = [
            Precip, Evap, Runoff, Swe, SoilMoist, CanopInt, SurfStor, SurfMoist, RootMoist,
        ];
        let fixed = [LandMask, SoilDepth];

        let cells = monthly
            .into_iter()
            .map(|v| MatrixCell::new(v, Frequency::Monthly))
            .chain(daily.into_iter().map(|v| MatrixCell::new(v, Frequency::Daily)))
            .chain(fixed.into_iter().map(|v| MatrixCell::new(v, Frequency::Fixed)))
            .collect();
        Self { cells }
    }
}

/// A report destined for its own file
#[derive(Debug, Clone)]
pub struct NamedReport {
    pub file_name: String,
    pub report: DiagnosticReport,
}

#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    /// Every message of the run
    pub run_report: DiagnosticReport,
    /// Per category and period: `dtmsg_*`, `wbmsg_*`, `ebmsg_*`
    pub split_reports: Vec<NamedReport>,
}

impl SweepOutcome {
    fn push(&mut self, file_name: String, report: DiagnosticReport) {
        self.run_report.extend(report.clone());
        self.split_reports.push(NamedReport { file_name, report });
    }

    /// Write the run report, and the split reports when `split` is set.
    /// Returns the paths written.
    pub fn write(&self, run_report_path: &Path, report_dir: &Path, split: bool) -> QcResult<Vec<PathBuf>> {
        let mut written = vec![run_report_path.to_path_buf()];
        self.run_report.write_to(run_report_path)?;
        if split {
            for named in &self.split_reports {
                let path = report_dir.join(&named.file_name);
                named.report.write_to(&path)?;
                written.push(path);
            }
        }
        Ok(written)
    }
}

/// Drives one run over a dataset store
pub struct Sweep<'c, S> {
    config: &'c ValidationConfig,
    store: S,
}

impl<'c, S: DatasetStore> Sweep<'c, S> {
    pub fn new(config: &'c ValidationConfig, store: S) -> Self {
        Self { config, store }
    }

    fn prefix(&self, category: &str) -> String {
        format!(
            "{}_{}_{}_{}",
            category, self.config.institution, self.config.version, self.config.domain
        )
    }

    /// Full sweep. Fails only on an undecodable file name, an invalid
    /// configuration, or a layout that cannot be built.
    pub fn run(&self) -> QcResult<SweepOutcome> {
        let config = self.config;
        config.validate()?;
        let layout = config.layout()?;
        let validator = StructuralValidator::new(&self.store, config.check_options());
        let loader = VariableLoader::new(&self.store);
        let mut outcome = SweepOutcome::default();

        let domain = config.domain;
        let aggregator = match loader.load_grid_area(
            &config.grid_area_file,
            &config.grid_area_variable,
            (domain.nlat(), domain.nlon()),
        ) {
            Ok(agg) => {
                outcome.run_report.status(format!(
                    "Loaded grid area '{}' from {}",
                    config.grid_area_variable,
                    config.grid_area_file.display()
                ));
                Some(agg)
            }
            Err(e) => {
                outcome.run_report.error(format!(
                    "Could not load grid area from {} ({}), skipping balance checks",
                    config.grid_area_file.display(),
                    e
                ));
                None
            }
        };

        if config.matrix.fixed().next().is_some() {
            let mut dtmsg = DiagnosticReport::new();
            for cell in config.matrix.fixed() {
                let path = layout.path_for(cell.variable, cell.frequency, config.start_year)?;
                validator.validate_file(&path, &mut dtmsg)?;
            }
            outcome.push(format!("{}_fix.txt", self.prefix("dtmsg")), dtmsg);
        }

        for range in layout.year_ranges() {
            info!("Processing {}", range);
            let mut dtmsg = DiagnosticReport::new();
            for cell in config.matrix.time_varying() {
                let path = layout.path_for(cell.variable, cell.frequency, range.start)?;
                validator.validate_file(&path, &mut dtmsg)?;
            }
            outcome.push(format!("{}_{}.txt", self.prefix("dtmsg"), range), dtmsg);

            let Some(aggregator) = &aggregator else {
                continue;
            };
            for year in range.years() {
                let (wbmsg, ebmsg) = self.balances(&loader, &layout, aggregator, year);
                outcome.push(format!("{}_{}.txt", self.prefix("wbmsg"), year), wbmsg);
                outcome.push(format!("{}_{}.txt", self.prefix("ebmsg"), year), ebmsg);
            }
        }

        Ok(outcome)
    }

    fn balances(
        &self,
        loader: &VariableLoader<&S>,
        layout: &FileLayout,
        aggregator: &AreaWeightedAggregator,
        year: i32,
    ) -> (DiagnosticReport, DiagnosticReport) {
        let ctx = BalanceContext::new(loader, layout, aggregator)
            .with_tolerance(self.config.residual_tolerance);
        (
            evaluate(&WaterBalance, &ctx, year),
            evaluate(&EnergyBalance, &ctx, year),
        )
    }

    /// Structural checks of explicitly named files
    pub fn validate_files(&self, paths: &[PathBuf]) -> QcResult<DiagnosticReport> {
        let validator = StructuralValidator::new(&self.store, self.config.check_options());
        let mut report = DiagnosticReport::new();
        for path in paths {
            validator.validate_file(path, &mut report)?;
        }
        Ok(report)
    }
}

fn evaluate<B: BalanceEvaluator, S: DatasetStore>(
    balance: &B,
    ctx: &BalanceContext<'_, S>,
    year: i32,
) -> DiagnosticReport {
    let mut report = DiagnosticReport::new();
    if let Err(e) = balance.evaluate(ctx, year, &mut report) {
        report.error(format!("{} {} Could not evaluate balance: {}", balance.label(), year, e));
    }
    report
}
