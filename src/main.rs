//! e2o Quality Control CLI
//!
//! Runs the structural and balance checks over one institution's output and
//! writes the reports. Exits non-zero when a file name cannot be decoded or a
//! report cannot be written.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use e2o_qc::logging::init_logging;
use e2o_qc::naming::{Domain, Institution, Version};
use e2o_qc::report::Category;
use e2o_qc::{DiagnosticReport, Sweep, ValidationConfig};

// ──────────────────────────────────────────────────────────────────────────────
// COMMAND LINE
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "e2o_qc")]
#[command(about = "Quality control for eartH2Observe model output")]
#[command(
    long_about = "Quality control for eartH2Observe model output.\n\nReading model output needs the `netcdf` cargo feature (and libnetcdf on the host): build with `cargo build --features netcdf`."
)]
struct Cli {
    /// YAML configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the model output files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// File with the cell-area variable used as weights
    #[arg(long)]
    grid_area: Option<PathBuf>,

    #[arg(long)]
    start_year: Option<i32>,

    #[arg(long)]
    end_year: Option<i32>,

    /// Spatial domain (glob30, glob15)
    #[arg(long)]
    domain: Option<Domain>,

    /// Institution id (ecmwf, univu, ...)
    #[arg(long)]
    institution: Option<Institution>,

    /// Experiment version (wrr0, wrr1, wrr2)
    #[arg(long)]
    version_id: Option<Version>,

    /// Check every timestep of the time axis, not only the first and last
    #[arg(long)]
    full_time_check: bool,

    /// Where to write the reports
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Years covered by each file
    #[arg(long)]
    years_per_file: Option<u32>,

    /// Only run the structural checks on these files (repeatable)
    #[arg(long = "file")]
    files: Vec<PathBuf>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<(ValidationConfig, Vec<PathBuf>)> {
        let mut config = match &self.config {
            Some(path) => ValidationConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => ValidationConfig::default(),
        };

        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(path) = self.grid_area {
            config.grid_area_file = path;
        }
        if let Some(year) = self.start_year {
            config.start_year = year;
        }
        if let Some(year) = self.end_year {
            config.end_year = year;
        }
        if let Some(domain) = self.domain {
            config.domain = domain;
        }
        if let Some(institution) = self.institution {
            config.institution = institution;
        }
        if let Some(version) = self.version_id {
            config.version = version;
        }
        if self.full_time_check {
            config.full_time_check = true;
        }
        if let Some(dir) = self.report_dir {
            config.report_dir = dir;
        }
        if let Some(n) = self.years_per_file {
            config.years_per_file = Some(n);
        }
        Ok((config, self.files))
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// STORE
// ──────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "netcdf")]
fn open_store() -> Result<e2o_qc::store::NetcdfStore> {
    Ok(e2o_qc::store::NetcdfStore::new())
}

#[cfg(not(feature = "netcdf"))]
fn open_store() -> Result<e2o_qc::store::MemoryStore> {
    anyhow::bail!("built without netCDF support; rebuild with `--features netcdf` to read model output")
}

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

fn summarize(report: &DiagnosticReport) {
    let counts: Vec<String> = Category::ALL
        .iter()
        .map(|c| format!("{} {}", c, report.count(*c)))
        .collect();
    info!("Summary: {}", counts.join(", "));
}

fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_file.as_deref())?;

    let (config, files) = cli.into_config()?;
    config.validate().context("Invalid configuration")?;

    let store = open_store()?;
    let sweep = Sweep::new(&config, store);

    if !files.is_empty() {
        let report = sweep.validate_files(&files)?;
        let path = config.report_dir.join("qc_files.txt");
        report
            .write_to(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        summarize(&report);
        info!("Report written to {}", path.display());
        return Ok(());
    }

    info!(
        "Checking {} {} {} for {}-{}",
        config.institution, config.version, config.domain, config.start_year, config.end_year
    );
    let outcome = sweep.run()?;
    let written = outcome
        .write(&config.run_report_path(), &config.report_dir, config.split_reports)
        .context("Failed to write reports")?;
    summarize(&outcome.run_report);
    info!("Wrote {} report files to {}", written.len(), config.report_dir.display());
    Ok(())
}
