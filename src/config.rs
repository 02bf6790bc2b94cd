//! Validation Configuration
//!
//! Everything a run depends on, passed explicitly to the components that need
//! it. Loaded from an optional YAML file; unspecified fields take defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::balance::RESIDUAL_TOLERANCE;
use crate::checks::CheckOptions;
use crate::error::{QcError, QcResult};
use crate::loader::CELL_AREA;
use crate::naming::{Domain, FileLayout, Institution, Version, YearBounds, YearRange};
use crate::sweep::ValidationMatrix;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Directory holding the model output files
    pub data_dir: PathBuf,
    /// File with the cell areas used as weights
    pub grid_area_file: PathBuf,
    pub grid_area_variable: String,
    pub start_year: i32,
    pub end_year: i32,
    /// Years any file may reference
    pub bounds: YearBounds,
    pub domain: Domain,
    pub institution: Institution,
    pub version: Version,
    /// Compare every timestep of the time axis instead of first/last
    pub full_time_check: bool,
    pub report_dir: PathBuf,
    /// Years per file; `None` means one file spans the whole run
    pub years_per_file: Option<u32>,
    /// Water residual tolerance, kg m-2 s-1
    pub residual_tolerance: f64,
    /// Tolerance on lat/lon values, degrees
    pub coordinate_epsilon: f64,
    /// Write one report per check category and year next to the run report
    pub split_reports: bool,
    pub matrix: ValidationMatrix,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let bounds = YearBounds::default();
        Self {
            data_dir: PathBuf::from("."),
            grid_area_file: PathBuf::from("garea.nc"),
            grid_area_variable: CELL_AREA.to_string(),
            start_year: bounds.min,
            end_year: bounds.max,
            bounds,
            domain: Domain::Glob30,
            institution: Institution::Ecmwf,
            version: Version::Wrr1,
            full_time_check: false,
            report_dir: PathBuf::from("reports"),
            years_per_file: Some(1),
            residual_tolerance: RESIDUAL_TOLERANCE,
            coordinate_epsilon: 1e-6,
            split_reports: true,
            matrix: ValidationMatrix::default(),
        }
    }
}

impl ValidationConfig {
    /// Read a YAML file; missing keys keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> QcResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| QcError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> QcResult<Self> {
        serde_yaml::from_str(text).map_err(|e| QcError::Config(e.to_string()))
    }

    pub fn validate(&self) -> QcResult<()> {
        let run = self.run_years()?;
        if !self.bounds.admits(&run) {
            return Err(QcError::Config(format!(
                "run years {} outside the allowed {}-{}",
                run, self.bounds.min, self.bounds.max
            )));
        }
        if self.residual_tolerance.is_nan() || self.residual_tolerance <= 0.0 {
            return Err(QcError::Config(format!(
                "residual_tolerance must be positive, got {}",
                self.residual_tolerance
            )));
        }
        if self.coordinate_epsilon.is_nan() || self.coordinate_epsilon < 0.0 {
            return Err(QcError::Config(format!(
                "coordinate_epsilon must not be negative, got {}",
                self.coordinate_epsilon
            )));
        }
        if self.years_per_file == Some(0) {
            return Err(QcError::Config("years_per_file must be positive".to_string()));
        }
        if self.grid_area_variable.is_empty() {
            return Err(QcError::Config("grid_area_variable is empty".to_string()));
        }
        Ok(())
    }

    pub fn run_years(&self) -> QcResult<YearRange> {
        YearRange::new(self.start_year, self.end_year)
            .map_err(|e| QcError::Config(format!("invalid run years: {}", e)))
    }

    pub fn layout(&self) -> QcResult<FileLayout> {
        FileLayout::new(
            &self.data_dir,
            self.institution,
            self.version,
            self.domain,
            self.run_years()?,
            self.years_per_file,
            self.bounds,
        )
    }

    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            full_time_check: self.full_time_check,
            coordinate_epsilon: self.coordinate_epsilon,
            bounds: self.bounds,
        }
    }

    /// `qc_<inst>_<ver>_<domain>_<ys>-<ye>.txt` in the report directory
    pub fn run_report_path(&self) -> PathBuf {
        self.report_dir.join(format!(
            "qc_{}_{}_{}_{:04}-{:04}.txt",
            self.institution, self.version, self.domain, self.start_year, self.end_year
        ))
    }
}
