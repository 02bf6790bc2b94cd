//! Variable Loader
//!
//! Pulls one variable out of a dataset for a time window. Absence is tolerated:
//! a missing file or time axis is a soft failure for the caller to log, and a
//! missing variable loads as zeros so additive arithmetic downstream stays
//! well-defined.

use ndarray::{ArrayD, ArrayView3, Axis, Ix2, Ix3, IxDyn};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::grid::{temporal_mean, AreaWeightedAggregator, GridField};
use crate::report::DiagnosticReport;
use crate::store::{Availability, Dataset, DatasetStore, StoreError, LAT, LON};
use crate::time::{CalendarDateTime, TimeAxis, TimeAxisError};

/// Default name of the cell-area variable in the grid-area file
pub const CELL_AREA: &str = "cell_area";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("dataset not present: {0}")]
    MissingDataset(PathBuf),

    #[error("cannot open {path}: {reason}")]
    UnreadableDataset { path: PathBuf, reason: String },

    #[error("cannot read time axis of {path}: {source}")]
    UnreadableTime {
        path: PathBuf,
        #[source]
        source: TimeAxisError,
    },

    #[error("no timesteps of {path} fall in the requested window")]
    EmptyWindow { path: PathBuf },

    #[error("'{variable}' has shape {found:?}, expected {expected:?}")]
    UnexpectedShape {
        variable: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Which timesteps to read
#[derive(Debug, Clone, PartialEq)]
pub enum TimeWindow {
    All,
    /// Half-open `[start, end)`
    Range {
        start: CalendarDateTime,
        end: CalendarDateTime,
    },
    /// Explicit positions on the time axis, read in this order
    Indices(Vec<usize>),
}

impl TimeWindow {
    /// The whole of calendar year `year`
    pub fn year(year: i32) -> Self {
        TimeWindow::Range {
            start: CalendarDateTime::start_of_year(year),
            end: CalendarDateTime::start_of_year(year + 1),
        }
    }

    /// Index set over `axis`; `None` means every timestep.
    pub fn resolve(&self, axis: &TimeAxis) -> Option<Vec<usize>> {
        match self {
            TimeWindow::All => None,
            TimeWindow::Range { start, end } => Some(axis.indices_between(start, end)),
            TimeWindow::Indices(indices) => Some(indices.clone()),
        }
    }
}

/// Values of one variable, time first, with a co-indexed validity array
#[derive(Debug, Clone)]
pub struct LoadedVariable {
    pub variable: String,
    pub values: ArrayD<f64>,
    pub valid: ArrayD<bool>,
    pub times: Vec<CalendarDateTime>,
}

impl LoadedVariable {
    pub fn time_len(&self) -> usize {
        self.values.shape().first().copied().unwrap_or(0)
    }

    /// Sum a `(time, level, lat, lon)` variable over its levels. A summed cell
    /// is valid only if every level is. Other shapes pass through.
    pub fn collapse_levels(self) -> Self {
        if self.values.ndim() != 4 {
            return self;
        }
        let values = self.values.sum_axis(Axis(1));
        let valid = self
            .valid
            .map_axis(Axis(1), |levels| levels.iter().all(|&ok| ok));
        Self {
            variable: self.variable,
            values,
            valid,
            times: self.times,
        }
    }

    fn as_cube(&self) -> Result<(ArrayView3<'_, f64>, ArrayView3<'_, bool>), LoadError> {
        let shape_err = || LoadError::UnexpectedShape {
            variable: self.variable.clone(),
            expected: vec![self.time_len(), 0, 0],
            found: self.values.shape().to_vec(),
        };
        let values = self.values.view().into_dimensionality::<Ix3>().map_err(|_| shape_err())?;
        let valid = self.valid.view().into_dimensionality::<Ix3>().map_err(|_| shape_err())?;
        Ok((values, valid))
    }

    /// Mean over time, per cell
    pub fn temporal_mean(&self) -> Result<GridField, LoadError> {
        let (values, valid) = self.as_cube()?;
        Ok(temporal_mean(values, valid))
    }

    /// One timestep as a field
    pub fn step(&self, index: usize) -> Result<GridField, LoadError> {
        let (values, valid) = self.as_cube()?;
        let len = values.len_of(Axis(0));
        if index >= len {
            return Err(StoreError::IndexOutOfRange {
                variable: self.variable.clone(),
                index,
                len,
            }
            .into());
        }
        Ok(GridField {
            values: values.index_axis(Axis(0), index).to_owned(),
            valid: Some(valid.index_axis(Axis(0), index).to_owned()),
        })
    }
}

/// First and last snapshot of a window, for storage-change terms
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub first: GridField,
    pub last: GridField,
    /// `last - first + 1` in timesteps of the file
    pub ndays: usize,
}

fn fill_value(dataset: &dyn Dataset, variable: &str) -> Option<f64> {
    dataset
        .attribute(variable, "_FillValue")
        .or_else(|| dataset.attribute(variable, "missing_value"))
        .and_then(|v| v.as_f64())
}

fn is_fill(value: f64, fill: Option<f64>) -> bool {
    match fill {
        Some(f) => value == f || (value - f).abs() <= f.abs() * 1e-7,
        None => false,
    }
}

/// Reads variables through a [`DatasetStore`]
pub struct VariableLoader<S> {
    store: S,
}

impl<S: DatasetStore> VariableLoader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Dataset + '_>, LoadError> {
        match self.store.probe(path) {
            Availability::Present => {}
            Availability::Absent => return Err(LoadError::MissingDataset(path.to_path_buf())),
            Availability::Unreadable(reason) => {
                return Err(LoadError::UnreadableDataset {
                    path: path.to_path_buf(),
                    reason,
                })
            }
        }
        self.store.open(path).map_err(|e| match e {
            StoreError::NotFound(p) => LoadError::MissingDataset(p),
            other => LoadError::UnreadableDataset {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })
    }

    fn time_axis(dataset: &dyn Dataset, path: &Path) -> Result<TimeAxis, LoadError> {
        TimeAxis::read(dataset).map_err(|source| LoadError::UnreadableTime {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `variable` from `path` over `window`. Messages are prefixed with `tag`.
    pub fn load(
        &self,
        path: &Path,
        variable: &str,
        window: &TimeWindow,
        report: &mut DiagnosticReport,
        tag: &str,
    ) -> Result<LoadedVariable, LoadError> {
        let dataset = self.open(path)?;
        let axis = Self::time_axis(dataset.as_ref(), path)?;
        let indices = window.resolve(&axis);
        read_selected(dataset.as_ref(), &axis, variable, indices, report, tag)
    }

    /// Load only the first and last timestep inside `[start, end)`
    pub fn load_endpoints(
        &self,
        path: &Path,
        variable: &str,
        start: CalendarDateTime,
        end: CalendarDateTime,
        report: &mut DiagnosticReport,
        tag: &str,
    ) -> Result<Endpoints, LoadError> {
        let dataset = self.open(path)?;
        let axis = Self::time_axis(dataset.as_ref(), path)?;
        let in_window = axis.indices_between(&start, &end);
        let (Some(&first), Some(&last)) = (in_window.first(), in_window.last()) else {
            return Err(LoadError::EmptyWindow {
                path: path.to_path_buf(),
            });
        };

        let loaded = read_selected(
            dataset.as_ref(),
            &axis,
            variable,
            Some(vec![first, last]),
            report,
            tag,
        )?
        .collapse_levels();

        Ok(Endpoints {
            first: loaded.step(0)?,
            last: loaded.step(1)?,
            ndays: last - first + 1,
        })
    }

    /// Cell areas shaped `(nlat, nlon)`. Fill values and NaNs get zero weight.
    pub fn load_grid_area(
        &self,
        path: &Path,
        variable: &str,
        shape: (usize, usize),
    ) -> Result<AreaWeightedAggregator, LoadError> {
        let dataset = self.open(path)?;
        if !dataset.variable_status(variable).is_present() {
            return Err(StoreError::MissingVariable(variable.to_string()).into());
        }
        let fill = fill_value(dataset.as_ref(), variable);
        let raw = dataset.read_values(variable, None)?;

        // a leading singleton axis (time or level) is tolerated
        let raw = match raw.ndim() {
            3 if raw.shape()[0] == 1 => raw.index_axis_move(Axis(0), 0),
            _ => raw,
        };
        let mismatch = |found: &[usize]| LoadError::UnexpectedShape {
            variable: variable.to_string(),
            expected: vec![shape.0, shape.1],
            found: found.to_vec(),
        };
        let found = raw.shape().to_vec();
        let area = raw
            .into_dimensionality::<Ix2>()
            .map_err(|_| mismatch(&found))?;
        if area.dim() != shape {
            return Err(mismatch(&found));
        }
        debug!("Loaded {} {:?} from {}", variable, shape, path.display());
        Ok(AreaWeightedAggregator::new(area.mapv(|a| {
            if a.is_nan() || is_fill(a, fill) {
                0.0
            } else {
                a
            }
        })))
    }
}

fn read_selected(
    dataset: &dyn Dataset,
    axis: &TimeAxis,
    variable: &str,
    indices: Option<Vec<usize>>,
    report: &mut DiagnosticReport,
    tag: &str,
) -> Result<LoadedVariable, LoadError> {
    let times = match &indices {
        None => axis.times.clone(),
        Some(idx) => {
            if let Some(&index) = idx.iter().find(|&&i| i >= axis.len()) {
                return Err(StoreError::IndexOutOfRange {
                    variable: variable.to_string(),
                    index,
                    len: axis.len(),
                }
                .into());
            }
            idx.iter().map(|&i| axis.times[i]).collect()
        }
    };

    match dataset.variable_status(variable) {
        Availability::Present => {}
        Availability::Absent => {
            let nlat = dataset.dimension_len(LAT).unwrap_or(0);
            let nlon = dataset.dimension_len(LON).unwrap_or(0);
            let shape = [times.len(), nlat, nlon];
            report.warning(format!(
                "{} load var {} could not find variable, setting to zero",
                tag, variable
            ));
            return Ok(LoadedVariable {
                variable: variable.to_string(),
                values: ArrayD::zeros(IxDyn(&shape)),
                valid: ArrayD::from_elem(IxDyn(&shape), true),
                times,
            });
        }
        Availability::Unreadable(reason) => {
            return Err(StoreError::Read {
                variable: variable.to_string(),
                reason,
            }
            .into())
        }
    }

    let values = dataset.read_values(variable, indices.as_deref())?;
    let fill = fill_value(dataset, variable);
    let valid = values.mapv(|v| !v.is_nan() && !is_fill(v, fill));
    report.status(format!(
        "{} load var {} ok with dimensions {:?}",
        tag,
        variable,
        values.shape()
    ));
    Ok(LoadedVariable {
        variable: variable.to_string(),
        values,
        valid,
        times,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Category;
    use crate::store::{AttrValue, MemoryDataset, MemoryStore};
    use ndarray::{Array2, Array3, Array4};

    fn daily(days: usize) -> MemoryDataset {
        let offsets: Vec<f64> = (0..days).map(|d| d as f64).collect();
        let swe = Array3::from_shape_fn((days, 2, 3), |(t, _, _)| t as f64).into_dyn();
        MemoryDataset::new()
            .with_grid(&[0.5, -0.5], &[0.0, 1.0, 2.0])
            .with_time(&offsets, "days since 1980-01-01", None)
            .with_variable("SWE", &["time", "lat", "lon"], swe)
            .with_attribute("SWE", "_FillValue", AttrValue::Number(-9999.0))
    }

    fn loader_with(ds: MemoryDataset) -> VariableLoader<MemoryStore> {
        let mut store = MemoryStore::new();
        store.insert("/d.nc", ds);
        VariableLoader::new(store)
    }

    #[test]
    fn test_range_window() {
        let loader = loader_with(daily(400));
        let mut report = DiagnosticReport::new();
        let loaded = loader
            .load(Path::new("/d.nc"), "SWE", &TimeWindow::year(1980), &mut report, "t")
            .unwrap();
        assert_eq!(loaded.time_len(), 366);
        assert_eq!(loaded.times[0], CalendarDateTime::date(1980, 1, 1));
        assert_eq!(loaded.times[365], CalendarDateTime::date(1980, 12, 31));
        assert_eq!(report.count(Category::Status), 1);
        assert_eq!(loader.store().open_handles(), 0);
    }

    #[test]
    fn test_explicit_indices_win() {
        let loader = loader_with(daily(10));
        let mut report = DiagnosticReport::new();
        let loaded = loader
            .load(Path::new("/d.nc"), "SWE", &TimeWindow::Indices(vec![7, 2]), &mut report, "t")
            .unwrap();
        assert_eq!(loaded.values[[0, 0, 0]], 7.0);
        assert_eq!(loaded.values[[1, 0, 0]], 2.0);

        let err = loader
            .load(Path::new("/d.nc"), "SWE", &TimeWindow::Indices(vec![10]), &mut report, "t")
            .unwrap_err();
        assert!(matches!(err, LoadError::Store(StoreError::IndexOutOfRange { index: 10, .. })));
    }

    #[test]
    fn test_absent_variable_is_zero_with_one_warning() {
        let loader = loader_with(daily(5));
        let mut report = DiagnosticReport::new();
        let loaded = loader
            .load(Path::new("/d.nc"), "Qsm", &TimeWindow::Indices(vec![0, 4]), &mut report, "t")
            .unwrap();
        assert_eq!(loaded.values.shape(), &[2, 2, 3]);
        assert!(loaded.values.iter().all(|&v| v == 0.0));
        assert!(loaded.valid.iter().all(|&ok| ok));
        assert_eq!(report.count(Category::Warning), 1);
    }

    #[test]
    fn test_missing_and_corrupt_files_are_soft() {
        let mut store = MemoryStore::new();
        store.insert_corrupt("/bad.nc", "truncated");
        let loader = VariableLoader::new(store);
        let mut report = DiagnosticReport::new();
        assert!(matches!(
            loader.load(Path::new("/none.nc"), "SWE", &TimeWindow::All, &mut report, "t"),
            Err(LoadError::MissingDataset(_))
        ));
        assert!(matches!(
            loader.load(Path::new("/bad.nc"), "SWE", &TimeWindow::All, &mut report, "t"),
            Err(LoadError::UnreadableDataset { .. })
        ));
    }

    #[test]
    fn test_bad_time_units() {
        let ds = daily(3).with_text_attribute("time", "units", "days after lunch");
        let loader = loader_with(ds);
        let mut report = DiagnosticReport::new();
        let err = loader
            .load(Path::new("/d.nc"), "SWE", &TimeWindow::All, &mut report, "t")
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::UnreadableTime { source: TimeAxisError::BadUnits(_), .. }
        ));
        assert_eq!(loader.store().open_handles(), 0);
    }

    #[test]
    fn test_fill_values_invalid() {
        let mut data = Array3::<f64>::zeros((2, 1, 2));
        data[[0, 0, 1]] = -9999.0;
        data[[1, 0, 0]] = f64::NAN;
        let ds = MemoryDataset::new()
            .with_grid(&[0.0], &[0.0, 1.0])
            .with_time(&[0.0, 1.0], "days since 1980-01-01", None)
            .with_variable("Evap", &["time", "lat", "lon"], data.into_dyn())
            .with_attribute("Evap", "_FillValue", AttrValue::Number(-9999.0));
        let loader = loader_with(ds);
        let mut report = DiagnosticReport::new();
        let loaded = loader
            .load(Path::new("/d.nc"), "Evap", &TimeWindow::All, &mut report, "t")
            .unwrap();
        let mean = loaded.temporal_mean().unwrap();
        assert_eq!(mean.values[[0, 0]], 0.0);
        assert_eq!(mean.values[[0, 1]], 0.0);
        assert_eq!(loaded.valid.iter().filter(|&&ok| !ok).count(), 2);
    }

    #[test]
    fn test_endpoints_collapse_levels() {
        let days = 366;
        let offsets: Vec<f64> = (0..days).map(|d| d as f64).collect();
        let soil = Array4::from_shape_fn((days, 3, 1, 1), |(t, l, _, _)| (t * (l + 1)) as f64);
        let ds = MemoryDataset::new()
            .with_grid(&[0.0], &[0.0])
            .with_time(&offsets, "days since 1980-01-01", None)
            .with_variable("SoilMoist", &["time", "nlevs", "lat", "lon"], soil.into_dyn());
        let loader = loader_with(ds);
        let mut report = DiagnosticReport::new();
        let ends = loader
            .load_endpoints(
                Path::new("/d.nc"),
                "SoilMoist",
                CalendarDateTime::start_of_year(1980),
                CalendarDateTime::start_of_year(1981),
                &mut report,
                "t",
            )
            .unwrap();
        assert_eq!(ends.ndays, 366);
        assert_eq!(ends.first.values[[0, 0]], 0.0);
        assert_eq!(ends.last.values[[0, 0]], 365.0 * 6.0);
    }

    #[test]
    fn test_grid_area_shape_checked() {
        let ds = MemoryDataset::new().with_variable(
            CELL_AREA,
            &["lat", "lon"],
            Array2::from_elem((2, 3), 4.0).into_dyn(),
        );
        let loader = loader_with(ds);
        let agg = loader.load_grid_area(Path::new("/d.nc"), CELL_AREA, (2, 3)).unwrap();
        assert_eq!(agg.shape(), (2, 3));
        assert!(matches!(
            loader.load_grid_area(Path::new("/d.nc"), CELL_AREA, (3, 3)),
            Err(LoadError::UnexpectedShape { .. })
        ));
    }
}
