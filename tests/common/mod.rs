//! Shared fixtures: small synthetic runs assembled in a MemoryStore.

#![allow(dead_code)]

use ndarray::{Array2, Array3, Array4};
use std::path::Path;

use e2o_qc::naming::{Domain, FileLayout, Frequency, Institution, Variable, Version, YearBounds, YearRange};
use e2o_qc::store::{MemoryDataset, MemoryStore};
use e2o_qc::time::Calendar;

pub const NLAT: usize = 2;
pub const NLON: usize = 3;
pub const DATA_DIR: &str = "/data";

pub fn layout(year: i32) -> FileLayout {
    FileLayout::new(
        DATA_DIR,
        Institution::Ecmwf,
        Version::Wrr1,
        Domain::Glob30,
        YearRange::new(year, year).unwrap(),
        Some(1),
        YearBounds::default(),
    )
    .unwrap()
}

fn small_grid() -> MemoryDataset {
    MemoryDataset::new().with_grid(&[0.25, -0.25], &[-0.25, 0.25, 0.75])
}

fn units_for(year: i32) -> String {
    format!("days since {}-01-01 00:00:00", year)
}

/// Monthly file for `year` with the same value in every cell and month
pub fn monthly(variable: Variable, year: i32, value: f64) -> MemoryDataset {
    let calendar = Calendar::Standard;
    let mut offsets = Vec::with_capacity(12);
    let mut day = 0.0;
    for month in 1..=12 {
        offsets.push(day);
        day += calendar.days_in_month(year, month) as f64;
    }
    let data = Array3::from_elem((12, NLAT, NLON), value).into_dyn();
    small_grid()
        .with_time(&offsets, &units_for(year), Some("standard"))
        .with_variable(variable.as_str(), &["time", "lat", "lon"], data)
}

/// Daily file for `year` going linearly from `first` on Jan 1 to `last` on Dec 31
pub fn daily_storage(variable: Variable, year: i32, first: f64, last: f64) -> MemoryDataset {
    let ndays = Calendar::Standard.days_in_year(year) as usize;
    let offsets: Vec<f64> = (0..ndays).map(|d| d as f64).collect();
    let step = (last - first) / (ndays - 1) as f64;
    let mut data = Array3::from_shape_fn((ndays, NLAT, NLON), |(t, _, _)| first + step * t as f64);
    data.index_axis_mut(ndarray::Axis(0), ndays - 1).fill(last);
    small_grid()
        .with_time(&offsets, &units_for(year), Some("standard"))
        .with_variable(variable.as_str(), &["time", "lat", "lon"], data.into_dyn())
}

/// Daily layered file: two soil levels whose sum goes from `first` to `last`
pub fn daily_layered(variable: Variable, year: i32, first: f64, last: f64) -> MemoryDataset {
    let ndays = Calendar::Standard.days_in_year(year) as usize;
    let offsets: Vec<f64> = (0..ndays).map(|d| d as f64).collect();
    let data = Array4::from_shape_fn((ndays, 2, NLAT, NLON), |(t, _, _, _)| {
        if t == ndays - 1 {
            last / 2.0
        } else {
            first / 2.0
        }
    });
    small_grid()
        .with_time(&offsets, &units_for(year), Some("standard"))
        .with_variable(variable.as_str(), &["time", "nlevs", "lat", "lon"], data.into_dyn())
}

pub fn insert(store: &mut MemoryStore, layout: &FileLayout, variable: Variable, frequency: Frequency, year: i32, ds: MemoryDataset) {
    let path = layout.path_for(variable, frequency, year).unwrap();
    store.insert(path, ds);
}

/// Every monthly flux and daily reservoir a water balance reads.
/// Fluxes are in kg m-2 s-1; `precip`, `runoff` and `evap` are given in mm/day.
pub fn water_store(year: i32, precip: f64, runoff: f64, evap: f64, swe_drop: f64) -> MemoryStore {
    let layout = layout(year);
    let mut store = MemoryStore::new();
    let per_second = |mm_per_day: f64| mm_per_day / 86_400.0;

    for (variable, value) in [
        (Variable::Precip, per_second(precip)),
        (Variable::Runoff, per_second(runoff)),
        (Variable::Evap, per_second(evap)),
        (Variable::Rainf, per_second(precip)),
        (Variable::Qsm, 0.0),
        (Variable::ECanop, 0.0),
        (Variable::TVeg, per_second(evap)),
        (Variable::ESoil, 0.0),
        (Variable::EWater, 0.0),
        (Variable::Qs, per_second(runoff)),
        (Variable::Qsb, 0.0),
        (Variable::Qrec, 0.0),
    ] {
        insert(&mut store, &layout, variable, Frequency::Monthly, year, monthly(variable, year, value));
    }

    let ndays = Calendar::Standard.days_in_year(year) as f64;
    let swe = daily_storage(Variable::Swe, year, 100.0 + swe_drop * ndays, 100.0);
    insert(&mut store, &layout, Variable::Swe, Frequency::Daily, year, swe);
    let soil = daily_layered(Variable::SoilMoist, year, 300.0, 300.0);
    insert(&mut store, &layout, Variable::SoilMoist, Frequency::Daily, year, soil);
    for variable in [Variable::CanopInt, Variable::SurfStor] {
        let ds = daily_storage(variable, year, 1.0, 1.0);
        insert(&mut store, &layout, variable, Frequency::Daily, year, ds);
    }
    store
}

/// Uniform cell areas on the small grid
pub fn cell_areas() -> Array2<f64> {
    Array2::from_elem((NLAT, NLON), 1.0)
}

pub fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}
