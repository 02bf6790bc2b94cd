//! End-to-end sweeps over an in-memory store

mod common;

use ndarray::Array2;
use std::path::PathBuf;

use common::file_name;
use e2o_qc::naming::{Frequency, Variable};
use e2o_qc::report::Category;
use e2o_qc::store::{MemoryDataset, MemoryStore};
use e2o_qc::sweep::{MatrixCell, ValidationMatrix};
use e2o_qc::{Sweep, ValidationConfig};

fn config(start: i32, end: i32, report_dir: PathBuf) -> ValidationConfig {
    ValidationConfig {
        data_dir: PathBuf::from("/data"),
        grid_area_file: PathBuf::from("/data/garea.nc"),
        start_year: start,
        end_year: end,
        report_dir,
        matrix: ValidationMatrix::new(vec![
            MatrixCell::new(Variable::Evap, Frequency::Daily),
            MatrixCell::new(Variable::LandMask, Frequency::Fixed),
        ]),
        ..ValidationConfig::default()
    }
}

fn grid_area() -> MemoryDataset {
    let area = Array2::from_elem((360, 720), 1.0).into_dyn();
    MemoryDataset::new().with_variable("cell_area", &["lat", "lon"], area)
}

#[test]
fn test_sweep_writes_split_reports() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(1981, 1981, dir.path().to_path_buf());
    let mut store = MemoryStore::new();
    store.insert("/data/garea.nc", grid_area());

    let outcome = Sweep::new(&config, &store).run().unwrap();
    let names: Vec<&str> = outcome
        .split_reports
        .iter()
        .map(|r| r.file_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "dtmsg_ecmwf_wrr1_glob30_fix.txt",
            "dtmsg_ecmwf_wrr1_glob30_1981-1981.txt",
            "wbmsg_ecmwf_wrr1_glob30_1981.txt",
            "ebmsg_ecmwf_wrr1_glob30_1981.txt",
        ]
    );

    // nothing but the grid area exists: warnings, never errors
    let run = &outcome.run_report;
    assert_eq!(run.count(Category::Error), 0, "{}", run.render());
    assert!(run.count(Category::Warning) > 0);
    assert!(run
        .messages(Category::Data)
        .iter()
        .any(|m| m.starts_with("WB 1981 variable NET")));

    let written = outcome
        .write(&config.run_report_path(), &config.report_dir, config.split_reports)
        .unwrap();
    assert_eq!(written.len(), 5);
    assert_eq!(file_name(&written[0]), "qc_ecmwf_wrr1_glob30_1981-1981.txt");
    for path in &written {
        assert!(path.exists(), "{} missing", path.display());
    }
    let text = std::fs::read_to_string(&written[0]).unwrap();
    assert!(text.starts_with("======================\nStatus:"));
    assert_eq!(store.open_handles(), 0);
}

#[test]
fn test_missing_grid_area_skips_balances() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(1981, 1983, dir.path().to_path_buf());
    config.years_per_file = Some(2);
    let store = MemoryStore::new();

    let outcome = Sweep::new(&config, &store).run().unwrap();
    let names: Vec<&str> = outcome
        .split_reports
        .iter()
        .map(|r| r.file_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "dtmsg_ecmwf_wrr1_glob30_fix.txt",
            "dtmsg_ecmwf_wrr1_glob30_1981-1982.txt",
            "dtmsg_ecmwf_wrr1_glob30_1983-1983.txt",
        ]
    );
    let errors = outcome.run_report.messages(Category::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("grid area"));
    assert_eq!(outcome.run_report.count(Category::Data), 0);
}

#[test]
fn test_run_only_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(1981, 1981, dir.path().join("out"));
    config.split_reports = false;
    let store = MemoryStore::new();

    let outcome = Sweep::new(&config, &store).run().unwrap();
    let written = outcome
        .write(&config.run_report_path(), &config.report_dir, config.split_reports)
        .unwrap();
    assert_eq!(written, vec![config.run_report_path()]);
    assert!(config.run_report_path().exists());
}

#[test]
fn test_invalid_config_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(1975, 1981, dir.path().to_path_buf());
    let store = MemoryStore::new();
    assert!(Sweep::new(&config, &store).run().is_err());
}
