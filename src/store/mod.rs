//! Dataset Store
//!
//! Read-only access to gridded files. The on-disk codec stays behind these
//! traits; callers ask whether a file or variable is available before reading
//! it instead of relying on read failures.

pub mod memory;
#[cfg(feature = "netcdf")]
pub mod netcdf;

pub use memory::{MemoryDataset, MemoryStore};
#[cfg(feature = "netcdf")]
pub use self::netcdf::NetcdfStore;

use ndarray::ArrayD;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("dataset not found: {0}")]
    NotFound(PathBuf),

    #[error("cannot open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("variable '{0}' not found")]
    MissingVariable(String),

    #[error("index {index} out of range for '{variable}' with {len} timesteps")]
    IndexOutOfRange {
        variable: String,
        index: usize,
        len: usize,
    },

    #[error("cannot read '{variable}': {reason}")]
    Read { variable: String, reason: String },
}

/// Outcome of an existence query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Present,
    Absent,
    Unreadable(String),
}

impl Availability {
    pub fn is_present(&self) -> bool {
        matches!(self, Availability::Present)
    }
}

/// Attribute values as far as the checks care about them
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(v) => Some(*v),
            AttrValue::Numbers(v) => v.first().copied(),
            AttrValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Number(v) => write!(f, "{}", v),
            AttrValue::Numbers(v) => {
                let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

/// An open, read-only dataset. Dropping it releases the underlying handle.
pub trait Dataset {
    /// Length of a named dimension, if declared
    fn dimension_len(&self, name: &str) -> Option<usize>;

    fn variable_status(&self, name: &str) -> Availability;

    /// Dimension names of a variable, outermost first
    fn variable_dims(&self, name: &str) -> Option<Vec<String>>;

    fn attribute(&self, variable: &str, name: &str) -> Option<AttrValue>;

    /// Read a variable as `f64`. With `time_indices`, only those positions of
    /// the leading (time) axis are read, in the given order.
    fn read_values(
        &self,
        variable: &str,
        time_indices: Option<&[usize]>,
    ) -> Result<ArrayD<f64>, StoreError>;
}

/// Names of the horizontal coordinate variables and dimensions
pub const LAT: &str = "lat";
pub const LON: &str = "lon";
/// Vertical soil-level dimension of layered variables
pub const LEVELS: &str = "nlevs";

pub trait DatasetStore {
    fn probe(&self, path: &Path) -> Availability;

    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn Dataset + 'a>, StoreError>;
}

impl<S: DatasetStore + ?Sized> DatasetStore for &S {
    fn probe(&self, path: &Path) -> Availability {
        (**self).probe(path)
    }

    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn Dataset + 'a>, StoreError> {
        (**self).open(path)
    }
}
