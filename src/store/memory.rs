//! In-memory dataset store.
//!
//! Holds datasets keyed by path. Used to assemble fixtures and to run the
//! checks without touching the filesystem.

use ndarray::{Array1, ArrayD, Axis};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::{AttrValue, Availability, Dataset, DatasetStore, StoreError, LAT, LON};
use crate::time::TIME;

#[derive(Debug, Clone)]
struct MemoryVariable {
    dims: Vec<String>,
    data: ArrayD<f64>,
    attrs: BTreeMap<String, AttrValue>,
    unreadable: Option<String>,
}

/// A dataset assembled in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    dims: BTreeMap<String, usize>,
    variables: BTreeMap<String, MemoryVariable>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(mut self, name: &str, len: usize) -> Self {
        self.dims.insert(name.to_string(), len);
        self
    }

    /// Add a variable; dimensions not declared yet are declared from the data shape.
    pub fn with_variable(mut self, name: &str, dims: &[&str], data: ArrayD<f64>) -> Self {
        for (dim, len) in dims.iter().zip(data.shape()) {
            self.dims.entry(dim.to_string()).or_insert(*len);
        }
        self.variables.insert(
            name.to_string(),
            MemoryVariable {
                dims: dims.iter().map(|d| d.to_string()).collect(),
                data,
                attrs: BTreeMap::new(),
                unreadable: None,
            },
        );
        self
    }

    /// Attach an attribute to an existing variable (ignored otherwise)
    pub fn with_attribute(mut self, variable: &str, name: &str, value: AttrValue) -> Self {
        if let Some(var) = self.variables.get_mut(variable) {
            var.attrs.insert(name.to_string(), value);
        }
        self
    }

    pub fn with_text_attribute(self, variable: &str, name: &str, value: &str) -> Self {
        self.with_attribute(variable, name, AttrValue::Text(value.to_string()))
    }

    /// Mark an existing variable as present but unreadable
    pub fn with_unreadable(mut self, variable: &str, reason: &str) -> Self {
        if let Some(var) = self.variables.get_mut(variable) {
            var.unreadable = Some(reason.to_string());
        }
        self
    }

    pub fn without_variable(mut self, variable: &str) -> Self {
        self.variables.remove(variable);
        self
    }

    pub fn without_attribute(mut self, variable: &str, name: &str) -> Self {
        if let Some(var) = self.variables.get_mut(variable) {
            var.attrs.remove(name);
        }
        self
    }

    /// `lat`/`lon` dimensions and fully attributed coordinate variables
    pub fn with_grid(self, lats: &[f64], lons: &[f64]) -> Self {
        self.with_variable(LAT, &[LAT], Array1::from(lats.to_vec()).into_dyn())
            .with_text_attribute(LAT, "long_name", "latitude")
            .with_text_attribute(LAT, "units", "degrees_north")
            .with_variable(LON, &[LON], Array1::from(lons.to_vec()).into_dyn())
            .with_text_attribute(LON, "long_name", "longitude")
            .with_text_attribute(LON, "units", "degrees_east")
    }

    /// `time` dimension and coordinate variable
    pub fn with_time(self, offsets: &[f64], units: &str, calendar: Option<&str>) -> Self {
        let data = Array1::from(offsets.to_vec()).into_dyn();
        let ds = self
            .with_variable(TIME, &[TIME], data)
            .with_text_attribute(TIME, "long_name", "time")
            .with_text_attribute(TIME, "units", units);
        match calendar {
            Some(cal) => ds.with_text_attribute(TIME, "calendar", cal),
            None => ds,
        }
    }
}

impl Dataset for MemoryDataset {
    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.dims.get(name).copied()
    }

    fn variable_status(&self, name: &str) -> Availability {
        match self.variables.get(name) {
            None => Availability::Absent,
            Some(var) => match &var.unreadable {
                Some(reason) => Availability::Unreadable(reason.clone()),
                None => Availability::Present,
            },
        }
    }

    fn variable_dims(&self, name: &str) -> Option<Vec<String>> {
        self.variables.get(name).map(|v| v.dims.clone())
    }

    fn attribute(&self, variable: &str, name: &str) -> Option<AttrValue> {
        self.variables.get(variable)?.attrs.get(name).cloned()
    }

    fn read_values(
        &self,
        variable: &str,
        time_indices: Option<&[usize]>,
    ) -> Result<ArrayD<f64>, StoreError> {
        let var = self
            .variables
            .get(variable)
            .ok_or_else(|| StoreError::MissingVariable(variable.to_string()))?;
        if let Some(reason) = &var.unreadable {
            return Err(StoreError::Read {
                variable: variable.to_string(),
                reason: reason.clone(),
            });
        }

        let Some(indices) = time_indices else {
            return Ok(var.data.clone());
        };
        if var.dims.first().map(String::as_str) != Some(TIME) {
            return Err(StoreError::Read {
                variable: variable.to_string(),
                reason: "variable has no leading time axis".to_string(),
            });
        }
        let len = var.data.shape()[0];
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(StoreError::IndexOutOfRange {
                variable: variable.to_string(),
                index,
                len,
            });
        }
        Ok(var.data.select(Axis(0), indices))
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Readable(MemoryDataset),
    Corrupt(String),
}

/// Path-keyed collection of in-memory datasets
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<PathBuf, Entry>,
    open_handles: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, dataset: MemoryDataset) {
        self.entries.insert(path.into(), Entry::Readable(dataset));
    }

    /// Register a path that exists but cannot be opened
    pub fn insert_corrupt(&mut self, path: impl Into<PathBuf>, reason: &str) {
        self.entries.insert(path.into(), Entry::Corrupt(reason.to_string()));
    }

    /// Handles opened and not yet dropped
    pub fn open_handles(&self) -> usize {
        self.open_handles.get()
    }
}

struct MemoryHandle<'a> {
    dataset: &'a MemoryDataset,
    counter: &'a Cell<usize>,
}

impl Drop for MemoryHandle<'_> {
    fn drop(&mut self) {
        self.counter.set(self.counter.get().saturating_sub(1));
    }
}

impl Dataset for MemoryHandle<'_> {
    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.dataset.dimension_len(name)
    }

    fn variable_status(&self, name: &str) -> Availability {
        self.dataset.variable_status(name)
    }

    fn variable_dims(&self, name: &str) -> Option<Vec<String>> {
        self.dataset.variable_dims(name)
    }

    fn attribute(&self, variable: &str, name: &str) -> Option<AttrValue> {
        self.dataset.attribute(variable, name)
    }

    fn read_values(
        &self,
        variable: &str,
        time_indices: Option<&[usize]>,
    ) -> Result<ArrayD<f64>, StoreError> {
        self.dataset.read_values(variable, time_indices)
    }
}

impl DatasetStore for MemoryStore {
    fn probe(&self, path: &Path) -> Availability {
        match self.entries.get(path) {
            None => Availability::Absent,
            Some(Entry::Readable(_)) => Availability::Present,
            Some(Entry::Corrupt(reason)) => Availability::Unreadable(reason.clone()),
        }
    }

    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn Dataset + 'a>, StoreError> {
        match self.entries.get(path) {
            None => Err(StoreError::NotFound(path.to_path_buf())),
            Some(Entry::Corrupt(reason)) => Err(StoreError::Open {
                path: path.to_path_buf(),
                reason: reason.clone(),
            }),
            Some(Entry::Readable(dataset)) => {
                self.open_handles.set(self.open_handles.get() + 1);
                Ok(Box::new(MemoryHandle {
                    dataset,
                    counter: &self.open_handles,
                }))
            }
        }
    }
}
