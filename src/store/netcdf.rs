//! netCDF-backed dataset store (requires the `netcdf` feature).

use ndarray::{ArrayD, IxDyn};
use netcdf::{AttributeValue, Extent};
use std::path::Path;
use tracing::debug;

use super::{AttrValue, Availability, Dataset, DatasetStore, StoreError};

/// Opens files read-only from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct NetcdfStore;

impl NetcdfStore {
    pub fn new() -> Self {
        Self
    }
}

impl DatasetStore for NetcdfStore {
    fn probe(&self, path: &Path) -> Availability {
        if !path.exists() {
            return Availability::Absent;
        }
        match netcdf::open(path) {
            Ok(_) => Availability::Present,
            Err(e) => Availability::Unreadable(e.to_string()),
        }
    }

    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn Dataset + 'a>, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        let file = netcdf::open(path).map_err(|e| StoreError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Opened {}", path.display());
        Ok(Box::new(NetcdfDataset { file }))
    }
}

struct NetcdfDataset {
    file: netcdf::File,
}

fn convert(value: AttributeValue) -> Option<AttrValue> {
    Some(match value {
        AttributeValue::Str(s) => AttrValue::Text(s),
        AttributeValue::Strs(v) => AttrValue::Text(v.join(" ")),
        AttributeValue::Double(v) => AttrValue::Number(v),
        AttributeValue::Float(v) => AttrValue::Number(v as f64),
        AttributeValue::Int(v) => AttrValue::Number(v as f64),
        AttributeValue::Short(v) => AttrValue::Number(v as f64),
        AttributeValue::Schar(v) => AttrValue::Number(v as f64),
        AttributeValue::Uchar(v) => AttrValue::Number(v as f64),
        AttributeValue::Longlong(v) => AttrValue::Number(v as f64),
        AttributeValue::Doubles(v) => AttrValue::Numbers(v),
        AttributeValue::Floats(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        AttributeValue::Ints(v) => AttrValue::Numbers(v.into_iter().map(f64::from).collect()),
        _ => return None,
    })
}

impl Dataset for NetcdfDataset {
    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.file.dimension(name).map(|d| d.len())
    }

    fn variable_status(&self, name: &str) -> Availability {
        match self.file.variable(name) {
            None => Availability::Absent,
            Some(_) => Availability::Present,
        }
    }

    fn variable_dims(&self, name: &str) -> Option<Vec<String>> {
        self.file
            .variable(name)
            .map(|v| v.dimensions().iter().map(|d| d.name()).collect())
    }

    fn attribute(&self, variable: &str, name: &str) -> Option<AttrValue> {
        let var = self.file.variable(variable)?;
        let attr = var.attribute(name)?;
        convert(attr.value().ok()?)
    }

    fn read_values(
        &self,
        variable: &str,
        time_indices: Option<&[usize]>,
    ) -> Result<ArrayD<f64>, StoreError> {
        let var = self
            .file
            .variable(variable)
            .ok_or_else(|| StoreError::MissingVariable(variable.to_string()))?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let read_err = |e: netcdf::Error| StoreError::Read {
            variable: variable.to_string(),
            reason: e.to_string(),
        };

        let Some(indices) = time_indices else {
            let values: Vec<f64> = var.get_values::<f64, _>(..).map_err(read_err)?;
            return ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| StoreError::Read {
                variable: variable.to_string(),
                reason: e.to_string(),
            });
        };

        let len = shape.first().copied().unwrap_or(0);
        let mut values = Vec::new();
        for &index in indices {
            if index >= len {
                return Err(StoreError::IndexOutOfRange {
                    variable: variable.to_string(),
                    index,
                    len,
                });
            }
            let mut extents = vec![Extent::Index(index)];
            extents.extend(shape[1..].iter().map(|&n| Extent::from(0..n)));
            values.extend(var.get_values::<f64, _>(extents.as_slice()).map_err(read_err)?);
        }
        let mut out_shape = shape;
        if let Some(first) = out_shape.first_mut() {
            *first = indices.len();
        }
        ArrayD::from_shape_vec(IxDyn(&out_shape), values).map_err(|e| StoreError::Read {
            variable: variable.to_string(),
            reason: e.to_string(),
        })
    }
}
