//! Gridded fields and area-weighted reduction.

use ndarray::{Array2, ArrayView3, Axis, Zip};

use crate::error::{QcError, QcResult};

/// A 2-D field with an optional validity array (`true` = valid)
#[derive(Debug, Clone, PartialEq)]
pub struct GridField {
    pub values: Array2<f64>,
    pub valid: Option<Array2<bool>>,
}

impl GridField {
    pub fn new(values: Array2<f64>) -> Self {
        Self { values, valid: None }
    }

    pub fn with_mask(values: Array2<f64>, valid: Array2<bool>) -> QcResult<Self> {
        if values.shape() != valid.shape() {
            return Err(QcError::ShapeMismatch {
                field: values.shape().to_vec(),
                weights: valid.shape().to_vec(),
            });
        }
        Ok(Self {
            values,
            valid: Some(valid),
        })
    }

    pub fn zeros(shape: (usize, usize)) -> Self {
        Self::new(Array2::zeros(shape))
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn is_valid(&self, idx: (usize, usize)) -> bool {
        self.valid.as_ref().map_or(true, |v| v[idx])
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            values: &self.values * factor,
            valid: self.valid.clone(),
        }
    }

    pub fn abs(&self) -> Self {
        Self {
            values: self.values.mapv(f64::abs),
            valid: self.valid.clone(),
        }
    }

    /// Elementwise sum; a cell stays valid only when valid in both operands.
    pub fn add(&self, other: &GridField) -> QcResult<Self> {
        self.combine(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &GridField) -> QcResult<Self> {
        self.combine(other, |a, b| a - b)
    }

    fn combine(&self, other: &GridField, op: impl Fn(f64, f64) -> f64) -> QcResult<Self> {
        if self.values.shape() != other.values.shape() {
            return Err(QcError::ShapeMismatch {
                field: self.values.shape().to_vec(),
                weights: other.values.shape().to_vec(),
            });
        }
        let values = Zip::from(&self.values)
            .and(&other.values)
            .map_collect(|&a, &b| op(a, b));
        let valid = match (&self.valid, &other.valid) {
            (None, None) => None,
            (Some(v), None) | (None, Some(v)) => Some(v.clone()),
            (Some(a), Some(b)) => Some(Zip::from(a).and(b).map_collect(|&x, &y| x && y)),
        };
        Ok(Self { values, valid })
    }

    /// Sum of a list of fields of identical shape
    pub fn sum<'a>(fields: impl IntoIterator<Item = &'a GridField>, shape: (usize, usize)) -> QcResult<Self> {
        fields
            .into_iter()
            .try_fold(GridField::zeros(shape), |acc, f| acc.add(f))
    }
}

/// Mean over the leading (time) axis, skipping invalid timesteps per cell.
/// A cell with no valid timestep is invalid and holds 0.
pub fn temporal_mean(values: ArrayView3<f64>, valid: ArrayView3<bool>) -> GridField {
    let (_, nlat, nlon) = values.dim();
    let mut sums = Array2::<f64>::zeros((nlat, nlon));
    let mut counts = Array2::<usize>::zeros((nlat, nlon));
    for (step, mask) in values.axis_iter(Axis(0)).zip(valid.axis_iter(Axis(0))) {
        Zip::from(&mut sums)
            .and(&mut counts)
            .and(&step)
            .and(&mask)
            .for_each(|s, c, &v, &ok| {
                if ok {
                    *s += v;
                    *c += 1;
                }
            });
    }
    let values = Zip::from(&sums)
        .and(&counts)
        .map_collect(|&s, &c| if c > 0 { s / c as f64 } else { 0.0 });
    let valid = counts.mapv(|c| c > 0);
    GridField {
        values,
        valid: Some(valid),
    }
}

/// Summary statistics of a residual field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub min: f64,
    pub max: f64,
    /// Area-weighted mean of the absolute value
    pub abs_mean: f64,
    /// Cells whose absolute value exceeds the threshold
    pub exceed_count: usize,
}

impl FieldStats {
    pub fn max_abs(&self) -> f64 {
        self.min.abs().max(self.max.abs())
    }
}

/// Reduces fields to scalars with a fixed set of per-cell area weights
#[derive(Debug, Clone)]
pub struct AreaWeightedAggregator {
    weights: Array2<f64>,
}

impl AreaWeightedAggregator {
    pub fn new(weights: Array2<f64>) -> Self {
        Self { weights }
    }

    /// Equal weight for every cell
    pub fn uniform(shape: (usize, usize)) -> Self {
        Self::new(Array2::ones(shape))
    }

    pub fn shape(&self) -> (usize, usize) {
        self.weights.dim()
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    fn check_shape(&self, field: &GridField) -> QcResult<()> {
        if field.values.shape() != self.weights.shape() {
            return Err(QcError::ShapeMismatch {
                field: field.values.shape().to_vec(),
                weights: self.weights.shape().to_vec(),
            });
        }
        Ok(())
    }

    /// Area-weighted mean over valid cells.
    ///
    /// A fully masked field falls back to the unmasked mean over the raw
    /// weights. Accumulates deviations from the first included value so a
    /// uniform field returns that value exactly.
    pub fn weighted_mean(&self, field: &GridField) -> QcResult<f64> {
        self.check_shape(field)?;

        let any_valid = field.valid.as_ref().map_or(true, |v| v.iter().any(|&ok| ok));
        let include = |idx: (usize, usize)| !any_valid || field.is_valid(idx);

        let mut reference = None;
        let mut total_weight = 0.0;
        let mut weighted_dev = 0.0;
        for (idx, &w) in self.weights.indexed_iter() {
            if !include(idx) {
                continue;
            }
            let v = field.values[idx];
            let r = *reference.get_or_insert(v);
            total_weight += w;
            weighted_dev += (v - r) * w;
        }

        if total_weight == 0.0 {
            return Err(QcError::DegenerateWeights);
        }
        Ok(reference.unwrap_or(0.0) + weighted_dev / total_weight)
    }

    /// Min, max, area-mean of |x| and threshold exceedances. Cells with zero
    /// weight are forced to 0 first.
    pub fn field_stats(&self, field: &GridField, threshold: f64) -> QcResult<FieldStats> {
        self.check_shape(field)?;

        let mut cleaned = field.clone();
        Zip::from(&mut cleaned.values)
            .and(&self.weights)
            .for_each(|v, &w| {
                if w == 0.0 {
                    *v = 0.0;
                }
            });

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut exceed_count = 0;
        for (idx, &v) in cleaned.values.indexed_iter() {
            if !cleaned.is_valid(idx) {
                continue;
            }
            min = min.min(v);
            max = max.max(v);
            if v.abs() > threshold {
                exceed_count += 1;
            }
        }
        if min > max {
            min = 0.0;
            max = 0.0;
        }

        Ok(FieldStats {
            min,
            max,
            abs_mean: self.weighted_mean(&cleaned.abs())?,
            exceed_count,
        })
    }
}
