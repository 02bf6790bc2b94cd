//! Error Types
//!
//! Library-level errors. Only `MalformedName` and infrastructure failures stop a
//! run; everything else a check runs into is turned into a report message.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;

pub type QcResult<T> = Result<T, QcError>;

#[derive(Error, Debug)]
pub enum QcError {
    #[error("malformed file name '{name}': {reason}")]
    MalformedName { name: String, reason: String },

    #[error("invalid file descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("total area weight over valid cells is zero")]
    DegenerateWeights,

    #[error("shape mismatch: field {field:?} vs weights {weights:?}")]
    ShapeMismatch { field: Vec<usize>, weights: Vec<usize> },

    #[error("dataset store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl QcError {
    pub(crate) fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        QcError::MalformedName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
