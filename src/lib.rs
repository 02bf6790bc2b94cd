//! e2o Quality Control
//!
//! Checks gridded output of the eartH2Observe water resources reanalysis:
//! - Canonical file naming and layout
//! - Dimension, attribute, coordinate and time-axis conformance
//! - Water and energy balance closure on area-weighted means
//! - Categorised plain-text reports

pub mod balance;
pub mod checks;
pub mod config;
pub mod error;
pub mod grid;
pub mod loader;
pub mod logging;
pub mod naming;
pub mod report;
pub mod store;
pub mod sweep;
pub mod time;

// Re-exports for convenience
pub use config::ValidationConfig;
pub use error::{QcError, QcResult};
pub use grid::{AreaWeightedAggregator, GridField};
pub use loader::{LoadError, TimeWindow, VariableLoader};
pub use naming::FileDescriptor;
pub use report::{Category, DiagnosticReport};
pub use sweep::{Sweep, SweepOutcome};
