//! # bl-compare
//!
//! Runs one Bayesian optimization two ways, by external evaluation through
//! `get_next_points` and through the built-in `run_optimization` driver,
//! then plots both sample sets over the true objective.

pub mod comparison;
pub mod config;
pub mod report;

pub use comparison::{run_comparison, Comparison, Curve, SampleSet};
pub use config::{CompareConfig, ObjectiveName};
pub use report::{write_report, ReportPaths};
