//! Parameter sweep engine for black-box simulators
//!
//! This crate enumerates a grid of simulator parameters, runs one simulator
//! invocation per grid point, extracts metrics from the run's text output,
//! and accumulates the results in a keyed store. It supports:
//! - Row-major grid enumeration over named dimensions (outermost first)
//! - Process execution with completion-marker checks, timeouts and cancellation
//! - Label-based metric parsing with last-match-wins semantics
//! - Per-point failure isolation with an append-only JSONL failure log
//! - Chart planning from the finished results store
//!
//! # Example
//!
//! ```ignore
//! use simsweep_core::{FailureLogger, ProcessExecutor, Sweep, SweepConfig, SweepProgress};
//!
//! let config = SweepConfig::load(Path::new("sweep.yaml"))?;
//! let grid = config.grid()?;
//! let executor = ProcessExecutor::from_config(&config.simulator);
//! let mut failures = FailureLogger::create(Path::new("failures.jsonl"))?;
//!
//! let report = Sweep::new(&grid, &executor)
//!     .with_metric_source(config.metrics.clone())
//!     .run(&mut failures, &SweepProgress::default(), |_| {})?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod chart;
pub mod error;
pub mod executor;
pub mod failure_log;
pub mod grid;
pub mod metrics;
pub mod parser;
pub mod progress;
pub mod store;
pub mod sweep;

// ============================================================================
// Configuration
// ============================================================================

pub mod config;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use chart::{ChartOptions, ChartPlan, ChartRenderer, ChartSeries, ChartSpec};
pub use config::{SimulatorConfig, SweepConfig};
pub use error::{ChartError, ConfigError, SweepError};
pub use executor::{Executor, FailureReason, InvocationStyle, ProcessExecutor, RunOutcome};
pub use failure_log::{FailureLogger, FailureRecord};
pub use grid::{Dimension, Parameter, ParameterGrid, ParameterTuple, ParameterValue};
pub use metrics::{Metric, MetricSample};
pub use parser::{DataMark, MetricSource, OutputParser};
pub use progress::SweepProgress;
pub use store::{PointResult, PointStatus, ResultsStore, StoreSnapshot};
pub use sweep::{PointReport, Sweep, SweepReport};
