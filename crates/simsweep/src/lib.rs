//! Command-line front end for simsweep_core
//!
//! Everything around the sweep engine that touches the terminal or the
//! filesystem: logging setup, the results directory, the stale data file
//! prompt, interrupt handling, progress display, and PNG charts.

#![warn(clippy::all)]

pub mod app;
pub mod chart;
pub mod logging;
pub mod prompt;
pub mod results_dir;
pub mod util;

pub use app::{RunOptions, RunSummary, SweepSource};
pub use logging::init_logging;
