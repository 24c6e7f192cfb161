//! Cross-component tests for the sweep engine
//!
//! Tests are organized by topic:
//! - `end_to_end` - Full sweeps through a mock simulator
//! - `failure_policy` - Store invariant, failure log, total failure, cancellation
//! - `data_file` - Metrics read from a simulator-written data file


use crate::executor::{FailureReason, RunOutcome};
use crate::grid::{Dimension, ParameterGrid, ParameterValue};

/// Output of a mock simulator that finished and reported throughput
pub(crate) fn completed_run(throughput: f64) -> RunOutcome {
    RunOutcome::Success {
        raw_text: format!("Throughput: {throughput} Mbps\nSimulation Completed\n"),
    }
}

pub(crate) fn crashed_run() -> RunOutcome {
    RunOutcome::Failure {
        reason: FailureReason::ProcessError,
        diagnostic: "assert failed in WifiPhy\n".to_string(),
    }
}

/// networkCount in {2, 3} x threshold in {-80, -78}
pub(crate) fn network_grid() -> ParameterGrid {
    ParameterGrid::new(
        vec![
            Dimension::new("networkCount", vec![2.into(), 3.into()]),
            Dimension::new("threshold", vec![(-80).into(), (-78).into()]),
        ],
        vec![],
    )
}

pub(crate) fn int(v: i64) -> ParameterValue {
    ParameterValue::Int(v)
}
