//! Orchestration loop: enumerate the grid, run each point, record results.
//!
//! Points run strictly one at a time in enumeration order. A failed point
//! is recorded with the fallback sample and appended to the failure log;
//! it never stops the sweep. Only an invalid grid, an unwritable failure
//! log, or cancellation end the loop early.

use std::io::Write;

use crate::error::SweepError;
use crate::executor::{Executor, FailureReason, RunOutcome};
use crate::failure_log::{FailureLogger, FailureRecord};
use crate::grid::{ParameterGrid, ParameterTuple};
use crate::parser::{MetricSource, OutputParser};
use crate::progress::SweepProgress;
use crate::store::{PointResult, PointStatus, ResultsStore};

/// Emitted after each grid point completes
#[derive(Debug, Clone, Copy)]
pub struct PointReport<'a> {
    pub point: &'a ParameterTuple,
    pub result: &'a PointResult,
    /// Points finished so far, including this one
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Outcome of a finished sweep
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub store: ResultsStore,
    pub succeeded: usize,
    pub failed: usize,
}

impl SweepReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// No grid point produced a measurement
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.succeeded == 0
    }
}

/// A configured sweep over a grid with a given executor
pub struct Sweep<'a, E: Executor + ?Sized> {
    grid: &'a ParameterGrid,
    executor: &'a E,
    parser: OutputParser,
    source: MetricSource,
}

impl<'a, E: Executor + ?Sized> Sweep<'a, E> {
    pub fn new(grid: &'a ParameterGrid, executor: &'a E) -> Self {
        Self {
            grid,
            executor,
            parser: OutputParser::default(),
            source: MetricSource::default(),
        }
    }

    #[must_use]
    pub fn with_parser(mut self, parser: OutputParser) -> Self {
        self.parser = parser;
        self
    }

    #[must_use]
    pub fn with_metric_source(mut self, source: MetricSource) -> Self {
        self.source = source;
        self
    }

    /// Run every grid point.
    ///
    /// `on_point` is called after each point is recorded, for progress
    /// display.
    pub fn run<W, F>(
        &self,
        failures: &mut FailureLogger<W>,
        progress: &SweepProgress,
        mut on_point: F,
    ) -> Result<SweepReport, SweepError>
    where
        W: Write,
        F: FnMut(&PointReport<'_>),
    {
        if let Err(err) = self.grid.validate() {
            tracing::warn!(error = %err, "sweep not started");
            return Err(err.into());
        }

        let total = self.grid.total_points();
        progress.reset(total);
        tracing::info!(
            points = total,
            dimensions = self.grid.dimensions().len(),
            "starting sweep"
        );

        let mut store = ResultsStore::new(self.grid.dimensions().to_vec());

        for point in self.grid.points() {
            if progress.is_cancelled() {
                return Err(cancelled(progress));
            }

            tracing::info!(point = %point, "running grid point");
            let mark = self.source.mark();
            let result = match self.executor.execute(&point, progress) {
                RunOutcome::Success { raw_text } => {
                    let metrics = self.source.extract(&self.parser, &raw_text, mark);
                    tracing::info!(
                        point = %point,
                        throughput = metrics.throughput,
                        delay = metrics.delay,
                        fairness = metrics.fairness,
                        "grid point succeeded"
                    );
                    progress.record_success();
                    PointResult::succeeded(metrics)
                }
                RunOutcome::Failure {
                    reason: FailureReason::Interrupted,
                    ..
                } if progress.is_cancelled() => {
                    return Err(cancelled(progress));
                }
                RunOutcome::Failure { reason, diagnostic } => {
                    tracing::warn!(point = %point, reason = %reason, "grid point failed");
                    failures
                        .append(&FailureRecord::new(&point, reason, diagnostic))
                        .map_err(SweepError::FailureLog)?;
                    progress.record_failure();
                    PointResult::failed(reason)
                }
            };

            store.insert(&point, result);
            on_point(&PointReport {
                point: &point,
                result: &result,
                completed: progress.completed(),
                total,
                succeeded: progress.succeeded(),
                failed: progress.failed(),
            });
        }

        let report = SweepReport {
            succeeded: store.succeeded(),
            failed: store.failed(),
            store,
        };

        if report.is_total_failure() {
            tracing::error!(failed = report.failed, "no grid point succeeded");
        } else if report.failed > 0 {
            tracing::warn!(
                succeeded = report.succeeded,
                failed = report.failed,
                "sweep finished with failures"
            );
        } else {
            tracing::info!(succeeded = report.succeeded, "sweep finished");
        }

        Ok(report)
    }
}

fn cancelled(progress: &SweepProgress) -> SweepError {
    let completed = progress.completed();
    tracing::warn!(completed, "sweep cancelled");
    SweepError::Cancelled { completed }
}

impl PointReport<'_> {
    /// Failure reason, if the point failed
    #[must_use]
    pub fn failure(&self) -> Option<FailureReason> {
        match self.result.status {
            PointStatus::Succeeded => None,
            PointStatus::Failed { reason } => Some(reason),
        }
    }
}
