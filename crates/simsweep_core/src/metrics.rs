//! Performance metrics reported by the simulator.

use serde::{Deserialize, Serialize};

/// Value substituted for a metric that was never reported, could not be
/// parsed, or belongs to a failed run
pub const FALLBACK_VALUE: f64 = 0.0;

/// The metrics extracted from each run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Throughput,
    Delay,
    Fairness,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Throughput, Metric::Delay, Metric::Fairness];

    /// Label the simulator prints in front of the value
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Throughput => "Throughput",
            Metric::Delay => "Delay",
            Metric::Fairness => "Fairness",
        }
    }

    /// Axis label including the unit
    #[must_use]
    pub fn axis_label(&self) -> &'static str {
        match self {
            Metric::Throughput => "Throughput (Mbps)",
            Metric::Delay => "Delay (ms)",
            Metric::Fairness => "Fairness Index",
        }
    }

    /// Stem used in chart file names
    #[must_use]
    pub fn file_stem(&self) -> &'static str {
        match self {
            Metric::Throughput => "throughput",
            Metric::Delay => "delay",
            Metric::Fairness => "fairness",
        }
    }
}

/// Metric values of one grid point, with unreported fields resolved to
/// [`FALLBACK_VALUE`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricSample {
    pub throughput: f64,
    pub delay: f64,
    pub fairness: f64,
}

impl MetricSample {
    /// The sample recorded for a failed grid point
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            throughput: FALLBACK_VALUE,
            delay: FALLBACK_VALUE,
            fairness: FALLBACK_VALUE,
        }
    }

    #[must_use]
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Throughput => self.throughput,
            Metric::Delay => self.delay,
            Metric::Fairness => self.fairness,
        }
    }
}

/// Metric readings collected while scanning output; every field stays
/// `None` until a value is parsed for it
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartialSample {
    pub throughput: Option<f64>,
    pub delay: Option<f64>,
    pub fairness: Option<f64>,
}

impl PartialSample {
    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Throughput => self.throughput = Some(value),
            Metric::Delay => self.delay = Some(value),
            Metric::Fairness => self.fairness = Some(value),
        }
    }

    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Throughput => self.throughput,
            Metric::Delay => self.delay,
            Metric::Fairness => self.fairness,
        }
    }

    /// Resolve missing fields to the fallback value
    #[must_use]
    pub fn resolve(self) -> MetricSample {
        MetricSample {
            throughput: self.throughput.unwrap_or(FALLBACK_VALUE),
            delay: self.delay.unwrap_or(FALLBACK_VALUE),
            fairness: self.fairness.unwrap_or(FALLBACK_VALUE),
        }
    }
}
