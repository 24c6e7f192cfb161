//! Sweep configuration documents.
//!
//! A sweep is described by a YAML document naming the simulator, the
//! swept dimensions (outermost first), fixed settings, the metric source,
//! and chart options:
//!
//! ```yaml
//! name: cca-sensitivity
//! simulator:
//!   program: ./ns3
//!   args: [run]
//!   scenario: multi-bss
//!   invocation: combined
//!   timeout_secs: 600
//! dimensions:
//!   - name: apNodes
//!     values: [2, 3, 4]
//!   - name: CcaSensitivity
//!     range: { start: -82, end: -61, step: 2 }
//! fixed:
//!   - { name: phyMode, value: OfdmRate54Mbps }
//! ```

mod presets;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use presets::{PRESET_NAMES, preset};

use crate::chart::ChartOptions;
use crate::error::ConfigError;
use crate::executor::{DEFAULT_COMPLETION_MARKER, InvocationStyle};
use crate::grid::{Dimension, Parameter, ParameterGrid, ParameterValue};
use crate::parser::MetricSource;

/// How to invoke the external simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Executable path
    pub program: PathBuf,
    /// Leading arguments, before the scenario and named parameters
    #[serde(default)]
    pub args: Vec<String>,
    /// Scenario/target name placed before the named parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(default)]
    pub invocation: InvocationStyle,
    /// Directory the simulator runs in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Literal that must appear in stdout for a run to count as finished.
    /// Empty means a zero exit status is enough.
    #[serde(default = "default_completion_marker")]
    pub completion_marker: String,
    /// Per-invocation time limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_completion_marker() -> String {
    DEFAULT_COMPLETION_MARKER.to_string()
}

/// Integer range with an exclusive end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
    #[serde(default = "default_step")]
    pub step: i64,
}

/// Exponent range with an inclusive end; values are `10^k`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentRange {
    pub start: i32,
    pub end: i32,
    #[serde(default = "default_exponent_step")]
    pub step: i32,
}

fn default_step() -> i64 {
    1
}

fn default_exponent_step() -> i32 {
    1
}

/// One swept dimension as written in a config document.
///
/// Exactly one of `values`, `range` and `log10` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSpec {
    /// Simulator parameter name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<ParameterValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<IntRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log10: Option<ExponentRange>,
}

impl DimensionSpec {
    pub fn values(name: impl Into<String>, values: Vec<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            values: Some(values),
            range: None,
            log10: None,
        }
    }

    pub fn range(name: impl Into<String>, start: i64, end: i64, step: i64) -> Self {
        Self {
            name: name.into(),
            values: None,
            range: Some(IntRange { start, end, step }),
            log10: None,
        }
    }

    pub fn log10(name: impl Into<String>, start: i32, end: i32, step: i32) -> Self {
        Self {
            name: name.into(),
            values: None,
            range: None,
            log10: Some(ExponentRange { start, end, step }),
        }
    }

    /// Expand into concrete values
    pub fn resolve(&self) -> Result<Dimension, ConfigError> {
        match (&self.values, &self.range, &self.log10) {
            (Some(values), None, None) => Ok(Dimension::new(self.name.clone(), values.clone())),
            (None, Some(r), None) => Dimension::range(self.name.clone(), r.start, r.end, r.step),
            (None, None, Some(r)) => Dimension::log10(self.name.clone(), r.start, r.end, r.step),
            _ => Err(ConfigError::AmbiguousDimension(self.name.clone())),
        }
    }
}

/// Complete description of one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Experiment name, used for the results directory
    pub name: String,
    pub simulator: SimulatorConfig,
    /// Swept dimensions, outermost first
    pub dimensions: Vec<DimensionSpec>,
    /// Settings passed unchanged to every invocation
    #[serde(default)]
    pub fixed: Vec<Parameter>,
    #[serde(default)]
    pub metrics: MetricSource,
    #[serde(default)]
    pub chart: ChartOptions,
}

impl SweepConfig {
    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_saphyr::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Resolve and validate the parameter grid
    pub fn grid(&self) -> Result<ParameterGrid, ConfigError> {
        let dimensions = self
            .dimensions
            .iter()
            .map(DimensionSpec::resolve)
            .collect::<Result<Vec<_>, _>>()?;
        let grid = ParameterGrid::new(dimensions, self.fixed.clone());
        grid.validate()?;
        Ok(grid)
    }

    /// Check everything that must hold before the first invocation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulator.program.as_os_str().is_empty() {
            return Err(ConfigError::MissingProgram);
        }
        self.grid().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
name: cca-sweep
simulator:
  program: ./ns3
  args: [run]
  scenario: multi-bss
  timeout_secs: 30
dimensions:
  - name: apNodes
    values: [2, 3]
  - name: CcaSensitivity
    range: { start: -82, end: -78, step: 2 }
  - name: trafficArrivalRate
    log10: { start: -2, end: -1 }
fixed:
  - { name: phyMode, value: OfdmRate54Mbps }
  - { name: duration, value: 10 }
"#;

    #[test]
    fn test_parse_document() {
        let config = SweepConfig::from_yaml(DOCUMENT).unwrap();
        assert_eq!(config.name, "cca-sweep");
        assert_eq!(config.simulator.invocation, InvocationStyle::Combined);
        assert_eq!(config.simulator.completion_marker, "Simulation Completed");
        assert_eq!(config.simulator.timeout_secs, Some(30));
        assert_eq!(config.metrics, MetricSource::Stdout);

        let grid = config.grid().unwrap();
        assert_eq!(grid.shape(), vec![2, 2, 2]);
        assert_eq!(
            grid.fixed()[0].value,
            ParameterValue::Text("OfdmRate54Mbps".into())
        );
        assert_eq!(grid.fixed()[1].value, ParameterValue::Int(10));
    }

    #[test]
    fn test_ambiguous_dimension() {
        let mut config = SweepConfig::from_yaml(DOCUMENT).unwrap();
        config.dimensions[0].range = Some(IntRange {
            start: 0,
            end: 2,
            step: 1,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AmbiguousDimension(name)) if name == "apNodes"
        ));
    }

    #[test]
    fn test_empty_range_is_config_error() {
        let mut config = SweepConfig::from_yaml(DOCUMENT).unwrap();
        config.dimensions[1] = DimensionSpec::range("CcaSensitivity", -60, -70, 2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyDimension(_))
        ));
    }

    #[test]
    fn test_missing_program() {
        let mut config = SweepConfig::from_yaml(DOCUMENT).unwrap();
        config.simulator.program = PathBuf::new();
        assert!(matches!(config.validate(), Err(ConfigError::MissingProgram)));
    }

    #[test]
    fn test_yaml_round_trip_keeps_grid() {
        let config = SweepConfig::from_yaml(DOCUMENT).unwrap();
        let reparsed = SweepConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SweepConfig::load(Path::new("/nonexistent/sweep.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
