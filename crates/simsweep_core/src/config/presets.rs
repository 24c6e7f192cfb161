//! Built-in sweeps for the multi-BSS Wi-Fi scenarios.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::chart::ChartOptions;
use crate::executor::InvocationStyle;
use crate::grid::{Parameter, ParameterValue};
use crate::parser::MetricSource;

use super::{DimensionSpec, SimulatorConfig, SweepConfig, default_completion_marker};

pub const PRESET_NAMES: [&str; 3] = ["bss-count", "cca-sensitivity", "traffic-rate"];

const STAS_PER_BSS: i64 = 10;
const SIMULATION_TIME_SECS: i64 = 10;
const PHY_MODE: &str = "OfdmRate54Mbps";

/// Look up a built-in sweep by name
#[must_use]
pub fn preset(name: &str) -> Option<SweepConfig> {
    match name {
        "bss-count" => Some(bss_count()),
        "cca-sensitivity" => Some(cca_sensitivity()),
        "traffic-rate" => Some(traffic_rate()),
        _ => None,
    }
}

fn ns3(scenario: &str) -> SimulatorConfig {
    SimulatorConfig {
        program: PathBuf::from("./ns3"),
        args: vec!["run".to_string()],
        scenario: Some(scenario.to_string()),
        invocation: InvocationStyle::Combined,
        working_dir: None,
        completion_marker: default_completion_marker(),
        timeout_secs: None,
    }
}

fn common_settings() -> Vec<Parameter> {
    vec![
        Parameter::new("networkSize", STAS_PER_BSS),
        Parameter::new("duration", SIMULATION_TIME_SECS),
        Parameter::new("phyMode", PHY_MODE),
    ]
}

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Number of BSS from 2 to 4
fn bss_count() -> SweepConfig {
    SweepConfig {
        name: "bss-count".to_string(),
        simulator: ns3("multi-bss"),
        dimensions: vec![DimensionSpec::range("apNodes", 2, 5, 1)],
        fixed: common_settings(),
        metrics: MetricSource::Stdout,
        chart: ChartOptions {
            log_x: false,
            axis_labels: labels(&[("apNodes", "Number of BSS")]),
        },
    }
}

/// BSS count x AP distance x CCA sensitivity (-82 to -62 dBm)
fn cca_sensitivity() -> SweepConfig {
    SweepConfig {
        name: "cca-sensitivity".to_string(),
        simulator: ns3("multi-bss"),
        dimensions: vec![
            DimensionSpec::values("apNodes", ints(&[2, 3, 4])),
            DimensionSpec::values("distanceBetweenAps", ints(&[5, 15, 30])),
            DimensionSpec::range("CcaSensitivity", -82, -61, 2),
        ],
        fixed: common_settings(),
        metrics: MetricSource::Stdout,
        chart: ChartOptions {
            log_x: false,
            axis_labels: labels(&[
                ("apNodes", "BSS"),
                ("distanceBetweenAps", "Distance (m)"),
                ("CcaSensitivity", "CCA Sensitivity (dBm)"),
            ]),
        },
    }
}

/// BSS count x traffic arrival rate, throughput read from `multi-bss.dat`.
/// This scenario prints no completion marker, so a zero exit counts as done.
fn traffic_rate() -> SweepConfig {
    SweepConfig {
        name: "traffic-rate".to_string(),
        simulator: SimulatorConfig {
            completion_marker: String::new(),
            ..ns3("multi-bss-throughput-updated")
        },
        dimensions: vec![
            DimensionSpec::range("numBSS", 2, 6, 1),
            DimensionSpec::log10("trafficArrivalRate", -4, -1, 1),
        ],
        fixed: vec![
            Parameter::new("rngRun", 1),
            Parameter::new("ccaPdThreshold", -75),
        ],
        metrics: MetricSource::DataFile {
            path: PathBuf::from("multi-bss.dat"),
            column: 1,
        },
        chart: ChartOptions {
            log_x: true,
            axis_labels: labels(&[
                ("numBSS", "BSSs"),
                ("trafficArrivalRate", "Traffic Arrival Rate (λ)"),
            ]),
        },
    }
}

fn ints(values: &[i64]) -> Vec<ParameterValue> {
    values.iter().copied().map(ParameterValue::Int).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_is_valid() {
        for name in PRESET_NAMES {
            let config = preset(name).unwrap();
            assert_eq!(config.name, name);
            config.validate().unwrap();
        }
        assert!(preset("unknown").is_none());
    }

    #[test]
    fn test_preset_grid_sizes() {
        assert_eq!(preset("bss-count").unwrap().grid().unwrap().total_points(), 3);
        assert_eq!(
            preset("cca-sensitivity").unwrap().grid().unwrap().total_points(),
            3 * 3 * 11
        );
        assert_eq!(preset("traffic-rate").unwrap().grid().unwrap().total_points(), 4 * 4);
    }

    #[test]
    fn test_marker_only_for_stdout_presets() {
        for name in PRESET_NAMES {
            let config = preset(name).unwrap();
            let stdout = config.metrics == MetricSource::Stdout;
            assert_eq!(config.simulator.completion_marker.is_empty(), !stdout, "{name}");
        }
    }
}
