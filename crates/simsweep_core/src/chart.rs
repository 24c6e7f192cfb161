//! Chart planning: turns a finished [`ResultsStore`] into a set of chart
//! descriptions that a [`ChartRenderer`] draws.
//!
//! The innermost dimension is the x axis. The next-innermost dimension, if
//! any, contributes one series per value. Every combination of the
//! remaining outer dimensions gets its own chart, for each metric. Failed
//! grid points are left out of the series.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ChartError;
use crate::grid::{Dimension, GridIndices, ParameterValue};
use crate::metrics::Metric;
use crate::store::ResultsStore;

/// Presentation options for a sweep's charts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartOptions {
    /// Logarithmic x axis (innermost dimension)
    #[serde(default)]
    pub log_x: bool,
    /// Display labels per dimension name; the name itself is the fallback
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub axis_labels: BTreeMap<String, String>,
}

impl ChartOptions {
    #[must_use]
    pub fn label_for<'a>(&'a self, dimension: &'a str) -> &'a str {
        self.axis_labels
            .get(dimension)
            .map_or(dimension, String::as_str)
    }
}

/// One line on a chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    /// `(x, y)` pairs in sweep order along the x dimension
    pub points: Vec<(f64, f64)>,
}

/// Everything a renderer needs to draw one chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub metric: Metric,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// File name inside the output directory, including the extension
    pub file_name: String,
    pub log_x: bool,
    pub series: Vec<ChartSeries>,
}

impl ChartSpec {
    /// Smallest and largest x across all series
    #[must_use]
    pub fn x_range(&self) -> Option<(f64, f64)> {
        bounds(self.series.iter().flat_map(|s| s.points.iter().map(|p| p.0)))
    }

    /// Smallest and largest y across all series
    #[must_use]
    pub fn y_range(&self) -> Option<(f64, f64)> {
        bounds(self.series.iter().flat_map(|s| s.points.iter().map(|p| p.1)))
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// The charts derived from one results store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartPlan {
    pub charts: Vec<ChartSpec>,
}

impl ChartPlan {
    pub fn from_store(store: &ResultsStore, options: &ChartOptions) -> Self {
        let dimensions = store.dimensions();
        let Some(x_dim) = dimensions.len().checked_sub(1) else {
            return Self::default();
        };
        let series_dim = x_dim.checked_sub(1);
        let outer_count = series_dim.unwrap_or(0);
        let outer_shape: Vec<usize> = dimensions[..outer_count]
            .iter()
            .map(Dimension::len)
            .collect();

        let x = &dimensions[x_dim];
        let mut charts = Vec::new();

        for outer in GridIndices::new(outer_shape) {
            let context: Vec<(&str, &ParameterValue)> = outer
                .iter()
                .enumerate()
                .map(|(d, &i)| (dimensions[d].name.as_str(), &dimensions[d].values[i]))
                .collect();

            for metric in Metric::ALL {
                let series: Vec<ChartSeries> = match series_dim {
                    Some(s) => dimensions[s]
                        .values
                        .iter()
                        .enumerate()
                        .map(|(i, value)| {
                            let mut fixed = outer.clone();
                            fixed.push(i);
                            fixed.push(0);
                            let name = options.label_for(&dimensions[s].name);
                            ChartSeries {
                                label: format!("{name} {value}"),
                                points: points(store, x_dim, &fixed, metric, options.log_x),
                            }
                        })
                        .filter(|s| !s.points.is_empty())
                        .collect(),
                    None => {
                        let points = points(store, x_dim, &[0], metric, options.log_x);
                        if points.is_empty() {
                            Vec::new()
                        } else {
                            vec![ChartSeries {
                                label: metric.label().to_string(),
                                points,
                            }]
                        }
                    }
                };

                if series.is_empty() {
                    tracing::debug!(metric = metric.file_stem(), ?context, "no data to chart");
                    continue;
                }

                charts.push(ChartSpec {
                    metric,
                    title: title(metric, options.label_for(&x.name), &context, options),
                    x_label: options.label_for(&x.name).to_string(),
                    y_label: metric.axis_label().to_string(),
                    file_name: file_name(metric, &x.name, &context),
                    log_x: options.log_x,
                    series,
                });
            }
        }

        Self { charts }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.charts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

/// Successful points along the x dimension. Text values are placed at their
/// index; on a log axis non-positive x values are dropped.
fn points(
    store: &ResultsStore,
    x_dim: usize,
    fixed: &[usize],
    metric: Metric,
    log_x: bool,
) -> Vec<(f64, f64)> {
    let Some(series) = store.series_along(x_dim, fixed) else {
        return Vec::new();
    };
    let values = &store.dimensions()[x_dim].values;
    series
        .into_iter()
        .filter(|(_, result)| result.is_success())
        .filter_map(|(value, result)| {
            let x = value.as_f64().or_else(|| {
                values
                    .iter()
                    .position(|v| v == value)
                    .map(|i| i as f64)
            })?;
            if log_x && x <= 0.0 {
                return None;
            }
            Some((x, result.metrics.get(metric)))
        })
        .collect()
}

fn title(
    metric: Metric,
    x_label: &str,
    context: &[(&str, &ParameterValue)],
    options: &ChartOptions,
) -> String {
    let mut title = format!("{} vs {x_label}", metric.label());
    if !context.is_empty() {
        let parts: Vec<String> = context
            .iter()
            .map(|(name, value)| format!("{} = {value}", options.label_for(name)))
            .collect();
        title.push_str(&format!(" ({})", parts.join(", ")));
    }
    title
}

fn file_name(metric: Metric, x_name: &str, context: &[(&str, &ParameterValue)]) -> String {
    let mut name = format!("{}_vs_{}", metric.file_stem(), sanitize(x_name));
    for (dim, value) in context {
        name.push('_');
        name.push_str(&sanitize(&format!("{dim}{value}")));
    }
    name.push_str(".png");
    name
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Draws planned charts to image files
pub trait ChartRenderer {
    /// Render one chart into `out_dir`, returning the written path
    fn render(&self, chart: &ChartSpec, out_dir: &Path) -> Result<PathBuf, ChartError>;
}

/// Render every chart of a plan, stopping at the first failure
pub fn render_all<R: ChartRenderer + ?Sized>(
    renderer: &R,
    plan: &ChartPlan,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, ChartError> {
    let mut written = Vec::with_capacity(plan.len());
    for chart in &plan.charts {
        let path = renderer.render(chart, out_dir)?;
        tracing::debug!(path = %path.display(), "chart written");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::FailureReason;
    use crate::grid::ParameterGrid;
    use crate::metrics::MetricSample;
    use crate::store::PointResult;
    use std::cell::RefCell;

    fn sample(throughput: f64) -> MetricSample {
        MetricSample {
            throughput,
            delay: 1.0,
            fairness: 0.9,
        }
    }

    fn filled_store(grid: &ParameterGrid) -> ResultsStore {
        let mut store = ResultsStore::new(grid.dimensions().to_vec());
        for (n, point) in grid.points().enumerate() {
            store.insert(&point, PointResult::succeeded(sample(n as f64)));
        }
        store
    }

    #[test]
    fn test_single_dimension_one_chart_per_metric() {
        let grid = ParameterGrid::new(
            vec![Dimension::range("apNodes", 2, 5, 1).unwrap()],
            vec![],
        );
        let mut options = ChartOptions::default();
        options
            .axis_labels
            .insert("apNodes".into(), "Number of BSS".into());

        let plan = ChartPlan::from_store(&filled_store(&grid), &options);
        assert_eq!(plan.len(), 3);

        let chart = &plan.charts[0];
        assert_eq!(chart.metric, Metric::Throughput);
        assert_eq!(chart.file_name, "throughput_vs_apNodes.png");
        assert_eq!(chart.x_label, "Number of BSS");
        assert_eq!(chart.y_label, "Throughput (Mbps)");
        assert_eq!(chart.series.len(), 1);
        assert_eq!(
            chart.series[0].points,
            vec![(2.0, 0.0), (3.0, 1.0), (4.0, 2.0)]
        );
    }

    #[test]
    fn test_outer_dimensions_split_charts() {
        let grid = ParameterGrid::new(
            vec![
                Dimension::new("apNodes", vec![2.into(), 3.into()]),
                Dimension::new("distanceBetweenAps", vec![5.into(), 15.into(), 30.into()]),
                Dimension::range("CcaSensitivity", -82, -78, 2).unwrap(),
            ],
            vec![],
        );
        let plan = ChartPlan::from_store(&filled_store(&grid), &ChartOptions::default());

        // two outer values x three metrics
        assert_eq!(plan.len(), 6);
        let names: Vec<&str> = plan.charts.iter().map(|c| c.file_name.as_str()).collect();
        assert!(names.contains(&"throughput_vs_CcaSensitivity_apNodes2.png"));
        assert!(names.contains(&"fairness_vs_CcaSensitivity_apNodes3.png"));

        let chart = &plan.charts[0];
        assert_eq!(chart.series.len(), 3);
        assert_eq!(chart.series[1].label, "distanceBetweenAps 15");
        // apNodes=2, distance=15 covers flat indices 2 and 3
        assert_eq!(chart.series[1].points, vec![(-82.0, 2.0), (-80.0, 3.0)]);
        assert!(chart.title.contains("apNodes = 2"));
    }

    #[test]
    fn test_failed_points_are_omitted() {
        let grid = ParameterGrid::new(
            vec![Dimension::new("rate", vec![0.001.into(), 0.01.into(), 0.1.into()])],
            vec![],
        );
        let mut store = ResultsStore::new(grid.dimensions().to_vec());
        for point in grid.points() {
            let result = if point.index[0] == 1 {
                PointResult::failed(FailureReason::ProcessError)
            } else {
                PointResult::succeeded(sample(5.0))
            };
            store.insert(&point, result);
        }

        let plan = ChartPlan::from_store(&store, &ChartOptions::default());
        assert_eq!(plan.charts[0].series[0].points, vec![(0.001, 5.0), (0.1, 5.0)]);
    }

    #[test]
    fn test_total_failure_plans_nothing() {
        let grid = ParameterGrid::new(vec![Dimension::new("x", vec![1.into()])], vec![]);
        let mut store = ResultsStore::new(grid.dimensions().to_vec());
        for point in grid.points() {
            store.insert(&point, PointResult::failed(FailureReason::Timeout));
        }
        assert!(ChartPlan::from_store(&store, &ChartOptions::default()).is_empty());
    }

    #[test]
    fn test_log_axis_drops_non_positive_x() {
        let grid = ParameterGrid::new(
            vec![Dimension::new("x", vec![0.into(), 10.into(), 100.into()])],
            vec![],
        );
        let options = ChartOptions {
            log_x: true,
            ..ChartOptions::default()
        };
        let plan = ChartPlan::from_store(&filled_store(&grid), &options);
        let chart = &plan.charts[0];
        assert!(chart.log_x);
        assert_eq!(chart.series[0].points.len(), 2);
        assert_eq!(chart.x_range(), Some((10.0, 100.0)));
    }

    struct Recorder(RefCell<Vec<String>>);

    impl ChartRenderer for Recorder {
        fn render(&self, chart: &ChartSpec, out_dir: &Path) -> Result<PathBuf, ChartError> {
            self.0.borrow_mut().push(chart.file_name.clone());
            Ok(out_dir.join(&chart.file_name))
        }
    }

    #[test]
    fn test_render_all_visits_every_chart() {
        let grid = ParameterGrid::new(vec![Dimension::range("x", 0, 3, 1).unwrap()], vec![]);
        let plan = ChartPlan::from_store(&filled_store(&grid), &ChartOptions::default());
        let recorder = Recorder(RefCell::new(Vec::new()));

        let paths = render_all(&recorder, &plan, Path::new("out")).unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0], Path::new("out/throughput_vs_x.png"));
        assert_eq!(recorder.0.borrow().len(), 3);
    }
}
