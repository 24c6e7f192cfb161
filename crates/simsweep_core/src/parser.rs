//! Extraction of metrics from unstructured simulator output.
//!
//! A metric line has the shape `<label> <sep> <number> [unit]`, where the
//! label may appear anywhere on the line and `<sep>` is `:` or `=`. Lines
//! are scanned top to bottom and a later reading of a metric replaces an
//! earlier one, since simulators print interim and final values under the
//! same label. A malformed number is logged and skipped; it never aborts
//! the scan of the remaining lines.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::metrics::{Metric, MetricSample, PartialSample};

/// Why a labelled value could not be read
#[derive(Debug, Clone, PartialEq)]
enum TokenError {
    Missing,
    Malformed(String),
}

/// Scans line-oriented text for metric labels
#[derive(Debug, Clone)]
pub struct OutputParser {
    labels: Vec<(Metric, String)>,
}

impl Default for OutputParser {
    fn default() -> Self {
        Self {
            labels: Metric::ALL
                .iter()
                .map(|m| (*m, m.label().to_string()))
                .collect(),
        }
    }
}

impl OutputParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the label recognized for a metric
    #[must_use]
    pub fn with_label(mut self, metric: Metric, label: impl Into<String>) -> Self {
        let label = label.into();
        for (m, l) in &mut self.labels {
            if *m == metric {
                *l = label.clone();
            }
        }
        self
    }

    /// Collect readings from `text`, leaving unreported metrics unset
    #[must_use]
    pub fn scan(&self, text: &str) -> PartialSample {
        let mut sample = PartialSample::default();
        for (line_no, line) in text.lines().enumerate() {
            for (metric, label) in &self.labels {
                match read_labelled_value(line, label) {
                    Some(Ok(value)) => sample.set(*metric, value),
                    Some(Err(TokenError::Missing)) => {
                        tracing::warn!(
                            metric = metric.label(),
                            line = line_no + 1,
                            "metric label without a value"
                        );
                    }
                    Some(Err(TokenError::Malformed(token))) => {
                        tracing::warn!(
                            metric = metric.label(),
                            line = line_no + 1,
                            token = %token,
                            "malformed metric value"
                        );
                    }
                    None => {}
                }
            }
        }
        sample
    }

    /// Parse `text` into a sample; unreported metrics take the fallback value
    #[must_use]
    pub fn parse(&self, text: &str) -> MetricSample {
        let partial = self.scan(text);
        for metric in Metric::ALL {
            if partial.get(metric).is_none() {
                tracing::debug!(metric = metric.label(), "metric not reported, using fallback");
            }
        }
        partial.resolve()
    }
}

/// `None` when the line carries no `label <sep>` pair. With the label
/// repeated on a line, the last occurrence followed by a separator counts.
fn read_labelled_value(line: &str, label: &str) -> Option<Result<f64, TokenError>> {
    let rest = line
        .match_indices(label)
        .filter_map(|(start, _)| {
            let rest = line[start + label.len()..].trim_start();
            rest.strip_prefix(':').or_else(|| rest.strip_prefix('='))
        })
        .last()?
        .trim_start();

    let token = rest
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .next()
        .unwrap_or("");
    if token.is_empty() {
        return Some(Err(TokenError::Missing));
    }
    Some(parse_number(token))
}

fn parse_number(token: &str) -> Result<f64, TokenError> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(TokenError::Malformed(token.to_string())),
    }
}

/// Where metric values for a successful run are read from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    /// Metric lines on the simulator's standard output
    #[default]
    Stdout,
    /// Last CSV row of a file the simulator appends to; `column` holds
    /// the throughput
    DataFile { path: PathBuf, column: usize },
}

/// Rows present in a data file before a run started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataMark {
    rows: usize,
}

impl MetricSource {
    /// Note how far the data file has been written, ahead of an invocation
    #[must_use]
    pub fn mark(&self) -> DataMark {
        match self {
            MetricSource::Stdout => DataMark::default(),
            MetricSource::DataFile { path, .. } => DataMark {
                rows: fs::read_to_string(path)
                    .map(|contents| count_rows(&contents))
                    .unwrap_or(0),
            },
        }
    }

    /// Extract the sample for a successful run. A data file only yields a
    /// reading when the run appended a row past `mark`.
    #[must_use]
    pub fn extract(&self, parser: &OutputParser, raw_text: &str, mark: DataMark) -> MetricSample {
        match self {
            MetricSource::Stdout => parser.parse(raw_text),
            MetricSource::DataFile { path, column } => match fs::read_to_string(path) {
                Ok(contents) if count_rows(&contents) > mark.rows => {
                    parse_data_row(&contents, *column)
                }
                Ok(_) => {
                    tracing::warn!(
                        path = %path.display(),
                        rows = mark.rows,
                        "simulator appended no row to its data file, using fallback"
                    );
                    MetricSample::fallback()
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "could not read simulator data file, using fallback"
                    );
                    MetricSample::fallback()
                }
            },
        }
    }
}

fn count_rows(contents: &str) -> usize {
    contents.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Throughput from the last non-empty `x,throughput,...` row of a data file
#[must_use]
pub fn parse_data_row(contents: &str, column: usize) -> MetricSample {
    let mut partial = PartialSample::default();
    let last_row = contents.lines().rev().find(|line| !line.trim().is_empty());

    match last_row.map(|row| row.split(',').map(str::trim).collect::<Vec<_>>()) {
        Some(fields) => match fields.get(column) {
            Some(token) => match parse_number(token) {
                Ok(v) => partial.set(Metric::Throughput, v),
                Err(_) => {
                    tracing::warn!(column, token = %token, "malformed value in data file");
                }
            },
            None => {
                tracing::warn!(column, fields = fields.len(), "data file row is too short");
            }
        },
        None => tracing::warn!("simulator data file is empty"),
    }

    partial.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_metric_others_fall_back() {
        let sample = OutputParser::new().parse("Throughput: 12.3 Mbps\n");
        assert_eq!(sample.throughput, 12.3);
        assert_eq!(sample.delay, 0.0);
        assert_eq!(sample.fairness, 0.0);
    }

    #[test]
    fn test_all_metrics() {
        let text = "starting\nThroughput: 41.5 Mbps\nDelay: 2.25 ms\nFairness: 0.97\nSimulation Completed\n";
        let sample = OutputParser::new().parse(text);
        assert_eq!(
            sample,
            MetricSample {
                throughput: 41.5,
                delay: 2.25,
                fairness: 0.97
            }
        );
    }

    #[test]
    fn test_later_reading_wins() {
        let text = "Throughput: 5 Mbps\nDelay: 1 ms\nThroughput: 7.5 Mbps\n";
        let sample = OutputParser::new().parse(text);
        assert_eq!(sample.throughput, 7.5);
        assert_eq!(sample.delay, 1.0);
    }

    #[test]
    fn test_label_anywhere_on_line() {
        let text = "BSS 1: Throughput = 3.2 Mbps, Success Probability = 1\n";
        let sample = OutputParser::new().parse(text);
        assert_eq!(sample.throughput, 3.2);
    }

    #[test]
    fn test_malformed_value_only_fails_that_field() {
        let text = "Throughput: fast Mbps\nDelay: 4 ms\nFairness: 0.5\n";
        let sample = OutputParser::new().parse(text);
        assert_eq!(sample.throughput, 0.0);
        assert_eq!(sample.delay, 4.0);
        assert_eq!(sample.fairness, 0.5);
    }

    #[test]
    fn test_malformed_later_reading_keeps_earlier_value() {
        let text = "Throughput: 9 Mbps\nThroughput: n/a\n";
        let partial = OutputParser::new().scan(text);
        assert_eq!(partial.throughput, Some(9.0));
    }

    #[test]
    fn test_label_without_separator_is_ignored() {
        let text = "Throughput measurement starting\nThroughput: 1.5 Mbps\n";
        let partial = OutputParser::new().scan(text);
        assert_eq!(partial.throughput, Some(1.5));
        assert_eq!(partial.delay, None);
    }

    #[test]
    fn test_repeated_label_uses_the_one_with_a_value() {
        let partial = OutputParser::new().scan("Throughput (aggregate) Throughput: 7.5 Mbps\n");
        assert_eq!(partial.throughput, Some(7.5));
    }

    #[test]
    fn test_non_finite_is_malformed() {
        let partial = OutputParser::new().scan("Delay: NaN ms\nFairness: inf\n");
        assert_eq!(partial.delay, None);
        assert_eq!(partial.fairness, None);
    }

    #[test]
    fn test_multiple_labels_on_one_line() {
        let partial = OutputParser::new().scan("Throughput: 2 Mbps; Delay: 3 ms\n");
        assert_eq!(partial.throughput, Some(2.0));
        assert_eq!(partial.delay, Some(3.0));
    }

    #[test]
    fn test_custom_label() {
        let parser = OutputParser::new().with_label(Metric::Fairness, "Jain index");
        let sample = parser.parse("Jain index: 0.8\nFairness: 0.1\n");
        assert_eq!(sample.fairness, 0.8);
    }

    #[test]
    fn test_data_row_last_line() {
        let contents = "0.0001,12.5\n0.001,20.25\n\n";
        assert_eq!(parse_data_row(contents, 1).throughput, 20.25);
    }

    #[test]
    fn test_data_file_needs_a_new_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi-bss.dat");
        fs::write(&path, "0.001,42\n").unwrap();
        let source = MetricSource::DataFile {
            path: path.clone(),
            column: 1,
        };
        let parser = OutputParser::new();

        let mark = source.mark();
        assert_eq!(source.extract(&parser, "", mark).throughput, 0.0);

        fs::write(&path, "0.001,42\n0.01,55\n").unwrap();
        assert_eq!(source.extract(&parser, "", mark).throughput, 55.0);
    }

    #[test]
    fn test_data_row_short_or_malformed() {
        assert_eq!(parse_data_row("0.1\n", 1).throughput, 0.0);
        assert_eq!(parse_data_row("0.1,abc\n", 1).throughput, 0.0);
        assert_eq!(parse_data_row("", 1).throughput, 0.0);
    }
}
