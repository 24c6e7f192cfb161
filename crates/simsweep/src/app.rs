//! Command implementations: run a sweep, print its plan, list presets.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use color_eyre::eyre::{WrapErr, bail, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use jiff::Zoned;
use simsweep_core::chart::{ChartPlan, render_all};
use simsweep_core::config::{PRESET_NAMES, SimulatorConfig, SweepConfig, preset};
use simsweep_core::error::{ConfigError, SweepError};
use simsweep_core::executor::ProcessExecutor;
use simsweep_core::failure_log::FailureLogger;
use simsweep_core::parser::MetricSource;
use simsweep_core::progress::SweepProgress;
use simsweep_core::sweep::{PointReport, Sweep};

use crate::chart::PlottersRenderer;
use crate::logging::init_logging;
use crate::prompt::{StaleFile, resolve_stale_file};
use crate::results_dir::ResultsDir;

/// Where the sweep definition comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepSource {
    File(PathBuf),
    Preset(String),
}

impl SweepSource {
    pub fn load(&self) -> Result<SweepConfig, ConfigError> {
        match self {
            SweepSource::File(path) => SweepConfig::load(path),
            SweepSource::Preset(name) => {
                preset(name).ok_or_else(|| ConfigError::UnknownPreset(name.clone()))
            }
        }
    }
}

/// Load a sweep definition, apply command-line overrides, and validate it
pub fn load_config(
    source: &SweepSource,
    timeout_secs: Option<u64>,
) -> color_eyre::Result<SweepConfig> {
    let mut config = source
        .load()
        .wrap_err_with(|| format!("failed to load sweep from {source:?}"))?;
    if timeout_secs.is_some() {
        config.simulator.timeout_secs = timeout_secs;
    }
    config.validate().wrap_err("invalid sweep configuration")?;
    Ok(config)
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: SweepSource,
    pub timeout_secs: Option<u64>,
    /// Parent of the timestamped results directory
    pub results_root: PathBuf,
    /// Write into this directory instead of a new timestamped one
    pub results_dir: Option<PathBuf>,
    /// Remove a stale data file without asking
    pub assume_yes: bool,
    pub log_level: String,
}

/// What a finished sweep produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub name: String,
    pub results_dir: PathBuf,
    pub succeeded: usize,
    pub failed: usize,
    pub failure_log: PathBuf,
    pub results_file: PathBuf,
    pub charts: Vec<PathBuf>,
    pub data_file: Option<PathBuf>,
}

impl RunSummary {
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.succeeded == 0
    }

    pub fn print<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Sweep {} finished", self.name)?;
        writeln!(out, "  succeeded: {}", self.succeeded)?;
        writeln!(out, "  failed:    {}", self.failed)?;
        writeln!(out, "  results:   {}", self.results_dir.display())?;
        writeln!(out, "  store:     {}", self.results_file.display())?;
        writeln!(out, "  failures:  {}", self.failure_log.display())?;
        if let Some(data) = &self.data_file {
            writeln!(out, "  data file: {}", data.display())?;
        }
        for chart in &self.charts {
            writeln!(out, "  chart:     {}", chart.display())?;
        }
        if self.failed > 0 && !self.is_total_failure() {
            writeln!(out, "Warning: {} grid points failed", self.failed)?;
        }
        Ok(())
    }
}

/// Run a full sweep: results directory, logging, the sweep itself, and
/// every artifact written afterwards.
pub fn run(options: &RunOptions) -> color_eyre::Result<RunSummary> {
    let mut config = load_config(&options.source, options.timeout_secs)?;
    locate_program(&mut config.simulator)?;
    let grid = config.grid()?;

    let dir = match &options.results_dir {
        Some(path) => ResultsDir::open(path.clone()),
        None => ResultsDir::create(&options.results_root, &config.name, &Zoned::now()),
    }
    .wrap_err("failed to create results directory")?;
    init_logging(dir.path(), &options.log_level)?;
    tracing::info!(
        sweep = %config.name,
        points = grid.total_points(),
        results_dir = %dir.path().display(),
        "sweep configured"
    );

    let source = resolve_source(&config.metrics, config.simulator.working_dir.as_deref());
    if let MetricSource::DataFile { path, .. } = &source {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        match resolve_stale_file(path, options.assume_yes, stdin.lock(), &mut stdout)? {
            StaleFile::Kept => bail!(
                "stale data file {} kept; sweep not started",
                path.display()
            ),
            StaleFile::Absent | StaleFile::Removed => {}
        }
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .wrap_err("failed to install Ctrl-C handler")?;
    let progress = SweepProgress::with_cancel_flag(grid.total_points(), cancel);

    let executor = ProcessExecutor::from_config(&config.simulator);
    let mut failures = FailureLogger::create(&dir.failure_log())
        .wrap_err("failed to open failure log")?;

    let bar = ProgressBar::new(grid.total_points() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})")?,
    );
    bar.set_message("ok 0 failed 0");

    let outcome = Sweep::new(&grid, &executor)
        .with_metric_source(source.clone())
        .run(&mut failures, &progress, |report| show_point(&bar, report));

    let report = match outcome {
        Ok(report) => report,
        Err(SweepError::Cancelled { completed }) => {
            bar.abandon_with_message("interrupted");
            return Err(eyre!(
                "sweep interrupted after {completed} points; failures so far are in {}",
                dir.failure_log().display()
            ));
        }
        Err(err) => {
            bar.abandon();
            return Err(err).wrap_err("sweep aborted");
        }
    };
    bar.finish_with_message(format!("ok {} failed {}", report.succeeded, report.failed));

    let results_file = dir
        .write_results(&report.store.snapshot())
        .wrap_err("failed to write results")?;

    let plan = ChartPlan::from_store(&report.store, &config.chart);
    let charts = match render_all(&PlottersRenderer::default(), &plan, dir.path()) {
        Ok(charts) => charts,
        Err(e) => {
            tracing::error!(error = %e, "chart rendering failed");
            eprintln!("Warning: chart rendering failed: {e}");
            Vec::new()
        }
    };

    let data_file = match &source {
        MetricSource::DataFile { path, .. } => dir
            .relocate(path)
            .wrap_err("failed to move data file into results directory")?,
        MetricSource::Stdout => None,
    };

    let repo_dir = config
        .simulator
        .working_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    dir.write_provenance(&repo_dir)
        .wrap_err("failed to write provenance note")?;

    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        charts = charts.len(),
        "sweep complete"
    );

    Ok(RunSummary {
        name: config.name,
        results_dir: dir.path().to_path_buf(),
        succeeded: report.succeeded,
        failed: report.failed,
        failure_log: dir.failure_log(),
        results_file,
        charts,
        data_file,
    })
}

fn show_point(bar: &ProgressBar, report: &PointReport<'_>) {
    bar.set_position(report.completed as u64);
    bar.set_message(format!("ok {} failed {}", report.succeeded, report.failed));
    if let Some(reason) = report.failure() {
        bar.println(format!("failed ({reason}): {}", report.point));
    }
}

/// Check a path-like simulator program exists and make it absolute, so it
/// still resolves once the process runs in `working_dir`. Bare names are
/// left for `PATH` lookup.
fn locate_program(simulator: &mut SimulatorConfig) -> color_eyre::Result<()> {
    let program = &simulator.program;
    if program.components().count() < 2 {
        return Ok(());
    }
    let resolved = match &simulator.working_dir {
        Some(dir) if program.is_relative() => dir.join(program),
        _ => program.clone(),
    };
    if !resolved.exists() {
        bail!(
            "simulator {} not found; run from the directory that contains it or set simulator.working_dir",
            resolved.display()
        );
    }
    simulator.program = fs::canonicalize(&resolved)
        .wrap_err_with(|| format!("failed to resolve {}", resolved.display()))?;
    Ok(())
}

/// A relative data-file path names a file in the simulator's working directory
fn resolve_source(source: &MetricSource, working_dir: Option<&Path>) -> MetricSource {
    match (source, working_dir) {
        (MetricSource::DataFile { path, column }, Some(dir)) if path.is_relative() => {
            MetricSource::DataFile {
                path: dir.join(path),
                column: *column,
            }
        }
        _ => source.clone(),
    }
}

/// Print every grid point and the command that would run for it
pub fn write_plan<W: Write>(config: &SweepConfig, out: &mut W) -> color_eyre::Result<()> {
    let grid = config.grid()?;
    let executor = ProcessExecutor::from_config(&config.simulator);

    writeln!(out, "Sweep {}: {} grid points", config.name, grid.total_points())?;
    for dim in grid.dimensions() {
        let values: Vec<String> = dim.values.iter().map(ToString::to_string).collect();
        writeln!(out, "  {} = [{}]", dim.name, values.join(", "))?;
    }
    for param in grid.fixed() {
        writeln!(out, "  {param} (fixed)")?;
    }
    if let Some(secs) = config.simulator.timeout_secs {
        writeln!(out, "  timeout: {secs}s per point")?;
    }
    writeln!(out)?;

    for (n, point) in grid.points().enumerate() {
        writeln!(out, "{:>5}  {}", n + 1, executor.command_line(&point))?;
    }
    Ok(())
}

/// List the built-in presets, or dump one of them as YAML
pub fn write_presets<W: Write>(name: Option<&str>, out: &mut W) -> color_eyre::Result<()> {
    match name {
        Some(name) => {
            let config =
                preset(name).ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?;
            write!(out, "{}", config.to_yaml()?)?;
        }
        None => {
            for name in PRESET_NAMES {
                let config =
                    preset(name).ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?;
                let points = config.grid()?.total_points();
                let scenario = config.simulator.scenario.as_deref().unwrap_or("");
                writeln!(out, "{name:<18} {points:>4} points  {scenario}")?;
            }
        }
    }
    Ok(())
}
