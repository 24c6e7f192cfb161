use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::bail;
use simsweep::app::{self, RunOptions, SweepSource};

#[derive(Parser, Debug)]
#[command(name = "simsweep")]
#[command(about = "Run parameter sweeps against an external network simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every grid point and collect results, logs and charts
    Run(RunArgs),
    /// Print the grid points and simulator commands without running anything
    Plan(SourceArgs),
    /// List the built-in presets, or print one as YAML
    Presets {
        /// Preset to print
        name: Option<String>,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Sweep definition (YAML)
    #[arg(short, long, conflicts_with = "preset", required_unless_present = "preset")]
    config: Option<PathBuf>,

    /// Built-in sweep (see `simsweep presets`)
    #[arg(short, long)]
    preset: Option<String>,

    /// Per-point time limit in seconds, overriding the config
    #[arg(long)]
    timeout: Option<u64>,
}

impl SourceArgs {
    fn source(&self) -> color_eyre::Result<SweepSource> {
        match (&self.config, &self.preset) {
            (Some(path), _) => Ok(SweepSource::File(path.clone())),
            (None, Some(name)) => Ok(SweepSource::Preset(name.clone())),
            (None, None) => bail!("either --config or --preset is required"),
        }
    }
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Directory that receives the timestamped results directory
    #[arg(long, default_value = "results")]
    results_root: PathBuf,

    /// Write into this directory instead of a new timestamped one
    #[arg(long, conflicts_with = "results_root")]
    results_dir: Option<PathBuf>,

    /// Remove a stale data file without asking
    #[arg(short, long)]
    yes: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    match Cli::parse().command {
        Command::Run(args) => {
            let options = RunOptions {
                source: args.source.source()?,
                timeout_secs: args.source.timeout,
                results_root: args.results_root,
                results_dir: args.results_dir,
                assume_yes: args.yes,
                log_level: args.log_level,
            };
            let summary = app::run(&options)?;
            summary.print(&mut io::stdout())?;
            tracing::info!("simsweep shutting down");
            if summary.is_total_failure() {
                bail!(
                    "no grid point succeeded; see {}",
                    summary.failure_log.display()
                );
            }
        }
        Command::Plan(args) => {
            let config = app::load_config(&args.source()?, args.timeout)?;
            app::write_plan(&config, &mut io::stdout())?;
        }
        Command::Presets { name } => {
            app::write_presets(name.as_deref(), &mut io::stdout())?;
        }
    }

    Ok(())
}
