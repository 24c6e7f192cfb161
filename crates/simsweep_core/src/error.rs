use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors in sweep configuration, detected before any simulator invocation
#[derive(Debug)]
pub enum ConfigError {
    /// The grid declares no dimensions at all
    NoDimensions,
    /// A dimension resolved to zero values
    EmptyDimension(String),
    /// Two dimensions (or a dimension and a fixed setting) share a name
    DuplicateParameter(String),
    /// A range dimension with a zero step
    ZeroStep(String),
    /// A dimension entry names none or more than one value source
    AmbiguousDimension(String),
    /// The simulator program path is empty
    MissingProgram,
    /// No preset with the given name
    UnknownPreset(String),
    /// The configuration document could not be parsed
    Parse(String),
    /// The configuration file could not be read
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoDimensions => write!(f, "sweep declares no dimensions"),
            ConfigError::EmptyDimension(name) => write!(f, "dimension '{name}' has no values"),
            ConfigError::DuplicateParameter(name) => {
                write!(f, "parameter '{name}' is declared more than once")
            }
            ConfigError::ZeroStep(name) => write!(f, "dimension '{name}' has a zero range step"),
            ConfigError::AmbiguousDimension(name) => write!(
                f,
                "dimension '{name}' must set exactly one of 'values', 'range' or 'log10'"
            ),
            ConfigError::MissingProgram => write!(f, "simulator program is not set"),
            ConfigError::UnknownPreset(name) => write!(f, "unknown preset '{name}'"),
            ConfigError::Parse(msg) => write!(f, "invalid sweep configuration: {msg}"),
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors that end a sweep early
#[derive(Debug)]
pub enum SweepError {
    /// Invalid grid, reported before the first invocation
    Config(ConfigError),
    /// The failure log could not be appended to
    FailureLog(io::Error),
    /// The sweep was interrupted after `completed` grid points
    Cancelled { completed: usize },
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::Config(e) => write!(f, "{e}"),
            SweepError::FailureLog(e) => write!(f, "failed to append to failure log: {e}"),
            SweepError::Cancelled { completed } => {
                write!(f, "sweep interrupted after {completed} grid points")
            }
        }
    }
}

impl std::error::Error for SweepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SweepError::Config(e) => Some(e),
            SweepError::FailureLog(e) => Some(e),
            SweepError::Cancelled { .. } => None,
        }
    }
}

impl From<ConfigError> for SweepError {
    fn from(err: ConfigError) -> Self {
        SweepError::Config(err)
    }
}

/// Errors raised by a chart renderer
#[derive(Debug)]
pub enum ChartError {
    Io(io::Error),
    /// Backend-specific drawing failure
    Backend(String),
}

impl fmt::Display for ChartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartError::Io(e) => write!(f, "chart I/O error: {e}"),
            ChartError::Backend(msg) => write!(f, "chart drawing failed: {msg}"),
        }
    }
}

impl std::error::Error for ChartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChartError::Io(e) => Some(e),
            ChartError::Backend(_) => None,
        }
    }
}

impl From<io::Error> for ChartError {
    fn from(err: io::Error) -> Self {
        ChartError::Io(err)
    }
}
