//! Run executor: one blocking simulator invocation per grid point.
//!
//! The executor makes exactly one attempt per point and classifies the
//! result. A zero exit status is not enough for success: the captured
//! output must also contain the completion marker, unless none is set.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::SimulatorConfig;
use crate::grid::ParameterTuple;
use crate::progress::SweepProgress;

/// Default literal that marks a meaningful, finished simulator run
pub const DEFAULT_COMPLETION_MARKER: &str = "Simulation Completed";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Why a grid point failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Launch failure or non-zero exit
    ProcessError,
    /// Zero exit without the completion marker
    IncompleteOutput,
    /// The invocation exceeded its time limit and was killed
    Timeout,
    /// The sweep was cancelled while the invocation was running
    Interrupted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureReason::ProcessError => "process error",
            FailureReason::IncompleteOutput => "incomplete output",
            FailureReason::Timeout => "timeout",
            FailureReason::Interrupted => "interrupted",
        };
        f.write_str(text)
    }
}

/// Classified result of one invocation
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success {
        raw_text: String,
    },
    Failure {
        reason: FailureReason,
        diagnostic: String,
    },
}

impl RunOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }
}

/// Runs the simulator for one grid point
pub trait Executor {
    /// Invoke the simulator and block until it finishes. Implementations
    /// should return promptly with [`FailureReason::Interrupted`] once
    /// `progress` is cancelled.
    fn execute(&self, point: &ParameterTuple, progress: &SweepProgress) -> RunOutcome;
}

impl<F> Executor for F
where
    F: Fn(&ParameterTuple) -> RunOutcome,
{
    fn execute(&self, point: &ParameterTuple, _progress: &SweepProgress) -> RunOutcome {
        self(point)
    }
}

/// How named parameters are laid out on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStyle {
    /// Scenario and every `--name=value` joined into one argument, as in
    /// `ns3 run "multi-bss --apNodes=2 --duration=10"`
    #[default]
    Combined,
    /// Scenario and each `--name=value` as separate arguments
    Separate,
}

/// Executes an external simulator process
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: PathBuf,
    args: Vec<String>,
    scenario: Option<String>,
    invocation: InvocationStyle,
    working_dir: Option<PathBuf>,
    completion_marker: String,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            scenario: None,
            invocation: InvocationStyle::Separate,
            working_dir: None,
            completion_marker: DEFAULT_COMPLETION_MARKER.to_string(),
            timeout: None,
        }
    }

    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            scenario: config.scenario.clone(),
            invocation: config.invocation,
            working_dir: config.working_dir.clone(),
            completion_marker: config.completion_marker.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    #[must_use]
    pub fn invocation(mut self, style: InvocationStyle) -> Self {
        self.invocation = style;
        self
    }

    #[must_use]
    pub fn completion_marker(mut self, marker: impl Into<String>) -> Self {
        self.completion_marker = marker.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Arguments passed to the program for `point`
    #[must_use]
    pub fn build_args(&self, point: &ParameterTuple) -> Vec<String> {
        let named = point.parameters().map(|p| format!("--{}={}", p.name, p.value));
        let mut args = self.args.clone();
        match self.invocation {
            InvocationStyle::Combined => {
                let combined: Vec<String> = self.scenario.iter().cloned().chain(named).collect();
                args.push(combined.join(" "));
            }
            InvocationStyle::Separate => {
                args.extend(self.scenario.iter().cloned());
                args.extend(named);
            }
        }
        args
    }

    /// Human-readable command line for logs and dry runs
    #[must_use]
    pub fn command_line(&self, point: &ParameterTuple) -> String {
        let mut line = self.program.display().to_string();
        for arg in self.build_args(point) {
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push('\'');
                line.push_str(&arg);
                line.push('\'');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }

    fn classify(&self, status: ExitStatus, stdout: String, stderr: String) -> RunOutcome {
        if !status.success() {
            let diagnostic = if stderr.trim().is_empty() {
                format!("simulator exited with {status}")
            } else {
                stderr
            };
            return RunOutcome::Failure {
                reason: FailureReason::ProcessError,
                diagnostic,
            };
        }
        if self.completion_marker.is_empty() || stdout.contains(&self.completion_marker) {
            RunOutcome::Success { raw_text: stdout }
        } else {
            RunOutcome::Failure {
                reason: FailureReason::IncompleteOutput,
                diagnostic: stdout,
            }
        }
    }
}

impl Executor for ProcessExecutor {
    fn execute(&self, point: &ParameterTuple, progress: &SweepProgress) -> RunOutcome {
        let mut command = Command::new(&self.program);
        command
            .args(self.build_args(point))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        // Own process group, so a terminal Ctrl-C reaches only the sweep and
        // termination can take the simulator's children down with it.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        tracing::debug!(command = %self.command_line(point), "launching simulator");

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return RunOutcome::Failure {
                    reason: FailureReason::ProcessError,
                    diagnostic: format!("failed to launch {}: {e}", self.program.display()),
                };
            }
        };

        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());
        let group = child.id();

        let started = Instant::now();
        let waited = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => {
                    if let Some(reason) = self.stop_reason(progress, started) {
                        terminate(&mut child);
                        break Err(reason);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to poll simulator process");
                    terminate(&mut child);
                    break Err(FailureReason::ProcessError);
                }
            }
        };

        // Background children of the simulator can keep the pipes open after
        // it exits; the time limit and cancellation still apply until they close.
        let waited = match waited {
            Ok(status) => loop {
                if [&stdout, &stderr]
                    .into_iter()
                    .flatten()
                    .all(JoinHandle::is_finished)
                {
                    break Ok(status);
                }
                if let Some(reason) = self.stop_reason(progress, started) {
                    tracing::warn!(reason = %reason, "simulator left processes holding its output");
                    kill_group(group);
                    break Err(reason);
                }
                thread::sleep(POLL_INTERVAL);
            },
            Err(reason) => Err(reason),
        };

        let stdout = join_reader(stdout);
        let stderr = join_reader(stderr);

        match waited {
            Ok(status) => self.classify(status, stdout, stderr),
            Err(reason) => {
                let diagnostic = match reason {
                    FailureReason::Timeout => format!(
                        "killed after {:.1}s\n{stderr}",
                        started.elapsed().as_secs_f64()
                    ),
                    _ => stderr,
                };
                RunOutcome::Failure { reason, diagnostic }
            }
        }
    }
}

impl ProcessExecutor {
    fn stop_reason(&self, progress: &SweepProgress, started: Instant) -> Option<FailureReason> {
        if progress.is_cancelled() {
            Some(FailureReason::Interrupted)
        } else if self.timeout.is_some_and(|limit| started.elapsed() >= limit) {
            Some(FailureReason::Timeout)
        } else {
            None
        }
    }
}

fn spawn_reader<R>(source: Option<R>) -> Option<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    source.map(|mut source| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            if let Err(e) = source.read_to_end(&mut buffer) {
                tracing::warn!(error = %e, "error reading simulator output");
            }
            String::from_utf8_lossy(&buffer).into_owned()
        })
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Kill every process left in the simulator's group
fn kill_group(group: u32) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(group) {
            // SAFETY: killpg only sends a signal; the group was created for this child.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = group;
}

/// Kill the child and its process group, then reap it
fn terminate(child: &mut Child) {
    kill_group(child.id());
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "simulator already exited");
    }
    if let Err(e) = child.wait() {
        tracing::warn!(error = %e, "failed to reap simulator process");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Dimension, ParameterGrid, Parameter, ParameterValue};

    fn sample_point() -> ParameterTuple {
        let grid = ParameterGrid::new(
            vec![Dimension::new("apNodes", vec![ParameterValue::Int(3)])],
            vec![Parameter::new("phyMode", "OfdmRate54Mbps")],
        );
        grid.points().next().unwrap()
    }

    #[test]
    fn test_combined_arguments() {
        let executor = ProcessExecutor::new("./ns3")
            .args(["run"])
            .scenario("multi-bss")
            .invocation(InvocationStyle::Combined);
        assert_eq!(
            executor.build_args(&sample_point()),
            vec!["run", "multi-bss --apNodes=3 --phyMode=OfdmRate54Mbps"]
        );
        assert_eq!(
            executor.command_line(&sample_point()),
            "./ns3 run 'multi-bss --apNodes=3 --phyMode=OfdmRate54Mbps'"
        );
    }

    #[test]
    fn test_separate_arguments() {
        let executor = ProcessExecutor::new("sim").invocation(InvocationStyle::Separate);
        assert_eq!(
            executor.build_args(&sample_point()),
            vec!["--apNodes=3", "--phyMode=OfdmRate54Mbps"]
        );
    }

    #[test]
    fn test_failure_reason_text() {
        assert_eq!(FailureReason::ProcessError.to_string(), "process error");
        assert_eq!(FailureReason::IncompleteOutput.to_string(), "incomplete output");
        assert_eq!(FailureReason::Timeout.to_string(), "timeout");
    }

    #[test]
    fn test_launch_failure_is_process_error() {
        let executor = ProcessExecutor::new("/nonexistent/simulator-binary");
        let outcome = executor.execute(&sample_point(), &SweepProgress::default());
        match outcome {
            RunOutcome::Failure { reason, diagnostic } => {
                assert_eq!(reason, FailureReason::ProcessError);
                assert!(diagnostic.contains("failed to launch"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    fn shell(script: &str) -> ProcessExecutor {
        // Trailing --name=value arguments land in $0, $1, ... and are ignored.
        ProcessExecutor::new("sh")
            .args(["-c", script])
            .invocation(InvocationStyle::Separate)
    }

    #[cfg(unix)]
    #[test]
    fn test_success_requires_marker() {
        let outcome = shell("echo 'Throughput: 10 Mbps'; echo 'Simulation Completed'")
            .execute(&sample_point(), &SweepProgress::default());
        match outcome {
            RunOutcome::Success { raw_text } => assert!(raw_text.contains("Throughput: 10")),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_zero_exit_without_marker_is_incomplete() {
        let outcome = shell("echo 'Throughput: 10 Mbps'")
            .execute(&sample_point(), &SweepProgress::default());
        assert_eq!(
            outcome,
            RunOutcome::Failure {
                reason: FailureReason::IncompleteOutput,
                diagnostic: "Throughput: 10 Mbps\n".to_string(),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_marker_accepts_zero_exit() {
        let outcome = shell("echo 'wrote multi-bss.dat'")
            .completion_marker("")
            .execute(&sample_point(), &SweepProgress::default());
        assert!(outcome.is_success());

        let outcome = shell("exit 1")
            .completion_marker("")
            .execute(&sample_point(), &SweepProgress::default());
        assert!(!outcome.is_success());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_captures_stderr() {
        let outcome = shell("echo 'Simulation Completed'; echo 'assert failed' >&2; exit 3")
            .execute(&sample_point(), &SweepProgress::default());
        assert_eq!(
            outcome,
            RunOutcome::Failure {
                reason: FailureReason::ProcessError,
                diagnostic: "assert failed\n".to_string(),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        let outcome = shell("sleep 5; echo 'Simulation Completed'")
            .timeout(Some(Duration::from_millis(200)))
            .execute(&sample_point(), &SweepProgress::default());
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(matches!(
            outcome,
            RunOutcome::Failure {
                reason: FailureReason::Timeout,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancelled_progress_interrupts() {
        let progress = SweepProgress::default();
        progress.cancel();
        let outcome = shell("sleep 5").execute(&sample_point(), &progress);
        assert!(matches!(
            outcome,
            RunOutcome::Failure {
                reason: FailureReason::Interrupted,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_covers_lingering_children() {
        let started = Instant::now();
        let outcome = shell("sleep 5 & echo 'Simulation Completed'")
            .timeout(Some(Duration::from_millis(300)))
            .execute(&sample_point(), &SweepProgress::default());
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(matches!(
            outcome,
            RunOutcome::Failure {
                reason: FailureReason::Timeout,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_covers_lingering_children() {
        let progress = SweepProgress::default();
        let executor = shell("sleep 5 & echo 'Simulation Completed'");
        let outcome = thread::scope(|scope| {
            scope.spawn(|| {
                thread::sleep(Duration::from_millis(300));
                progress.cancel();
            });
            executor.execute(&sample_point(), &progress)
        });
        assert!(matches!(
            outcome,
            RunOutcome::Failure {
                reason: FailureReason::Interrupted,
                ..
            }
        ));
    }
}
