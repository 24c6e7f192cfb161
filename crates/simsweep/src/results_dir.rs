//! The per-execution results directory and the artifacts written into it.
//!
//! Layout of `{root}/{name}-{YYYYmmdd-HHMMSS}/`:
//! - `simsweep.log` - tracing output
//! - `failures.jsonl` - one record per failed grid point
//! - `results.json` - the results store
//! - `*.png` - charts
//! - `git-commit.txt` - code revision in effect
//! - the simulator's data file, when the sweep read one

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use jiff::Zoned;
use simsweep_core::store::StoreSnapshot;

use crate::util::io::{atomic_write, move_file};

pub const FAILURE_LOG_NAME: &str = "failures.jsonl";
pub const RESULTS_NAME: &str = "results.json";
pub const PROVENANCE_NAME: &str = "git-commit.txt";

#[derive(Debug, Clone)]
pub struct ResultsDir {
    path: PathBuf,
}

impl ResultsDir {
    /// Create `{root}/{name}-{timestamp}`. A numeric suffix is added if two
    /// sweeps start within the same second.
    pub fn create(root: &Path, name: &str, now: &Zoned) -> io::Result<Self> {
        let stem = format!("{}-{}", dir_safe(name), now.strftime("%Y%m%d-%H%M%S"));
        fs::create_dir_all(root)?;

        let mut path = root.join(&stem);
        let mut attempt = 1;
        loop {
            match fs::create_dir(&path) {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    path = root.join(format!("{stem}-{attempt}"));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self { path })
    }

    /// Use an existing directory as is
    pub fn open(path: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn failure_log(&self) -> PathBuf {
        self.path.join(FAILURE_LOG_NAME)
    }

    #[must_use]
    pub fn results_file(&self) -> PathBuf {
        self.path.join(RESULTS_NAME)
    }

    /// Write the results store as pretty JSON
    pub fn write_results(&self, snapshot: &StoreSnapshot) -> io::Result<PathBuf> {
        let path = self.results_file();
        let mut json = serde_json::to_vec_pretty(snapshot)?;
        json.push(b'\n');
        atomic_write(&path, &json)?;
        Ok(path)
    }

    /// Record `git show --name-only` run in `repo_dir`. When git is missing
    /// or `repo_dir` is not a repository, the note says so instead.
    pub fn write_provenance(&self, repo_dir: &Path) -> io::Result<PathBuf> {
        let path = self.path.join(PROVENANCE_NAME);
        let note = match Command::new("git")
            .args(["show", "--name-only"])
            .current_dir(repo_dir)
            .output()
        {
            Ok(output) if output.status.success() => output.stdout,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::warn!(status = %output.status, "git show failed");
                format!("revision unavailable: git show exited with {}\n{stderr}", output.status)
                    .into_bytes()
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not run git");
                format!("revision unavailable: {e}\n").into_bytes()
            }
        };
        fs::write(&path, note)?;
        Ok(path)
    }

    /// Move a file into the directory, keeping its name. Returns `None` if
    /// the file does not exist.
    pub fn relocate(&self, file: &Path) -> io::Result<Option<PathBuf>> {
        if !file.exists() {
            return Ok(None);
        }
        let Some(name) = file.file_name() else {
            return Ok(None);
        };
        let target = self.path.join(name);
        move_file(file, &target)?;
        tracing::info!(from = %file.display(), to = %target.display(), "relocated data file");
        Ok(Some(target))
    }
}

fn dir_safe(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '-' })
        .collect();
    if cleaned.is_empty() {
        "sweep".to_string()
    } else {
        cleaned
    }
}
