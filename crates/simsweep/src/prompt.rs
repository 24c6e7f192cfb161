//! Interactive confirmation before a sweep reuses state from a previous run.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Ask a yes/no question until the answer is recognizable.
///
/// Accepts `y`/`yes` and `n`/`no` in any case. End of input counts as no.
pub fn confirm<R: BufRead, W: Write>(
    mut input: R,
    output: &mut W,
    question: &str,
) -> io::Result<bool> {
    let mut line = String::new();
    loop {
        write!(output, "{question} [Yes/No]: ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please answer yes or no.")?,
        }
    }
}

/// What to do about a data file left behind by an earlier run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleFile {
    /// Nothing there
    Absent,
    /// Removed, the sweep may proceed
    Removed,
    /// The user chose to keep it; the sweep must not start
    Kept,
}

/// Offer to remove a stale data file. With `assume_yes` the file is removed
/// without asking.
pub fn resolve_stale_file<R: BufRead, W: Write>(
    path: &Path,
    assume_yes: bool,
    input: R,
    output: &mut W,
) -> io::Result<StaleFile> {
    if !path.exists() {
        return Ok(StaleFile::Absent);
    }

    let remove = assume_yes
        || confirm(
            input,
            output,
            &format!("Remove existing file {}?", path.display()),
        )?;
    if !remove {
        tracing::warn!(path = %path.display(), "stale data file kept, not starting sweep");
        return Ok(StaleFile::Kept);
    }

    fs::remove_file(path)?;
    tracing::info!(path = %path.display(), "removed stale data file");
    writeln!(output, "Removed {}", path.display())?;
    Ok(StaleFile::Removed)
}
