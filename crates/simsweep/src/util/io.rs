//! I/O utility functions

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write content to a file atomically using write-then-rename pattern.
///
/// The content is first written to `<name>.tmp` next to the target, then
/// renamed over it, so readers never observe a half-written file.
///
/// # Example
/// ```ignore
/// atomic_write(&dir.join("results.json"), json.as_bytes())?;
/// ```
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let temp_path = temp_path(path);
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("output"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

/// Move a file, falling back to copy-and-delete when a rename is not
/// possible (e.g. across filesystems)
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(error = %e, "rename failed, copying instead");
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
