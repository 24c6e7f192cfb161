//! Append-only failure log, one JSON record per line.
//!
//! Every record is flushed as soon as it is written, so an interrupted
//! sweep still leaves a complete log of the failures seen so far.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::executor::FailureReason;
use crate::grid::{Parameter, ParameterTuple};

/// One failed grid point, with enough context to rerun it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub timestamp: Timestamp,
    /// Grid indices of the point
    pub index: Vec<usize>,
    /// Swept values of the point
    pub coordinates: Vec<Parameter>,
    /// Fixed settings in effect
    pub fixed: Vec<Parameter>,
    pub reason: FailureReason,
    /// Captured stderr, or stdout for incomplete runs
    pub diagnostic: String,
}

impl FailureRecord {
    pub fn new(
        point: &ParameterTuple,
        reason: FailureReason,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Timestamp::now(),
            index: point.index.clone(),
            coordinates: point.coordinates.clone(),
            fixed: point.fixed.clone(),
            reason,
            diagnostic: diagnostic.into(),
        }
    }

    /// Rebuild the parameter tuple that failed
    #[must_use]
    pub fn tuple(&self) -> ParameterTuple {
        ParameterTuple {
            index: self.index.clone(),
            coordinates: self.coordinates.clone(),
            fixed: self.fixed.clone(),
        }
    }
}

/// Writes [`FailureRecord`]s to a durable sink
#[derive(Debug)]
pub struct FailureLogger<W: Write> {
    writer: W,
    path: Option<PathBuf>,
    records: usize,
}

impl FailureLogger<File> {
    /// Open (or create) a log file for appending
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: file,
            path: Some(path.to_path_buf()),
            records: 0,
        })
    }
}

impl<W: Write> FailureLogger<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            path: None,
            records: 0,
        }
    }

    /// Append and flush one record
    pub fn append(&mut self, record: &FailureRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.records += 1;
        Ok(())
    }

    /// Records written through this logger
    #[must_use]
    pub fn count(&self) -> usize {
        self.records
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Read records back from a log; blank lines are skipped
pub fn read_records<R: io::Read>(reader: R) -> io::Result<Vec<FailureRecord>> {
    let mut records = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        records.push(record);
    }
    Ok(records)
}

/// Read all records from a log file
pub fn read_log(path: &Path) -> io::Result<Vec<FailureRecord>> {
    read_records(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Dimension, ParameterGrid};
    use tempfile::tempdir;

    fn points() -> Vec<ParameterTuple> {
        ParameterGrid::new(
            vec![Dimension::new("apNodes", vec![2.into(), 3.into()])],
            vec![Parameter::new("duration", 10)],
        )
        .points()
        .collect()
    }

    #[test]
    fn test_records_reproduce_tuple() {
        let mut logger = FailureLogger::new(Vec::new());
        for point in points() {
            let record = FailureRecord::new(&point, FailureReason::ProcessError, "boom\n");
            logger.append(&record).unwrap();
        }
        assert_eq!(logger.count(), 2);

        let bytes = logger.into_inner();
        let records = read_records(bytes.as_slice()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].tuple(), points()[1]);
        assert_eq!(records[1].diagnostic, "boom\n");
        assert_eq!(records[0].reason, FailureReason::ProcessError);
    }

    #[test]
    fn test_file_log_appends_across_loggers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failures.jsonl");
        let point = points().remove(0);

        {
            let mut logger = FailureLogger::create(&path).unwrap();
            logger
                .append(&FailureRecord::new(&point, FailureReason::Timeout, ""))
                .unwrap();
            assert_eq!(logger.path(), Some(path.as_path()));
        }
        {
            let mut logger = FailureLogger::create(&path).unwrap();
            logger
                .append(&FailureRecord::new(&point, FailureReason::IncompleteOutput, "partial"))
                .unwrap();
        }

        let records = read_log(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].reason, FailureReason::Timeout);
        assert_eq!(records[1].reason, FailureReason::IncompleteOutput);
    }
}
