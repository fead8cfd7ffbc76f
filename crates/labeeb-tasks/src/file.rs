//! On-disk task list codec.
//!
//! The file is a UTF-8, human-readable JSON array of `{"text", "time"}`
//! objects with ISO-8601 local timestamps. Embeddings and ids are never
//! written. Every mutation rewrites the whole file through a temporary
//! sibling that is renamed into place.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use labeeb_core::Task;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TaskError;

/// One persisted entry as it appears in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub text: String,
    pub time: String,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            text: task.text.clone(),
            time: task.scheduled_time.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        }
    }
}

/// A persisted entry that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTask {
    pub text: String,
    pub time: NaiveDateTime,
}

/// Result of reading the task file.
#[derive(Debug, Default)]
pub struct FileContents {
    /// Valid entries, in file order.
    pub entries: Vec<StoredTask>,
    /// Entries skipped because they were malformed.
    pub skipped: usize,
}

/// Handle to the persisted task list.
#[derive(Debug, Clone)]
pub struct TaskFile {
    path: PathBuf,
}

impl TaskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every valid entry.
    ///
    /// A missing file reads as empty. A file that is not a JSON array is an
    /// error; individual malformed entries are skipped and counted.
    pub fn read(&self) -> Result<FileContents, TaskError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Task file not found, starting empty");
                return Ok(FileContents::default());
            }
            Err(e) => return Err(TaskError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(FileContents::default());
        }

        let values: Vec<serde_json::Value> =
            serde_json::from_str(&content).map_err(|e| TaskError::Malformed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        let mut contents = FileContents::default();
        for value in values {
            match parse_entry(value) {
                Ok(entry) => contents.entries.push(entry),
                Err(reason) => {
                    warn!(path = %self.path.display(), %reason, "Skipping invalid task entry");
                    contents.skipped += 1;
                }
            }
        }

        Ok(contents)
    }

    /// Overwrite the file with `tasks`, in order.
    pub fn write(&self, tasks: &[Task]) -> Result<(), TaskError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
            }
        }

        let records: Vec<TaskRecord> = tasks.iter().map(TaskRecord::from).collect();
        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| TaskError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| TaskError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| TaskError::io(&self.path, e))?;

        debug!(path = %self.path.display(), task_count = tasks.len(), "Task file written");
        Ok(())
    }
}

fn parse_entry(value: serde_json::Value) -> Result<StoredTask, String> {
    let record: TaskRecord = serde_json::from_value(value).map_err(|e| e.to_string())?;
    let time = parse_time(&record.time)
        .ok_or_else(|| format!("unparseable time {:?} for {:?}", record.time, record.text))?;
    Ok(StoredTask {
        text: record.text,
        time,
    })
}

/// Accept naive ISO-8601 timestamps (the format this crate writes) and
/// offset-qualified RFC 3339 ones, which are taken at their local wall time.
fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    raw.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
}
