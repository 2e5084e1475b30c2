//! Run journal: append-only record of everything that happened in a run.
//!
//! Entries are kept in memory and, when a path is configured, appended as
//! JSON lines to `journal.jsonl` in the run directory.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::LogLevel;

/// One thing that happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted { process: String, inputs: Value },
    TaskRequested { effect_id: String, task: String, title: String },
    TaskCompleted { effect_id: String, task: String },
    TaskFailed { effect_id: String, task: String, error: String },
    BreakpointRaised { breakpoint_id: Uuid, title: String },
    BreakpointResolved { breakpoint_id: Uuid, outcome: String },
    Log { level: LogLevel, message: String },
    RunFinished {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// A journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: RunEvent,
}

struct JournalInner {
    entries: Vec<JournalEntry>,
    file: Option<File>,
}

/// Append-only journal for one run.
pub struct RunJournal {
    path: Option<PathBuf>,
    inner: Mutex<JournalInner>,
}

impl RunJournal {
    /// Journal kept only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            inner: Mutex::new(JournalInner {
                entries: Vec::new(),
                file: None,
            }),
        }
    }

    /// Journal mirrored to `path`. The file is created on first write.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::in_memory()
        }
    }

    pub fn record(&self, event: RunEvent) {
        let Ok(mut inner) = self.inner.lock() else {
            tracing::error!("Run journal lock poisoned, dropping event");
            return;
        };

        let entry = JournalEntry {
            seq: inner.entries.len() as u64 + 1,
            timestamp: Utc::now(),
            event,
        };

        if let Some(path) = &self.path {
            if inner.file.is_none() {
                inner.file = open_append(path);
            }
            if let Some(file) = inner.file.as_mut() {
                let line = serde_json::to_string(&entry).unwrap_or_default();
                if let Err(e) = writeln!(file, "{}", line) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to append journal entry");
                }
            }
        }

        inner.entries.push(entry);
    }

    /// Snapshot of all entries so far.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.inner
            .lock()
            .map(|inner| inner.entries.clone())
            .unwrap_or_default()
    }

    /// Events only, in order.
    pub fn events(&self) -> Vec<RunEvent> {
        self.entries().into_iter().map(|e| e.event).collect()
    }
}

fn open_append(path: &PathBuf) -> Option<File> {
    if let Some(parent) = path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        tracing::warn!(path = %parent.display(), error = %e, "Cannot create journal directory");
        return None;
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot open run journal");
            None
        }
    }
}
