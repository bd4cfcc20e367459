//! JSON persistence for the schedule and the publish history.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::config::{read_json, write_json};
use crate::error::AutopostResult;

use super::ScheduledPost;

/// Result of one publish attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Posted { post_id: String },
    Failed { error: String },
}

/// One entry of `post_history.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub text: String,
    pub timestamp: DateTime<FixedOffset>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// The schedule file.
#[derive(Debug, Clone)]
pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries; empty when the file does not exist yet.
    pub fn load(&self) -> AutopostResult<Vec<ScheduledPost>> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    pub fn save(&self, posts: &[ScheduledPost]) -> AutopostResult<()> {
        write_json(&self.path, posts)?;
        tracing::debug!(path = %self.path.display(), count = posts.len(), "Schedule saved");
        Ok(())
    }
}

/// Append-only publish history.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> AutopostResult<Vec<HistoryRecord>> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    pub fn append(&self, records: &[HistoryRecord]) -> AutopostResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut history = self.load()?;
        history.extend_from_slice(records);
        write_json(&self.path, &history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_schedule_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ScheduleStore::new(dir.path().join("scheduled.json"));
        assert!(store.load().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_history_appends() {
        let dir = TempDir::new().unwrap();
        let log = HistoryLog::new(dir.path().join("post_history.json"));
        let at = DateTime::parse_from_rfc3339("2026-03-01T07:00:00+09:00").unwrap();

        log.append(&[HistoryRecord {
            text: "一件目".into(),
            timestamp: at,
            outcome: Outcome::Posted {
                post_id: "1".into(),
            },
        }])
        .unwrap();
        log.append(&[HistoryRecord {
            text: "二件目".into(),
            timestamp: at,
            outcome: Outcome::Failed {
                error: "boom".into(),
            },
        }])
        .unwrap();

        let history = log.load().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].outcome, Outcome::Failed { error: "boom".into() });

        let raw = std::fs::read_to_string(dir.path().join("post_history.json")).unwrap();
        assert!(raw.contains("\"result\": \"posted\""));
    }
}
