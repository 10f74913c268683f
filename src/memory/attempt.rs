//! The attempt record (spec.md §3 "AttemptRecord", §4.2.8): a single
//! persisted JSON document capturing the operator's current intent.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::PhotonPaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Done,
    Blocked,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AttemptRecord {
    pub intent: Option<String>,
    pub status: Option<AttemptStatus>,
    #[serde(default)]
    pub read_scope: Vec<String>,
    #[serde(default)]
    pub steps_completed: Vec<String>,
    #[serde(default)]
    pub affected_files: Vec<String>,
    pub created_at: Option<u64>,
    pub updated_at: Option<u64>,
}

impl AttemptRecord {
    fn is_empty(&self) -> bool {
        self.intent.is_none()
            && self.status.is_none()
            && self.read_scope.is_empty()
            && self.steps_completed.is_empty()
            && self.affected_files.is_empty()
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// One record at a time, rooted at `.photon/current_attempt.json`
/// (spec.md §3, §6).
pub struct AttemptStore {
    path: PathBuf,
}

impl AttemptStore {
    pub fn new(project_root: &Path) -> Self {
        Self {
            path: PhotonPaths::new(project_root).current_attempt_json(),
        }
    }

    /// The current record, or an empty one if none has been written yet
    /// (spec.md §8 scenario 5: `clear` then `get` returns `{}`).
    pub fn get(&self) -> AttemptRecord {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }

    /// Merge `intent`/`status`/`read_scope`/`affected_files`; `step_done`
    /// appends exactly one entry to `steps_completed` (spec.md §7
    /// monotonicity invariant).
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &self,
        intent: Option<String>,
        status: Option<AttemptStatus>,
        read_scope: Option<Vec<String>>,
        step_done: Option<String>,
        affected_files: Option<Vec<String>>,
    ) -> std::io::Result<AttemptRecord> {
        let mut record = self.get();
        let is_new = record.is_empty();

        if let Some(intent) = intent {
            record.intent = Some(intent);
        }
        if let Some(status) = status {
            record.status = Some(status);
        }
        if let Some(scope) = read_scope {
            record.read_scope = scope;
        }
        if let Some(step) = step_done {
            record.steps_completed.push(step);
        }
        if let Some(files) = affected_files {
            record.affected_files = files;
        }

        let now = now_secs();
        if is_new || record.created_at.is_none() {
            record.created_at = Some(now);
        }
        record.updated_at = Some(now);

        self.write(&record)?;
        Ok(record)
    }

    pub fn clear(&self) -> std::io::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn write(&self, record: &AttemptRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn get_on_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = AttemptStore::new(dir.path());
        assert!(store.get().is_empty());
    }

    #[test]
    fn step_done_appends_monotonically() {
        let dir = TempDir::new().unwrap();
        let store = AttemptStore::new(dir.path());
        store
            .update(Some("T".to_string()), Some(AttemptStatus::InProgress), None, None, None)
            .unwrap();
        store.update(None, None, None, Some("s1".to_string()), None).unwrap();
        store.update(None, None, None, Some("s2".to_string()), None).unwrap();

        let record = store.get();
        assert_eq!(record.steps_completed, vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(record.status, Some(AttemptStatus::InProgress));
    }

    #[test]
    fn clear_then_get_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = AttemptStore::new(dir.path());
        store.update(Some("T".to_string()), None, None, None, None).unwrap();
        store.clear().unwrap();
        assert!(store.get().is_empty());
    }
}
