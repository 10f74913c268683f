//! Failure memory (spec.md §4.5 "Failure memory"): a FIFO-capped log of
//! past tool failures, consulted by the Agent Control Loop's Act phase
//! for a `failure_hint` when a similar failure recurs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::PhotonPaths;

const MAX_ENTRIES: usize = 100;
const SIMILARITY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FailureRecord {
    pub tool: String,
    pub args: serde_json::Value,
    pub error: String,
    pub solution: Option<String>,
    pub timestamp: u64,
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Case-insensitive substring-containment similarity: the length of the
/// longer string's longest run contained in the other, over the longer
/// string's length (spec.md §4.5).
fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if longer.contains(shorter.as_str()) {
        return shorter.len() as f64 / longer.len() as f64;
    }
    // Fall back to the longest common substring when neither fully
    // contains the other.
    let common = longest_common_substring(shorter, longer);
    common as f64 / longer.len() as f64
}

fn longest_common_substring(a: &str, b: &str) -> usize {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    let mut prev = vec![0usize; b_bytes.len() + 1];
    let mut best = 0;
    for i in 1..=a_bytes.len() {
        let mut cur = vec![0usize; b_bytes.len() + 1];
        for j in 1..=b_bytes.len() {
            if a_bytes[i - 1] == b_bytes[j - 1] {
                cur[j] = prev[j - 1] + 1;
                best = best.max(cur[j]);
            }
        }
        prev = cur;
    }
    best
}

pub struct FailureMemory {
    path: PathBuf,
}

impl FailureMemory {
    pub fn new(project_root: &Path) -> Self {
        Self {
            path: PhotonPaths::new(project_root).failures_json(),
        }
    }

    fn load(&self) -> Vec<FailureRecord> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }

    /// All recorded failures, oldest first.
    pub fn all(&self) -> Vec<FailureRecord> {
        self.load()
    }

    fn save(&self, records: &[FailureRecord]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(records)?)
    }

    /// Appends a failure, evicting the oldest entry once the log exceeds
    /// 100 records (FIFO).
    pub fn record(&self, tool: &str, args: serde_json::Value, error: &str, solution: Option<String>) -> std::io::Result<()> {
        let mut records = self.load();
        records.push(FailureRecord {
            tool: tool.to_string(),
            args,
            error: error.to_string(),
            solution,
            timestamp: now_secs(),
        });
        while records.len() > MAX_ENTRIES {
            records.remove(0);
        }
        self.save(&records)
    }

    /// Returns the solution of the most similar past failure for the
    /// same tool, if its similarity exceeds the 0.8 threshold.
    pub fn lookup(&self, tool: &str, error: &str) -> Option<String> {
        self.load()
            .into_iter()
            .filter(|r| r.tool == tool && r.solution.is_some())
            .filter_map(|r| {
                let score = similarity(&r.error, error);
                (score > SIMILARITY_THRESHOLD).then_some((score, r.solution.unwrap()))
            })
            .max_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, solution)| solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn record_and_lookup_round_trip() {
        let dir = TempDir::new().unwrap();
        let memory = FailureMemory::new(dir.path());
        memory
            .record(
                "run_command",
                serde_json::json!({"command": "cargo build"}),
                "error[E0433]: failed to resolve: use of undeclared crate",
                Some("add the missing dependency to Cargo.toml".to_string()),
            )
            .unwrap();

        let hint = memory.lookup("run_command", "error[E0433]: failed to resolve: use of undeclared crate or module");
        assert_eq!(hint, Some("add the missing dependency to Cargo.toml".to_string()));
    }

    #[test]
    fn dissimilar_errors_return_no_hint() {
        let dir = TempDir::new().unwrap();
        let memory = FailureMemory::new(dir.path());
        memory
            .record("run_command", serde_json::json!({}), "permission denied", Some("chmod +x".to_string()))
            .unwrap();
        assert_eq!(memory.lookup("run_command", "connection refused on port 8080"), None);
    }

    #[test]
    fn log_is_capped_fifo_at_100() {
        let dir = TempDir::new().unwrap();
        let memory = FailureMemory::new(dir.path());
        for i in 0..105 {
            memory.record("t", serde_json::json!({}), &format!("error {i}"), None).unwrap();
        }
        assert_eq!(memory.load().len(), 100);
        assert_eq!(memory.load()[0].error, "error 5");
    }
}
