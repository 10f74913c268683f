//! The on-disk patch stack (spec.md §3 "PatchStack entry", §4.2.3) and the
//! backup-path mirroring rule it depends on. Shared by `apply_patch` (push)
//! and the operator-triggered `undo` command (pop), which spec.md §7
//! places outside the agent loop.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::PhotonPaths;
use crate::error::{ToolError, ToolResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchStackEntry {
    pub timestamp: u64,
    pub affected_files: Vec<String>,
    pub patch_path: PathBuf,
}

/// Fold an absolute source path under `abs/` with drive/separator
/// sanitization, so backups of absolute paths never escape the
/// `.photon/backups/` tree (spec.md §4.2.3 step 2).
pub fn backup_path(paths: &PhotonPaths, relative_or_absolute: &Path) -> PathBuf {
    if relative_or_absolute.is_absolute() {
        let sanitized: String = relative_or_absolute
            .to_string_lossy()
            .chars()
            .map(|c| match c {
                ':' | '\\' => '_',
                '/' => std::path::MAIN_SEPARATOR,
                other => other,
            })
            .collect();
        let sanitized = sanitized.trim_start_matches(std::path::MAIN_SEPARATOR);
        paths.backups_dir().join("abs").join(sanitized)
    } else {
        paths.backups_dir().join(relative_or_absolute)
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn load(paths: &PhotonPaths) -> ToolResult<Vec<PatchStackEntry>> {
    let path = paths.patches_dir().join("patch_stack.json");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let body = std::fs::read_to_string(&path).map_err(|source| ToolError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|e| ToolError::InvalidArgs(e.to_string()))
}

fn save(paths: &PhotonPaths, entries: &[PatchStackEntry]) -> ToolResult<()> {
    let path = paths.patches_dir().join("patch_stack.json");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ToolError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let body = serde_json::to_string_pretty(entries).map_err(|e| ToolError::InvalidArgs(e.to_string()))?;
    std::fs::write(&path, body).map_err(|source| ToolError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Write the patch artifact, append one stack entry, and mirror the top
/// into `last.patch`/`last_patch.json` (spec.md §4.2.3 "Patch stack").
pub fn push(paths: &PhotonPaths, affected_files: Vec<String>, diff_text: &str) -> ToolResult<PatchStackEntry> {
    let timestamp = now_secs();
    let patch_path = paths.patches_dir().join(format!("{timestamp}.patch"));
    if let Some(parent) = patch_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ToolError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    std::fs::write(&patch_path, diff_text).map_err(|source| ToolError::Io {
        path: patch_path.display().to_string(),
        source,
    })?;

    let entry = PatchStackEntry {
        timestamp,
        affected_files,
        patch_path: patch_path.clone(),
    };

    let mut entries = load(paths)?;
    entries.push(entry.clone());
    save(paths, &entries)?;

    std::fs::write(paths.last_patch(), diff_text).map_err(|source| ToolError::Io {
        path: paths.last_patch().display().to_string(),
        source,
    })?;
    let entry_json = serde_json::to_string_pretty(&entry).map_err(|e| ToolError::InvalidArgs(e.to_string()))?;
    std::fs::write(paths.last_patch_json(), entry_json).map_err(|source| ToolError::Io {
        path: paths.last_patch_json().display().to_string(),
        source,
    })?;

    Ok(entry)
}

/// The top entry without popping it, so a caller can inspect the patch
/// file (e.g. to try a `git apply -R`) before `pop` removes it.
pub fn peek(paths: &PhotonPaths) -> ToolResult<Option<PatchStackEntry>> {
    Ok(load(paths)?.into_iter().next_back())
}

/// Pop the top entry, remove its patch file, and re-mirror the new top (if
/// any) into `last.patch`/`last_patch.json`.
pub fn pop(paths: &PhotonPaths) -> ToolResult<Option<PatchStackEntry>> {
    let mut entries = load(paths)?;
    let Some(top) = entries.pop() else {
        return Ok(None);
    };
    save(paths, &entries)?;
    let _ = std::fs::remove_file(&top.patch_path);

    match entries.last() {
        Some(new_top) => {
            if let Ok(text) = std::fs::read_to_string(&new_top.patch_path) {
                let _ = std::fs::write(paths.last_patch(), text);
            }
            if let Ok(json) = serde_json::to_string_pretty(new_top) {
                let _ = std::fs::write(paths.last_patch_json(), json);
            }
        }
        None => {
            let _ = std::fs::remove_file(paths.last_patch());
            let _ = std::fs::remove_file(paths.last_patch_json());
        }
    }

    Ok(Some(top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn push_then_pop_round_trips_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let paths = PhotonPaths::new(dir.path());

        let entry = push(&paths, vec!["a.txt".into()], "--- a\n+++ b\n").unwrap();
        assert!(entry.patch_path.exists());
        assert_eq!(load(&paths).unwrap().len(), 1);

        let popped = pop(&paths).unwrap().unwrap();
        assert_eq!(popped.affected_files, vec!["a.txt".to_string()]);
        assert!(!popped.patch_path.exists());
        assert!(load(&paths).unwrap().is_empty());
    }

    #[test]
    fn pop_on_empty_stack_is_none() {
        let dir = TempDir::new().unwrap();
        let paths = PhotonPaths::new(dir.path());
        assert!(pop(&paths).unwrap().is_none());
    }

    #[test]
    fn absolute_backup_paths_fold_under_abs_prefix() {
        let dir = TempDir::new().unwrap();
        let paths = PhotonPaths::new(dir.path());
        let abs = if cfg!(windows) {
            PathBuf::from(r"C:\repo\file.rs")
        } else {
            PathBuf::from("/repo/file.rs")
        };
        let backup = backup_path(&paths, &abs);
        assert!(backup.starts_with(paths.backups_dir().join("abs")));
    }
}
