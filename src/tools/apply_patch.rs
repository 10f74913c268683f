//! `apply_patch` (spec.md §4.2.3): the hardest tool. Whole-file or
//! line-range edits with conflict detection, backup, atomic per-file
//! writes, and a stacked, unified-diff undo trail.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use similar::TextDiff;

use super::patch_stack;
use super::{Tool, ToolContext, ToolEnvelope};
use crate::config::PhotonPaths;

pub struct ApplyPatch;

#[derive(Debug, Clone)]
struct Edit {
    start_line: u32,
    end_line: Option<u32>,
    content: String,
}

#[derive(Debug, Clone)]
enum FileOp {
    WholeFile(String),
    Edits(Vec<Edit>),
}

struct FileEntry {
    path: String,
    op: FileOp,
}

fn parse_edit(value: &Value) -> Option<Edit> {
    let start_line = value.get("start_line")?.as_u64()? as u32;
    let end_line = value.get("end_line").and_then(Value::as_u64).map(|v| v as u32);
    let content = value.get("content")?.as_str()?.to_string();
    Some(Edit {
        start_line,
        end_line,
        content,
    })
}

fn parse_entries(args: &Value) -> Result<Vec<FileEntry>, String> {
    let files = args
        .get("files")
        .and_then(Value::as_array)
        .ok_or("apply_patch requires a non-empty 'files' array")?;
    if files.is_empty() {
        return Err("apply_patch requires a non-empty 'files' array".into());
    }
    let mut out = Vec::with_capacity(files.len());
    for file in files {
        let path = file
            .get("path")
            .and_then(Value::as_str)
            .ok_or("every file entry requires 'path'")?
            .to_string();
        let op = if let Some(content) = file.get("content").and_then(Value::as_str) {
            FileOp::WholeFile(content.to_string())
        } else if let Some(edits) = file.get("edits").and_then(Value::as_array) {
            let parsed: Vec<Edit> = edits.iter().filter_map(parse_edit).collect();
            if parsed.len() != edits.len() || parsed.is_empty() {
                return Err(format!("'{path}' has malformed edits"));
            }
            FileOp::Edits(parsed)
        } else {
            return Err(format!("'{path}' must provide either 'content' or 'edits'"));
        };
        out.push(FileEntry { path, op });
    }
    Ok(out)
}

fn is_non_code(ctx: &ToolContext, path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_lowercase();
    ctx.settings.tools.non_code_extensions.iter().any(|e| e == &ext)
}

fn write_atomic(path: &Path, body: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("patch").to_string();
    tmp_name.push_str(".tmp");
    let tmp = path.with_file_name(tmp_name);
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)
}

/// Apply edits sorted by descending `start_line`, so later edits cannot
/// renumber lines the earlier ones still need (spec.md §5 "Ordering
/// guarantees").
fn apply_edits(original: &str, edits: &[Edit], max_lines: u32, non_code: bool) -> Result<String, String> {
    let mut lines: Vec<String> = original.lines().map(str::to_string).collect();
    let trailing_newline = original.ends_with('\n') || original.is_empty();

    let mut sorted = edits.to_vec();
    sorted.sort_by(|a, b| b.start_line.cmp(&a.start_line));

    for edit in &sorted {
        let is_insertion = edit.end_line.is_none_or(|e| e < edit.start_line);
        if edit.start_line < 1 {
            return Err(format!("edit start_line {} is less than 1", edit.start_line));
        }
        let new_content_lines: Vec<&str> = edit.content.lines().collect();

        if is_insertion {
            let idx = (edit.start_line as usize - 1).min(lines.len());
            for (i, l) in new_content_lines.iter().enumerate() {
                lines.insert(idx + i, l.to_string());
            }
        } else {
            let end_line = edit.end_line.unwrap();
            if end_line as usize > lines.len() {
                return Err(format!(
                    "edit end_line {end_line} exceeds file length {}",
                    lines.len()
                ));
            }
            if !non_code && end_line - edit.start_line + 1 > max_lines {
                return Err(format!(
                    "range edit [{}, {end_line}] spans more than {max_lines} lines",
                    edit.start_line
                ));
            }
            let start_idx = edit.start_line as usize - 1;
            let end_idx = end_line as usize;
            lines.splice(start_idx..end_idx, new_content_lines.iter().map(|s| s.to_string()));
        }
    }

    let mut body = lines.join("\n");
    if trailing_newline && !body.is_empty() {
        body.push('\n');
    }
    Ok(body)
}

fn unified_diff(path: &str, before: &str, after: &str) -> String {
    TextDiff::from_lines(before, after)
        .unified_diff()
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

impl Tool for ApplyPatch {
    fn name(&self) -> &'static str {
        "apply_patch"
    }

    fn description(&self) -> &'static str {
        "Apply whole-file or line-range edits to one or more files, with \
         conflict detection against the last read, a pre-edit backup, and a \
         stacked, undoable unified diff."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "files": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "path": {"type": "string"},
                            "content": {"type": "string"},
                            "edits": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "start_line": {"type": "integer"},
                                        "end_line": {"type": "integer"},
                                        "content": {"type": "string"},
                                    },
                                    "required": ["start_line", "content"],
                                },
                            },
                        },
                        "required": ["path"],
                    },
                },
                "backup": {"type": "boolean"},
            },
            "required": ["files"],
        })
    }

    fn execute(&self, ctx: &ToolContext, args: Value) -> ToolEnvelope {
        let entries = match parse_entries(&args) {
            Ok(e) => e,
            Err(message) => return ToolEnvelope::error(message),
        };
        let backup = args.get("backup").and_then(Value::as_bool).unwrap_or(ctx.settings.tools.backup_by_default);
        let paths = PhotonPaths::new(&ctx.root);
        let max_lines = ctx.settings.tools.max_read_lines;

        let mut touched: Vec<String> = Vec::new();
        let mut diffs: Vec<String> = Vec::new();

        for entry in &entries {
            let abs = ctx.abs_path(&entry.path);

            if let Some(expected_hash) = ctx.recorded_hash(&abs) {
                if let Ok(current) = std::fs::read(&abs) {
                    let current_hash = crate::symbol::fnv1a_64(&current);
                    if current_hash != expected_hash {
                        return ToolEnvelope::error(format!("CONFLICT DETECTED: {}", entry.path));
                    }
                }
            }

            let before = std::fs::read_to_string(&abs).unwrap_or_default();
            let existed = abs.exists();

            if backup && existed {
                let backup_path = patch_stack::backup_path(&paths, Path::new(&entry.path));
                if let Some(parent) = backup_path.parent() {
                    if std::fs::create_dir_all(parent).is_err() {
                        return ToolEnvelope::error(format!("failed to create backup dir for '{}'", entry.path));
                    }
                }
                if std::fs::copy(&abs, &backup_path).is_err() {
                    return ToolEnvelope::error(format!("failed to back up '{}'", entry.path));
                }
            }

            let after = match &entry.op {
                FileOp::WholeFile(content) => content.clone(),
                FileOp::Edits(edits) => {
                    let non_code = is_non_code(ctx, &abs);
                    match apply_edits(&before, edits, max_lines, non_code) {
                        Ok(body) => body,
                        Err(message) => return ToolEnvelope::error(format!("'{}': {message}", entry.path)),
                    }
                }
            };

            if write_atomic(&abs, &after).is_err() {
                return ToolEnvelope::error(format!("failed to write '{}'", entry.path));
            }

            diffs.push(unified_diff(&entry.path, &before, &after));
            touched.push(entry.path.clone());
        }

        if touched.is_empty() {
            return ToolEnvelope::error("apply_patch applied no files");
        }

        let combined_diff = diffs.join("\n");
        match patch_stack::push(&paths, touched.clone(), &combined_diff) {
            Ok(_) => ToolEnvelope::text(format!("applied patch to {} file(s)", touched.len()))
                .with_field("files", touched),
            Err(e) => ToolEnvelope::error(format!("files written but patch stack update failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use tempfile::TempDir;

    fn ctx(dir: &TempDir) -> ToolContext {
        ToolContext::new(dir.path(), Settings::default(), None)
    }

    #[test]
    fn whole_file_write_creates_backup_and_stack_entry() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "old\n").unwrap();
        let ctx = ctx(&dir);
        let tool = ApplyPatch;
        let result = tool.execute(&ctx, json!({"files": [{"path": "a.txt", "content": "new\n"}]}));
        assert!(!result.is_error(), "{:?}", result.error);
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "new\n");
        let paths = PhotonPaths::new(dir.path());
        assert_eq!(patch_stack::load(&paths).unwrap().len(), 1);
    }

    #[test]
    fn apply_then_undo_round_trips_exactly() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("doc.txt"), "A\nB\nC\n").unwrap();
        let ctx = ctx(&dir);
        let tool = ApplyPatch;
        let result = tool.execute(
            &ctx,
            json!({"files": [{"path": "doc.txt", "edits": [{"start_line": 2, "end_line": 2, "content": "B\nX\nY\n"}]}]}),
        );
        assert!(!result.is_error(), "{:?}", result.error);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("doc.txt")).unwrap(),
            "A\nB\nX\nY\nC\n"
        );

        let paths = PhotonPaths::new(dir.path());
        let entry = patch_stack::pop(&paths).unwrap().unwrap();
        for file in &entry.affected_files {
            let backup = patch_stack::backup_path(&paths, Path::new(file));
            std::fs::copy(&backup, dir.path().join(file)).unwrap();
        }
        assert_eq!(std::fs::read_to_string(dir.path().join("doc.txt")).unwrap(), "A\nB\nC\n");
    }

    #[test]
    fn range_end_beyond_file_length_errors_without_writing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "A\nB\n").unwrap();
        let ctx = ctx(&dir);
        let tool = ApplyPatch;
        let result = tool.execute(
            &ctx,
            json!({"files": [{"path": "a.txt", "edits": [{"start_line": 1, "end_line": 10, "content": "X\n"}]}]}),
        );
        assert!(result.is_error());
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "A\nB\n");
    }

    #[test]
    fn empty_files_array_is_rejected() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        let tool = ApplyPatch;
        let result = tool.execute(&ctx, json!({"files": []}));
        assert!(result.is_error());
    }

    #[test]
    fn conflict_is_detected_against_last_read_hash() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        std::fs::write(&path, "line1\nline2\nline3\n").unwrap();
        let ctx = ctx(&dir);
        ctx.record_read(&path, b"line1\nline2\nline3\n");
        std::fs::write(&path, "line1\nline2\nline3\nline4\n").unwrap();

        let tool = ApplyPatch;
        let result = tool.execute(&ctx, json!({"files": [{"path": "x.txt", "content": "new\n"}]}));
        assert!(result.is_error());
        assert_eq!(result.error.unwrap(), "CONFLICT DETECTED: x.txt");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "line1\nline2\nline3\nline4\n"
        );
    }
}
