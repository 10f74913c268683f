//! `list_project_files` (spec.md §4.2.5): a depth-capped directory tree,
//! optionally decorated with a per-file `sym` summary string sourced from
//! one batched, shared-lock read of the Symbol Index.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::{Tool, ToolContext, ToolEnvelope};

pub struct ListProjectFiles;

struct Entry {
    name: String,
    is_directory: bool,
    children: Vec<Entry>,
    sym: Option<String>,
}

impl Entry {
    fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("name".into(), Value::String(self.name.clone()));
        obj.insert("is_directory".into(), Value::Bool(self.is_directory));
        if let Some(sym) = &self.sym {
            obj.insert("sym".into(), Value::String(sym.clone()));
        }
        if self.is_directory {
            obj.insert(
                "children".into(),
                Value::Array(self.children.iter().map(Entry::to_json).collect()),
            );
        }
        Value::Object(obj)
    }
}

fn is_ignored(name: &str, ignore_patterns: &[String]) -> bool {
    ignore_patterns.iter().any(|p| p == name)
}

fn collect_code_files(root: &Path, start: &Path, depth_left: usize, ignore_patterns: &[String], out: &mut Vec<PathBuf>) {
    if depth_left == 0 {
        return;
    }
    let Ok(read_dir) = std::fs::read_dir(start) else {
        return;
    };
    for entry in read_dir.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_ignored(&name, ignore_patterns) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            collect_code_files(root, &path, depth_left - 1, ignore_patterns, out);
        } else {
            out.push(crate::index::walk::relative_path(root, &path));
        }
    }
}

fn build_tree(
    root: &Path,
    start: &Path,
    depth_left: usize,
    ignore_patterns: &[String],
    symbols: &std::collections::HashMap<PathBuf, Vec<crate::symbol::Symbol>>,
) -> Vec<Entry> {
    let Ok(mut read_dir) = std::fs::read_dir(start).map(|r| r.flatten().collect::<Vec<_>>()) else {
        return Vec::new();
    };
    read_dir.sort_by_key(|e| e.file_name());

    let mut entries = Vec::new();
    for dir_entry in read_dir {
        let name = dir_entry.file_name().to_string_lossy().into_owned();
        if is_ignored(&name, ignore_patterns) {
            continue;
        }
        let path = dir_entry.path();
        let is_directory = path.is_dir();
        let children = if is_directory && depth_left > 0 {
            build_tree(root, &path, depth_left - 1, ignore_patterns, symbols)
        } else {
            Vec::new()
        };
        let sym = if !is_directory {
            let rel = crate::index::walk::relative_path(root, &path);
            symbols.get(&rel).and_then(|syms| format_sym(syms))
        } else {
            None
        };
        entries.push(Entry {
            name,
            is_directory,
            children,
            sym,
        });
    }
    entries
}

/// `C:<class-name>[, …]; F:<function-name>[, …]` (spec.md §4.2.5).
fn format_sym(symbols: &[crate::symbol::Symbol]) -> Option<String> {
    use crate::types::SymbolKind;
    let classes: Vec<&str> = symbols
        .iter()
        .filter(|s| matches!(s.kind, SymbolKind::Class | SymbolKind::Struct | SymbolKind::Interface | SymbolKind::Enum))
        .map(|s| s.name.as_ref())
        .collect();
    let functions: Vec<&str> = symbols
        .iter()
        .filter(|s| matches!(s.kind, SymbolKind::Function | SymbolKind::Method))
        .map(|s| s.name.as_ref())
        .collect();
    if classes.is_empty() && functions.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    if !classes.is_empty() {
        parts.push(format!("C:{}", classes.join(", ")));
    }
    if !functions.is_empty() {
        parts.push(format!("F:{}", functions.join(", ")));
    }
    Some(parts.join("; "))
}

impl Tool for ListProjectFiles {
    fn name(&self) -> &'static str {
        "list_project_files"
    }

    fn description(&self) -> &'static str {
        "List the project tree under a path, to a max depth, optionally \
         decorated with a per-file class/function summary."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "max_depth": {"type": "integer"},
                "include_symbols": {"type": "boolean"},
            },
        })
    }

    fn execute(&self, ctx: &ToolContext, args: Value) -> ToolEnvelope {
        let start_rel = args.get("path").and_then(Value::as_str).unwrap_or(".");
        let start = ctx.abs_path(start_rel);
        let max_depth = args
            .get("max_depth")
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(ctx.settings.indexing.list_max_depth);
        let include_symbols = args.get("include_symbols").and_then(Value::as_bool).unwrap_or(false);

        if !start.exists() {
            return ToolEnvelope::error(format!("path '{start_rel}' does not exist"));
        }

        let symbols = if include_symbols {
            if let Some(index) = &ctx.index {
                let mut code_files = Vec::new();
                collect_code_files(&ctx.root, &start, max_depth, &ctx.settings.indexing.ignore_patterns, &mut code_files);
                index.file_symbols_batch(&code_files)
            } else {
                std::collections::HashMap::new()
            }
        } else {
            std::collections::HashMap::new()
        };

        let entries = build_tree(&ctx.root, &start, max_depth, &ctx.settings.indexing.ignore_patterns, &symbols);
        let tree = Value::Array(entries.iter().map(Entry::to_json).collect());
        ToolEnvelope::text(format!("{} entries", entries.len())).with_field("tree", tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use tempfile::TempDir;

    #[test]
    fn lists_a_nested_tree() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.rs"), "fn main() {}\n").unwrap();
        let ctx = ToolContext::new(dir.path(), Settings::default(), None);
        let tool = ListProjectFiles;
        let result = tool.execute(&ctx, json!({}));
        assert!(!result.is_error());
        let tree = result.extra.get("tree").unwrap().as_array().unwrap();
        assert!(tree.iter().any(|e| e["name"] == "src"));
    }

    #[test]
    fn missing_path_errors() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(dir.path(), Settings::default(), None);
        let tool = ListProjectFiles;
        let result = tool.execute(&ctx, json!({"path": "nope"}));
        assert!(result.is_error());
    }
}
