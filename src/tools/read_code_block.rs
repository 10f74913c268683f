//! `read_code_block` (spec.md §4.2.2): symbol-aware reads. Code files
//! without an explicit scope get a symbol summary, never the full body,
//! unless the file has no extracted symbols at all.

use serde_json::{json, Value};

use super::{Tool, ToolContext, ToolEnvelope};

pub struct ReadCodeBlock;

fn is_non_code(ctx: &ToolContext, path: &std::path::Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    ctx.settings.tools.non_code_extensions.iter().any(|e| e == &ext)
        || path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| ctx.settings.tools.non_code_extensions.iter().any(|e| e == n))
            .unwrap_or(false)
}

fn numbered(lines: &[&str], start_line: u32) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>5}\t{}", start_line as usize + i, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_one(ctx: &ToolContext, args: &Value) -> ToolEnvelope {
    let Some(file_path) = args.get("file_path").and_then(Value::as_str) else {
        return ToolEnvelope::error("read_code_block requires 'file_path'");
    };
    let abs = ctx.abs_path(file_path);
    let Ok(content) = std::fs::read_to_string(&abs) else {
        return ToolEnvelope::error(format!("cannot read '{file_path}'"));
    };
    let total_lines = content.lines().count() as u32;
    let max_lines = ctx.settings.tools.max_read_lines;
    let non_code = is_non_code(ctx, &abs);

    let symbol_name = args.get("symbol_name").and_then(Value::as_str);
    let start_line = args.get("start_line").and_then(Value::as_u64).map(|v| v as u32);
    let end_line = args.get("end_line").and_then(Value::as_u64).map(|v| v as u32);

    let (from, to) = if let Some(name) = symbol_name {
        let rel = crate::index::walk::relative_path(&ctx.root, &abs);
        let symbol = ctx
            .index
            .as_ref()
            .and_then(|idx| idx.file_symbols(&rel).into_iter().find(|s| &*s.name == name));
        match symbol {
            Some(s) => (s.range.start_line, if s.range.end_line == 0 { total_lines } else { s.range.end_line }),
            None => return ToolEnvelope::error(format!("symbol '{name}' not found in '{file_path}'")),
        }
    } else if let (Some(s), Some(e)) = (start_line, end_line) {
        (s, e)
    } else if non_code {
        (1, total_lines)
    } else {
        return symbol_summary(ctx, &abs, file_path, &content, total_lines);
    };

    if from < 1 || to > total_lines.max(1) || to < from {
        return ToolEnvelope::error(format!(
            "invalid range [{from}, {to}] for '{file_path}' ({total_lines} lines)"
        ));
    }
    if !non_code && to - from + 1 > max_lines {
        return ToolEnvelope::error(format!(
            "read of {} lines exceeds the {max_lines}-line cap for '{file_path}'",
            to - from + 1
        ));
    }

    let lines: Vec<&str> = content.lines().collect();
    let slice = &lines[(from as usize - 1)..(to as usize).min(lines.len())];
    ctx.record_read(&abs, content.as_bytes());

    ToolEnvelope::text(numbered(slice, from))
        .with_field("file_path", file_path)
        .with_field("start_line", from)
        .with_field("end_line", to)
}

/// Code file, no explicit scope: return a symbol summary rather than the
/// full file body (spec.md §4.2.2 "Policy").
fn symbol_summary(
    ctx: &ToolContext,
    abs: &std::path::Path,
    file_path: &str,
    content: &str,
    total_lines: u32,
) -> ToolEnvelope {
    let rel = crate::index::walk::relative_path(&ctx.root, abs);
    let symbols = ctx.index.as_ref().map(|idx| idx.file_symbols(&rel)).unwrap_or_default();

    if symbols.is_empty() {
        // No extracted symbols at all: fall back to the full content,
        // still subject to the line cap.
        let max_lines = ctx.settings.tools.max_read_lines;
        if total_lines > max_lines {
            return ToolEnvelope::error(format!(
                "'{file_path}' has {total_lines} lines and no symbol_name/line range was given; \
                 it exceeds the {max_lines}-line cap"
            ));
        }
        ctx.record_read(abs, content.as_bytes());
        let lines: Vec<&str> = content.lines().collect();
        return ToolEnvelope::text(numbered(&lines, 1)).with_field("file_path", file_path);
    }

    let summary: Vec<Value> = symbols
        .iter()
        .map(|s| {
            json!({
                "kind": s.kind.as_str(),
                "name": &*s.name,
                "start_line": s.range.start_line,
                "end_line": s.range.end_line,
            })
        })
        .collect();
    ToolEnvelope::text(format!("{} symbols in '{file_path}'", summary.len()))
        .with_field("file_path", file_path)
        .with_field("symbols", Value::Array(summary))
}

impl Tool for ReadCodeBlock {
    fn name(&self) -> &'static str {
        "read_code_block"
    }

    fn description(&self) -> &'static str {
        "Read a symbol body, an explicit line range, or a whole non-code file. \
         Code files read without a scope return a symbol summary instead of \
         the full body."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {"type": "string"},
                "symbol_name": {"type": "string"},
                "start_line": {"type": "integer"},
                "end_line": {"type": "integer"},
                "requests": {
                    "type": "array",
                    "items": {"type": "object"},
                },
            },
        })
    }

    fn execute(&self, ctx: &ToolContext, args: Value) -> ToolEnvelope {
        if let Some(requests) = args.get("requests").and_then(Value::as_array) {
            let results: Vec<Value> = requests.iter().map(|r| read_one(ctx, r).to_json()).collect();
            return ToolEnvelope::text(format!("{} batched reads", results.len()))
                .with_field("results", Value::Array(results));
        }
        read_one(ctx, &args)
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
    fn explicit_range_returns_numbered_lines() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "A\nB\nC\n").unwrap();
        let ctx = ctx(&dir);
        let tool = ReadCodeBlock;
        let result = tool.execute(&ctx, json!({"file_path": "a.txt", "start_line": 1, "end_line": 2}));
        assert!(!result.is_error());
        assert!(result.content[0].text.contains("A"));
        assert!(result.content[0].text.contains("B"));
        assert!(!result.content[0].text.contains("C"));
    }

    #[test]
    fn out_of_bounds_range_errors_without_reading() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "A\nB\n").unwrap();
        let ctx = ctx(&dir);
        let tool = ReadCodeBlock;
        let result = tool.execute(&ctx, json!({"file_path": "a.txt", "start_line": 1, "end_line": 10}));
        assert!(result.is_error());
    }

    #[test]
    fn code_file_without_scope_and_no_symbols_falls_back_to_full_content() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "// just a comment\n").unwrap();
        let ctx = ctx(&dir);
        let tool = ReadCodeBlock;
        let result = tool.execute(&ctx, json!({"file_path": "a.rs"}));
        assert!(!result.is_error());
    }

    #[test]
    fn non_code_file_without_scope_reads_whole_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.md"), "# Title\nbody\n").unwrap();
        let ctx = ctx(&dir);
        let tool = ReadCodeBlock;
        let result = tool.execute(&ctx, json!({"file_path": "a.md"}));
        assert!(!result.is_error());
        assert!(result.content[0].text.contains("Title"));
    }
}
