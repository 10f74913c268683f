//! `grep` (spec.md §4.2.6): a literal or regex content search. Delegates
//! to the host's `git grep`, `rg`, or `grep -rn` when present; otherwise
//! falls back to a built-in parallel scan with one `rayon` task per file
//! chunk.

use std::path::Path;
use std::process::Command;

use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use super::{Tool, ToolContext, ToolEnvelope};
use crate::index::walk;

#[derive(Debug, Clone, Serialize)]
pub struct GrepMatch {
    pub file: String,
    pub line: u32,
    pub content: String,
}

fn host_tool_available(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

/// Parse `path:line:content` output shared by `git grep -n`, `rg -n`, and
/// `grep -rn`.
fn parse_colon_triples(output: &str, max_results: usize) -> Vec<GrepMatch> {
    let mut out = Vec::new();
    for line in output.lines() {
        if out.len() >= max_results {
            break;
        }
        let mut parts = line.splitn(3, ':');
        let (Some(file), Some(line_no), Some(content)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        let Ok(line_no) = line_no.parse::<u32>() else {
            continue;
        };
        out.push(GrepMatch {
            file: file.to_string(),
            line: line_no,
            content: content.to_string(),
        });
    }
    out
}

fn run_host_tool(root: &Path, pattern: &str, max_results: usize) -> Option<Vec<GrepMatch>> {
    // `--no-index` makes `git grep` work outside a git repository and
    // search untracked files too, rather than only the tracked index;
    // `-F`/`--fixed-strings` keep this path literal, matching the
    // `!use_regex` caller (regex searches always go through
    // `scan_built_in` instead).
    let candidates: &[(&str, &[&str])] = &[
        ("git", &["grep", "--no-index", "-n", "-F"]),
        ("rg", &["--no-heading", "--line-number", "--with-filename", "--fixed-strings"]),
        ("grep", &["-rn", "-F"]),
    ];
    for (program, base_args) in candidates {
        if !host_tool_available(program) {
            continue;
        }
        let output = Command::new(program)
            .args(*base_args)
            .arg(pattern)
            .args(if *program == "grep" { Some(".") } else { None })
            .current_dir(root)
            .output();
        let Ok(output) = output else { continue };
        // Exit 0 (matches found) and 1 (ran cleanly, zero matches) are
        // both valid results for git/rg/grep. Anything else — e.g. git
        // grep's 128 when the tree isn't a repository it can search —
        // means this candidate didn't actually run the search, so fall
        // through to the next one instead of reporting a false zero.
        match output.status.code() {
            Some(0) | Some(1) => {
                let text = String::from_utf8_lossy(&output.stdout);
                return Some(parse_colon_triples(&text, max_results));
            }
            _ => continue,
        }
    }
    None
}

/// Built-in fallback: one `rayon` task per hardware-thread-sized chunk of
/// the file list (spec.md §4.2.6, §5 "bounded worker pool").
pub fn scan_built_in(
    root: &Path,
    pattern: &str,
    use_regex: bool,
    ignore_patterns: &[String],
    max_results: usize,
) -> Vec<GrepMatch> {
    let files = walk::walk_files(root, ignore_patterns);
    let regex = if use_regex { Regex::new(pattern).ok() } else { None };

    let num_threads = num_cpus::get().max(2);
    let chunk_size = (files.len() / num_threads).max(1);

    let mut matches: Vec<GrepMatch> = files
        .chunks(chunk_size)
        .collect::<Vec<_>>()
        .into_par_iter()
        .flat_map(|chunk| {
            let mut local = Vec::new();
            for path in chunk {
                let Ok(content) = std::fs::read_to_string(path) else {
                    continue;
                };
                let rel = walk::relative_path(root, path);
                for (idx, line) in content.lines().enumerate() {
                    let is_match = match &regex {
                        Some(re) => re.is_match(line),
                        None => line.contains(pattern),
                    };
                    if is_match {
                        local.push(GrepMatch {
                            file: rel.display().to_string(),
                            line: idx as u32 + 1,
                            content: line.to_string(),
                        });
                    }
                }
            }
            local
        })
        .collect();
    matches.truncate(max_results);
    matches
}

pub struct Grep;

impl Tool for Grep {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "Search file contents for a literal string or regular expression."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "regex": {"type": "boolean"},
                "max_results": {"type": "integer"},
            },
            "required": ["pattern"],
        })
    }

    fn execute(&self, ctx: &ToolContext, args: Value) -> ToolEnvelope {
        let Some(pattern) = args.get("pattern").and_then(Value::as_str) else {
            return ToolEnvelope::error("grep requires 'pattern'");
        };
        let use_regex = args.get("regex").and_then(Value::as_bool).unwrap_or(false);
        let max_results = args
            .get("max_results")
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(ctx.settings.tools.grep_max_results);

        let matches = if !use_regex {
            run_host_tool(&ctx.root, pattern, max_results)
                .unwrap_or_else(|| scan_built_in(&ctx.root, pattern, use_regex, &ctx.settings.indexing.ignore_patterns, max_results))
        } else {
            scan_built_in(&ctx.root, pattern, use_regex, &ctx.settings.indexing.ignore_patterns, max_results)
        };

        let count = matches.len();
        let value = serde_json::to_value(&matches).unwrap_or(Value::Array(Vec::new()));
        ToolEnvelope::text(format!("{count} match(es)"))
            .with_field("matches", value)
            .with_field("count", count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn built_in_scan_finds_literal_token() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "line1\nTOKEN\nline3\n").unwrap();
        let matches = scan_built_in(dir.path(), "TOKEN", false, &[], 200);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file, "a.txt");
        assert_eq!(matches[0].line, 2);
        assert!(matches[0].content.contains("TOKEN"));
    }

    #[test]
    fn max_results_caps_output() {
        let dir = TempDir::new().unwrap();
        let body: String = (0..10).map(|_| "TOKEN\n").collect();
        std::fs::write(dir.path().join("a.txt"), body).unwrap();
        let matches = scan_built_in(dir.path(), "TOKEN", false, &[], 3);
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn regex_mode_matches_pattern() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "foo123\nbar\n").unwrap();
        let matches = scan_built_in(dir.path(), r"foo\d+", true, &[], 200);
        assert_eq!(matches.len(), 1);
    }
}
