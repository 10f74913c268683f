//! `syntax_check` (spec.md §4.2.7): auto-detect a build/check command from
//! project markers, run it, and on failure surface only the lines that
//! look like compiler diagnostics.

use std::io::Read as _;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use regex::Regex;
use serde_json::{json, Value};

use super::{Tool, ToolContext, ToolEnvelope};

pub struct SyntaxCheck;

/// Picks a build/check command from recognized project markers
/// (spec.md §4.2.7). Checked in a fixed, most-specific-first order so a
/// repo with both `Cargo.toml` and a `Makefile` still gets `cargo check`.
pub fn detect_build_command(root: &Path) -> Option<String> {
    if root.join("Cargo.toml").exists() {
        return Some("cargo check --message-format=short".to_string());
    }
    if root.join("go.mod").exists() {
        return Some("go build ./...".to_string());
    }
    if let Ok(text) = std::fs::read_to_string(root.join("package.json")) {
        if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
            if parsed.get("scripts").and_then(|s| s.get("build")).is_some() {
                return Some("npm run build".to_string());
            }
        }
    }
    if root.join("CMakeLists.txt").exists() {
        return Some("cmake --build build".to_string());
    }
    if root.join("Makefile").exists() {
        return Some("make".to_string());
    }
    None
}

fn capture(mut stream: impl std::io::Read + Send + 'static, cap: usize) -> Arc<Mutex<Vec<u8>>> {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let out = Arc::clone(&buf);
    std::thread::spawn(move || {
        let mut chunk = [0u8; 4096];
        loop {
            let Ok(n) = stream.read(&mut chunk) else { break };
            if n == 0 {
                break;
            }
            let mut guard = out.lock().unwrap();
            if guard.len() < cap {
                let take = n.min(cap - guard.len());
                guard.extend_from_slice(&chunk[..take]);
            }
        }
    });
    buf
}

/// Runs `command` in `root`, returning `(output, succeeded)`.
fn run_for_status(root: &Path, command: &str, timeout: Duration, cap: usize) -> (String, bool) {
    let shell = if cfg!(windows) { "cmd" } else { "sh" };
    let shell_flag = if cfg!(windows) { "/C" } else { "-c" };

    let mut cmd = Command::new(shell);
    cmd.arg(shell_flag)
        .arg(command)
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let Ok(mut child) = cmd.spawn() else {
        return (format!("failed to spawn '{command}'"), false);
    };

    let out_buf = child.stdout.take().map(|s| capture(s, cap));
    let err_buf = child.stderr.take().map(|s| capture(s, cap));

    let deadline = Instant::now() + timeout;
    let (exit_ok, timed_out) = loop {
        match child.try_wait() {
            Ok(Some(status)) => break (status.success(), false),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    break (false, true);
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(_) => break (false, false),
        }
    };

    std::thread::sleep(Duration::from_millis(10));
    let mut combined = Vec::new();
    if let Some(buf) = out_buf {
        combined.extend_from_slice(&buf.lock().unwrap());
    }
    if let Some(buf) = err_buf {
        combined.extend_from_slice(&buf.lock().unwrap());
    }
    let mut text = String::from_utf8_lossy(&combined).into_owned();
    if timed_out {
        text.push_str(&format!("\n[timed out after {}s]", timeout.as_secs()));
    }
    (text, exit_ok && !timed_out)
}

/// Lines that look like a compiler error/warning diagnostic: `error`,
/// `warning`, or a `path:line:col` prefix.
fn diagnostic_lines(output: &str) -> Vec<String> {
    let marker = Regex::new(r"(?i)\b(error|warning)\b").unwrap();
    let location = Regex::new(r"^\S+:\d+(:\d+)?").unwrap();
    output
        .lines()
        .filter(|line| marker.is_match(line) || location.is_match(line))
        .map(|line| line.to_string())
        .collect()
}

impl Tool for SyntaxCheck {
    fn name(&self) -> &'static str {
        "syntax_check"
    }

    fn description(&self) -> &'static str {
        "Run the project's build/check command and report diagnostics on failure."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string"},
            },
        })
    }

    fn execute(&self, ctx: &ToolContext, args: Value) -> ToolEnvelope {
        let command = args
            .get("command")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| detect_build_command(&ctx.root));

        let Some(command) = command else {
            return ToolEnvelope::error("no build command could be detected for this project");
        };

        let timeout = Duration::from_secs(ctx.settings.tools.command_timeout_secs);
        let cap = ctx.settings.tools.command_output_cap_bytes;
        let (output, succeeded) = run_for_status(&ctx.root, &command, timeout, cap);

        if succeeded {
            ToolEnvelope::text(output)
                .with_field("command", command)
                .with_field("success", true)
        } else {
            let diagnostics = diagnostic_lines(&output);
            let text = if diagnostics.is_empty() { output } else { diagnostics.join("\n") };
            ToolEnvelope::text(text)
                .with_field("command", command)
                .with_field("success", false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use tempfile::TempDir;

    #[test]
    fn detects_cargo_project() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname=\"x\"\n").unwrap();
        assert_eq!(detect_build_command(dir.path()), Some("cargo check --message-format=short".to_string()));
    }

    #[test]
    fn detects_go_project() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("go.mod"), "module x\n").unwrap();
        assert_eq!(detect_build_command(dir.path()), Some("go build ./...".to_string()));
    }

    #[test]
    fn no_marker_files_detects_nothing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(detect_build_command(dir.path()), None);
    }

    #[test]
    fn explicit_command_override_runs_and_reports_failure() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(dir.path(), Settings::default(), None);
        let tool = SyntaxCheck;
        let result = tool.execute(&ctx, json!({"command": "echo error: bad syntax at line 3 && exit 1"}));
        assert_eq!(result.extra.get("success"), Some(&Value::Bool(false)));
        assert!(result.content[0].text.contains("error"));
    }

    #[test]
    fn explicit_command_override_runs_and_reports_success() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(dir.path(), Settings::default(), None);
        let tool = SyntaxCheck;
        let result = tool.execute(&ctx, json!({"command": "echo all good"}));
        assert_eq!(result.extra.get("success"), Some(&Value::Bool(true)));
    }
}
