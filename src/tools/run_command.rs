//! `run_command` (spec.md §4.2.4): execute a shell command in the project
//! root, capture combined output up to a byte cap, enforce a wall-clock
//! timeout. No safety filtering here — policy is the Constitution's job
//! (spec.md §4.2.4, §7).

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use super::{Tool, ToolContext, ToolEnvelope};

pub struct RunCommand;

fn capture(mut stream: impl Read + Send + 'static, cap: usize) -> Arc<Mutex<Vec<u8>>> {
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

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap_or_else(|e| {
        String::from_utf8_lossy(e.as_bytes())
            .chars()
            .map(|c| if c == '\u{FFFD}' { '?' } else { c })
            .collect()
    })
}

/// Runs `command`, returning `(output, timed_out)`.
pub fn run(root: &std::path::Path, command: &str, timeout: Duration, output_cap: usize) -> (String, bool) {
    let needs_stdin = command.contains('<') || command.contains('|');
    let shell = if cfg!(windows) { "cmd" } else { "sh" };
    let shell_flag = if cfg!(windows) { "/C" } else { "-c" };

    let mut cmd = Command::new(shell);
    cmd.arg(shell_flag)
        .arg(command)
        .current_dir(root)
        .stdin(if needs_stdin { Stdio::inherit() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let Ok(mut child) = cmd.spawn() else {
        return ("failed to spawn command".to_string(), false);
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_buf = stdout.map(|s| capture(s, output_cap));
    let err_buf = stderr.map(|s| capture(s, output_cap));

    let deadline = Instant::now() + timeout;
    let timed_out = loop {
        match child.try_wait() {
            Ok(Some(_)) => break false,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    break true;
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(_) => break false,
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

    let mut text = lossy(&combined);
    if timed_out {
        text.push_str(&format!("\n[timed out after {}s]", timeout.as_secs()));
    }
    (text, timed_out)
}

impl Tool for RunCommand {
    fn name(&self) -> &'static str {
        "run_command"
    }

    fn description(&self) -> &'static str {
        "Execute a shell command in the project root and return its \
         captured output, subject to a byte cap and wall-clock timeout."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"command": {"type": "string"}},
            "required": ["command"],
        })
    }

    fn execute(&self, ctx: &ToolContext, args: Value) -> ToolEnvelope {
        let Some(command) = args.get("command").and_then(Value::as_str) else {
            return ToolEnvelope::error("run_command requires 'command'");
        };
        let timeout = Duration::from_secs(ctx.settings.tools.command_timeout_secs);
        let cap = ctx.settings.tools.command_output_cap_bytes;
        let (output, timed_out) = run(&ctx.root, command, timeout, cap);
        ToolEnvelope::text(output).with_field("timed_out", timed_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use tempfile::TempDir;

    #[test]
    fn captures_stdout() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(dir.path(), Settings::default(), None);
        let tool = RunCommand;
        let result = tool.execute(&ctx, json!({"command": "echo hello"}));
        assert!(!result.is_error());
        assert!(result.content[0].text.contains("hello"));
    }

    #[test]
    fn timeout_is_enforced() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.tools.command_timeout_secs = 1;
        let ctx = ToolContext::new(dir.path(), settings, None);
        let tool = RunCommand;
        let result = tool.execute(&ctx, json!({"command": "sleep 5"}));
        assert_eq!(result.extra.get("timed_out"), Some(&Value::Bool(true)));
    }
}
