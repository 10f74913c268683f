//! Message-history compression (spec.md §4.5 "Message compression"):
//! once the history grows past a character threshold, superseded
//! tool-result bodies collapse into a one-line `[READ_SUMMARY]` marker
//! so the model keeps only the latest view of each resource it touched.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Present on `Role::Tool` messages; the id the model's `tool_calls`
    /// entry used to request this result.
    pub tool_call_id: Option<String>,
    /// The tool that produced this message, e.g. `"read_code_block"`.
    pub tool_name: Option<String>,
    /// A stable key identifying *what* was read/acted on (e.g. a file
    /// path), used to dedup repeated reads of the same resource.
    pub resource_key: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), tool_call_id: None, tool_name: None, resource_key: None }
    }

    pub fn tool_result(tool_name: &str, tool_call_id: &str, resource_key: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.to_string()),
            tool_name: Some(tool_name.to_string()),
            resource_key: resource_key.map(str::to_string),
        }
    }
}

fn total_chars(messages: &[Message]) -> usize {
    messages.iter().map(|m| m.content.len()).sum()
}

/// Compresses `messages` in place once their combined length exceeds
/// `threshold_chars`. Two passes, oldest-first:
///
/// 1. Dedup: for tool messages sharing a `(tool_name, resource_key)`,
///    every occurrence but the most recent collapses to a
///    `[READ_SUMMARY]` marker — the model already has the latest view.
/// 2. If still over threshold, truncate remaining large tool bodies to a
///    `[READ_SUMMARY]` + excerpt.
///
/// Returns whether anything was rewritten.
pub fn compress(messages: &mut [Message], threshold_chars: usize) -> bool {
    if total_chars(messages) <= threshold_chars {
        return false;
    }

    let mut latest_index: std::collections::HashMap<(String, String), usize> = std::collections::HashMap::new();
    for (i, message) in messages.iter().enumerate() {
        if let (Some(tool), Some(key)) = (&message.tool_name, &message.resource_key) {
            latest_index.insert((tool.clone(), key.clone()), i);
        }
    }

    let mut changed = false;
    for (i, message) in messages.iter_mut().enumerate() {
        if message.content.starts_with("[READ_SUMMARY]") {
            continue;
        }
        let Some(tool) = &message.tool_name else { continue };
        let Some(key) = &message.resource_key else { continue };
        let is_latest = latest_index.get(&(tool.clone(), key.clone())) == Some(&i);
        if !is_latest {
            message.content = format!("[READ_SUMMARY] superseded {tool} result for {key}");
            changed = true;
        }
    }

    if total_chars(messages) > threshold_chars {
        const EXCERPT_CHARS: usize = 400;
        for message in messages.iter_mut() {
            if message.role == Role::Tool && message.content.len() > EXCERPT_CHARS && !message.content.starts_with("[READ_SUMMARY]") {
                let excerpt: String = message.content.chars().take(EXCERPT_CHARS).collect();
                message.content = format!("[READ_SUMMARY] {excerpt}…");
                changed = true;
            }
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_is_left_untouched() {
        let mut messages = vec![Message::system("hi")];
        assert!(!compress(&mut messages, 1000));
        assert_eq!(messages[0].content, "hi");
    }

    #[test]
    fn superseded_duplicate_reads_collapse_keeping_the_latest() {
        let mut messages = vec![
            Message::tool_result("read_code_block", "1", Some("a.rs"), "x".repeat(50)),
            Message::tool_result("read_code_block", "2", Some("a.rs"), "y".repeat(50)),
        ];
        assert!(compress(&mut messages, 10));
        assert!(messages[0].content.starts_with("[READ_SUMMARY]"));
        assert_eq!(messages[1].content, "y".repeat(50));
    }

    #[test]
    fn oversized_single_body_is_excerpted() {
        let mut messages = vec![Message::tool_result("grep", "1", Some("pattern"), "z".repeat(2000))];
        assert!(compress(&mut messages, 10));
        assert!(messages[0].content.starts_with("[READ_SUMMARY]"));
        assert!(messages[0].content.len() < 2000);
    }
}
