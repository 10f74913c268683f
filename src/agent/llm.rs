//! A blocking HTTP client for the LLM endpoint (spec.md §5 "Model calls
//! block the agent loop"; §6 "LLM envelope"). Grounded in the teacher's
//! pattern of wrapping `reqwest::blocking` behind a narrow client type
//! rather than pulling in an async runtime for one outbound call site.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmConfig;
use crate::error::{AgentError, AgentResult};

#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub role: String,
    /// `None` only makes sense for assistant tool-call-only turns; the
    /// wire format otherwise always carries a string or array content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallWire>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallWire {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallWire>,
}

/// What the model handed back for one plan step: final content, planned
/// tool calls, or both absent (treated as "no calls, empty content").
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallWire>,
}

/// Normalizes outbound messages for providers with narrower wire
/// contracts than OpenAI's (spec.md §6): array-typed `content` flattened
/// to a string, and/or the tool-result `name` field dropped.
fn normalize(mut messages: Vec<WireMessage>, config: &LlmConfig) -> Vec<WireMessage> {
    for message in &mut messages {
        if config.flatten_content {
            if let Some(Value::Array(parts)) = &message.content {
                let flattened = parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("\n");
                message.content = Some(Value::String(flattened));
            }
        }
        if config.drop_tool_result_name && message.role == "tool" {
            message.name = None;
        }
    }
    messages
}

pub struct LlmClient {
    client: reqwest::blocking::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> AgentResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .build()
            .map_err(|e| AgentError::Llm(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Posts one chat-completion request with up to
    /// `config.max_retries` exponential-backoff retries on transient
    /// failures (spec.md §5 "three retries with exponential backoff").
    pub fn complete(&self, messages: Vec<WireMessage>, tools: &[Value], api_key: &str) -> AgentResult<AssistantReply> {
        let messages = normalize(messages, &self.config);
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "tools": tools,
        });

        let mut attempt = 0;
        let mut last_error = String::new();
        while attempt <= self.config.max_retries {
            match self.send_once(&body, api_key) {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    last_error = e;
                    attempt += 1;
                    if attempt <= self.config.max_retries {
                        let backoff = Duration::from_millis(200 * 2u64.pow(attempt.min(6)));
                        std::thread::sleep(backoff);
                    }
                }
            }
        }
        Err(AgentError::Llm(last_error))
    }

    fn send_once(&self, body: &Value, api_key: &str) -> Result<AssistantReply, String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("LLM endpoint returned status {}", response.status()));
        }

        let parsed: ChatResponse = response.json().map_err(|e| e.to_string())?;
        let choice = parsed.choices.into_iter().next().ok_or("LLM response had no choices")?;
        Ok(AssistantReply {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_content_joins_array_text_parts() {
        let mut config = LlmConfig::default();
        config.flatten_content = true;
        let messages = vec![WireMessage {
            role: "user".to_string(),
            content: Some(serde_json::json!([{"type": "text", "text": "a"}, {"type": "text", "text": "b"}])),
            tool_call_id: None,
            name: None,
            tool_calls: None,
        }];
        let normalized = normalize(messages, &config);
        assert_eq!(normalized[0].content, Some(Value::String("a\nb".to_string())));
    }

    #[test]
    fn drop_tool_result_name_clears_name_on_tool_messages_only() {
        let mut config = LlmConfig::default();
        config.drop_tool_result_name = true;
        let messages = vec![WireMessage {
            role: "tool".to_string(),
            content: Some(Value::String("ok".to_string())),
            tool_call_id: Some("1".to_string()),
            name: Some("grep".to_string()),
            tool_calls: None,
        }];
        let normalized = normalize(messages, &config);
        assert_eq!(normalized[0].name, None);
    }
}
