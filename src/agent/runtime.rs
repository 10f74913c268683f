//! The Agent Control Loop (spec.md §4.3): `planning -> acting ->
//! observing -> planning | completed`, terminating `failed` on the
//! iteration cap or an unrecoverable error. Grounded in the original's
//! `AgentRuntime::assembleSystemPrompt`/`assembleContext` shape, expressed
//! here as plain synchronous Rust rather than coroutines (spec.md §9
//! "Cooperative suspension").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use serde_json::Value;

use super::llm::{AssistantReply, LlmClient, WireMessage};
use super::state::{AgentState, Observation, Phase, PlannedCall, RecordedFailure};
use crate::config::Settings;
use crate::error::{AgentError, AgentResult};
use crate::memory::context::{self, Message, Role};
use crate::memory::failures::FailureMemory;
use crate::tools::{ToolContext, ToolRegistry};

/// The loop's single cancellation flag, polled between phases (spec.md
/// §4.3 "Cancellation", §9 "a single boolean polled between phases").
pub type CancelFlag = Arc<AtomicBool>;

pub struct AgentLoop {
    ctx: Arc<ToolContext>,
    registry: Arc<ToolRegistry>,
    llm: LlmClient,
    failures: FailureMemory,
    settings: Settings,
    api_key: String,
}

impl AgentLoop {
    pub fn new(ctx: Arc<ToolContext>, registry: Arc<ToolRegistry>, llm: LlmClient, settings: Settings, api_key: String) -> Self {
        let failures = FailureMemory::new(&ctx.root);
        Self { ctx, registry, llm, failures, settings, api_key }
    }

    fn system_prompt(&self) -> String {
        let tool_list = self
            .registry
            .schemas()
            .iter()
            .filter_map(|schema| {
                let function = schema.get("function")?;
                let name = function.get("name")?.as_str()?;
                let description = function.get("description")?.as_str()?;
                Some(format!("- {name}: {description}"))
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are Photon, an autonomous coding agent operating on the project at {root}.\n\
             Current time: {now}.\n\n\
             Hard constraints (violations are rejected before any tool runs):\n\
             - apply_patch.files must be a non-empty array; every entry needs 'content' or 'edits'.\n\
             - read_code_block on a code file needs either 'symbol_name' or an explicit line range.\n\n\
             Available tools:\n{tool_list}",
            root = self.ctx.root.display(),
            now = Local::now().to_rfc3339(),
        )
    }

    /// Runs one task to completion, cancellation, or the iteration cap.
    /// Returns the final assistant content on `completed`.
    pub fn run(&self, goal: &str, cancel: CancelFlag) -> AgentResult<String> {
        let mut state = AgentState::new(goal);
        let mut history = vec![Message::system(self.system_prompt()), Message::system(format!("Goal: {goal}"))];

        loop {
            if cancel.load(Ordering::SeqCst) {
                state.phase = Phase::Completed;
                return Err(AgentError::Cancelled);
            }
            if state.iteration >= self.settings.agent.max_iterations {
                state.phase = Phase::Failed;
                return Err(AgentError::IterationCapReached(self.settings.agent.max_iterations));
            }

            state.phase = Phase::Planning;
            context::compress(&mut history, self.settings.agent.context_threshold_chars);
            let reply = self.plan(&history)?;

            if reply.tool_calls.is_empty() {
                state.phase = Phase::Completed;
                return Ok(reply.content.unwrap_or_default());
            }

            history.push(Message::system(reply.content.clone().unwrap_or_default()));
            state.planned_calls = reply
                .tool_calls
                .iter()
                .map(|call| PlannedCall {
                    id: call.id.clone(),
                    name: call.function.name.clone(),
                    args: serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null),
                })
                .collect();

            state.phase = Phase::Acting;
            if cancel.load(Ordering::SeqCst) {
                state.phase = Phase::Completed;
                return Err(AgentError::Cancelled);
            }
            let observations = self.act(&state.planned_calls, &mut history);

            state.phase = Phase::Observing;
            let all_failed = !observations.is_empty() && observations.iter().all(|o| !o.succeeded);
            if all_failed {
                history.push(Message::system(
                    "Every tool call this iteration failed. Reconsider your approach before retrying.".to_string(),
                ));
            }
            for observation in &observations {
                if !observation.succeeded {
                    state.failures.push(RecordedFailure {
                        tool: observation.tool_name.clone(),
                        args: Value::Null,
                        error: observation.content.clone(),
                    });
                }
            }
            state.observations.extend(observations);
            state.iteration += 1;
        }
    }

    fn plan(&self, history: &[Message]) -> AgentResult<AssistantReply> {
        let wire = history.iter().map(to_wire).collect();
        self.llm.complete(wire, &self.registry.schemas(), &self.api_key)
    }

    /// Validates then dispatches every planned call in model order,
    /// recording each result (spec.md §4.3 "Act").
    fn act(&self, calls: &[PlannedCall], history: &mut Vec<Message>) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(calls.len());
        for call in calls {
            let envelope = self.registry.dispatch_checked(&self.ctx, &call.name, call.args.clone());
            let succeeded = !envelope.is_error();
            let content = if succeeded {
                envelope.content.first().map(|c| c.text.clone()).unwrap_or_default()
            } else {
                envelope.error.clone().unwrap_or_default()
            };

            let hint = if succeeded { None } else { self.failures.lookup(&call.name, &content) };
            if !succeeded {
                let _ = self.failures.record(&call.name, call.args.clone(), &content, None);
            }

            let mut message = Message::tool_result(&call.name, &call.id, None, content.clone());
            if let Some(hint) = &hint {
                message.content = format!("{content}\n[failure_hint] {hint}");
            }
            history.push(message);

            observations.push(Observation {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                succeeded,
                content,
                failure_hint: hint,
            });
        }
        observations
    }
}

fn to_wire(message: &Message) -> WireMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };
    WireMessage {
        role: role.to_string(),
        content: Some(Value::String(message.content.clone())),
        tool_call_id: message.tool_call_id.clone(),
        name: message.tool_name.clone(),
        tool_calls: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use tempfile::TempDir;

    #[test]
    fn system_prompt_lists_every_registered_tool() {
        let dir = TempDir::new().unwrap();
        let ctx = Arc::new(ToolContext::new(dir.path(), Settings::default(), None));
        let registry = Arc::new(ToolRegistry::new());
        let llm = LlmClient::new(Settings::default().llm).unwrap();
        let agent = AgentLoop::new(ctx, registry, llm, Settings::default(), "test-key".to_string());
        let prompt = agent.system_prompt();
        for name in ["read_code_block", "apply_patch", "run_command", "list_project_files", "grep", "syntax_check", "attempt"] {
            assert!(prompt.contains(name), "prompt missing {name}");
        }
    }

    #[test]
    fn cap_of_zero_fails_immediately() {
        let dir = TempDir::new().unwrap();
        let ctx = Arc::new(ToolContext::new(dir.path(), Settings::default(), None));
        let registry = Arc::new(ToolRegistry::new());
        let mut settings = Settings::default();
        settings.agent.max_iterations = 0;
        let llm = LlmClient::new(settings.llm.clone()).unwrap();
        let agent = AgentLoop::new(ctx, registry, llm, settings, "test-key".to_string());
        let result = agent.run("do something", Arc::new(AtomicBool::new(false)));
        assert!(matches!(result, Err(AgentError::IterationCapReached(0))));
    }

    #[test]
    fn pre_cancelled_flag_returns_cancelled_without_calling_the_model() {
        let dir = TempDir::new().unwrap();
        let ctx = Arc::new(ToolContext::new(dir.path(), Settings::default(), None));
        let registry = Arc::new(ToolRegistry::new());
        let llm = LlmClient::new(Settings::default().llm).unwrap();
        let agent = AgentLoop::new(ctx, registry, llm, Settings::default(), "test-key".to_string());
        let result = agent.run("do something", Arc::new(AtomicBool::new(true)));
        assert!(matches!(result, Err(AgentError::Cancelled)));
    }
}
