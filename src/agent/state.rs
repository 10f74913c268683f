//! Per-task agent state (spec.md §3 "AgentState", §4.3 "States").

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planning,
    Acting,
    Observing,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PlannedCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone)]
pub struct Observation {
    pub call_id: String,
    pub tool_name: String,
    pub succeeded: bool,
    pub content: String,
    /// A recalled solution from Failure Memory for a similar past
    /// failure (spec.md §4.3 "Act").
    pub failure_hint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecordedFailure {
    pub tool: String,
    pub args: Value,
    pub error: String,
}

/// Reset per user goal (spec.md §3).
#[derive(Debug, Clone)]
pub struct AgentState {
    pub goal: String,
    pub phase: Phase,
    pub iteration: usize,
    pub planned_calls: Vec<PlannedCall>,
    pub observations: Vec<Observation>,
    pub failures: Vec<RecordedFailure>,
}

impl AgentState {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            phase: Phase::Planning,
            iteration: 0,
            planned_calls: Vec::new(),
            observations: Vec::new(),
            failures: Vec::new(),
        }
    }
}
