//! The Agent Control Loop (spec.md §4.3): plan/act/observe over the Tool
//! Execution Layer, guarded by the Constitution, backed by a blocking
//! LLM client.

pub mod llm;
pub mod runtime;
pub mod state;

pub use llm::LlmClient;
pub use runtime::{AgentLoop, CancelFlag};
pub use state::{AgentState, Phase};
