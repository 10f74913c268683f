//! The Tool Execution Layer (spec.md §4.2): a small set of atomic,
//! schema-described operations invoked by the model. Every tool shares the
//! envelope contract in §4.2.1; the layer holds no hidden state beyond
//! what a specific tool owns on disk (e.g. the patch stack).

pub mod apply_patch;
pub mod attempt;
pub mod envelope;
pub mod grep;
pub mod list_project_files;
pub mod patch_stack;
pub mod read_code_block;
pub mod run_command;
pub mod syntax_check;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

pub use envelope::ToolEnvelope;

use crate::config::Settings;
use crate::index::SymbolIndex;
use crate::memory::attempt::AttemptStore;

/// Shared, session-scoped state every tool reads from or writes to.
/// Grounded in the teacher's pattern of passing a long-lived "context"
/// struct into per-tool handlers (`src/mcp/http_server.rs`'s
/// `ServerState`), narrowed to exactly what spec.md's tools need.
pub struct ToolContext {
    pub root: PathBuf,
    pub settings: Settings,
    pub index: Option<Arc<SymbolIndex>>,
    pub attempt_store: AttemptStore,
    /// Content hash recorded the last time each file was read through
    /// `read_code_block` in this session, for `apply_patch`'s conflict
    /// check (spec.md §4.2.3 step 1).
    read_hashes: Mutex<HashMap<PathBuf, u64>>,
}

impl ToolContext {
    pub fn new(root: impl Into<PathBuf>, settings: Settings, index: Option<Arc<SymbolIndex>>) -> Self {
        let root = root.into();
        let attempt_store = AttemptStore::new(&root);
        Self {
            root,
            settings,
            index,
            attempt_store,
            read_hashes: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_read(&self, path: &std::path::Path, content: &[u8]) {
        let hash = crate::symbol::fnv1a_64(content);
        self.read_hashes.lock().insert(path.to_path_buf(), hash);
    }

    /// `None` means the file was never read this session, so there is
    /// nothing to conflict against.
    pub fn recorded_hash(&self, path: &std::path::Path) -> Option<u64> {
        self.read_hashes.lock().get(path).copied()
    }

    pub fn abs_path(&self, relative: &str) -> PathBuf {
        let candidate = PathBuf::from(relative);
        if candidate.is_absolute() {
            candidate
        } else {
            self.root.join(candidate)
        }
    }
}

/// A tool's (name, description, JSON-schema, `execute`) contract (spec.md
/// §4.2.1).
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn schema(&self) -> Value;
    fn execute(&self, ctx: &ToolContext, args: Value) -> ToolEnvelope;
}

/// The atomic, new-surface tool set (spec.md §9 Open Question #1: the
/// legacy ~30-tool `InternalMCPClient` is not shipped).
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let tools: Vec<Box<dyn Tool>> = vec![
            Box::new(read_code_block::ReadCodeBlock),
            Box::new(apply_patch::ApplyPatch),
            Box::new(run_command::RunCommand),
            Box::new(list_project_files::ListProjectFiles),
            Box::new(grep::Grep),
            Box::new(syntax_check::SyntaxCheck),
            Box::new(attempt::Attempt),
        ];
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    pub fn dispatch(&self, ctx: &ToolContext, name: &str, args: Value) -> ToolEnvelope {
        match self.get(name) {
            Some(tool) => tool.execute(ctx, args),
            None => ToolEnvelope::error(format!("unknown tool '{name}'")),
        }
    }

    /// Validates `args` through the Constitution before dispatching
    /// (spec.md §4.3 "Act" step 1-2). A violation never reaches the
    /// tool; it comes back as an error envelope the model can see.
    pub fn dispatch_checked(&self, ctx: &ToolContext, name: &str, args: Value) -> ToolEnvelope {
        if let Err(violation) = crate::constitution::validate(name, &args) {
            return ToolEnvelope::error(violation.to_string());
        }
        self.dispatch(ctx, name, args)
    }

    /// OpenAI-style function-calling tool list (spec.md §6 "LLM
    /// envelope").
    pub fn schemas(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.schema(),
                    },
                })
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_exposes_exactly_the_spec_surface() {
        let registry = ToolRegistry::new();
        let names: Vec<&str> = registry.tools.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "read_code_block",
                "apply_patch",
                "run_command",
                "list_project_files",
                "grep",
                "syntax_check",
                "attempt",
            ]
        );
    }

    #[test]
    fn unknown_tool_returns_error_envelope() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = ToolContext::new(dir.path(), Settings::default(), None);
        let registry = ToolRegistry::new();
        let result = registry.dispatch(&ctx, "nope", serde_json::json!({}));
        assert!(result.error.is_some());
    }
}
