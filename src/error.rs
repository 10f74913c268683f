//! Structured error types for every subsystem, one enum per concern
//! (`IndexError`/`ToolError`/`ConstitutionError`/`AgentError`/`LspError`)
//! rather than one crate-wide error type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the Symbol Index (scan, watch, persistence, call resolution).
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}' with provider '{provider}': {reason}")]
    ParseError {
        path: PathBuf,
        provider: String,
        reason: String,
    },

    #[error("Failed to persist index to '{path}': {source}")]
    PersistenceError {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to load index from '{path}': {source}")]
    LoadError {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Symbol id space exhausted")]
    SymbolIdExhausted,

    #[error("File id space exhausted")]
    FileIdExhausted,

    #[error("A full scan is already in progress")]
    ScanInProgress,

    #[error("{0}")]
    General(String),
}

impl IndexError {
    /// Recovery suggestions surfaced by the CLI's top-level error handler.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::LoadError { .. } | Self::PersistenceError { .. } => vec![
                "The index will be rebuilt from a full scan on next start",
                "Run 'photon index --force' if the problem persists",
            ],
            Self::ScanInProgress => vec!["Wait for the current scan to finish and retry"],
            Self::FileRead { .. } => vec!["Check the file exists and is readable"],
            _ => vec![],
        }
    }
}

/// Errors specific to the Tool Execution Layer. These never escape a tool;
/// they are converted into the tool envelope's `error` field.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArgs(String),

    #[error("read of {requested} lines exceeds the 500-line cap for '{path}'")]
    ReadTooLarge { path: String, requested: u32 },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("unknown tool '{0}'")]
    UnknownTool(String),
}

/// Errors from Constitution validation.
#[derive(Error, Debug)]
pub enum ConstitutionError {
    #[error("{constraint}: {message}")]
    Violation { constraint: String, message: String },
}

/// Errors from the Agent Control Loop.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("maximum iterations ({0}) reached")]
    IterationCapReached(usize),

    #[error("task cancelled by operator")]
    Cancelled,
}

/// Errors from the LSP Subprocess Bridge. Bridge errors are absorbed
/// internally rather than surfaced to the agent; this type exists for
/// logging only.
#[derive(Error, Debug)]
pub enum LspError {
    #[error("failed to spawn language server '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request '{method}' timed out after {timeout_secs}s")]
    Timeout { method: String, timeout_secs: u64 },

    #[error("server is not initialized")]
    NotInitialized,

    #[error("transport error: {0}")]
    Transport(String),
}

pub type IndexResult<T> = Result<T, IndexError>;
pub type ToolResult<T> = Result<T, ToolError>;
pub type AgentResult<T> = Result<T, AgentError>;
pub type LspResult<T> = Result<T, LspError>;

/// Adds file-path context to a fallible filesystem operation, mirroring the
/// teacher's `ErrorContext` helper trait.
pub trait ErrorContext<T> {
    fn with_path(self, path: &std::path::Path) -> IndexResult<T>;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_path(self, path: &std::path::Path) -> IndexResult<T> {
        self.map_err(|source| IndexError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_includes_path() {
        let err = ToolError::Io {
            path: "x.txt".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("x.txt"));
    }
}
