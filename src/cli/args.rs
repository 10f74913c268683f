//! CLI argument parsing (spec.md §6, SPEC_FULL.md §6 Expansion).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "photon", version, about = "A code-intelligence and agent-orchestration engine for local repositories")]
pub struct Cli {
    /// Project root; defaults to the current directory. Applies to every
    /// subcommand (`Index`/`Watch` additionally accept a positional
    /// override for backward-compatible scripting).
    #[arg(short = 'C', long = "path", global = true)]
    pub path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the `.photon` directory and a default settings file.
    Init,

    /// Run a full symbol-index scan over the project.
    Index {
        /// Directory to index; defaults to the current directory.
        path: Option<PathBuf>,
    },

    /// Index once, then keep watching the tree for changes.
    Watch {
        path: Option<PathBuf>,
    },

    /// Query the symbol index.
    Retrieve {
        #[command(subcommand)]
        query: RetrieveQuery,
    },

    /// Hand a natural-language goal to the Agent Control Loop.
    Run {
        /// The operator's goal, in natural language.
        goal: String,
    },

    /// Pop the most recent patch off the undo stack.
    Undo,

    /// List the patch stack.
    Patches,

    /// Inspect or clear the durable memories.
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Inspect or clear the current attempt record.
    Attempt {
        #[command(subcommand)]
        action: AttemptAction,
    },

    /// Print the resolved configuration.
    Config,
}

#[derive(Subcommand, Debug)]
pub enum RetrieveQuery {
    /// Symbols whose name contains the query (case-insensitive).
    Symbol { name: String },
    /// Callers of the given symbol's composite key.
    Callers { key: String },
    /// Callees of the given symbol's composite key.
    Callees { key: String },
}

#[derive(Subcommand, Debug)]
pub enum MemoryAction {
    Show,
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum AttemptAction {
    Get,
    Clear,
}
