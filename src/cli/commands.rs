//! Command handlers, extracted from `main` for modularity (mirrors the
//! teacher's `src/cli/commands` split).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::agent::{AgentLoop, LlmClient};
use crate::config::{PhotonPaths, Settings};
use crate::index::SymbolIndex;
use crate::lsp::LspRegistry;
use crate::memory::{FailureMemory, Preferences, ProjectMemory};
use crate::providers::{RegexProvider, TreeSitterProvider};
use crate::tools::{ToolContext, ToolRegistry};

use super::args::{AttemptAction, MemoryAction, RetrieveQuery};

fn project_root(path: Option<PathBuf>) -> Result<PathBuf> {
    let root = path.unwrap_or(std::env::current_dir()?);
    Ok(root.canonicalize().unwrap_or(root))
}

/// Builds a `SymbolIndex` wired with every tree-sitter provider plus the
/// regex fallback, in that priority order (spec.md §4.1 contract), and an
/// LSP registry if `Settings.lsp.servers` configures one.
fn build_index(root: &Path, settings: &Settings) -> Arc<SymbolIndex> {
    let mut index = SymbolIndex::new(root, settings.indexing.clone());
    for provider in TreeSitterProvider::all() {
        index.register_provider(provider);
    }
    index.register_provider(Box::new(RegexProvider::new()));

    if !settings.lsp.servers.is_empty() {
        let lsp = Arc::new(LspRegistry::from_config(
            root,
            &settings.lsp.servers,
            std::time::Duration::from_secs(settings.lsp.request_timeout_secs),
        ));
        index = index.with_lsp(lsp);
    }
    Arc::new(index)
}

pub fn init(path: Option<PathBuf>) -> Result<()> {
    let root = project_root(path)?;
    let paths = PhotonPaths::new(&root);
    std::fs::create_dir_all(paths.index_dir())?;
    std::fs::create_dir_all(paths.backups_dir())?;
    std::fs::create_dir_all(paths.patches_dir())?;
    std::fs::create_dir_all(paths.memory_dir())?;
    std::fs::create_dir_all(paths.logs_dir())?;

    if !paths.settings_file().exists() {
        Settings::default().save(paths.settings_file())?;
    }
    println!("Initialized .photon in {}", root.display());
    Ok(())
}

pub fn index(path: Option<PathBuf>) -> Result<()> {
    let root = project_root(path)?;
    let settings = Settings::load(&root).unwrap_or_default();
    let index = build_index(&root, &settings);
    index.load_cache()?;
    index.scan_blocking()?;
    println!(
        "Indexed {} files, {} symbols",
        index.file_count(),
        index.symbol_count()
    );
    Ok(())
}

pub fn watch(path: Option<PathBuf>) -> Result<()> {
    let root = project_root(path)?;
    let settings = Settings::load(&root).unwrap_or_default();
    let index = build_index(&root, &settings);
    index.load_cache()?;
    index.scan_blocking()?;
    println!(
        "Indexed {} files, {} symbols; watching for changes (Ctrl+C to stop)",
        index.file_count(),
        index.symbol_count()
    );

    let interval = std::time::Duration::from_secs(settings.indexing.watch_interval_secs);
    let _handle = index.watch(interval);
    // No signal-handling crate in the dependency stack; the process is
    // expected to be interrupted by the operator (spec.md §4.1 `watch`
    // is a long-running foreground command).
    loop {
        std::thread::park();
    }
}

pub fn retrieve(path: Option<PathBuf>, query: RetrieveQuery) -> Result<()> {
    let root = project_root(path)?;
    let settings = Settings::load(&root).unwrap_or_default();
    let index = build_index(&root, &settings);
    index.load_cache()?;

    match query {
        RetrieveQuery::Symbol { name } => {
            let symbols = index.search(&name);
            for s in symbols {
                println!("{} {} {}:{}-{}", s.kind.as_str(), s.name, s.path.display(), s.range.start_line, s.range.end_line);
            }
        }
        RetrieveQuery::Callers { key } => {
            for caller in index.callers(&key) {
                println!("{caller}");
            }
        }
        RetrieveQuery::Callees { key } => {
            for callee in index.callees(&key) {
                println!("{callee}");
            }
        }
    }
    Ok(())
}

pub fn run(path: Option<PathBuf>, goal: String) -> Result<()> {
    let root = project_root(path)?;
    let settings = Settings::load(&root).unwrap_or_default();
    let api_key = std::env::var("PHOTON_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .context("set PHOTON_API_KEY or OPENAI_API_KEY to run the agent loop")?;

    let index = build_index(&root, &settings);
    index.load_cache()?;

    let ctx = Arc::new(ToolContext::new(root.clone(), settings.clone(), Some(index)));
    let registry = Arc::new(ToolRegistry::new());
    let llm = LlmClient::new(settings.llm.clone())?;
    let agent = AgentLoop::new(ctx, registry, llm, settings, api_key);

    let cancel = Arc::new(std::sync::atomic::AtomicBool::new(false));
    match agent.run(&goal, cancel) {
        Ok(content) => {
            println!("{content}");
            Ok(())
        }
        Err(e) => bail!("task did not complete: {e}"),
    }
}

pub fn undo(path: Option<PathBuf>) -> Result<()> {
    let root = project_root(path)?;
    let paths = PhotonPaths::new(&root);
    let Some(top) = crate::tools::patch_stack::peek(&paths)? else {
        println!("nothing to undo");
        return Ok(());
    };

    // Try a clean Git-based reversal while the patch file still exists;
    // `pop` below removes it unconditionally either way (spec.md §4.2.3
    // "Undo").
    let reverted_via_git = git_reverse_apply(&root, &top.patch_path);

    let entry = crate::tools::patch_stack::pop(&paths)?
        .context("patch stack changed concurrently during undo")?;

    if reverted_via_git {
        println!("reverted via git apply -R: {} file(s)", entry.affected_files.len());
        return Ok(());
    }

    for file in &entry.affected_files {
        let backup = crate::tools::patch_stack::backup_path(&paths, Path::new(file));
        let target = root.join(file);
        if backup.exists() {
            std::fs::copy(&backup, &target)?;
        }
    }
    println!("restored {} file(s) from backup", entry.affected_files.len());
    Ok(())
}

fn git_reverse_apply(root: &Path, patch_path: &Path) -> bool {
    if !patch_path.exists() {
        return false;
    }
    std::process::Command::new("git")
        .arg("apply")
        .arg("-R")
        .arg(patch_path)
        .current_dir(root)
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn patches(path: Option<PathBuf>) -> Result<()> {
    let root = project_root(path)?;
    let paths = PhotonPaths::new(&root);
    let stack = crate::tools::patch_stack::load(&paths)?;
    if stack.is_empty() {
        println!("no patches on the stack");
    }
    for entry in &stack {
        println!("{} {}", entry.timestamp, entry.affected_files.join(", "));
    }
    Ok(())
}

pub fn memory(path: Option<PathBuf>, action: MemoryAction) -> Result<()> {
    let root = project_root(path)?;
    match action {
        MemoryAction::Show => {
            let project = ProjectMemory::new(&root).load();
            let prefs = Preferences::new(&root).all();
            let failures = FailureMemory::new(&root).all();
            println!("project: {}", serde_json::to_string_pretty(&project)?);
            println!("preferences: {}", serde_json::to_string_pretty(&prefs)?);
            println!("failures: {}", serde_json::to_string_pretty(&failures)?);
        }
        MemoryAction::Clear => {
            let paths = PhotonPaths::new(&root);
            let _ = std::fs::remove_file(paths.failures_json());
            let _ = std::fs::remove_file(paths.project_json());
            let _ = std::fs::remove_file(paths.preferences_json());
            println!("cleared memory");
        }
    }
    Ok(())
}

pub fn attempt(path: Option<PathBuf>, action: AttemptAction) -> Result<()> {
    let root = project_root(path)?;
    let ctx = ToolContext::new(root, Settings::default(), None);
    match action {
        AttemptAction::Get => {
            let record = ctx.attempt_store.get();
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        AttemptAction::Clear => {
            ctx.attempt_store.clear()?;
            println!("cleared attempt record");
        }
    }
    Ok(())
}

pub fn config(path: Option<PathBuf>) -> Result<()> {
    let root = project_root(path)?;
    let settings = Settings::load(&root).unwrap_or_default();
    println!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}
