//! The Symbol Index: the queryable map from files to their symbols and
//! from symbols to call sites, kept current through blocking full scans
//! and a periodic watcher.

pub mod persist;
pub mod resolve;
pub mod walk;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::config::{IndexingConfig, PhotonPaths};
use crate::error::{IndexError, IndexResult};
use crate::lsp::LspRegistry;
use crate::symbol::provider::SymbolProvider;
use crate::symbol::{CallInfo, FileMeta, Symbol};
use crate::types::{FileId, LineRange, SymbolId, SymbolSource};

use resolve::NameIndex;

/// Everything the index holds in memory. Swapped as a unit under the
/// write lock on scan/watch commit.
#[derive(Default)]
struct IndexState {
    file_symbols: HashMap<PathBuf, Vec<Symbol>>,
    file_meta: HashMap<PathBuf, FileMeta>,
    symbol_calls: HashMap<String, Vec<CallInfo>>,
    call_graph_adj: HashMap<String, Vec<String>>,
    callee_counts: HashMap<String, usize>,
    caller_out_counts: HashMap<String, usize>,
}

pub struct SymbolIndex {
    root: PathBuf,
    paths: PhotonPaths,
    config: IndexingConfig,
    providers: Vec<Box<dyn SymbolProvider>>,
    lsp: Option<Arc<LspRegistry>>,
    state: RwLock<IndexState>,
    next_symbol_id: AtomicU32,
    next_file_id: AtomicU32,
    scan_lock: Mutex<()>,
    watch_stop: Arc<AtomicBool>,
}

impl SymbolIndex {
    pub fn new(root: impl Into<PathBuf>, config: IndexingConfig) -> Self {
        let root = root.into();
        let paths = PhotonPaths::new(root.clone());
        Self {
            root,
            paths,
            config,
            providers: Vec::new(),
            lsp: None,
            state: RwLock::new(IndexState::default()),
            next_symbol_id: AtomicU32::new(1),
            next_file_id: AtomicU32::new(1),
            scan_lock: Mutex::new(()),
            watch_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_lsp(mut self, lsp: Arc<LspRegistry>) -> Self {
        self.lsp = Some(lsp);
        self
    }

    /// Attach an extraction provider. Providers are queried in
    /// registration order; callers must register tree-sitter providers
    /// before fallback providers.
    pub fn register_provider(&mut self, provider: Box<dyn SymbolProvider>) {
        self.providers.push(provider);
    }

    pub fn load_cache(&self) -> IndexResult<()> {
        let loaded_symbols = persist::load_symbols(&self.paths.symbols_json())?;
        let loaded_calls = persist::load_symbol_calls(&self.paths.symbol_calls_json())?;
        let loaded_graph = persist::load_call_graph(&self.paths.call_graph_json())?;

        let mut state = self.state.write();
        if let Some((file_symbols, file_meta)) = loaded_symbols {
            let mut max_id = 0u32;
            for symbols in file_symbols.values() {
                for s in symbols {
                    max_id = max_id.max(s.id.value());
                }
            }
            self.next_symbol_id.store(max_id + 1, Ordering::SeqCst);
            state.file_symbols = file_symbols;
            state.file_meta = file_meta;
        }
        if let Some(calls) = loaded_calls {
            state.symbol_calls = calls;
        }
        if let Some(graph) = loaded_graph {
            state.call_graph_adj = graph;
            recompute_counts(&mut state);
        }
        Ok(())
    }

    fn persist(&self, state: &IndexState) -> IndexResult<()> {
        persist::save_symbols(&self.paths.symbols_json(), &state.file_symbols, &state.file_meta)?;
        persist::save_symbol_calls(&self.paths.symbol_calls_json(), &state.symbol_calls)?;
        persist::save_call_graph(&self.paths.call_graph_json(), &state.call_graph_adj)?;
        Ok(())
    }

    fn alloc_symbol_id(&self) -> SymbolId {
        let value = self.next_symbol_id.fetch_add(1, Ordering::SeqCst);
        SymbolId::new(value).unwrap_or_else(|| SymbolId::new(u32::MAX).unwrap())
    }

    #[allow(dead_code)]
    fn alloc_file_id(&self) -> FileId {
        let value = self.next_file_id.fetch_add(1, Ordering::SeqCst);
        FileId::new(value).unwrap_or_else(|| FileId::new(u32::MAX).unwrap())
    }

    /// Extract symbols for one file given its content, trying providers in
    /// priority order and falling back to LSP `documentSymbol` once if
    /// every provider comes back empty.
    fn extract_one(&self, path: &Path, ext: &str, content: &str) -> Vec<Symbol> {
        for provider in &self.providers {
            if !provider.supports_extension(ext) {
                continue;
            }
            let mut next_id = || self.alloc_symbol_id();
            let symbols = provider.extract_symbols(content, path, &mut next_id);
            if !symbols.is_empty() {
                return dedup_symbols(symbols);
            }
            if let Some(lsp) = &self.lsp {
                if lsp.has_server_for(ext) {
                    let lsp_symbols = lsp.document_symbols(ext, path, content);
                    if !lsp_symbols.is_empty() {
                        let mut out = Vec::with_capacity(lsp_symbols.len());
                        for s in lsp_symbols {
                            let id = self.alloc_symbol_id();
                            out.push(Symbol::new(
                                id,
                                s.name,
                                lsp_kind(s.kind),
                                SymbolSource::Lsp,
                                path.to_path_buf(),
                                LineRange::new(s.start_line, s.end_line),
                            ));
                        }
                        return dedup_symbols(out);
                    }
                }
            }
            // This provider claimed the extension but produced nothing;
            // fall through to the next (lower-priority) provider.
        }
        Vec::new()
    }

    fn extract_calls_for(&self, ext: &str, content: &str, range: LineRange) -> Vec<CallInfo> {
        for provider in &self.providers {
            if provider.supports_extension(ext) {
                let calls = provider.extract_calls(content, range);
                if !calls.is_empty() {
                    return calls;
                }
            }
        }
        Vec::new()
    }

    /// Walk the tree, reparse changed files, purge deleted ones, rebuild
    /// the call graph, and persist. Blocks the caller until done.
    pub fn scan_blocking(&self) -> IndexResult<()> {
        let _guard = self
            .scan_lock
            .try_lock()
            .ok_or(IndexError::ScanInProgress)?;

        let cached_meta = self.state.read().file_meta.clone();
        let cached_symbols = self.state.read().file_symbols.clone();

        let files = walk::walk_files(&self.root, &self.config.ignore_patterns);
        let mut new_file_symbols: HashMap<PathBuf, Vec<Symbol>> = HashMap::new();
        let mut new_file_meta: HashMap<PathBuf, FileMeta> = HashMap::new();

        for abs_path in &files {
            let rel_path = walk::relative_path(&self.root, abs_path);
            let ext = walk::extension_of(abs_path).unwrap_or_default();
            let Ok(stat) = std::fs::metadata(abs_path) else {
                continue;
            };
            let mtime = stat
                .modified()
                .ok()
                .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let size = stat.len();

            if let Some(meta) = cached_meta.get(&rel_path) {
                if meta.matches_stat(size, mtime) {
                    if let Some(symbols) = cached_symbols.get(&rel_path) {
                        new_file_symbols.insert(rel_path.clone(), symbols.clone());
                        new_file_meta.insert(rel_path, *meta);
                        continue;
                    }
                }
            }

            let Ok(content) = std::fs::read_to_string(abs_path) else {
                continue;
            };
            let hash = crate::symbol::fnv1a_64(content.as_bytes());

            if let Some(meta) = cached_meta.get(&rel_path) {
                if meta.hash == hash {
                    if let Some(symbols) = cached_symbols.get(&rel_path) {
                        new_file_symbols.insert(rel_path.clone(), symbols.clone());
                        new_file_meta.insert(rel_path, FileMeta { size, mtime, hash });
                        continue;
                    }
                }
            }

            let symbols = self.extract_one(&rel_path, &ext, &content);
            new_file_symbols.insert(rel_path.clone(), symbols);
            new_file_meta.insert(rel_path, FileMeta { size, mtime, hash });
        }

        self.commit(new_file_symbols, new_file_meta)
    }

    /// Spawn the full scan on a background thread; `scan_lock` keeps at
    /// most one running at a time. The returned handle can be joined by
    /// the caller; errors surface through the `JoinHandle`.
    pub fn scan_async(self: &Arc<Self>) -> std::thread::JoinHandle<IndexResult<()>> {
        let index = Arc::clone(self);
        std::thread::spawn(move || index.scan_blocking())
    }

    /// Commit a freshly computed `(file_symbols, file_meta)` pair: rebuild
    /// the call graph against the *new* symbol set (so renamed/removed
    /// callees resolve correctly), persist, then swap under one write
    /// lock.
    fn commit(
        &self,
        file_symbols: HashMap<PathBuf, Vec<Symbol>>,
        file_meta: HashMap<PathBuf, FileMeta>,
    ) -> IndexResult<()> {
        let name_index = NameIndex::build(&file_symbols);
        let mut symbol_calls: HashMap<String, Vec<CallInfo>> = HashMap::new();
        let mut call_graph_adj: HashMap<String, Vec<String>> = HashMap::new();

        for (rel_path, symbols) in &file_symbols {
            let ext = walk::extension_of(rel_path).unwrap_or_default();
            let abs_path = self.root.join(rel_path);
            let Ok(content) = std::fs::read_to_string(&abs_path) else {
                continue;
            };
            for symbol in symbols {
                let raw_calls = self.extract_calls_for(&ext, &content, symbol.range);
                if raw_calls.is_empty() {
                    continue;
                }
                let caller_key = symbol.composite_key();
                let mut callees = Vec::with_capacity(raw_calls.len());
                for call in &raw_calls {
                    let resolved = self.resolve_callee(&name_index, rel_path, call, ext.as_str());
                    if !callees.contains(&resolved) {
                        callees.push(resolved);
                    }
                }
                symbol_calls.insert(caller_key.clone(), raw_calls);
                call_graph_adj.insert(caller_key, callees);
            }
        }

        let mut state = self.state.write();
        state.file_symbols = file_symbols;
        state.file_meta = file_meta;
        state.symbol_calls = symbol_calls;
        state.call_graph_adj = call_graph_adj;
        recompute_counts(&mut state);
        self.persist(&state)
    }

    /// Call-edge resolution: local, then global (with qualifier
    /// stripping), then case-insensitive, then LSP goto-definition as a
    /// tie-breaker, then a sentinel.
    fn resolve_callee(&self, name_index: &NameIndex, caller_path: &Path, call: &CallInfo, ext: &str) -> String {
        let callee = call.callee_name.as_ref();
        let resolved = name_index.resolve(caller_path, callee);
        if !crate::symbol::is_sentinel_key(&resolved) {
            return resolved;
        }
        if let Some(lsp) = &self.lsp {
            let abs = self.root.join(caller_path);
            if let Ok(content) = std::fs::read_to_string(&abs) {
                let pos = crate::lsp::Position {
                    line: call.line.saturating_sub(1),
                    character: call.column as u32,
                };
                let locations = lsp.goto_definition(ext, caller_path, &content, pos);
                // Same-file hits are preferred, then by path.
                let mut ranked = locations;
                ranked.sort_by_key(|loc| (!loc.uri.ends_with(&*caller_path.to_string_lossy()), loc.uri.clone()));
                if let Some(first) = ranked.first() {
                    return format!("{}:{}:{}", first.uri, first.line + 1, callee);
                }
            }
        }
        resolved
    }

    /// Start the background watcher loop on its own thread, rescanning
    /// file metadata every `interval`. Returns a handle that can be used
    /// to stop it.
    pub fn watch(self: &Arc<Self>, interval: Duration) -> WatchHandle {
        self.watch_stop.store(false, Ordering::SeqCst);
        let index = Arc::clone(self);
        let stop = Arc::clone(&self.watch_stop);
        let handle = std::thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                std::thread::sleep(interval);
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                index.watch_tick();
            }
        });
        WatchHandle { handle: Some(handle), stop: Arc::clone(&self.watch_stop) }
    }

    /// One watcher tick: rescan `(size, mtime)` only, without ever
    /// contending with a full scan for the write lock during I/O.
    fn watch_tick(&self) {
        let Some(_guard) = self.scan_lock.try_lock() else {
            // A full scan is running; the watcher yields this tick.
            return;
        };

        let files = walk::walk_files(&self.root, &self.config.ignore_patterns);
        let mut seen = std::collections::HashSet::new();
        let mut changed: Vec<(PathBuf, PathBuf, u64, u64)> = Vec::new();

        {
            let state = self.state.read();
            for abs_path in &files {
                let rel_path = walk::relative_path(&self.root, abs_path);
                seen.insert(rel_path.clone());
                let Ok(stat) = std::fs::metadata(abs_path) else {
                    continue;
                };
                let mtime = stat
                    .modified()
                    .ok()
                    .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                let size = stat.len();
                let unchanged = state
                    .file_meta
                    .get(&rel_path)
                    .is_some_and(|m| m.matches_stat(size, mtime));
                if !unchanged {
                    changed.push((abs_path.clone(), rel_path, size, mtime));
                }
            }
        }

        if changed.is_empty() {
            let purge_needed = {
                let state = self.state.read();
                state.file_meta.keys().any(|p| !seen.contains(p))
            };
            if !purge_needed {
                return;
            }
        }

        let mut file_symbols = self.state.read().file_symbols.clone();
        let mut file_meta = self.state.read().file_meta.clone();

        file_meta.retain(|p, _| seen.contains(p));
        file_symbols.retain(|p, _| seen.contains(p));

        for (abs_path, rel_path, size, mtime) in changed {
            let Ok(content) = std::fs::read_to_string(&abs_path) else {
                file_symbols.remove(&rel_path);
                file_meta.remove(&rel_path);
                continue;
            };
            let hash = crate::symbol::fnv1a_64(content.as_bytes());
            let ext = walk::extension_of(&rel_path).unwrap_or_default();
            let symbols = self.extract_one(&rel_path, &ext, &content);
            file_symbols.insert(rel_path.clone(), symbols);
            file_meta.insert(rel_path, FileMeta { size, mtime, hash });
        }

        let _ = self.commit(file_symbols, file_meta);
    }

    /// Case-insensitive substring search. Ordering: exact-name matches
    /// first, then provider priority, then alphabetical.
    pub fn search(&self, q: &str) -> Vec<Symbol> {
        let q_lower = q.to_lowercase();
        let state = self.state.read();
        let mut matches: Vec<Symbol> = state
            .file_symbols
            .values()
            .flatten()
            .filter(|s| s.name.to_lowercase().contains(&q_lower))
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            let a_exact = a.name.eq_ignore_ascii_case(q);
            let b_exact = b.name.eq_ignore_ascii_case(q);
            b_exact
                .cmp(&a_exact)
                .then(a.source.cmp(&b.source))
                .then(a.name.cmp(&b.name))
        });
        matches
    }

    pub fn file_symbols(&self, path: &Path) -> Vec<Symbol> {
        self.state.read().file_symbols.get(path).cloned().unwrap_or_default()
    }

    /// Batched lookup of several files' symbols under one shared read
    /// lock, used by `list_project_files`'s `include_symbols` decoration
    /// so one batched read serves the whole tree under one shared lock.
    pub fn file_symbols_batch(&self, paths: &[PathBuf]) -> HashMap<PathBuf, Vec<Symbol>> {
        let state = self.state.read();
        paths
            .iter()
            .filter_map(|p| state.file_symbols.get(p).map(|s| (p.clone(), s.clone())))
            .collect()
    }

    /// The symbol with the smallest `end_line - start_line` span
    /// containing `line`; ties broken by the largest `start_line`.
    pub fn find_enclosing(&self, path: &Path, line: u32) -> Option<Symbol> {
        let state = self.state.read();
        state
            .file_symbols
            .get(path)?
            .iter()
            .filter(|s| s.range.contains(line))
            .min_by(|a, b| {
                a.range
                    .span()
                    .cmp(&b.range.span())
                    .then(b.range.start_line.cmp(&a.range.start_line))
            })
            .cloned()
    }

    pub fn calls_for(&self, caller_key: &str) -> Vec<CallInfo> {
        self.state.read().symbol_calls.get(caller_key).cloned().unwrap_or_default()
    }

    pub fn callees(&self, caller_key: &str) -> Vec<String> {
        self.state.read().call_graph_adj.get(caller_key).cloned().unwrap_or_default()
    }

    /// Reverse lookup over the same adjacency map `callees` reads: every
    /// caller key whose callee list contains `callee_key`.
    pub fn callers(&self, callee_key: &str) -> Vec<String> {
        self.state
            .read()
            .call_graph_adj
            .iter()
            .filter(|(_, callees)| callees.iter().any(|c| c == callee_key))
            .map(|(caller, _)| caller.clone())
            .collect()
    }

    pub fn global_callee_count(&self, name: &str) -> usize {
        self.state.read().callee_counts.get(name).copied().unwrap_or(0)
    }

    pub fn caller_out_degree(&self, caller_key: &str) -> usize {
        self.state.read().caller_out_counts.get(caller_key).copied().unwrap_or(0)
    }

    pub fn symbol_count(&self) -> usize {
        self.state.read().file_symbols.values().map(Vec::len).sum()
    }

    pub fn file_count(&self) -> usize {
        self.state.read().file_meta.len()
    }
}

pub struct WatchHandle {
    handle: Option<std::thread::JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl WatchHandle {
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn dedup_symbols(symbols: Vec<Symbol>) -> Vec<Symbol> {
    let mut seen = std::collections::HashSet::new();
    symbols
        .into_iter()
        .filter(|s| seen.insert(s.dedup_key()))
        .collect()
}

fn lsp_kind(kind: u32) -> crate::types::SymbolKind {
    use crate::types::SymbolKind::*;
    // LSP `SymbolKind` numeric values (1-based), per the LSP spec:
    // 5=Class, 6=Method, 10=Enum, 11=Interface, 12=Function, 23=Struct.
    match kind {
        5 => Class,
        6 => Method,
        10 => Enum,
        11 => Interface,
        12 => Function,
        23 => Struct,
        _ => Other,
    }
}

fn recompute_counts(state: &mut IndexState) {
    state.callee_counts.clear();
    state.caller_out_counts.clear();
    for (caller_key, callees) in &state.call_graph_adj {
        state.caller_out_counts.insert(caller_key.clone(), callees.len());
        for callee in callees {
            let name = callee.rsplit(':').next().unwrap_or(callee);
            *state.callee_counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }
}
