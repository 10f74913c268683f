//! Persistence of the three on-disk index artifacts, each written
//! atomically (temp file + rename) so a crash mid-save never leaves a
//! truncated file behind.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};
use crate::symbol::{CallInfo, FileMeta, Symbol};

const SYMBOLS_SCHEMA_VERSION: u32 = 2;

#[derive(Serialize, Deserialize)]
struct SymbolsFile {
    version: u32,
    // `BTreeMap`, not `HashMap`: the key order feeds straight into
    // `to_string_pretty`, and a `HashMap`'s iteration order varies
    // between otherwise-identical scans (new `RandomState` seed each
    // time), which would break the "repeated scan is byte-identical"
    // idempotence law for any tree with more than one file.
    files: BTreeMap<String, FileEntry>,
}

#[derive(Serialize, Deserialize)]
struct FileEntry {
    meta: FileMeta,
    symbols: Vec<Symbol>,
}

#[derive(Serialize, Deserialize)]
struct CallerCalls {
    caller_key: String,
    calls: Vec<CallInfo>,
}

#[derive(Serialize, Deserialize)]
struct CallerCallees {
    caller_key: String,
    callees: Vec<String>,
}

fn write_atomic(path: &Path, body: &str) -> IndexResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| IndexError::FileWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, body).map_err(|source| IndexError::FileWrite {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| IndexError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn save_symbols(
    path: &Path,
    file_symbols: &HashMap<PathBuf, Vec<Symbol>>,
    file_meta: &HashMap<PathBuf, FileMeta>,
) -> IndexResult<()> {
    let mut files = BTreeMap::new();
    for (p, symbols) in file_symbols {
        let Some(meta) = file_meta.get(p) else {
            continue;
        };
        files.insert(
            p.to_string_lossy().into_owned(),
            FileEntry {
                meta: *meta,
                symbols: symbols.clone(),
            },
        );
    }
    let doc = SymbolsFile {
        version: SYMBOLS_SCHEMA_VERSION,
        files,
    };
    let body = serde_json::to_string_pretty(&doc).map_err(|e| IndexError::PersistenceError {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    write_atomic(path, &body)
}

pub fn load_symbols(
    path: &Path,
) -> IndexResult<Option<(HashMap<PathBuf, Vec<Symbol>>, HashMap<PathBuf, FileMeta>)>> {
    if !path.exists() {
        return Ok(None);
    }
    let body = fs::read_to_string(path).map_err(|source| IndexError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: SymbolsFile = serde_json::from_str(&body).map_err(|e| IndexError::LoadError {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    let mut file_symbols = HashMap::with_capacity(doc.files.len());
    let mut file_meta = HashMap::with_capacity(doc.files.len());
    for (p, entry) in doc.files {
        let path_buf = PathBuf::from(p);
        file_meta.insert(path_buf.clone(), entry.meta);
        file_symbols.insert(path_buf, entry.symbols);
    }
    Ok(Some((file_symbols, file_meta)))
}

pub fn save_symbol_calls(path: &Path, symbol_calls: &HashMap<String, Vec<CallInfo>>) -> IndexResult<()> {
    // Sorted by `caller_key`: `HashMap::iter()` order isn't stable across
    // scans, which would otherwise break scan idempotence for any tree
    // with more than one caller.
    let mut doc: Vec<CallerCalls> = symbol_calls
        .iter()
        .map(|(caller_key, calls)| CallerCalls {
            caller_key: caller_key.clone(),
            calls: calls.clone(),
        })
        .collect();
    doc.sort_by(|a, b| a.caller_key.cmp(&b.caller_key));
    let body = serde_json::to_string_pretty(&doc).map_err(|e| IndexError::PersistenceError {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    write_atomic(path, &body)
}

pub fn load_symbol_calls(path: &Path) -> IndexResult<Option<HashMap<String, Vec<CallInfo>>>> {
    if !path.exists() {
        return Ok(None);
    }
    let body = fs::read_to_string(path).map_err(|source| IndexError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Vec<CallerCalls> = serde_json::from_str(&body).map_err(|e| IndexError::LoadError {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    Ok(Some(
        doc.into_iter().map(|e| (e.caller_key, e.calls)).collect(),
    ))
}

pub fn save_call_graph(path: &Path, call_graph_adj: &HashMap<String, Vec<String>>) -> IndexResult<()> {
    // Same determinism concern as `save_symbol_calls`: sort the rows by
    // `caller_key`, and each row's own `callees` list, so the emitted
    // JSON doesn't depend on `HashMap`'s randomized iteration order.
    let mut doc: Vec<CallerCallees> = call_graph_adj
        .iter()
        .map(|(caller_key, callees)| {
            let mut callees = callees.clone();
            callees.sort();
            CallerCallees {
                caller_key: caller_key.clone(),
                callees,
            }
        })
        .collect();
    doc.sort_by(|a, b| a.caller_key.cmp(&b.caller_key));
    let body = serde_json::to_string_pretty(&doc).map_err(|e| IndexError::PersistenceError {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    write_atomic(path, &body)
}

pub fn load_call_graph(path: &Path) -> IndexResult<Option<HashMap<String, Vec<String>>>> {
    if !path.exists() {
        return Ok(None);
    }
    let body = fs::read_to_string(path).map_err(|source| IndexError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Vec<CallerCallees> = serde_json::from_str(&body).map_err(|e| IndexError::LoadError {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    Ok(Some(
        doc.into_iter().map(|e| (e.caller_key, e.callees)).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineRange, SymbolId, SymbolKind, SymbolSource};
    use tempfile::TempDir;

    #[test]
    fn symbols_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("symbols.json");

        let mut file_symbols = HashMap::new();
        let mut file_meta = HashMap::new();
        let p = PathBuf::from("a.rs");
        let symbol = Symbol::new(
            SymbolId::new(1).unwrap(),
            "foo",
            SymbolKind::Function,
            SymbolSource::TreeSitter,
            p.clone(),
            LineRange::new(1, 2),
        );
        file_symbols.insert(p.clone(), vec![symbol]);
        file_meta.insert(
            p,
            FileMeta {
                size: 10,
                mtime: 100,
                hash: 42,
            },
        );

        save_symbols(&path, &file_symbols, &file_meta).unwrap();
        let (loaded_symbols, loaded_meta) = load_symbols(&path).unwrap().unwrap();
        assert_eq!(loaded_symbols.len(), 1);
        assert_eq!(loaded_meta.len(), 1);
    }

    fn file_meta(n: u64) -> FileMeta {
        FileMeta {
            size: n,
            mtime: n,
            hash: n,
        }
    }

    /// spec.md §8 Idempotence: repeated saves of the same (unsorted)
    /// in-memory maps must produce byte-identical JSON, not just
    /// equivalent JSON. A `HashMap`'s iteration order isn't stable
    /// across instances, so this only catches a regression with more
    /// than one key.
    #[test]
    fn save_symbols_is_byte_identical_across_hashmap_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("symbols.json");

        let build = || {
            let mut file_symbols = HashMap::new();
            let mut file_meta_map = HashMap::new();
            for name in ["a.rs", "b.rs", "c.rs", "d.rs", "e.rs"] {
                let p = PathBuf::from(name);
                file_symbols.insert(p.clone(), Vec::new());
                file_meta_map.insert(p, file_meta(1));
            }
            (file_symbols, file_meta_map)
        };

        let (fs1, fm1) = build();
        save_symbols(&path, &fs1, &fm1).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        let (fs2, fm2) = build();
        save_symbols(&path, &fs2, &fm2).unwrap();
        let second = fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn save_symbol_calls_and_call_graph_are_byte_identical_across_hashmap_instances() {
        let dir = TempDir::new().unwrap();
        let calls_path = dir.path().join("symbol_calls.json");
        let graph_path = dir.path().join("call_graph.json");

        let build_calls = || {
            let mut calls = HashMap::new();
            for key in ["a.rs:1:foo", "b.rs:1:bar", "c.rs:1:baz", "d.rs:1:qux"] {
                calls.insert(key.to_string(), Vec::new());
            }
            calls
        };
        let build_graph = || {
            let mut graph = HashMap::new();
            for key in ["a.rs:1:foo", "b.rs:1:bar", "c.rs:1:baz", "d.rs:1:qux"] {
                graph.insert(key.to_string(), vec!["z".to_string(), "a".to_string()]);
            }
            graph
        };

        save_symbol_calls(&calls_path, &build_calls()).unwrap();
        let calls_first = fs::read_to_string(&calls_path).unwrap();
        save_symbol_calls(&calls_path, &build_calls()).unwrap();
        let calls_second = fs::read_to_string(&calls_path).unwrap();
        assert_eq!(calls_first, calls_second);

        save_call_graph(&graph_path, &build_graph()).unwrap();
        let graph_first = fs::read_to_string(&graph_path).unwrap();
        save_call_graph(&graph_path, &build_graph()).unwrap();
        let graph_second = fs::read_to_string(&graph_path).unwrap();
        assert_eq!(graph_first, graph_second);
    }

    #[test]
    fn missing_files_load_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(load_symbols(&dir.path().join("nope.json")).unwrap().is_none());
        assert!(load_symbol_calls(&dir.path().join("nope.json")).unwrap().is_none());
        assert!(load_call_graph(&dir.path().join("nope.json")).unwrap().is_none());
    }
}
