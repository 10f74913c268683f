//! The Symbol Index's data model: `Symbol`, `FileMeta`, `CallInfo`, and the
//! flat-string-keyed call graph, per spec.md §3.

pub mod provider;

use crate::types::{compact_string, CompactString, LineRange, SymbolId, SymbolKind, SymbolSource};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A declared symbol (class, struct, function, method, interface, enum).
///
/// Identity key (per spec.md §3) is `(path, start_line, name)`; `id` is an
/// internal dense arena index assigned by `SymbolIndex`, not part of the
/// identity (Design Notes §9, "arena + index opportunity").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: CompactString,
    pub kind: SymbolKind,
    pub source: SymbolSource,
    pub path: PathBuf,
    pub range: LineRange,
    pub signature: Option<Box<str>>,
}

impl Symbol {
    pub fn new(
        id: SymbolId,
        name: impl Into<CompactString>,
        kind: SymbolKind,
        source: SymbolSource,
        path: impl Into<PathBuf>,
        range: LineRange,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            source,
            path: path.into(),
            range,
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<Box<str>>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// The flat `path:line:name` composite key used for call-graph edges.
    pub fn composite_key(&self) -> String {
        composite_key(&self.path, self.range.start_line, &self.name)
    }

    /// De-duplication key: `kind|name|source|path|line|signature`, per
    /// spec.md §4.1's scan algorithm.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.kind.as_str(),
            self.name,
            self.source.as_str(),
            self.path.display(),
            self.range.start_line,
            self.signature.as_deref().unwrap_or(""),
        )
    }
}

pub fn composite_key(path: &Path, start_line: u32, name: &str) -> String {
    format!("{}:{start_line}:{name}", path.display())
}

pub fn unresolved_key(name: &str) -> String {
    format!("unresolved:{name}")
}

pub fn ambiguous_key(name: &str) -> String {
    format!("ambiguous:{name}")
}

pub fn is_sentinel_key(key: &str) -> bool {
    key.starts_with("unresolved:") || key.starts_with("ambiguous:")
}

/// Cached `(size, mtime, hash)` used to short-circuit reparse on unchanged
/// files (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub size: u64,
    pub mtime: u64,
    pub hash: u64,
}

impl FileMeta {
    pub fn matches_stat(&self, size: u64, mtime: u64) -> bool {
        self.size == size && self.mtime == mtime
    }
}

/// A call site inside a symbol's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    pub callee_name: CompactString,
    pub line: u32,
    pub column: u16,
}

impl CallInfo {
    pub fn new(callee_name: impl Into<CompactString>, line: u32, column: u16) -> Self {
        Self {
            callee_name: callee_name.into(),
            line,
            column,
        }
    }
}

/// Compute the standard 64-bit FNV-1a hash of a byte slice.
///
/// Intentionally non-cryptographic (spec.md §9, Open Questions) — used only
/// to short-circuit reparsing of unchanged files.
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

pub use compact_string as new_compact_string;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_known_vector() {
        // FNV-1a 64-bit of the empty string is the offset basis.
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
    }

    #[test]
    fn composite_key_format() {
        let key = composite_key(Path::new("a/b.rs"), 10, "foo");
        assert_eq!(key, "a/b.rs:10:foo");
    }

    #[test]
    fn sentinel_keys_are_recognized() {
        assert!(is_sentinel_key(&unresolved_key("foo")));
        assert!(is_sentinel_key(&ambiguous_key("foo")));
        assert!(!is_sentinel_key("a/b.rs:10:foo"));
    }

    #[test]
    fn dedup_key_distinguishes_by_every_component() {
        let id = SymbolId::new(1).unwrap();
        let a = Symbol::new(id, "foo", SymbolKind::Function, SymbolSource::TreeSitter, "a.rs", LineRange::new(1, 2));
        let b = Symbol::new(id, "foo", SymbolKind::Function, SymbolSource::Regex, "a.rs", LineRange::new(1, 2));
        assert_ne!(a.dedup_key(), b.dedup_key());
    }
}
