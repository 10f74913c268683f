//! Core identifiers and value types shared across the engine.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// Stable identity for a [`crate::symbol::Symbol`]. Never zero so that
/// `Option<SymbolId>` stays pointer-sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(NonZeroU32);

/// Stable identity for an indexed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(NonZeroU32);

impl SymbolId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

impl FileId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

/// A 1-based, half-open-by-convention line range. `end_line == 0` means
/// "unknown end", per the data model's Symbol attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start_line: u32,
    pub end_line: u32,
}

impl LineRange {
    pub fn new(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// Span in lines, or `u32::MAX` when the end is unknown (sorts last).
    pub fn span(&self) -> u32 {
        if self.end_line == 0 || self.end_line < self.start_line {
            u32::MAX
        } else {
            self.end_line - self.start_line
        }
    }

    pub fn contains(&self, line: u32) -> bool {
        if line < self.start_line {
            return false;
        }
        self.end_line == 0 || line <= self.end_line
    }
}

/// Symbol kind, per the data model's closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Struct,
    Function,
    Method,
    Interface,
    Enum,
    Type,
    Other,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::Type => "type",
            SymbolKind::Other => "other",
        }
    }
}

/// Provenance of a symbol: which provider (or fallback path) produced it.
/// Ordering here is priority order: tree-sitter < regex < legacy, used by
/// `search()`'s tie-break and by provider registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolSource {
    TreeSitter,
    Regex,
    Lsp,
    Legacy,
}

impl SymbolSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolSource::TreeSitter => "tree-sitter",
            SymbolSource::Regex => "regex",
            SymbolSource::Lsp => "lsp",
            SymbolSource::Legacy => "legacy",
        }
    }
}

pub type CompactString = Box<str>;

pub fn compact_string(s: &str) -> CompactString {
    s.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_id_rejects_zero() {
        assert!(SymbolId::new(0).is_none());
        assert_eq!(SymbolId::new(7).unwrap().value(), 7);
    }

    #[test]
    fn file_id_rejects_zero() {
        assert!(FileId::new(0).is_none());
        assert_eq!(FileId::new(3).unwrap().value(), 3);
    }

    #[test]
    fn line_range_contains_open_ended() {
        let r = LineRange::new(10, 0);
        assert!(r.contains(10));
        assert!(r.contains(1000));
        assert!(!r.contains(9));
    }

    #[test]
    fn line_range_span_orders_unknown_last() {
        let known = LineRange::new(10, 20);
        let unknown = LineRange::new(10, 0);
        assert!(known.span() < unknown.span());
    }

    #[test]
    fn symbol_source_priority_order() {
        assert!(SymbolSource::TreeSitter < SymbolSource::Regex);
        assert!(SymbolSource::Regex < SymbolSource::Lsp);
        assert!(SymbolSource::Lsp < SymbolSource::Legacy);
    }
}
