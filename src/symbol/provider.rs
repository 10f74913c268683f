//! Provider polymorphism (Design Notes §9): a capability set
//! `{supports_extension, extract_symbols, extract_calls}` implemented by
//! `TreeSitterProvider` and `RegexProvider`. Ordering is intrinsic to the
//! list the index holds, not the trait, per the same Design Note.

use crate::symbol::{CallInfo, Symbol};
use crate::types::{LineRange, SymbolId};
use std::path::Path;

/// A replaceable unit that extracts symbols (and optionally call sites)
/// from a file's contents given its path. Grounded in the teacher's
/// `LanguageParser` trait (`src/parsing/parser.rs`) and
/// `original_source/src/analysis/providers/{TreeSitter,Regex}SymbolProvider`.
pub trait SymbolProvider: Send + Sync {
    /// Human-readable provider name, used as `Symbol::source`'s display
    /// form in diagnostics (the `SymbolSource` enum carries the actual
    /// provenance tag).
    fn name(&self) -> &'static str;

    /// Whether this provider claims the given (lowercase, no-dot) file
    /// extension.
    fn supports_extension(&self, ext: &str) -> bool;

    /// Extract symbols from `content`. `next_id` is called once per
    /// produced symbol to obtain its arena-dense `SymbolId`.
    fn extract_symbols(
        &self,
        content: &str,
        path: &Path,
        next_id: &mut dyn FnMut() -> SymbolId,
    ) -> Vec<Symbol>;

    /// Extract call sites within `range` of `content`, attributing them to
    /// the enclosing symbol. Tree-sitter providers implement this; the
    /// regex fallback returns an empty vec (Design Notes §9:
    /// `extract_calls` is optional on the capability set).
    fn extract_calls(&self, _content: &str, _range: LineRange) -> Vec<CallInfo> {
        Vec::new()
    }
}
