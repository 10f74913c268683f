//! Line-oriented regex fallback, used when no tree-sitter grammar claims
//! an extension (or a grammar's tree fails to parse): one `Regex` per
//! construct, tried in priority order per line.
//!
//! `SymbolSource::Regex` sorts below `TreeSitter` (see `SymbolSource`'s
//! declaration order), so a tree-sitter symbol at the same key always wins
//! a provider race; this provider exists to cover languages/files the
//! tree-sitter table doesn't.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::symbol::provider::SymbolProvider;
use crate::symbol::{CallInfo, Symbol};
use crate::types::{LineRange, SymbolId, SymbolKind, SymbolSource};

struct LineRule {
    regex: Regex,
    name_group: usize,
    kind: SymbolKind,
}

static RULES: LazyLock<Vec<LineRule>> = LazyLock::new(|| {
    vec![
        LineRule {
            regex: Regex::new(r"^\s*(?:pub\s+)?(class|struct|interface)\s+([A-Za-z0-9_]+)").unwrap(),
            name_group: 2,
            kind: SymbolKind::Class,
        },
        LineRule {
            regex: Regex::new(r"^\s*(def|async\s+def)\s+([A-Za-z0-9_]+)").unwrap(),
            name_group: 2,
            kind: SymbolKind::Function,
        },
        LineRule {
            regex: Regex::new(r"^\s*(?:export\s+)?(?:async\s+)?function\s+([A-Za-z0-9_]+)\s*\(").unwrap(),
            name_group: 1,
            kind: SymbolKind::Function,
        },
        LineRule {
            regex: Regex::new(r"^\s*(?:public|private|protected|static|\s)*[\w<>\[\],\s]+?\s+([A-Za-z0-9_]+)\s*\([^;]*\)\s*\{?\s*$").unwrap(),
            name_group: 1,
            kind: SymbolKind::Function,
        },
        LineRule {
            regex: Regex::new(r"^\s*interface\s+([A-Za-z0-9_]+)").unwrap(),
            name_group: 1,
            kind: SymbolKind::Interface,
        },
        LineRule {
            regex: Regex::new(r"^\s*type\s+([A-Za-z0-9_]+)\s*=").unwrap(),
            name_group: 1,
            kind: SymbolKind::Type,
        },
        LineRule {
            regex: Regex::new(r"^\s*enum\s+([A-Za-z0-9_]+)").unwrap(),
            name_group: 1,
            kind: SymbolKind::Enum,
        },
        LineRule {
            regex: Regex::new(r"^\s*\(defn-?\s+([A-Za-z0-9_!?*+/.<>=-]+)").unwrap(),
            name_group: 1,
            kind: SymbolKind::Function,
        },
    ]
});

pub struct RegexProvider;

impl RegexProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RegexProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolProvider for RegexProvider {
    fn name(&self) -> &'static str {
        "regex"
    }

    /// The catch-all: any extension no tree-sitter grammar claims, plus
    /// Clojure (whose uniform list-form grammar doesn't fit the
    /// tree-sitter table's field-based name lookup).
    fn supports_extension(&self, _ext: &str) -> bool {
        true
    }

    fn extract_symbols(
        &self,
        content: &str,
        path: &Path,
        next_id: &mut dyn FnMut() -> SymbolId,
    ) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        for (line_idx, line) in content.lines().enumerate() {
            let line_num = line_idx as u32 + 1;
            for rule in RULES.iter() {
                if let Some(caps) = rule.regex.captures(line) {
                    if let Some(m) = caps.get(rule.name_group) {
                        let range = LineRange::new(line_num, 0);
                        let symbol = Symbol::new(
                            next_id(),
                            m.as_str(),
                            rule.kind,
                            SymbolSource::Regex,
                            path.to_path_buf(),
                            range,
                        )
                        .with_signature(line.trim());
                        symbols.push(symbol);
                    }
                    break;
                }
            }
        }
        symbols
    }

    fn extract_calls(&self, _content: &str, _range: LineRange) -> Vec<CallInfo> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> impl FnMut() -> SymbolId {
        let mut counter = 0u32;
        move || {
            counter += 1;
            SymbolId::new(counter).unwrap()
        }
    }

    #[test]
    fn extracts_python_def_and_class() {
        let provider = RegexProvider::new();
        let code = "class Foo:\n    def bar(self):\n        pass\n";
        let mut next_id = ids();
        let symbols = provider.extract_symbols(code, Path::new("a.py"), &mut next_id);
        assert!(symbols.iter().any(|s| &*s.name == "Foo" && s.kind == SymbolKind::Class));
        assert!(symbols.iter().any(|s| &*s.name == "bar" && s.kind == SymbolKind::Function));
    }

    #[test]
    fn extracts_clojure_defn() {
        let provider = RegexProvider::new();
        let code = "(ns my.ns)\n(defn greet [name]\n  (str \"hi \" name))\n";
        let mut next_id = ids();
        let symbols = provider.extract_symbols(code, Path::new("a.clj"), &mut next_id);
        assert!(symbols.iter().any(|s| &*s.name == "greet" && s.kind == SymbolKind::Function));
    }

    #[test]
    fn every_extension_is_supported_as_fallback() {
        let provider = RegexProvider::new();
        assert!(provider.supports_extension("clj"));
        assert!(provider.supports_extension("anything"));
    }
}
