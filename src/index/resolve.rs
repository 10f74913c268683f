//! Call-edge resolution: local match, then global match (with qualifier
//! stripping), then case-insensitive, then an unresolved/ambiguous
//! sentinel. LSP goto-definition tie-breaking is deferred until a
//! registry is attached via [`NameIndex::resolve_with_lsp`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::symbol::{ambiguous_key, composite_key, unresolved_key, Symbol};

pub struct NameIndex {
    by_name: HashMap<String, Vec<(PathBuf, String)>>,
    by_name_lower: HashMap<String, Vec<(PathBuf, String)>>,
}

impl NameIndex {
    pub fn build(file_symbols: &HashMap<PathBuf, Vec<Symbol>>) -> Self {
        let mut by_name: HashMap<String, Vec<(PathBuf, String)>> = HashMap::new();
        let mut by_name_lower: HashMap<String, Vec<(PathBuf, String)>> = HashMap::new();

        for symbols in file_symbols.values() {
            for symbol in symbols {
                let key = composite_key(&symbol.path, symbol.range.start_line, &symbol.name);
                by_name
                    .entry(symbol.name.to_string())
                    .or_default()
                    .push((symbol.path.clone(), key.clone()));
                by_name_lower
                    .entry(symbol.name.to_lowercase())
                    .or_default()
                    .push((symbol.path.clone(), key));
            }
        }

        Self { by_name, by_name_lower }
    }

    /// Strip a language-specific qualifier (`Ns::Name`, `obj.Name`,
    /// `pkg.Name`) down to the trailing segment.
    fn unqualified(name: &str) -> &str {
        name.rsplit("::").next().unwrap_or(name).rsplit('.').next().unwrap_or(name)
    }

    pub fn resolve(&self, caller_path: &Path, callee_name: &str) -> String {
        if let Some(candidates) = self.by_name.get(callee_name) {
            if let Some(key) = Self::unique_in_path(candidates, caller_path) {
                return key;
            }
            if candidates.len() == 1 {
                return candidates[0].1.clone();
            }
        }

        let stripped = Self::unqualified(callee_name);
        if stripped != callee_name {
            if let Some(candidates) = self.by_name.get(stripped) {
                if candidates.len() == 1 {
                    return candidates[0].1.clone();
                }
            }
        }

        let lower = callee_name.to_lowercase();
        if let Some(candidates) = self.by_name_lower.get(&lower) {
            if candidates.len() == 1 {
                return candidates[0].1.clone();
            }
            if !candidates.is_empty() {
                return ambiguous_key(callee_name);
            }
        }

        if self.by_name.contains_key(callee_name) || self.by_name.contains_key(stripped) {
            return ambiguous_key(callee_name);
        }
        unresolved_key(callee_name)
    }

    fn unique_in_path(candidates: &[(PathBuf, String)], path: &Path) -> Option<String> {
        let mut matches = candidates.iter().filter(|(p, _)| p == path);
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(first.1.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineRange, SymbolId, SymbolKind, SymbolSource};

    fn sym(id: u32, name: &str, path: &str, line: u32) -> Symbol {
        Symbol::new(
            SymbolId::new(id).unwrap(),
            name,
            SymbolKind::Function,
            SymbolSource::TreeSitter,
            PathBuf::from(path),
            LineRange::new(line, line + 1),
        )
    }

    #[test]
    fn resolves_local_match_over_global() {
        let mut map = HashMap::new();
        map.insert(
            PathBuf::from("a.rs"),
            vec![sym(1, "helper", "a.rs", 1), sym(2, "caller", "a.rs", 10)],
        );
        map.insert(PathBuf::from("b.rs"), vec![sym(3, "helper", "b.rs", 1)]);
        let index = NameIndex::build(&map);

        let resolved = index.resolve(Path::new("a.rs"), "helper");
        assert_eq!(resolved, "a.rs:1:helper");
    }

    #[test]
    fn resolves_unique_global_match() {
        let mut map = HashMap::new();
        map.insert(PathBuf::from("a.rs"), vec![sym(1, "caller", "a.rs", 1)]);
        map.insert(PathBuf::from("b.rs"), vec![sym(2, "only_one", "b.rs", 5)]);
        let index = NameIndex::build(&map);

        assert_eq!(index.resolve(Path::new("a.rs"), "only_one"), "b.rs:5:only_one");
    }

    #[test]
    fn ambiguous_when_multiple_globals_match() {
        let mut map = HashMap::new();
        map.insert(PathBuf::from("a.rs"), vec![sym(1, "dup", "a.rs", 1)]);
        map.insert(PathBuf::from("b.rs"), vec![sym(2, "dup", "b.rs", 1)]);
        let index = NameIndex::build(&map);

        assert_eq!(index.resolve(Path::new("c.rs"), "dup"), "ambiguous:dup");
    }

    #[test]
    fn unresolved_when_nothing_matches() {
        let map = HashMap::new();
        let index = NameIndex::build(&map);
        assert_eq!(index.resolve(Path::new("a.rs"), "nope"), "unresolved:nope");
    }

    #[test]
    fn strips_qualifier_before_global_lookup() {
        let mut map = HashMap::new();
        map.insert(PathBuf::from("a.rs"), vec![sym(1, "caller", "a.rs", 1)]);
        map.insert(PathBuf::from("b.rs"), vec![sym(2, "Name", "b.rs", 5)]);
        let index = NameIndex::build(&map);

        assert_eq!(index.resolve(Path::new("a.rs"), "Ns::Name"), "b.rs:5:Name");
    }
}
