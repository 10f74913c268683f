//! A single generic tree-sitter walker driven by `providers::language`'s
//! per-language tables: parse with `tree_sitter::Parser`, then recurse
//! over `Node`s matching on `node.kind()`. The kind/field names live in a
//! table instead of being hardcoded once per language, so one walker
//! serves every grammar in Cargo.toml.

use std::path::Path;

use tree_sitter::{Node, Parser};

use crate::providers::language::{LanguageSpec, NameStrategy, LANGUAGES};
use crate::symbol::provider::SymbolProvider;
use crate::symbol::{CallInfo, Symbol};
use crate::types::{LineRange, SymbolId, SymbolKind, SymbolSource};

pub struct TreeSitterProvider {
    spec: &'static LanguageSpec,
}

impl TreeSitterProvider {
    pub fn new(spec: &'static LanguageSpec) -> Self {
        Self { spec }
    }

    /// One provider per grammar in `LANGUAGES`, ready to register with a
    /// `SymbolIndex`.
    pub fn all() -> Vec<Box<dyn SymbolProvider>> {
        LANGUAGES
            .iter()
            .map(|spec| Box::new(TreeSitterProvider::new(spec)) as Box<dyn SymbolProvider>)
            .collect()
    }

    fn parser(&self) -> Option<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&(self.spec.language)()).ok()?;
        Some(parser)
    }
}

impl SymbolProvider for TreeSitterProvider {
    fn name(&self) -> &'static str {
        self.spec.id
    }

    fn supports_extension(&self, ext: &str) -> bool {
        self.spec.extensions.contains(&ext)
    }

    fn extract_symbols(
        &self,
        content: &str,
        path: &Path,
        next_id: &mut dyn FnMut() -> SymbolId,
    ) -> Vec<Symbol> {
        let Some(mut parser) = self.parser() else {
            return Vec::new();
        };
        let Some(tree) = parser.parse(content, None) else {
            return Vec::new();
        };

        let mut symbols = Vec::new();
        walk_symbols(tree.root_node(), content, path, self.spec, next_id, &mut symbols);
        symbols
    }

    fn extract_calls(&self, content: &str, range: LineRange) -> Vec<CallInfo> {
        if self.spec.call_rules.is_empty() {
            return Vec::new();
        }
        let Some(mut parser) = self.parser() else {
            return Vec::new();
        };
        let Some(tree) = parser.parse(content, None) else {
            return Vec::new();
        };

        let mut calls = Vec::new();
        walk_calls(tree.root_node(), content, self.spec, range, &mut calls);
        calls
    }
}

fn node_name<'a>(node: Node, content: &'a str, strategy: NameStrategy) -> Option<&'a str> {
    match strategy {
        NameStrategy::Field(field) => {
            let name_node = node.child_by_field_name(field)?;
            content.get(name_node.byte_range())
        }
        NameStrategy::DeclaratorIdentifier => {
            let mut cursor = node.child_by_field_name("declarator")?;
            loop {
                match cursor.kind() {
                    "identifier" | "field_identifier" => {
                        return content.get(cursor.byte_range());
                    }
                    _ => {
                        cursor = cursor.child_by_field_name("declarator")?;
                    }
                }
            }
        }
    }
}

fn is_inside_method_container(node: Node, spec: &LanguageSpec) -> bool {
    if spec.method_container_kinds.is_empty() {
        return false;
    }
    let mut current = node.parent();
    while let Some(n) = current {
        if spec.method_container_kinds.contains(&n.kind()) {
            return true;
        }
        current = n.parent();
    }
    false
}

fn walk_symbols(
    node: Node,
    content: &str,
    path: &Path,
    spec: &LanguageSpec,
    next_id: &mut dyn FnMut() -> SymbolId,
    out: &mut Vec<Symbol>,
) {
    for rule in spec.symbol_rules {
        if node.kind() == rule.node_kind {
            if let Some(name) = node_name(node, content, rule.name) {
                let mut kind = rule.kind;
                if kind == SymbolKind::Function && is_inside_method_container(node, spec) {
                    kind = SymbolKind::Method;
                }
                let range = LineRange::new(
                    node.start_position().row as u32 + 1,
                    node.end_position().row as u32 + 1,
                );
                let signature = content
                    .get(node.byte_range())
                    .and_then(|s| s.lines().next())
                    .map(str::trim)
                    .filter(|s| !s.is_empty());

                let mut symbol = Symbol::new(
                    next_id(),
                    name,
                    kind,
                    SymbolSource::TreeSitter,
                    path.to_path_buf(),
                    range,
                );
                if let Some(sig) = signature {
                    symbol = symbol.with_signature(sig);
                }
                out.push(symbol);
            }
            break;
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_symbols(child, content, path, spec, next_id, out);
    }
}

fn last_identifier_text<'a>(node: Node, content: &'a str) -> Option<&'a str> {
    if node.child_count() == 0 {
        return if node.kind().ends_with("identifier") {
            content.get(node.byte_range())
        } else {
            None
        };
    }
    let mut cursor = node.walk();
    let mut found = None;
    for child in node.children(&mut cursor) {
        if let Some(text) = last_identifier_text(child, content) {
            found = Some(text);
        }
    }
    found
}

fn walk_calls(
    node: Node,
    content: &str,
    spec: &LanguageSpec,
    range: LineRange,
    out: &mut Vec<CallInfo>,
) {
    let line = node.start_position().row as u32 + 1;
    if range.contains(line) {
        for rule in spec.call_rules {
            if node.kind() == rule.node_kind {
                if let Some(function_node) = node.child_by_field_name(rule.function_field) {
                    if let Some(callee) = last_identifier_text(function_node, content) {
                        let column = node.start_position().column as u16;
                        out.push(CallInfo::new(callee, line, column));
                    }
                }
                break;
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_calls(child, content, spec, range, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::language::LANGUAGES;
    use crate::types::SymbolId;

    fn rust_spec() -> &'static LanguageSpec {
        LANGUAGES.iter().find(|l| l.id == "rust").unwrap()
    }

    #[test]
    fn extracts_rust_functions_and_structs() {
        let provider = TreeSitterProvider::new(rust_spec());
        let code = r#"
struct Point { x: i32, y: i32 }

fn free_function() {}

impl Point {
    fn method(&self) {}
}
"#;
        let mut counter = 0u32;
        let mut next_id = move || {
            counter += 1;
            SymbolId::new(counter).unwrap()
        };
        let symbols = provider.extract_symbols(code, Path::new("a.rs"), &mut next_id);

        assert!(symbols.iter().any(|s| &*s.name == "Point" && s.kind == SymbolKind::Struct));
        assert!(symbols
            .iter()
            .any(|s| &*s.name == "free_function" && s.kind == SymbolKind::Function));
        assert!(symbols.iter().any(|s| &*s.name == "method" && s.kind == SymbolKind::Method));
    }

    #[test]
    fn extracts_rust_calls_within_range() {
        let provider = TreeSitterProvider::new(rust_spec());
        let code = "fn caller() {\n    callee();\n}\n";
        let calls = provider.extract_calls(code, LineRange::new(1, 3));
        assert!(calls.iter().any(|c| &*c.callee_name == "callee"));
    }

    #[test]
    fn supports_extension_is_case_sensitive_lowercase() {
        let provider = TreeSitterProvider::new(rust_spec());
        assert!(provider.supports_extension("rs"));
        assert!(!provider.supports_extension("py"));
    }
}
