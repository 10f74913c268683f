//! Concrete `SymbolProvider` implementations: a generic, table-driven
//! tree-sitter walker covering the grammars in Cargo.toml, and a regex
//! fallback for files no grammar claims.
//!
//! The walker visits a `tree_sitter::Node` tree by hand, matching on
//! `node.kind()` string literals rather than `tree_sitter::Query`
//! S-expressions, and factors the per-language specifics (which node
//! kinds are symbols, which field holds the name, which kind marks a
//! call) into a static table so one walker serves every language instead
//! of one struct per language.

pub mod language;
pub mod regex_provider;
pub mod tree_sitter_provider;

pub use regex_provider::RegexProvider;
pub use tree_sitter_provider::TreeSitterProvider;
