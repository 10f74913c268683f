//! Static per-language tables driving the generic tree-sitter walker.
//!
//! Field names (`"name"`, `"function"`) and kind lists come from each
//! grammar's own node-types.json / published node kinds.

use crate::types::SymbolKind;
use tree_sitter::Language;

/// How a symbol-producing node's name token is found.
#[derive(Clone, Copy)]
pub enum NameStrategy {
    /// `node.child_by_field_name(field)`.
    Field(&'static str),
    /// C/C++ function definitions nest the identifier inside a chain of
    /// declarators (`pointer_declarator` wrapping `function_declarator`
    /// wrapping the identifier) rather than exposing it as a direct field.
    DeclaratorIdentifier,
}

/// A node kind that introduces a symbol.
pub struct SymbolRule {
    pub node_kind: &'static str,
    pub name: NameStrategy,
    pub kind: SymbolKind,
}

/// A node kind that represents a call expression, plus the field holding
/// the callee expression.
pub struct CallRule {
    pub node_kind: &'static str,
    pub function_field: &'static str,
}

pub struct LanguageSpec {
    pub id: &'static str,
    pub extensions: &'static [&'static str],
    pub language: fn() -> Language,
    pub symbol_rules: &'static [SymbolRule],
    /// Node kinds that, when an ancestor of a `Function`-kind match, mean
    /// the symbol should be reclassified as `Method` (teacher's rust.rs:
    /// a `function_item` inside an `impl_item` is a method).
    pub method_container_kinds: &'static [&'static str],
    pub call_rules: &'static [CallRule],
}

macro_rules! symbol_rule {
    ($kind:literal, field $field:literal, $symkind:ident) => {
        SymbolRule {
            node_kind: $kind,
            name: NameStrategy::Field($field),
            kind: SymbolKind::$symkind,
        }
    };
    ($kind:literal, declarator, $symkind:ident) => {
        SymbolRule {
            node_kind: $kind,
            name: NameStrategy::DeclaratorIdentifier,
            kind: SymbolKind::$symkind,
        }
    };
}

static RUST: LanguageSpec = LanguageSpec {
    id: "rust",
    extensions: &["rs"],
    language: || tree_sitter_rust::LANGUAGE.into(),
    symbol_rules: &[
        symbol_rule!("function_item", field "name", Function),
        symbol_rule!("struct_item", field "name", Struct),
        symbol_rule!("enum_item", field "name", Enum),
        symbol_rule!("trait_item", field "name", Interface),
    ],
    method_container_kinds: &["impl_item"],
    call_rules: &[CallRule {
        node_kind: "call_expression",
        function_field: "function",
    }],
};

static PYTHON: LanguageSpec = LanguageSpec {
    id: "python",
    extensions: &["py", "pyi"],
    language: || tree_sitter_python::LANGUAGE.into(),
    symbol_rules: &[
        symbol_rule!("function_definition", field "name", Function),
        symbol_rule!("class_definition", field "name", Class),
    ],
    method_container_kinds: &["class_definition"],
    call_rules: &[CallRule {
        node_kind: "call",
        function_field: "function",
    }],
};

static JAVASCRIPT: LanguageSpec = LanguageSpec {
    id: "javascript",
    extensions: &["js", "jsx", "mjs", "cjs"],
    language: || tree_sitter_javascript::LANGUAGE.into(),
    symbol_rules: &[
        symbol_rule!("function_declaration", field "name", Function),
        symbol_rule!("class_declaration", field "name", Class),
        symbol_rule!("method_definition", field "name", Method),
    ],
    method_container_kinds: &[],
    call_rules: &[CallRule {
        node_kind: "call_expression",
        function_field: "function",
    }],
};

static TYPESCRIPT: LanguageSpec = LanguageSpec {
    id: "typescript",
    extensions: &["ts", "tsx", "mts", "cts"],
    language: || tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
    symbol_rules: &[
        symbol_rule!("function_declaration", field "name", Function),
        symbol_rule!("class_declaration", field "name", Class),
        symbol_rule!("method_definition", field "name", Method),
        symbol_rule!("interface_declaration", field "name", Interface),
    ],
    method_container_kinds: &[],
    call_rules: &[CallRule {
        node_kind: "call_expression",
        function_field: "function",
    }],
};

static GO: LanguageSpec = LanguageSpec {
    id: "go",
    extensions: &["go"],
    language: || tree_sitter_go::LANGUAGE.into(),
    symbol_rules: &[
        symbol_rule!("function_declaration", field "name", Function),
        symbol_rule!("method_declaration", field "name", Method),
        symbol_rule!("type_spec", field "name", Type),
    ],
    method_container_kinds: &[],
    call_rules: &[CallRule {
        node_kind: "call_expression",
        function_field: "function",
    }],
};

static JAVA: LanguageSpec = LanguageSpec {
    id: "java",
    extensions: &["java"],
    language: || tree_sitter_java::LANGUAGE.into(),
    symbol_rules: &[
        symbol_rule!("class_declaration", field "name", Class),
        symbol_rule!("interface_declaration", field "name", Interface),
        symbol_rule!("enum_declaration", field "name", Enum),
        symbol_rule!("method_declaration", field "name", Method),
    ],
    method_container_kinds: &[],
    call_rules: &[CallRule {
        node_kind: "method_invocation",
        function_field: "name",
    }],
};

static C: LanguageSpec = LanguageSpec {
    id: "c",
    extensions: &["c", "h"],
    language: || tree_sitter_c::LANGUAGE.into(),
    symbol_rules: &[
        symbol_rule!("function_definition", declarator, Function),
        symbol_rule!("struct_specifier", field "name", Struct),
        symbol_rule!("enum_specifier", field "name", Enum),
    ],
    method_container_kinds: &[],
    call_rules: &[CallRule {
        node_kind: "call_expression",
        function_field: "function",
    }],
};

static CPP: LanguageSpec = LanguageSpec {
    id: "cpp",
    extensions: &["cpp", "cc", "cxx", "hpp", "hh"],
    language: || tree_sitter_cpp::LANGUAGE.into(),
    symbol_rules: &[
        symbol_rule!("function_definition", declarator, Function),
        symbol_rule!("class_specifier", field "name", Class),
        symbol_rule!("struct_specifier", field "name", Struct),
        symbol_rule!("enum_specifier", field "name", Enum),
    ],
    method_container_kinds: &["class_specifier", "struct_specifier"],
    call_rules: &[CallRule {
        node_kind: "call_expression",
        function_field: "function",
    }],
};

static C_SHARP: LanguageSpec = LanguageSpec {
    id: "csharp",
    extensions: &["cs"],
    language: || tree_sitter_c_sharp::LANGUAGE.into(),
    symbol_rules: &[
        symbol_rule!("class_declaration", field "name", Class),
        symbol_rule!("interface_declaration", field "name", Interface),
        symbol_rule!("enum_declaration", field "name", Enum),
        symbol_rule!("method_declaration", field "name", Method),
    ],
    method_container_kinds: &[],
    call_rules: &[CallRule {
        node_kind: "invocation_expression",
        function_field: "function",
    }],
};

static PHP: LanguageSpec = LanguageSpec {
    id: "php",
    extensions: &["php"],
    language: || tree_sitter_php::LANGUAGE_PHP.into(),
    symbol_rules: &[
        symbol_rule!("function_definition", field "name", Function),
        symbol_rule!("class_declaration", field "name", Class),
        symbol_rule!("method_declaration", field "name", Method),
    ],
    method_container_kinds: &[],
    call_rules: &[
        CallRule {
            node_kind: "function_call_expression",
            function_field: "function",
        },
        CallRule {
            node_kind: "member_call_expression",
            function_field: "name",
        },
    ],
};

static SWIFT: LanguageSpec = LanguageSpec {
    id: "swift",
    extensions: &["swift"],
    language: || tree_sitter_swift::LANGUAGE.into(),
    symbol_rules: &[
        symbol_rule!("function_declaration", field "name", Function),
        symbol_rule!("class_declaration", field "name", Class),
    ],
    method_container_kinds: &["class_declaration"],
    call_rules: &[],
};

static LUA: LanguageSpec = LanguageSpec {
    id: "lua",
    extensions: &["lua"],
    language: || tree_sitter_lua::LANGUAGE.into(),
    symbol_rules: &[
        symbol_rule!("function_declaration", field "name", Function),
        symbol_rule!("local_function", field "name", Function),
    ],
    method_container_kinds: &[],
    call_rules: &[],
};

static GDSCRIPT: LanguageSpec = LanguageSpec {
    id: "gdscript",
    extensions: &["gd"],
    language: || tree_sitter_gdscript::LANGUAGE.into(),
    symbol_rules: &[symbol_rule!("function_definition", field "name", Function)],
    method_container_kinds: &[],
    call_rules: &[],
};

/// All languages with a full symbol/call-rule table. Clojure is
/// deliberately absent: `tree-sitter-clojure-orchard` represents every
/// form (including `defn`) as a uniform `list_lit`, which doesn't fit a
/// field-based name lookup, so Clojure files fall back to `RegexProvider`.
pub static LANGUAGES: &[&LanguageSpec] = &[
    &RUST,
    &PYTHON,
    &JAVASCRIPT,
    &TYPESCRIPT,
    &GO,
    &JAVA,
    &C,
    &CPP,
    &C_SHARP,
    &PHP,
    &SWIFT,
    &LUA,
    &GDSCRIPT,
];
