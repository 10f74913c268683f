//! The Constitution Validator (spec.md §4.3 "Act", §7): hard constraints
//! checked against a tool call's arguments before dispatch. A violation
//! never reaches the tool; it becomes a message the model sees and can
//! self-correct from (spec.md §7 "Operator-visible behavior").

use serde_json::Value;

use crate::error::ConstitutionError;

fn violation(constraint: &str, message: impl Into<String>) -> ConstitutionError {
    ConstitutionError::Violation {
        constraint: constraint.to_string(),
        message: message.into(),
    }
}

/// Checks `name`/`args` against every applicable clause, short-circuiting
/// on the first violation (spec.md §8 "Boundary behaviors").
pub fn validate(name: &str, args: &Value) -> Result<(), ConstitutionError> {
    match name {
        "apply_patch" => validate_apply_patch(args),
        "read_code_block" => validate_read_code_block(args),
        _ => Ok(()),
    }
}

/// "Constitution rejects `apply_patch` when `files` is missing, empty, or
/// any entry lacks both `content` and `edits`" (spec.md §8).
fn validate_apply_patch(args: &Value) -> Result<(), ConstitutionError> {
    let files = args.get("files").and_then(Value::as_array);
    let Some(files) = files else {
        return Err(violation(
            "apply_patch.write-constraints",
            "apply_patch.files is required and must be a non-empty array",
        ));
    };
    if files.is_empty() {
        return Err(violation(
            "apply_patch.write-constraints",
            "apply_patch.files must not be empty",
        ));
    }
    for entry in files {
        let has_content = entry.get("content").and_then(Value::as_str).is_some();
        let has_edits = entry.get("edits").and_then(Value::as_array).is_some();
        if !has_content && !has_edits {
            let path = entry.get("path").and_then(Value::as_str).unwrap_or("<unknown>");
            return Err(violation(
                "apply_patch.write-constraints",
                format!("apply_patch entry for '{path}' has neither 'content' nor 'edits'"),
            ));
        }
    }
    Ok(())
}

/// "read_code_block rejects any read lacking both `symbol_name` and an
/// explicit line range on a code file" (spec.md §8). Non-code files
/// (extension outside the configured code set) are exempt, matching the
/// tool's own whole-file fallback for those extensions.
fn validate_read_code_block(args: &Value) -> Result<(), ConstitutionError> {
    if args.get("requests").and_then(Value::as_array).is_some() {
        // Batched form: each nested request is validated individually by
        // the tool itself; the Constitution only gates the top-level
        // single-read shape it understands.
        return Ok(());
    }
    let has_symbol = args.get("symbol_name").and_then(Value::as_str).is_some();
    let has_range = args.get("start_line").and_then(Value::as_u64).is_some()
        && args.get("end_line").and_then(Value::as_u64).is_some();
    if has_symbol || has_range {
        return Ok(());
    }
    let Some(file_path) = args.get("file_path").and_then(Value::as_str) else {
        return Err(violation(
            "read_code_block.scope-required",
            "read_code_block.file_path is required",
        ));
    };
    if is_code_file(file_path) {
        return Err(violation(
            "read_code_block.scope-required",
            format!("read_code_block on code file '{file_path}' requires either 'symbol_name' or an explicit line range"),
        ));
    }
    Ok(())
}

const NON_CODE_EXTENSIONS: &[&str] = &[
    "json", "md", "yml", "yaml", "toml", "txt", "xml", "html", "cmake", "lock", "ini", "cfg", "conf", "env",
];

fn is_code_file(file_path: &str) -> bool {
    let ext = std::path::Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match ext {
        Some(ext) => !NON_CODE_EXTENSIONS.contains(&ext.as_str()),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_missing_files_field() {
        let err = validate("apply_patch", &json!({}));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_empty_files_array() {
        let err = validate("apply_patch", &json!({"files": []}));
        assert!(err.is_err());
    }

    #[test]
    fn rejects_entry_without_content_or_edits() {
        let err = validate("apply_patch", &json!({"files": [{"path": "a.rs"}]}));
        assert!(err.is_err());
    }

    #[test]
    fn accepts_well_formed_apply_patch() {
        let ok = validate("apply_patch", &json!({"files": [{"path": "a.rs", "content": "fn main() {}"}]}));
        assert!(ok.is_ok());
    }

    #[test]
    fn rejects_unscoped_read_of_code_file() {
        let err = validate("read_code_block", &json!({"file_path": "a.rs"}));
        assert!(err.is_err());
    }

    #[test]
    fn allows_unscoped_read_of_non_code_file() {
        let ok = validate("read_code_block", &json!({"file_path": "README.md"}));
        assert!(ok.is_ok());
    }

    #[test]
    fn allows_scoped_read_by_symbol_name() {
        let ok = validate("read_code_block", &json!({"file_path": "a.rs", "symbol_name": "main"}));
        assert!(ok.is_ok());
    }

    #[test]
    fn unrelated_tools_are_not_constrained() {
        let ok = validate("run_command", &json!({}));
        assert!(ok.is_ok());
    }
}
