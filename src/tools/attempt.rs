//! `attempt` (spec.md §4.2.8): get/update/clear the operator's current
//! intent record.

use serde_json::{json, Value};

use super::{Tool, ToolContext, ToolEnvelope};

pub struct Attempt;

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value?.as_array().map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    })
}

impl Tool for Attempt {
    fn name(&self) -> &'static str {
        "attempt"
    }

    fn description(&self) -> &'static str {
        "Get, update, or clear the persisted record of the operator's current intent."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["get", "update", "clear"]},
                "intent": {"type": "string"},
                "status": {"type": "string", "enum": ["in_progress", "done", "blocked"]},
                "read_scope": {"type": "array", "items": {"type": "string"}},
                "step_done": {"type": "string"},
                "affected_files": {"type": "array", "items": {"type": "string"}},
            },
            "required": ["action"],
        })
    }

    fn execute(&self, ctx: &ToolContext, args: Value) -> ToolEnvelope {
        let action = args.get("action").and_then(Value::as_str).unwrap_or("get");
        match action {
            "get" => {
                let record = ctx.attempt_store.get();
                ToolEnvelope::text("current attempt").with_field(
                    "record",
                    serde_json::to_value(&record).unwrap_or(Value::Object(Default::default())),
                )
            }
            "clear" => match ctx.attempt_store.clear() {
                Ok(()) => ToolEnvelope::text("attempt record cleared"),
                Err(e) => ToolEnvelope::error(format!("failed to clear attempt record: {e}")),
            },
            "update" => {
                let intent = args.get("intent").and_then(Value::as_str).map(str::to_string);
                let status = args
                    .get("status")
                    .and_then(Value::as_str)
                    .and_then(|s| serde_json::from_value(Value::String(s.to_string())).ok());
                let read_scope = string_list(args.get("read_scope"));
                let step_done = args.get("step_done").and_then(Value::as_str).map(str::to_string);
                let affected_files = string_list(args.get("affected_files"));

                match ctx.attempt_store.update(intent, status, read_scope, step_done, affected_files) {
                    Ok(record) => ToolEnvelope::text("attempt record updated").with_field(
                        "record",
                        serde_json::to_value(&record).unwrap_or(Value::Object(Default::default())),
                    ),
                    Err(e) => ToolEnvelope::error(format!("failed to update attempt record: {e}")),
                }
            }
            other => ToolEnvelope::error(format!("unknown attempt action '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use tempfile::TempDir;

    #[test]
    fn lifecycle_matches_the_example_scenario() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(dir.path(), Settings::default(), None);
        let tool = Attempt;

        tool.execute(&ctx, json!({"action": "update", "intent": "T", "status": "in_progress"}));
        tool.execute(&ctx, json!({"action": "update", "step_done": "s1"}));
        tool.execute(&ctx, json!({"action": "update", "step_done": "s2"}));

        let result = tool.execute(&ctx, json!({"action": "get"}));
        let record = result.extra.get("record").unwrap();
        assert_eq!(record["steps_completed"], json!(["s1", "s2"]));
        assert_eq!(record["status"], json!("in_progress"));

        tool.execute(&ctx, json!({"action": "clear"}));
        let cleared = tool.execute(&ctx, json!({"action": "get"}));
        let record = cleared.extra.get("record").unwrap();
        assert_eq!(record["steps_completed"], json!([]));
        assert!(record["intent"].is_null());
    }

    #[test]
    fn unknown_action_errors() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(dir.path(), Settings::default(), None);
        let tool = Attempt;
        let result = tool.execute(&ctx, json!({"action": "nope"}));
        assert!(result.is_error());
    }
}
