//! Workflow template loading and `{{placeholder}}` substitution.
//!
//! A workflow description is an arbitrary JSON document (the engine's node
//! graph). Templates carry `{{name}}` tokens inside string values; the
//! runner fills them from a [`Params`] map before submission.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::CoreError;
use crate::types::Params;

/// Regex matching `{{name}}` tokens. The capture is the raw name between
/// the braces; whitespace is significant.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("valid regex"));

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a workflow template from disk.
///
/// `None` or an empty path means the template was never configured.
pub fn load_template(path: Option<&Path>) -> Result<Value, CoreError> {
    let path = path
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            CoreError::Config(
                "ComfyUI workflow template not configured. Set COMFYUI_WORKFLOW_PATH (for generation) \
                 or COMFYUI_UPSCALE_WORKFLOW_PATH."
                    .to_string(),
            )
        })?;

    let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CoreError::NotFound(format!(
            "Workflow template file not found: {}",
            path.display()
        )),
        _ => CoreError::Io(e),
    })?;

    serde_json::from_str(&contents).map_err(|e| {
        CoreError::Parse(format!(
            "Invalid JSON in workflow template {}: {e}",
            path.display()
        ))
    })
}

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

/// Return a copy of `description` with every `{{key}}` inside string values
/// replaced by the stringified `params[key]`.
///
/// Objects and arrays keep their exact shape, non-string scalars are copied
/// as-is, and tokens whose key is absent from `params` are left in place.
/// A `null` parameter renders as the empty string.
pub fn substitute(description: &Value, params: &Params) -> Value {
    match description {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), substitute(value, params)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| substitute(item, params)).collect())
        }
        Value::String(text) => Value::String(substitute_str(text, params)),
        other => other.clone(),
    }
}

/// Replace placeholders in a single string in one pass, so values that
/// themselves contain `{{...}}` are never expanded again.
fn substitute_str(text: &str, params: &Params) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }
    PLACEHOLDER_RE
        .replace_all(text, |caps: &regex::Captures| match params.get(&caps[1]) {
            Some(value) => stringify(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Render a parameter value as it should appear inside a string.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// List the distinct placeholder names still present in `description`,
/// sorted.
pub fn unresolved_placeholders(description: &Value) -> Vec<String> {
    let mut names = Vec::new();
    collect_placeholders(description, &mut names);
    names.sort();
    names.dedup();
    names
}

fn collect_placeholders(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::Object(map) => map.values().for_each(|v| collect_placeholders(v, names)),
        Value::Array(items) => items.iter().for_each(|v| collect_placeholders(v, names)),
        Value::String(text) => names.extend(
            PLACEHOLDER_RE
                .captures_iter(text)
                .map(|caps| caps[1].to_string()),
        ),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
