//! Typed view over the `/api/history/{id}` response.
//!
//! The history body is loosely structured, so parsing here is lenient:
//! unknown fields are ignored and malformed image descriptors are skipped
//! rather than failing the whole poll.

use std::collections::BTreeMap;

use nova_core::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal-or-not status of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Pending,
    Completed,
    Error,
}

/// Pointer to an output file held in the engine's own storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    /// Storage area on the engine side (`output`, `temp`, `input`).
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "output".to_string()
}

/// One parsed history entry.
#[derive(Debug, Clone)]
pub struct EngineHistoryRecord {
    pub status: HistoryStatus,
    /// Artifacts per node id, iterated in lexicographic node-id order.
    pub outputs: BTreeMap<String, Vec<ArtifactRef>>,
    pub error_detail: Option<String>,
    /// The untouched entry as returned by the engine.
    pub raw: Value,
}

impl EngineHistoryRecord {
    /// Pick the entry for `prompt_id` out of a history response.
    ///
    /// Returns `None` when the engine has not created the entry yet.
    pub fn extract(history: &Value, prompt_id: &str) -> Option<Self> {
        history
            .get(prompt_id)
            .filter(|entry| !entry.is_null())
            .map(Self::parse)
    }

    /// Parse a single history entry.
    pub fn parse(entry: &Value) -> Self {
        let (status, error_detail) = parse_status(entry.get("status").unwrap_or(&Value::Null));

        let mut outputs = BTreeMap::new();
        if let Some(nodes) = entry.get("outputs").and_then(Value::as_object) {
            for (node_id, node_output) in nodes {
                let images: Vec<ArtifactRef> = node_output
                    .get("images")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|item| serde_json::from_value(item.clone()).ok())
                            .collect()
                    })
                    .unwrap_or_default();
                outputs.insert(node_id.clone(), images);
            }
        }

        Self {
            status,
            outputs,
            error_detail,
            raw: entry.clone(),
        }
    }
}

/// Interpret the `status` object.
///
/// Accepts both `{"status": "completed"}` and the
/// `{"status_str": "success", "completed": true}` form.
fn parse_status(status: &Value) -> (HistoryStatus, Option<String>) {
    let label = status.get("status").and_then(Value::as_str);
    let status_str = status.get("status_str").and_then(Value::as_str);
    let completed = status
        .get("completed")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if label == Some("error") || status_str == Some("error") {
        let detail = status.get("error").and_then(|e| match e {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        });
        return (HistoryStatus::Error, detail);
    }

    if label == Some("completed") || (completed && status_str == Some("success")) {
        return (HistoryStatus::Completed, None);
    }

    (HistoryStatus::Pending, None)
}

/// Return the first artifact across all output nodes.
pub fn locate_artifact(record: &EngineHistoryRecord) -> Result<ArtifactRef, CoreError> {
    record
        .outputs
        .values()
        .flatten()
        .next()
        .cloned()
        .ok_or_else(|| CoreError::Engine("No images were returned by the workflow.".to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn extract_absent_entry() {
        assert!(EngineHistoryRecord::extract(&json!({}), "p1").is_none());
        assert!(EngineHistoryRecord::extract(&json!({"p1": null}), "p1").is_none());
    }

    #[test]
    fn parses_completed_with_images() {
        let history = json!({"p1": {
            "status": {"status": "completed"},
            "outputs": {"9": {"images": [{"filename": "a.png", "subfolder": "", "type": "output"}]}}
        }});
        let rec = EngineHistoryRecord::extract(&history, "p1").unwrap();
        assert_eq!(rec.status, HistoryStatus::Completed);
        assert_eq!(rec.outputs["9"][0].filename, "a.png");
        assert_eq!(rec.raw["status"]["status"], "completed");
    }

    #[test]
    fn parses_success_flag_form() {
        let rec = EngineHistoryRecord::parse(&json!({
            "status": {"status_str": "success", "completed": true, "messages": []},
            "outputs": {}
        }));
        assert_eq!(rec.status, HistoryStatus::Completed);
    }

    #[test]
    fn parses_error_with_detail() {
        let rec = EngineHistoryRecord::parse(&json!({
            "status": {"status": "error", "error": "CUDA out of memory"}
        }));
        assert_eq!(rec.status, HistoryStatus::Error);
        assert_eq!(rec.error_detail.as_deref(), Some("CUDA out of memory"));
    }

    #[test]
    fn unknown_status_is_pending() {
        let rec = EngineHistoryRecord::parse(&json!({"status": {"status": "running"}}));
        assert_eq!(rec.status, HistoryStatus::Pending);
        let rec = EngineHistoryRecord::parse(&json!({}));
        assert_eq!(rec.status, HistoryStatus::Pending);
    }

    #[test]
    fn artifact_kind_defaults_to_output() {
        let a: ArtifactRef = serde_json::from_value(json!({"filename": "x.png"})).unwrap();
        assert_eq!(a.kind, "output");
        assert_eq!(a.subfolder, "");
    }

    #[test]
    fn locate_skips_nodes_without_images() {
        let rec = EngineHistoryRecord::parse(&json!({
            "status": {"status": "completed"},
            "outputs": {
                "10": {"images": [{"filename": "second.png"}]},
                "2": {"text": ["no images here"]},
                "11": {"images": [{"filename": "third.png"}]}
            }
        }));
        // Node ids iterate lexicographically: "10" < "11" < "2".
        assert_eq!(locate_artifact(&rec).unwrap().filename, "second.png");
    }

    #[test]
    fn locate_without_images_is_engine_error() {
        let rec = EngineHistoryRecord::parse(&json!({
            "status": {"status": "completed"},
            "outputs": {"9": {"images": []}}
        }));
        assert_matches!(locate_artifact(&rec), Err(CoreError::Engine(msg)) if msg.contains("No images"));
    }
}
