/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Workflow parameter values keyed by placeholder name.
pub type Params = std::collections::BTreeMap<String, serde_json::Value>;
