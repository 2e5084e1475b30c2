//! Agent output wrapper with typed accessors.

use serde::Serialize;
use serde_json::Value;

use crate::artifact::Artifact;

/// The JSON object an agent returned for one task.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TaskOutput(Value);

impl TaskOutput {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// String entries of an array field; non-strings are skipped.
    pub fn strings(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Field value or `null`, for threading into the next step's payload.
    pub fn field(&self, key: &str) -> Value {
        self.0.get(key).cloned().unwrap_or(Value::Null)
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        Artifact::list_from(&self.0)
    }
}

impl From<Value> for TaskOutput {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_accessors() {
        let out = TaskOutput::new(json!({
            "viabilityScore": 0.3,
            "criticalBugs": 2.0,
            "summary": "ok",
            "ready": true,
            "concerns": ["x", 1, "y"],
            "artifacts": [{"path": "a.md"}]
        }));
        assert_eq!(out.number("viabilityScore"), Some(0.3));
        assert_eq!(out.number("criticalBugs"), Some(2.0));
        assert_eq!(out.string("summary"), Some("ok"));
        assert_eq!(out.boolean("ready"), Some(true));
        assert_eq!(out.strings("concerns"), vec!["x", "y"]);
        assert_eq!(out.field("missing"), Value::Null);
        assert_eq!(out.artifacts().len(), 1);
    }
}
