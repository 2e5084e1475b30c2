//! Artifacts: references to files produced by agent steps.
//!
//! Artifacts are purely descriptive. Nothing here dereferences or validates
//! the path; they are collected in call order and handed back in the
//! process result.

use serde::{Deserialize, Serialize};

/// A file produced by an agent step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Artifact {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: None,
            label: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Parse the `artifacts` array of an agent output.
    ///
    /// Entries that are not objects with a string `path` are skipped with a
    /// debug event; a bare string is accepted as a path.
    pub fn list_from(value: &serde_json::Value) -> Vec<Artifact> {
        let Some(items) = value.get("artifacts").and_then(|a| a.as_array()) else {
            return Vec::new();
        };

        items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let artifact = match item {
                    serde_json::Value::String(path) => Some(Artifact::new(path.clone())),
                    serde_json::Value::Object(_) => serde_json::from_value(item.clone()).ok(),
                    _ => None,
                };
                if artifact.is_none() {
                    tracing::debug!(index, entry = %item, "Skipping artifact without a path");
                }
                artifact
            })
            .collect()
    }
}

/// Ordered artifact accumulator for one process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactLog {
    entries: Vec<Artifact>,
}

impl ArtifactLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every artifact of a step output, preserving order.
    pub fn extend_from(&mut self, output: &serde_json::Value) {
        self.entries.extend(Artifact::list_from(output));
    }

    pub fn push(&mut self, artifact: Artifact) {
        self.entries.push(artifact);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[Artifact] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<Artifact> {
        self.entries
    }
}
