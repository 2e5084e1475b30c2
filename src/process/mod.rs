//! Process definitions.
//!
//! A process is a fixed sequence of agent tasks, optionally fanned out in
//! parallel and gated by human breakpoints. Processes never talk to agents
//! directly; everything goes through the injected [`Orchestrator`].

pub mod contract_review;
pub mod game_concept;
pub mod game_playtesting;
pub mod game_qa_release;
pub mod operations_sop;
pub mod registry;
pub mod route_optimization;

pub use registry::ProcessRegistry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::artifact::{Artifact, ArtifactLog};
use crate::error::{OrchestrationError, ProcessError, Result};
use crate::orchestrator::Orchestrator;
use crate::task::{TaskDef, TaskOutput};

/// A named workflow.
#[async_trait]
pub trait Process: Send + Sync {
    /// Registry key, e.g. `game-concept-development`.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Every task this process may invoke, in declaration order.
    fn tasks(&self) -> &'static [TaskDef];

    /// Run the process to completion.
    async fn run(&self, inputs: Value, ctx: &dyn Orchestrator) -> Result<ProcessResult>;
}

/// Metadata attached to every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub process_id: String,
    pub timestamp: DateTime<Utc>,
    pub output_dir: String,
}

/// Aggregate result of one process run.
///
/// Step outputs are flattened into the top level, so the serialized form
/// reads `{ "success": true, "artifacts": [...], "marketAnalysis": {...}, "metadata": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub success: bool,
    pub artifacts: Vec<Artifact>,
    #[serde(flatten)]
    pub outputs: Map<String, Value>,
    pub metadata: ResultMetadata,
}

impl ProcessResult {
    pub fn new(process_id: &str, output_dir: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            artifacts: Vec::new(),
            outputs: Map::new(),
            metadata: ResultMetadata {
                process_id: process_id.to_string(),
                timestamp,
                output_dir: output_dir.into(),
            },
        }
    }

    pub fn with_output(mut self, key: &str, value: Value) -> Self {
        self.outputs.insert(key.to_string(), value);
        self
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactLog) -> Self {
        self.artifacts = artifacts.into_vec();
        self
    }

    /// A step output by key.
    pub fn output(&self, key: &str) -> Option<&Value> {
        self.outputs.get(key)
    }
}

/// Deserialize process inputs, treating `null` as "all defaults".
pub fn parse_inputs<T>(process: &str, inputs: Value) -> std::result::Result<T, ProcessError>
where
    T: DeserializeOwned + Default,
{
    if inputs.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(inputs).map_err(|e| ProcessError::InvalidInputs {
        process: process.to_string(),
        reason: e.to_string(),
    })
}

/// Runs steps against an orchestrator and keeps the artifact trail.
pub(crate) struct Steps<'a> {
    ctx: &'a dyn Orchestrator,
    artifacts: ArtifactLog,
}

impl<'a> Steps<'a> {
    pub(crate) fn new(ctx: &'a dyn Orchestrator) -> Self {
        Self {
            ctx,
            artifacts: ArtifactLog::new(),
        }
    }

    /// Run one task and append its artifacts.
    pub(crate) async fn run(
        &mut self,
        task: &TaskDef,
        args: Value,
    ) -> std::result::Result<TaskOutput, OrchestrationError> {
        let output = self.ctx.task(task, args).await?;
        self.artifacts.extend_from(output.value());
        Ok(output)
    }

    /// Append artifacts of outputs produced outside [`Steps::run`], such as
    /// parallel branches. Order follows the slice.
    pub(crate) fn absorb(&mut self, outputs: &[TaskOutput]) {
        for output in outputs {
            self.artifacts.extend_from(output.value());
        }
    }

    pub(crate) fn into_artifacts(self) -> ArtifactLog {
        self.artifacts
    }
}

/// Merge a reviewer's edited context over a step output.
///
/// Object keys in `edited` replace the same keys in `output`; anything else
/// replaces the output wholesale.
pub(crate) fn apply_edit(output: Value, edited: Option<Value>) -> Value {
    match (output, edited) {
        (Value::Object(mut base), Some(Value::Object(patch))) => {
            for (key, value) in patch {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, Some(replacement)) => replacement,
        (output, None) => output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    struct Inputs {
        game_name: Option<String>,
        budget: Option<f64>,
    }

    #[test]
    fn null_inputs_use_defaults() {
        let inputs: Inputs = parse_inputs("p", Value::Null).unwrap();
        assert!(inputs.game_name.is_none());
    }

    #[test]
    fn wrongly_typed_inputs_are_rejected() {
        let err = parse_inputs::<Inputs>("p", json!({"budget": "lots"})).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidInputs { ref process, .. } if process == "p"));
    }

    #[test]
    fn result_flattens_outputs() {
        let ts = Utc::now();
        let mut log = ArtifactLog::new();
        log.push(Artifact::new("a.md"));
        let result = ProcessResult::new("proc", "out", ts)
            .with_output("marketAnalysis", json!({"viabilityScore": 0.9}))
            .with_artifacts(log);

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["marketAnalysis"]["viabilityScore"], 0.9);
        assert_eq!(value["artifacts"][0]["path"], "a.md");
        assert_eq!(value["metadata"]["processId"], "proc");
        assert_eq!(value["metadata"]["outputDir"], "out");
        assert_eq!(result.output("marketAnalysis").unwrap()["viabilityScore"], 0.9);
    }

    #[test]
    fn edits_patch_object_outputs() {
        let merged = apply_edit(json!({"a": 1, "b": 2}), Some(json!({"b": 3})));
        assert_eq!(merged, json!({"a": 1, "b": 3}));
        assert_eq!(apply_edit(json!({"a": 1}), None), json!({"a": 1}));
        assert_eq!(apply_edit(json!({"a": 1}), Some(json!("x"))), json!("x"));
    }
}
