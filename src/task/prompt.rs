//! Agent prompt payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured prompt handed to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPrompt {
    /// Persona the agent should adopt.
    pub role: String,
    /// One-line statement of the job.
    pub task: String,
    /// Step inputs and prior outputs, passed through untouched.
    pub context: Value,
    pub instructions: Vec<String>,
    pub output_format: String,
}

impl AgentPrompt {
    pub fn new(role: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            task: task.into(),
            context: Value::Null,
            instructions: Vec::new(),
            output_format: "JSON object matching the output schema".to_string(),
        }
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions = instructions.into_iter().map(Into::into).collect();
        self
    }

    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }
}
