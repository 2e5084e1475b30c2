//! Task descriptors and the `define_task` builder.
//!
//! A descriptor is the declarative description of one agent invocation. It
//! performs no work itself; the orchestrator executes it.

use serde::Serialize;
use serde_json::Value;

use super::prompt::AgentPrompt;
use super::schema::OutputSchema;

/// Kind of work a descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Agent,
}

/// Agent invocation details.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSpec {
    pub name: String,
    pub prompt: AgentPrompt,
    pub output_schema: OutputSchema,
}

/// Where the task's input and output JSON live, relative to the run directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskIo {
    pub input_json_path: String,
    pub output_json_path: String,
}

impl TaskIo {
    /// `tasks/<effect_id>/{input,output}.json`
    pub fn for_effect(effect_id: &str) -> Self {
        Self {
            input_json_path: format!("tasks/{}/input.json", effect_id),
            output_json_path: format!("tasks/{}/output.json", effect_id),
        }
    }
}

/// Complete, immutable description of one task invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    pub kind: TaskKind,
    pub title: String,
    pub agent: AgentSpec,
    pub io: TaskIo,
    pub labels: Vec<String>,
}

/// Per-invocation context supplied by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub effect_id: String,
}

impl TaskContext {
    pub fn new(effect_id: impl Into<String>) -> Self {
        Self {
            effect_id: effect_id.into(),
        }
    }
}

/// What a task builder returns. `kind` and `io` are filled in by [`TaskDef`].
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTask {
    pub title: String,
    pub agent: AgentSpec,
    pub labels: Vec<String>,
}

impl AgentTask {
    pub fn new(title: impl Into<String>, agent_name: impl Into<String>, prompt: AgentPrompt) -> Self {
        Self {
            title: title.into(),
            agent: AgentSpec {
                name: agent_name.into(),
                prompt,
                output_schema: OutputSchema::object(),
            },
            labels: Vec::new(),
        }
    }

    pub fn output_schema(mut self, schema: OutputSchema) -> Self {
        self.agent.output_schema = schema;
        self
    }

    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }
}

/// Builder signature: pure function of `(args, ctx)`.
pub type TaskBuilder = fn(&Value, &TaskContext) -> AgentTask;

/// A named task definition. Construct with [`define_task`].
#[derive(Clone, Copy)]
pub struct TaskDef {
    name: &'static str,
    build: TaskBuilder,
}

impl TaskDef {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Build the descriptor for one invocation.
    pub fn descriptor(&self, args: &Value, ctx: &TaskContext) -> TaskDescriptor {
        let AgentTask {
            title,
            agent,
            labels,
        } = (self.build)(args, ctx);

        TaskDescriptor {
            kind: TaskKind::Agent,
            title,
            agent,
            io: TaskIo::for_effect(&ctx.effect_id),
            labels,
        }
    }
}

impl std::fmt::Debug for TaskDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDef").field("name", &self.name).finish()
    }
}

/// Define a named task from a builder function.
pub const fn define_task(name: &'static str, build: TaskBuilder) -> TaskDef {
    TaskDef { name, build }
}

/// Render an argument for interpolation into titles.
///
/// Strings are shown bare, missing values as `unspecified`, anything else as
/// compact JSON.
pub fn arg_display(args: &Value, key: &str) -> String {
    match args.get(key) {
        None | Some(Value::Null) => "unspecified".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::schema::SchemaType;
    use serde_json::json;

    fn build_example(args: &Value, _ctx: &TaskContext) -> AgentTask {
        AgentTask::new(
            format!("Analyze {}", arg_display(args, "gameName")),
            "market-analyst",
            AgentPrompt::new("analyst", "analyze").context(args.clone()),
        )
        .output_schema(OutputSchema::object().required("score", SchemaType::Number))
        .labels(["agent", "market"])
    }

    const EXAMPLE: TaskDef = define_task("example", build_example);

    #[test]
    fn descriptor_has_agent_kind_and_effect_paths() {
        let desc = EXAMPLE.descriptor(&json!({"gameName": "Orbit"}), &TaskContext::new("0001-example"));
        assert_eq!(desc.kind, TaskKind::Agent);
        assert_eq!(desc.title, "Analyze Orbit");
        assert_eq!(desc.io.input_json_path, "tasks/0001-example/input.json");
        assert_eq!(desc.io.output_json_path, "tasks/0001-example/output.json");
        assert_eq!(desc.labels, vec!["agent", "market"]);
    }

    #[test]
    fn descriptor_is_pure() {
        let args = json!({"gameName": "Orbit", "budget": 5});
        let ctx = TaskContext::new("e1");
        assert_eq!(EXAMPLE.descriptor(&args, &ctx), EXAMPLE.descriptor(&args, &ctx));
    }

    #[test]
    fn serializes_camel_case() {
        let desc = EXAMPLE.descriptor(&json!({}), &TaskContext::new("e2"));
        let value = serde_json::to_value(&desc).unwrap();
        assert_eq!(value["kind"], "agent");
        assert_eq!(value["title"], "Analyze unspecified");
        assert_eq!(value["io"]["inputJsonPath"], "tasks/e2/input.json");
        assert_eq!(value["agent"]["outputSchema"]["properties"]["score"]["type"], "number");
        assert_eq!(value["agent"]["prompt"]["outputFormat"], "JSON object matching the output schema");
    }

    #[test]
    fn arg_display_formats_values() {
        let args = json!({"s": "text", "n": 3, "list": ["a"]});
        assert_eq!(arg_display(&args, "s"), "text");
        assert_eq!(arg_display(&args, "n"), "3");
        assert_eq!(arg_display(&args, "list"), "[\"a\"]");
        assert_eq!(arg_display(&args, "missing"), "unspecified");
    }
}
