//! Task definitions: descriptors, prompts, output schemas and outputs.

pub mod descriptor;
pub mod output;
pub mod prompt;
pub mod schema;

pub use descriptor::{
    AgentSpec, AgentTask, TaskBuilder, TaskContext, TaskDef, TaskDescriptor, TaskIo, TaskKind,
    arg_display, define_task,
};
pub use output::TaskOutput;
pub use prompt::AgentPrompt;
pub use schema::{OutputSchema, SchemaProperty, SchemaType, SchemaViolation};
