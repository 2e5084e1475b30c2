//! Standard operating procedure development.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::breakpoint::BreakpointRequest;
use crate::error::Result;
use crate::orchestrator::{Orchestrator, require_approval};
use crate::process::{Process, ProcessResult, Steps, apply_edit, parse_inputs};
use crate::task::{
    AgentPrompt, AgentTask, OutputSchema, SchemaType, TaskContext, TaskDef, arg_display, define_task,
};

pub const NAME: &str = "operations-sop-development";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SopInputs {
    pub process_name: Option<String>,
    pub department: Option<String>,
    pub stakeholders: Vec<String>,
    pub compliance_requirements: Vec<String>,
    pub output_dir: Option<String>,
}

fn build_discovery(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!(
            "Process discovery for {} ({})",
            arg_display(args, "processName"),
            arg_display(args, "department")
        ),
        "process-analyst",
        AgentPrompt::new("Operations process analyst", "Map the current process as practised")
            .context(args.clone())
            .instructions([
                "List every step, owner and hand-off",
                "Call out variation between teams and known failure points",
            ]),
    )
    .output_schema(
        OutputSchema::object()
            .required("steps", SchemaType::array(SchemaType::Any))
            .optional("painPoints", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "operations", "discovery"])
}

fn build_sop_draft(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("SOP draft for {}", arg_display(args, "processName")),
        "sop-writer",
        AgentPrompt::new("Technical writer for operations", "Draft the standard operating procedure")
            .context(args.clone())
            .output_format("JSON object with SOP metadata; the document itself goes in artifacts"),
    )
    .output_schema(
        OutputSchema::object()
            .required("title", SchemaType::String)
            .required("sections", SchemaType::array(SchemaType::String))
            .optional("version", SchemaType::String)
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "operations", "sop"])
}

fn build_training_plan(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("Training plan for {}", arg_display(args, "processName")),
        "training-designer",
        AgentPrompt::new("Learning and development lead", "Plan rollout training for the SOP")
            .context(args.clone()),
    )
    .output_schema(
        OutputSchema::object()
            .required("modules", SchemaType::array(SchemaType::Any))
            .optional("audience", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "operations", "training"])
}

pub const DISCOVERY_TASK: TaskDef = define_task("process-discovery", build_discovery);
pub const SOP_DRAFT_TASK: TaskDef = define_task("sop-draft", build_sop_draft);
pub const TRAINING_PLAN_TASK: TaskDef = define_task("training-plan", build_training_plan);

const TASKS: &[TaskDef] = &[DISCOVERY_TASK, SOP_DRAFT_TASK, TRAINING_PLAN_TASK];

pub struct OperationsSopDevelopment;

#[async_trait]
impl Process for OperationsSopDevelopment {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Discover a process, draft its SOP, review with stakeholders and plan training"
    }

    fn tasks(&self) -> &'static [TaskDef] {
        TASKS
    }

    async fn run(&self, inputs: Value, ctx: &dyn Orchestrator) -> Result<ProcessResult> {
        let inputs: SopInputs = parse_inputs(NAME, inputs)?;
        let output_dir = inputs
            .output_dir
            .clone()
            .unwrap_or_else(|| "artifacts/sop".to_string());
        let mut steps = Steps::new(ctx);

        let discovery = steps
            .run(
                &DISCOVERY_TASK,
                json!({
                    "processName": inputs.process_name,
                    "department": inputs.department,
                    "stakeholders": inputs.stakeholders,
                }),
            )
            .await?;

        let draft = steps
            .run(
                &SOP_DRAFT_TASK,
                json!({
                    "processName": inputs.process_name,
                    "department": inputs.department,
                    "complianceRequirements": inputs.compliance_requirements,
                    "discovery": discovery.value(),
                }),
            )
            .await?;

        let edited = require_approval(
            ctx,
            BreakpointRequest::new(
                "SOP Stakeholder Review",
                format!(
                    "Stakeholders ({}) should review the SOP draft before training is planned.",
                    if inputs.stakeholders.is_empty() {
                        "none listed".to_string()
                    } else {
                        inputs.stakeholders.join(", ")
                    }
                ),
            )
            .with_context(draft.value().clone()),
        )
        .await?;
        let sop_draft = apply_edit(draft.into_value(), edited);

        let training = steps
            .run(
                &TRAINING_PLAN_TASK,
                json!({
                    "processName": inputs.process_name,
                    "department": inputs.department,
                    "sop": sop_draft,
                }),
            )
            .await?;

        Ok(ProcessResult::new(NAME, output_dir, ctx.now())
            .with_output("processName", json!(inputs.process_name))
            .with_output("discovery", discovery.into_value())
            .with_output("sopDraft", sop_draft)
            .with_output("trainingPlan", training.into_value())
            .with_artifacts(steps.into_artifacts()))
    }
}
