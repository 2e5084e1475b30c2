//! Contract review: clause extraction, risk assessment, redlines.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::breakpoint::BreakpointRequest;
use crate::error::Result;
use crate::orchestrator::{LogLevel, Orchestrator, require_approval};
use crate::process::{Process, ProcessResult, Steps, apply_edit, parse_inputs};
use crate::task::{
    AgentPrompt, AgentTask, OutputSchema, SchemaType, TaskContext, TaskDef, arg_display, define_task,
};

pub const NAME: &str = "contract-review";

/// Risk scores are 0..=10; at or above this a lawyer signs off.
pub const DEFAULT_RISK_THRESHOLD: f64 = 7.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContractReviewInputs {
    pub contract_name: Option<String>,
    pub contract_path: Option<String>,
    pub contract_type: Option<String>,
    pub jurisdiction: Option<String>,
    /// Which side of the contract we represent.
    pub party: Option<String>,
    pub risk_threshold: Option<f64>,
    pub output_dir: Option<String>,
}

fn clause_schema() -> OutputSchema {
    OutputSchema::object()
        .required("type", SchemaType::String)
        .required("text", SchemaType::String)
        .optional("section", SchemaType::String)
}

fn build_clause_extraction(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("Extract clauses from {}", arg_display(args, "contractName")),
        "contract-analyst",
        AgentPrompt::new("Contract analyst", "Extract and classify every clause")
            .context(args.clone())
            .instructions([
                "Classify each clause (indemnity, liability, termination, IP, payment, other)",
                "Keep the original wording and section reference",
            ]),
    )
    .output_schema(
        OutputSchema::object()
            .required("clauses", SchemaType::array(SchemaType::Object(clause_schema())))
            .optional("parties", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "legal", "contract"])
}

fn build_risk_assessment(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!(
            "Risk assessment for {} ({})",
            arg_display(args, "contractName"),
            arg_display(args, "jurisdiction")
        ),
        "legal-risk-assessor",
        AgentPrompt::new("Commercial lawyer", "Assess legal and commercial risk for our party")
            .context(args.clone())
            .instructions([
                "Score overall risk from 0 (benign) to 10 (unacceptable)",
                "Flag clauses that deviate from market standard",
            ]),
    )
    .output_schema(
        OutputSchema::object()
            .required("riskScore", SchemaType::Number)
            .optional("highRiskClauses", SchemaType::array(SchemaType::Any))
            .optional("summary", SchemaType::String)
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "legal", "risk"])
}

fn build_redlines(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("Redlines for {}", arg_display(args, "contractName")),
        "redline-drafter",
        AgentPrompt::new("Contract negotiator", "Draft redlines and a negotiation memo")
            .context(args.clone())
            .output_format("JSON object listing redlines; the marked-up contract goes in artifacts"),
    )
    .output_schema(
        OutputSchema::object()
            .required("redlines", SchemaType::array(SchemaType::Any))
            .optional("negotiationPoints", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "legal", "redline"])
}

pub const CLAUSE_EXTRACTION_TASK: TaskDef = define_task("clause-extraction", build_clause_extraction);
pub const RISK_ASSESSMENT_TASK: TaskDef = define_task("risk-assessment", build_risk_assessment);
pub const REDLINE_TASK: TaskDef = define_task("redline-suggestions", build_redlines);

const TASKS: &[TaskDef] = &[CLAUSE_EXTRACTION_TASK, RISK_ASSESSMENT_TASK, REDLINE_TASK];

pub struct ContractReview;

#[async_trait]
impl Process for ContractReview {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Extract clauses, assess risk and draft redlines for a contract"
    }

    fn tasks(&self) -> &'static [TaskDef] {
        TASKS
    }

    async fn run(&self, inputs: Value, ctx: &dyn Orchestrator) -> Result<ProcessResult> {
        let inputs: ContractReviewInputs = parse_inputs(NAME, inputs)?;
        let output_dir = inputs
            .output_dir
            .clone()
            .unwrap_or_else(|| "artifacts/contract-review".to_string());
        let threshold = inputs.risk_threshold.unwrap_or(DEFAULT_RISK_THRESHOLD);
        let mut steps = Steps::new(ctx);

        let extraction = steps
            .run(
                &CLAUSE_EXTRACTION_TASK,
                json!({
                    "contractName": inputs.contract_name,
                    "contractPath": inputs.contract_path,
                    "contractType": inputs.contract_type,
                }),
            )
            .await?;

        let assessment = steps
            .run(
                &RISK_ASSESSMENT_TASK,
                json!({
                    "contractName": inputs.contract_name,
                    "jurisdiction": inputs.jurisdiction,
                    "party": inputs.party,
                    "clauses": extraction.field("clauses"),
                }),
            )
            .await?;

        let mut risk_assessment = assessment.value().clone();
        if let Some(score) = assessment.number("riskScore")
            && score >= threshold
        {
            ctx.log(
                LogLevel::Warn,
                &format!("Contract risk {} meets threshold {}", score, threshold),
            );
            let edited = require_approval(
                ctx,
                BreakpointRequest::new(
                    "High Risk Contract Review",
                    format!(
                        "Risk score {:.1} is at or above {:.1}. Approve drafting redlines?",
                        score, threshold
                    ),
                )
                .with_context(json!({
                    "riskScore": score,
                    "riskThreshold": threshold,
                    "highRiskClauses": assessment.field("highRiskClauses"),
                })),
            )
            .await?;
            risk_assessment = apply_edit(risk_assessment, edited);
        }

        let redlines = steps
            .run(
                &REDLINE_TASK,
                json!({
                    "contractName": inputs.contract_name,
                    "party": inputs.party,
                    "clauses": extraction.field("clauses"),
                    "riskAssessment": risk_assessment,
                }),
            )
            .await?;

        Ok(ProcessResult::new(NAME, output_dir, ctx.now())
            .with_output("contractName", json!(inputs.contract_name))
            .with_output("clauseExtraction", extraction.into_value())
            .with_output("riskAssessment", risk_assessment)
            .with_output("redlines", redlines.into_value())
            .with_artifacts(steps.into_artifacts()))
    }
}
