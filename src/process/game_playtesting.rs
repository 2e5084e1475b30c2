//! Playtest planning, session analysis and recommendations.

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

pub const NAME: &str = "game-playtesting";

pub const MIN_FUN_FACTOR: f64 = 7.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaytestInputs {
    pub game_name: Option<String>,
    pub build_version: Option<String>,
    pub player_count: Option<u32>,
    pub focus_areas: Vec<String>,
    pub output_dir: Option<String>,
}

fn build_test_plan(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!(
            "Playtest plan for {} build {}",
            arg_display(args, "gameName"),
            arg_display(args, "buildVersion")
        ),
        "playtest-coordinator",
        AgentPrompt::new("Playtest coordinator", "Design a structured playtest session")
            .context(args.clone())
            .instructions([
                "Define session goals for each focus area",
                "Write the survey and observation checklist",
                "Recommend participant count and profile",
            ]),
    )
    .output_schema(
        OutputSchema::object()
            .required("sessionGoals", SchemaType::array(SchemaType::String))
            .optional("survey", SchemaType::array(SchemaType::String))
            .optional("participants", SchemaType::Integer)
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "game-dev", "playtest"])
}

fn build_session_analysis(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("Playtest session analysis for {}", arg_display(args, "gameName")),
        "ux-researcher",
        AgentPrompt::new("Games user researcher", "Analyse playtest session results")
            .context(args.clone())
            .instructions([
                "Score the fun factor from 0 to 10",
                "Group observed issues by severity",
                "Quote players where it supports a finding",
            ]),
    )
    .output_schema(
        OutputSchema::object()
            .required("funFactorScore", SchemaType::Number)
            .optional("issues", SchemaType::array(SchemaType::Any))
            .optional("playerQuotes", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "game-dev", "playtest", "analysis"])
}

fn build_recommendations(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("Design recommendations for {}", arg_display(args, "gameName")),
        "game-designer",
        AgentPrompt::new("Lead game designer", "Turn playtest findings into prioritised changes")
            .context(args.clone()),
    )
    .output_schema(
        OutputSchema::object()
            .required("recommendations", SchemaType::array(SchemaType::Any))
            .optional("nextPlaytestFocus", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "game-dev", "playtest"])
}

pub const TEST_PLAN_TASK: TaskDef = define_task("playtest-plan", build_test_plan);
pub const SESSION_ANALYSIS_TASK: TaskDef = define_task("session-analysis", build_session_analysis);
pub const RECOMMENDATIONS_TASK: TaskDef = define_task("playtest-recommendations", build_recommendations);

const TASKS: &[TaskDef] = &[TEST_PLAN_TASK, SESSION_ANALYSIS_TASK, RECOMMENDATIONS_TASK];

pub struct GamePlaytesting;

#[async_trait]
impl Process for GamePlaytesting {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Plan a playtest, analyse the sessions and recommend design changes"
    }

    fn tasks(&self) -> &'static [TaskDef] {
        TASKS
    }

    async fn run(&self, inputs: Value, ctx: &dyn Orchestrator) -> Result<ProcessResult> {
        let inputs: PlaytestInputs = parse_inputs(NAME, inputs)?;
        let output_dir = inputs
            .output_dir
            .clone()
            .unwrap_or_else(|| "artifacts/playtesting".to_string());
        let mut steps = Steps::new(ctx);

        let plan = steps
            .run(
                &TEST_PLAN_TASK,
                json!({
                    "gameName": inputs.game_name,
                    "buildVersion": inputs.build_version,
                    "playerCount": inputs.player_count,
                    "focusAreas": inputs.focus_areas,
                }),
            )
            .await?;

        let analysis = steps
            .run(
                &SESSION_ANALYSIS_TASK,
                json!({
                    "gameName": inputs.game_name,
                    "buildVersion": inputs.build_version,
                    "testPlan": plan.value(),
                }),
            )
            .await?;

        let mut session_analysis = analysis.value().clone();
        if let Some(score) = analysis.number("funFactorScore")
            && score < MIN_FUN_FACTOR
        {
            ctx.log(
                LogLevel::Warn,
                &format!("Fun factor {} is below {}", score, MIN_FUN_FACTOR),
            );
            let edited = require_approval(
                ctx,
                BreakpointRequest::new(
                    "Fun Factor Review",
                    format!(
                        "Playtesters rated the fun factor {:.1}/10. Proceed to recommendations?",
                        score
                    ),
                )
                .with_context(json!({
                    "funFactorScore": score,
                    "issues": analysis.field("issues"),
                })),
            )
            .await?;
            session_analysis = apply_edit(session_analysis, edited);
        }

        let recommendations = steps
            .run(
                &RECOMMENDATIONS_TASK,
                json!({
                    "gameName": inputs.game_name,
                    "focusAreas": inputs.focus_areas,
                    "sessionAnalysis": session_analysis,
                }),
            )
            .await?;

        Ok(ProcessResult::new(NAME, output_dir, ctx.now())
            .with_output("gameName", json!(inputs.game_name))
            .with_output("testPlan", plan.into_value())
            .with_output("sessionAnalysis", session_analysis)
            .with_output("recommendations", recommendations.into_value())
            .with_artifacts(steps.into_artifacts()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_title_includes_build() {
        let desc = TEST_PLAN_TASK.descriptor(
            &json!({"gameName": "Orbit", "buildVersion": "0.4.1"}),
            &TaskContext::new("0001-p"),
        );
        assert_eq!(desc.title, "Playtest plan for Orbit build 0.4.1");
    }

    #[test]
    fn analysis_requires_fun_factor() {
        let desc = SESSION_ANALYSIS_TASK.descriptor(&json!({}), &TaskContext::new("0002-s"));
        assert!(desc.agent.output_schema.validate(&json!({"issues": []})).is_err());
        assert!(desc.agent.output_schema.validate(&json!({"funFactorScore": 8})).is_ok());
    }
}
