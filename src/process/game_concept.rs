//! Game concept development.
//!
//! Market analysis, then core concept, mechanics prototype plan and pitch
//! document. A weak market (viability below 0.5) pauses for a "Market
//! Viability Review" before the concept phase; the finished concept is
//! always reviewed before the pitch is written.

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

pub const NAME: &str = "game-concept-development";

/// Below this the market review breakpoint fires.
pub const MIN_VIABILITY: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConceptInputs {
    pub game_name: Option<String>,
    pub genre: Option<String>,
    pub target_audience: Option<String>,
    pub target_platforms: Vec<String>,
    pub budget: Option<f64>,
    pub output_dir: Option<String>,
}

fn build_market_analysis(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("Market analysis for {}", arg_display(args, "gameName")),
        "market-analyst",
        AgentPrompt::new(
            "Senior games market analyst",
            "Assess market viability for the proposed game",
        )
        .context(args.clone())
        .instructions([
            "Identify comparable titles and their commercial performance",
            "Estimate addressable audience for the genre and platforms",
            "Score overall viability between 0 and 1",
            "List concrete concerns that lower the score",
        ]),
    )
    .output_schema(
        OutputSchema::object()
            .required("viabilityScore", SchemaType::Number)
            .optional("marketSize", SchemaType::String)
            .optional("competitors", SchemaType::array(SchemaType::String))
            .optional("concerns", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "game-dev", "market"])
}

fn build_core_concept(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!(
            "Core concept for {} ({})",
            arg_display(args, "gameName"),
            arg_display(args, "genre")
        ),
        "game-designer",
        AgentPrompt::new("Lead game designer", "Define the core concept and design pillars")
            .context(args.clone())
            .instructions([
                "State the core gameplay loop in one paragraph",
                "Define three to five design pillars",
                "Tie unique selling points back to the market analysis",
            ]),
    )
    .output_schema(
        OutputSchema::object()
            .required("coreLoop", SchemaType::String)
            .optional("pillars", SchemaType::array(SchemaType::String))
            .optional("uniqueSellingPoints", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "game-dev", "design"])
}

fn build_mechanics_prototype(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("Mechanics prototype plan for {}", arg_display(args, "gameName")),
        "systems-designer",
        AgentPrompt::new("Systems designer", "Plan a vertical-slice prototype of the core mechanics")
            .context(args.clone())
            .instructions([
                "Break the core loop into testable mechanics",
                "Scope a prototype that proves the riskiest mechanic first",
            ]),
    )
    .output_schema(
        OutputSchema::object()
            .required("mechanics", SchemaType::array(SchemaType::Any))
            .optional("prototypeScope", SchemaType::String)
            .optional("risks", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "game-dev", "prototype"])
}

fn build_pitch_document(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("Pitch document for {}", arg_display(args, "gameName")),
        "pitch-writer",
        AgentPrompt::new("Producer preparing a publisher pitch", "Write the pitch document")
            .context(args.clone())
            .instructions([
                "Summarise the concept, market and prototype plan",
                "Include budget and platform assumptions",
            ])
            .output_format("JSON object with the pitch summary and the written document as an artifact"),
    )
    .output_schema(
        OutputSchema::object()
            .required("pitchSummary", SchemaType::String)
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "game-dev", "pitch"])
}

pub const MARKET_ANALYSIS_TASK: TaskDef = define_task("market-analysis", build_market_analysis);
pub const CORE_CONCEPT_TASK: TaskDef = define_task("core-concept", build_core_concept);
pub const MECHANICS_PROTOTYPE_TASK: TaskDef = define_task("mechanics-prototype", build_mechanics_prototype);
pub const PITCH_DOCUMENT_TASK: TaskDef = define_task("pitch-document", build_pitch_document);

const TASKS: &[TaskDef] = &[
    MARKET_ANALYSIS_TASK,
    CORE_CONCEPT_TASK,
    MECHANICS_PROTOTYPE_TASK,
    PITCH_DOCUMENT_TASK,
];

pub struct GameConceptDevelopment;

#[async_trait]
impl Process for GameConceptDevelopment {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Market analysis, core concept, mechanics prototype and pitch for a new game"
    }

    fn tasks(&self) -> &'static [TaskDef] {
        TASKS
    }

    async fn run(&self, inputs: Value, ctx: &dyn Orchestrator) -> Result<ProcessResult> {
        let inputs: GameConceptInputs = parse_inputs(NAME, inputs)?;
        let output_dir = inputs
            .output_dir
            .clone()
            .unwrap_or_else(|| "artifacts/game-concept".to_string());
        let mut steps = Steps::new(ctx);

        ctx.log(LogLevel::Info, "Phase 1: market analysis");
        let market = steps
            .run(
                &MARKET_ANALYSIS_TASK,
                json!({
                    "gameName": inputs.game_name,
                    "genre": inputs.genre,
                    "targetAudience": inputs.target_audience,
                    "targetPlatforms": inputs.target_platforms,
                    "budget": inputs.budget,
                }),
            )
            .await?;

        let mut market_analysis = market.value().clone();
        if let Some(score) = market.number("viabilityScore")
            && score < MIN_VIABILITY
        {
            ctx.log(
                LogLevel::Warn,
                &format!("Viability score {} is below {}", score, MIN_VIABILITY),
            );
            let edited = require_approval(
                ctx,
                BreakpointRequest::new(
                    "Market Viability Review",
                    format!(
                        "Market viability for {} scored {:.2}. Continue with concept development?",
                        inputs.game_name.as_deref().unwrap_or("the game"),
                        score
                    ),
                )
                .with_context(json!({
                    "viabilityScore": score,
                    "concerns": market.strings("concerns"),
                })),
            )
            .await?;
            market_analysis = apply_edit(market_analysis, edited);
        }

        ctx.log(LogLevel::Info, "Phase 2: core concept");
        let concept = steps
            .run(
                &CORE_CONCEPT_TASK,
                json!({
                    "gameName": inputs.game_name,
                    "genre": inputs.genre,
                    "targetAudience": inputs.target_audience,
                    "marketAnalysis": market_analysis,
                }),
            )
            .await?;

        ctx.log(LogLevel::Info, "Phase 3: mechanics prototype");
        let mechanics = steps
            .run(
                &MECHANICS_PROTOTYPE_TASK,
                json!({
                    "gameName": inputs.game_name,
                    "coreConcept": concept.value(),
                    "targetPlatforms": inputs.target_platforms,
                }),
            )
            .await?;

        let edited = require_approval(
            ctx,
            BreakpointRequest::new(
                "Game Concept Review",
                "Review the core concept and prototype plan before the pitch is written.",
            )
            .with_context(json!({
                "coreConcept": concept.value(),
                "mechanicsPrototype": mechanics.value(),
            })),
        )
        .await?;
        let core_concept = apply_edit(concept.into_value(), edited);

        ctx.log(LogLevel::Info, "Phase 4: pitch document");
        let pitch = steps
            .run(
                &PITCH_DOCUMENT_TASK,
                json!({
                    "gameName": inputs.game_name,
                    "budget": inputs.budget,
                    "targetPlatforms": inputs.target_platforms,
                    "marketAnalysis": market_analysis,
                    "coreConcept": core_concept,
                    "mechanicsPrototype": mechanics.value(),
                }),
            )
            .await?;

        Ok(ProcessResult::new(NAME, output_dir, ctx.now())
            .with_output("gameName", json!(inputs.game_name))
            .with_output("marketAnalysis", market_analysis)
            .with_output("coreConcept", core_concept)
            .with_output("mechanicsPrototype", mechanics.into_value())
            .with_output("pitchDocument", pitch.into_value())
            .with_artifacts(steps.into_artifacts()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_title_interpolates_game_name() {
        let desc = MARKET_ANALYSIS_TASK.descriptor(&json!({"gameName": "Orbit"}), &TaskContext::new("0001-m"));
        assert_eq!(desc.title, "Market analysis for Orbit");
        assert_eq!(desc.agent.output_schema.required_names(), vec!["viabilityScore"]);
    }

    #[test]
    fn concept_title_includes_genre() {
        let desc = CORE_CONCEPT_TASK.descriptor(
            &json!({"gameName": "Orbit", "genre": "roguelike"}),
            &TaskContext::new("0002-c"),
        );
        assert_eq!(desc.title, "Core concept for Orbit (roguelike)");
    }

    #[test]
    fn inputs_accept_camel_case() {
        let inputs: GameConceptInputs = parse_inputs(
            NAME,
            json!({"gameName": "Orbit", "targetPlatforms": ["pc"], "outputDir": "out"}),
        )
        .unwrap();
        assert_eq!(inputs.game_name.as_deref(), Some("Orbit"));
        assert_eq!(inputs.target_platforms, vec!["pc"]);
        assert_eq!(inputs.output_dir.as_deref(), Some("out"));
    }
}
