//! QA and release certification.
//!
//! Test suite design, bug triage, a critical-bug gate, then one certification
//! task per target platform run in parallel, and a final readiness call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::breakpoint::BreakpointRequest;
use crate::error::Result;
use crate::orchestrator::{LogLevel, Orchestrator, parallel_all, require_approval};
use crate::process::{Process, ProcessResult, Steps, apply_edit, parse_inputs};
use crate::task::{
    AgentPrompt, AgentTask, OutputSchema, SchemaType, TaskContext, TaskDef, arg_display, define_task,
};

pub const NAME: &str = "game-qa-release";

const DEFAULT_PLATFORMS: &[&str] = &["pc"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QaReleaseInputs {
    pub game_name: Option<String>,
    pub version: Option<String>,
    pub platforms: Vec<String>,
    /// Critical bugs tolerated without a review. Defaults to zero.
    pub max_critical_bugs: Option<u64>,
    pub output_dir: Option<String>,
}

impl QaReleaseInputs {
    fn platforms(&self) -> Vec<String> {
        if self.platforms.is_empty() {
            DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect()
        } else {
            self.platforms.clone()
        }
    }
}

fn build_test_suite(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!(
            "Test suite for {} {}",
            arg_display(args, "gameName"),
            arg_display(args, "version")
        ),
        "qa-lead",
        AgentPrompt::new("QA lead", "Design the release test suite")
            .context(args.clone())
            .instructions([
                "Cover functional, regression, performance and compliance areas",
                "Mark which cases are platform specific",
            ]),
    )
    .output_schema(
        OutputSchema::object()
            .required("testCases", SchemaType::array(SchemaType::Any))
            .optional("coverage", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "game-dev", "qa"])
}

fn build_bug_triage(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("Bug triage for {}", arg_display(args, "gameName")),
        "bug-triager",
        AgentPrompt::new("QA analyst", "Triage open bugs by severity and release impact")
            .context(args.clone()),
    )
    .output_schema(
        OutputSchema::object()
            .required("criticalBugs", SchemaType::Integer)
            .optional("bugs", SchemaType::array(SchemaType::Any))
            .optional("passRate", SchemaType::Number)
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "game-dev", "qa", "triage"])
}

fn build_platform_certification(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!(
            "{} certification for {}",
            arg_display(args, "platform"),
            arg_display(args, "gameName")
        ),
        "certification-specialist",
        AgentPrompt::new(
            "Platform certification specialist",
            "Check the build against the platform holder's requirements",
        )
        .context(args.clone()),
    )
    .output_schema(
        OutputSchema::object()
            .required("platform", SchemaType::String)
            .required("passed", SchemaType::Boolean)
            .optional("failures", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "game-dev", "qa", "certification"])
}

fn build_release_readiness(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!(
            "Release readiness for {} {}",
            arg_display(args, "gameName"),
            arg_display(args, "version")
        ),
        "release-manager",
        AgentPrompt::new("Release manager", "Make the go/no-go recommendation").context(args.clone()),
    )
    .output_schema(
        OutputSchema::object()
            .required("readyForRelease", SchemaType::Boolean)
            .optional("blockers", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "game-dev", "release"])
}

pub const TEST_SUITE_TASK: TaskDef = define_task("qa-test-suite", build_test_suite);
pub const BUG_TRIAGE_TASK: TaskDef = define_task("bug-triage", build_bug_triage);
pub const PLATFORM_CERTIFICATION_TASK: TaskDef = define_task("platform-certification", build_platform_certification);
pub const RELEASE_READINESS_TASK: TaskDef = define_task("release-readiness", build_release_readiness);

const TASKS: &[TaskDef] = &[
    TEST_SUITE_TASK,
    BUG_TRIAGE_TASK,
    PLATFORM_CERTIFICATION_TASK,
    RELEASE_READINESS_TASK,
];

pub struct GameQaRelease;

#[async_trait]
impl Process for GameQaRelease {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Test suite, bug triage and per-platform certification ahead of a release"
    }

    fn tasks(&self) -> &'static [TaskDef] {
        TASKS
    }

    async fn run(&self, inputs: Value, ctx: &dyn Orchestrator) -> Result<ProcessResult> {
        let inputs: QaReleaseInputs = parse_inputs(NAME, inputs)?;
        let output_dir = inputs
            .output_dir
            .clone()
            .unwrap_or_else(|| "artifacts/qa-release".to_string());
        let platforms = inputs.platforms();
        let max_critical = inputs.max_critical_bugs.unwrap_or(0);
        let mut steps = Steps::new(ctx);

        let suite = steps
            .run(
                &TEST_SUITE_TASK,
                json!({
                    "gameName": inputs.game_name,
                    "version": inputs.version,
                    "platforms": platforms,
                }),
            )
            .await?;

        let triage = steps
            .run(
                &BUG_TRIAGE_TASK,
                json!({
                    "gameName": inputs.game_name,
                    "version": inputs.version,
                    "testSuite": suite.value(),
                }),
            )
            .await?;

        let mut bug_triage = triage.value().clone();
        // Counts are compared as numbers; a fractional count still trips the gate.
        if let Some(critical) = triage.number("criticalBugs")
            && critical > max_critical as f64
        {
            ctx.log(
                LogLevel::Warn,
                &format!("{} critical bugs open, limit is {}", critical, max_critical),
            );
            let edited = require_approval(
                ctx,
                BreakpointRequest::new(
                    "Critical Bug Review",
                    format!(
                        "{} critical bugs remain open (limit {}). Continue to certification?",
                        critical, max_critical
                    ),
                )
                .with_context(json!({
                    "criticalBugs": triage.field("criticalBugs"),
                    "maxCriticalBugs": max_critical,
                    "bugs": triage.field("bugs"),
                })),
            )
            .await?;
            bug_triage = apply_edit(bug_triage, edited);
        }

        ctx.log(
            LogLevel::Info,
            &format!("Certifying {} platform(s) in parallel", platforms.len()),
        );
        let certifications = parallel_all(platforms.iter().map(|platform| {
            ctx.task(
                &PLATFORM_CERTIFICATION_TASK,
                json!({
                    "gameName": inputs.game_name,
                    "version": inputs.version,
                    "platform": platform,
                }),
            )
        }))
        .await?;
        steps.absorb(&certifications);

        let certification_values: Vec<Value> = certifications
            .into_iter()
            .map(|c| c.into_value())
            .collect();

        let readiness = steps
            .run(
                &RELEASE_READINESS_TASK,
                json!({
                    "gameName": inputs.game_name,
                    "version": inputs.version,
                    "bugTriage": bug_triage,
                    "certifications": certification_values,
                }),
            )
            .await?;

        Ok(ProcessResult::new(NAME, output_dir, ctx.now())
            .with_output("gameName", json!(inputs.game_name))
            .with_output("version", json!(inputs.version))
            .with_output("testSuite", suite.into_value())
            .with_output("bugTriage", bug_triage)
            .with_output("certifications", Value::Array(certification_values))
            .with_output("releaseReadiness", readiness.into_value())
            .with_artifacts(steps.into_artifacts()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_platform_list_falls_back_to_pc() {
        assert_eq!(QaReleaseInputs::default().platforms(), vec!["pc"]);
        let inputs = QaReleaseInputs {
            platforms: vec!["switch".into()],
            ..Default::default()
        };
        assert_eq!(inputs.platforms(), vec!["switch"]);
    }

    #[test]
    fn certification_title_names_platform() {
        let desc = PLATFORM_CERTIFICATION_TASK.descriptor(
            &json!({"gameName": "Orbit", "platform": "switch"}),
            &TaskContext::new("0003-platform-certification"),
        );
        assert_eq!(desc.title, "switch certification for Orbit");
        assert_eq!(
            desc.io.output_json_path,
            "tasks/0003-platform-certification/output.json"
        );
    }
}
