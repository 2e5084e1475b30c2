//! Logistics route optimisation.
//!
//! Demand analysis feeds one route-planning task per region, run in
//! parallel. The cost comparison then decides whether the savings clear the
//! target; if not, a planner has to sign off.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::breakpoint::BreakpointRequest;
use crate::error::Result;
use crate::orchestrator::{LogLevel, Orchestrator, parallel_all_limited, require_approval};
use crate::process::{Process, ProcessResult, Steps, apply_edit, parse_inputs};
use crate::task::{
    AgentPrompt, AgentTask, OutputSchema, SchemaType, TaskContext, TaskDef, arg_display, define_task,
};

pub const NAME: &str = "route-optimization";

pub const DEFAULT_TARGET_SAVINGS_PERCENT: f64 = 10.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteOptimizationInputs {
    pub network_name: Option<String>,
    pub regions: Vec<String>,
    pub depots: Vec<String>,
    pub vehicle_count: Option<u32>,
    pub target_savings_percent: Option<f64>,
    /// Region plans in flight at once. All regions run together when unset.
    pub max_concurrent_regions: Option<usize>,
    pub output_dir: Option<String>,
}

fn build_demand_analysis(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("Demand analysis for {}", arg_display(args, "networkName")),
        "demand-analyst",
        AgentPrompt::new("Logistics demand analyst", "Profile delivery demand across the network")
            .context(args.clone())
            .instructions([
                "Estimate stop volume and time windows per region",
                "Note seasonal peaks and capacity constraints",
            ]),
    )
    .output_schema(
        OutputSchema::object()
            .required("regions", SchemaType::array(SchemaType::Any))
            .optional("peakPeriods", SchemaType::array(SchemaType::String))
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "logistics", "demand"])
}

fn build_region_routes(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!(
            "Route plan for {} region of {}",
            arg_display(args, "region"),
            arg_display(args, "networkName")
        ),
        "route-planner",
        AgentPrompt::new("Route planner", "Plan vehicle routes for one region")
            .context(args.clone())
            .instructions([
                "Respect delivery time windows and vehicle capacity",
                "Report total distance and cost for the proposed routes",
            ]),
    )
    .output_schema(
        OutputSchema::object()
            .required("region", SchemaType::String)
            .required("routes", SchemaType::array(SchemaType::Any))
            .optional("totalDistanceKm", SchemaType::Number)
            .optional("estimatedCost", SchemaType::Number)
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "logistics", "routing"])
}

fn build_cost_comparison(args: &Value, _ctx: &TaskContext) -> AgentTask {
    AgentTask::new(
        format!("Cost comparison for {}", arg_display(args, "networkName")),
        "cost-analyst",
        AgentPrompt::new("Transport cost analyst", "Compare planned routes against the current baseline")
            .context(args.clone()),
    )
    .output_schema(
        OutputSchema::object()
            .required("savingsPercent", SchemaType::Number)
            .optional("baselineCost", SchemaType::Number)
            .optional("optimizedCost", SchemaType::Number)
            .optional("artifacts", SchemaType::artifacts()),
    )
    .labels(["agent", "logistics", "cost"])
}

pub const DEMAND_ANALYSIS_TASK: TaskDef = define_task("demand-analysis", build_demand_analysis);
pub const REGION_ROUTES_TASK: TaskDef = define_task("region-route-plan", build_region_routes);
pub const COST_COMPARISON_TASK: TaskDef = define_task("cost-comparison", build_cost_comparison);

const TASKS: &[TaskDef] = &[DEMAND_ANALYSIS_TASK, REGION_ROUTES_TASK, COST_COMPARISON_TASK];

pub struct RouteOptimization;

#[async_trait]
impl Process for RouteOptimization {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Analyse demand, plan routes per region in parallel and compare costs"
    }

    fn tasks(&self) -> &'static [TaskDef] {
        TASKS
    }

    async fn run(&self, inputs: Value, ctx: &dyn Orchestrator) -> Result<ProcessResult> {
        let inputs: RouteOptimizationInputs = parse_inputs(NAME, inputs)?;
        let output_dir = inputs
            .output_dir
            .clone()
            .unwrap_or_else(|| "artifacts/route-optimization".to_string());
        let target = inputs
            .target_savings_percent
            .unwrap_or(DEFAULT_TARGET_SAVINGS_PERCENT);
        let mut steps = Steps::new(ctx);

        let demand = steps
            .run(
                &DEMAND_ANALYSIS_TASK,
                json!({
                    "networkName": inputs.network_name,
                    "regions": inputs.regions,
                    "depots": inputs.depots,
                    "vehicleCount": inputs.vehicle_count,
                }),
            )
            .await?;

        // Regions come from the inputs; when none were given, plan whatever
        // the demand analysis found.
        let regions = if inputs.regions.is_empty() {
            region_names(demand.get("regions"))
        } else {
            inputs.regions.clone()
        };
        ctx.log(
            LogLevel::Info,
            &format!("Planning routes for {} region(s)", regions.len()),
        );

        let limit = inputs.max_concurrent_regions.unwrap_or(regions.len());
        let branches: Vec<_> = regions
            .iter()
            .map(|region| {
                ctx.task(
                    &REGION_ROUTES_TASK,
                    json!({
                        "networkName": inputs.network_name,
                        "region": region,
                        "vehicleCount": inputs.vehicle_count,
                        "demand": demand.value(),
                    }),
                )
            })
            .collect();
        let plans = parallel_all_limited(branches, limit).await?;
        steps.absorb(&plans);
        let route_plans: Vec<Value> = plans.into_iter().map(|p| p.into_value()).collect();

        let comparison = steps
            .run(
                &COST_COMPARISON_TASK,
                json!({
                    "networkName": inputs.network_name,
                    "routePlans": route_plans,
                    "targetSavingsPercent": target,
                }),
            )
            .await?;

        let mut cost_comparison = comparison.value().clone();
        if let Some(savings) = comparison.number("savingsPercent")
            && savings < target
        {
            let edited = require_approval(
                ctx,
                BreakpointRequest::new(
                    "Savings Target Review",
                    format!(
                        "Optimised routes save {:.1}% against a {:.1}% target. Adopt them anyway?",
                        savings, target
                    ),
                )
                .with_context(json!({
                    "savingsPercent": savings,
                    "targetSavingsPercent": target,
                })),
            )
            .await?;
            cost_comparison = apply_edit(cost_comparison, edited);
        }

        Ok(ProcessResult::new(NAME, output_dir, ctx.now())
            .with_output("networkName", json!(inputs.network_name))
            .with_output("demandAnalysis", demand.into_value())
            .with_output("routePlans", Value::Array(route_plans))
            .with_output("costComparison", cost_comparison)
            .with_artifacts(steps.into_artifacts()))
    }
}

/// Region names from a demand analysis `regions` array. Entries may be bare
/// strings or objects with a `name`.
fn region_names(regions: Option<&Value>) -> Vec<String> {
    regions
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name.clone()),
                    Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_names_accept_strings_and_objects() {
        let regions = json!(["north", {"name": "south", "stops": 40}, 3, {"stops": 1}]);
        assert_eq!(region_names(Some(&regions)), vec!["north", "south"]);
        assert!(region_names(None).is_empty());
    }

    #[test]
    fn region_title_names_region() {
        let desc = REGION_ROUTES_TASK.descriptor(
            &json!({"region": "north", "networkName": "UK parcels"}),
            &TaskContext::new("0002-region-route-plan"),
        );
        assert_eq!(desc.title, "Route plan for north region of UK parcels");
    }
}
