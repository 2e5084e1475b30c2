//! Process runner: resolves a process by name, wires the orchestrator for one
//! run directory, and records the outcome.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::{AgentExecutor, FileAgent};
use crate::breakpoint::ApprovalGate;
use crate::config::RunnerConfig;
use crate::error::{Result, StoreError};
use crate::orchestrator::{EffectStore, LocalOrchestrator, RunEvent};
use crate::process::{ProcessRegistry, ProcessResult};

/// File written at the root of a run directory on success.
pub const RESULT_FILE: &str = "result.json";

/// A finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub result: ProcessResult,
}

/// Runs registered processes.
pub struct ProcessRunner {
    registry: ProcessRegistry,
    config: RunnerConfig,
    gate: Arc<dyn ApprovalGate>,
    agent: Option<Arc<dyn AgentExecutor>>,
}

impl ProcessRunner {
    pub fn new(registry: ProcessRegistry, config: RunnerConfig, gate: Arc<dyn ApprovalGate>) -> Self {
        Self {
            registry,
            config,
            gate,
            agent: None,
        }
    }

    /// Use a fixed executor instead of a [`FileAgent`] per run directory.
    pub fn with_agent(mut self, agent: Arc<dyn AgentExecutor>) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Fresh run id.
    pub fn new_run_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn run_path(&self, run_id: &str) -> PathBuf {
        self.config.run_dir.join(run_id)
    }

    /// Run `process` under `run_id`.
    ///
    /// Reusing the id of an earlier run replays its effects: the file agent
    /// returns outputs already on disk instead of waiting again.
    pub async fn run(&self, process: &str, inputs: Value, run_id: &str) -> Result<RunReport> {
        let definition = self.registry.get(process)?;
        let run_dir = self.run_path(run_id);
        tokio::fs::create_dir_all(&run_dir)
            .await
            .map_err(|source| StoreError::Io {
                path: run_dir.display().to_string(),
                source,
            })?;

        let agent: Arc<dyn AgentExecutor> = match &self.agent {
            Some(agent) => Arc::clone(agent),
            None => Arc::new(FileAgent::new(&run_dir, self.config.poll_interval)),
        };
        let orchestrator = LocalOrchestrator::new(agent, Arc::clone(&self.gate))
            .with_run_id(run_id)
            .with_run_dir(&run_dir)
            .with_task_timeout(self.config.task_timeout)
            .with_strict_schemas(self.config.strict_schemas)
            .with_max_parallel(self.config.max_parallel);
        let journal = orchestrator.journal();

        journal.record(RunEvent::RunStarted {
            process: process.to_string(),
            inputs: inputs.clone(),
        });

        let span = tracing::info_span!("run", run_id = %run_id, process = %process);
        let outcome = async {
            tracing::info!(run_dir = %run_dir.display(), "Starting process");
            definition.run(inputs, &orchestrator).await
        }
        .instrument(span)
        .await;

        match outcome {
            Ok(result) => {
                EffectStore::new(&run_dir).write_json(RESULT_FILE, &result).await?;
                journal.record(RunEvent::RunFinished {
                    success: result.success,
                    error: None,
                });
                tracing::info!(
                    run_id = %run_id,
                    process = %process,
                    artifacts = result.artifacts.len(),
                    "Process finished"
                );
                Ok(RunReport {
                    run_id: run_id.to_string(),
                    run_dir,
                    result,
                })
            }
            Err(e) => {
                journal.record(RunEvent::RunFinished {
                    success: false,
                    error: Some(e.to_string()),
                });
                tracing::error!(run_id = %run_id, process = %process, error = %e, "Process failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::AutoApprove;
    use crate::error::{Error, OrchestrationError, ProcessError};
    use crate::task::TaskDescriptor;
    use async_trait::async_trait;
    use serde_json::json;

    /// Answers every task with a score high enough to skip optional gates.
    struct HappyAgent;

    #[async_trait]
    impl AgentExecutor for HappyAgent {
        async fn execute(
            &self,
            descriptor: &TaskDescriptor,
            _: &Value,
        ) -> std::result::Result<Value, OrchestrationError> {
            Ok(json!({
                "viabilityScore": 0.9,
                "artifacts": [{"path": format!("{}.md", descriptor.agent.name)}]
            }))
        }
    }

    fn runner(dir: &std::path::Path) -> ProcessRunner {
        let config = RunnerConfig {
            run_dir: dir.to_path_buf(),
            ..Default::default()
        };
        ProcessRunner::new(ProcessRegistry::builtin(), config, Arc::new(AutoApprove))
            .with_agent(Arc::new(HappyAgent))
    }

    #[tokio::test]
    async fn writes_result_and_journal() {
        let dir = tempfile::tempdir().unwrap();
        let report = runner(dir.path())
            .run("game-concept-development", json!({"gameName": "Orbit"}), "run-1")
            .await
            .unwrap();

        assert_eq!(report.run_dir, dir.path().join("run-1"));
        assert!(report.result.success);
        assert_eq!(report.result.artifacts.len(), 4);

        let saved: Value = serde_json::from_str(
            &std::fs::read_to_string(report.run_dir.join(RESULT_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["metadata"]["processId"], "game-concept-development");

        let journal = std::fs::read_to_string(report.run_dir.join("journal.jsonl")).unwrap();
        let first: Value = serde_json::from_str(journal.lines().next().unwrap()).unwrap();
        let last: Value = serde_json::from_str(journal.lines().last().unwrap()).unwrap();
        assert_eq!(first["event"], "run_started");
        assert_eq!(last["event"], "run_finished");
        assert_eq!(last["success"], true);
    }

    #[tokio::test]
    async fn unknown_process_fails_before_creating_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = runner(dir.path())
            .run("nope", Value::Null, "run-2")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Process(ProcessError::UnknownProcess { .. })));
        assert!(!dir.path().join("run-2").exists());
    }
}
