//! Agent boundary: where a task descriptor turns into an output object.
//!
//! The substantive work of every step is done by an external LLM-driven
//! agent. This module only defines the seam and the file-effect executor
//! used by the CLI.

pub mod repair;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use crate::error::OrchestrationError;
use crate::task::TaskDescriptor;

/// Executes one task descriptor and returns the agent's JSON output.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(
        &self,
        descriptor: &TaskDescriptor,
        args: &Value,
    ) -> Result<Value, OrchestrationError>;
}

/// Waits for an external harness to write `tasks/<effectId>/output.json`.
///
/// The orchestrator has already written `input.json` next to it. Outputs
/// that exist before the task is requested are returned immediately, which
/// makes re-running a run directory replay finished effects. An output that
/// does not parse yet is treated as still being written.
pub struct FileAgent {
    run_dir: PathBuf,
    poll_interval: Duration,
}

impl FileAgent {
    pub fn new(run_dir: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            run_dir: run_dir.into(),
            poll_interval,
        }
    }
}

#[async_trait]
impl AgentExecutor for FileAgent {
    async fn execute(
        &self,
        descriptor: &TaskDescriptor,
        _args: &Value,
    ) -> Result<Value, OrchestrationError> {
        let output_path = self.run_dir.join(&descriptor.io.output_json_path);
        let mut announced = false;

        loop {
            match fs::read(&output_path).await.map(|bytes| repair::repair_json_text(&bytes)) {
                Ok(raw) => match serde_json::from_str(&raw) {
                    Ok(value) => return Ok(value),
                    // still being written; the task timeout bounds the wait
                    Err(e) => tracing::debug!(
                        output = %output_path.display(),
                        error = %e,
                        "Agent output not parseable yet"
                    ),
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(OrchestrationError::TaskFailed {
                        task: descriptor.agent.name.clone(),
                        effect_id: effect_id_of(descriptor),
                        reason: format!("cannot read {}: {}", output_path.display(), e),
                    });
                }
            }

            if !announced {
                tracing::info!(
                    title = %descriptor.title,
                    agent = %descriptor.agent.name,
                    output = %output_path.display(),
                    "Waiting for agent output"
                );
                announced = true;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// `tasks/<effect_id>/output.json` → `<effect_id>`
fn effect_id_of(descriptor: &TaskDescriptor) -> String {
    descriptor
        .io
        .output_json_path
        .split('/')
        .nth(1)
        .unwrap_or_default()
        .to_string()
}
