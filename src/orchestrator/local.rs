//! In-process orchestrator.
//!
//! Assigns effect ids, persists task input/output, delegates execution to an
//! [`AgentExecutor`], routes breakpoints to an [`ApprovalGate`], and journals
//! every step.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::journal::{RunEvent, RunJournal};
use super::store::EffectStore;
use super::{LogLevel, Orchestrator};
use crate::agent::AgentExecutor;
use crate::breakpoint::{ApprovalGate, Breakpoint, BreakpointOutcome, BreakpointRequest};
use crate::error::OrchestrationError;
use crate::task::{TaskContext, TaskDef, TaskDescriptor, TaskOutput};

static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Default cap on concurrently executing agent calls.
const DEFAULT_MAX_PARALLEL: usize = 8;

/// Orchestrator that runs everything inside the current process.
pub struct LocalOrchestrator {
    run_id: String,
    agent: Arc<dyn AgentExecutor>,
    gate: Arc<dyn ApprovalGate>,
    store: Option<EffectStore>,
    journal: Arc<RunJournal>,
    task_timeout: Option<Duration>,
    strict_schemas: bool,
    seq: AtomicU64,
    permits: Arc<Semaphore>,
}

impl LocalOrchestrator {
    /// New orchestrator with a random run id, no persistence, and an
    /// in-memory journal.
    pub fn new(agent: Arc<dyn AgentExecutor>, gate: Arc<dyn ApprovalGate>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            agent,
            gate,
            store: None,
            journal: Arc::new(RunJournal::in_memory()),
            task_timeout: None,
            strict_schemas: false,
            seq: AtomicU64::new(0),
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_PARALLEL)),
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Persist effects and the journal under `run_dir`.
    pub fn with_run_dir(mut self, run_dir: impl Into<PathBuf>) -> Self {
        let run_dir = run_dir.into();
        self.journal = Arc::new(RunJournal::at(run_dir.join("journal.jsonl")));
        self.store = Some(EffectStore::new(run_dir));
        self
    }

    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Fail tasks whose output does not match the declared schema.
    pub fn with_strict_schemas(mut self, strict: bool) -> Self {
        self.strict_schemas = strict;
        self
    }

    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    pub fn journal(&self) -> Arc<RunJournal> {
        Arc::clone(&self.journal)
    }

    pub fn store(&self) -> Option<&EffectStore> {
        self.store.as_ref()
    }

    fn next_effect_id(&self, task_name: &str) -> String {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{:04}-{}", seq, slugify(task_name))
    }

    async fn execute_effect(
        &self,
        descriptor: &TaskDescriptor,
        args: &Value,
        task_name: &str,
        effect_id: &str,
    ) -> Result<Value, OrchestrationError> {
        if let Some(store) = &self.store {
            store.write_input(descriptor, args).await?;
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| OrchestrationError::Cancelled {
                run_id: self.run_id.clone(),
            })?;

        let execution = self.agent.execute(descriptor, args);
        let value = match self.task_timeout {
            Some(timeout) => tokio::time::timeout(timeout, execution).await.map_err(|_| {
                OrchestrationError::Timeout {
                    task: task_name.to_string(),
                    effect_id: effect_id.to_string(),
                    timeout,
                }
            })??,
            None => execution.await?,
        };

        if let Err(violation) = descriptor.agent.output_schema.validate(&value) {
            if self.strict_schemas {
                return Err(OrchestrationError::SchemaMismatch {
                    task: task_name.to_string(),
                    path: violation.path,
                    reason: violation.reason,
                });
            }
            tracing::warn!(
                run_id = %self.run_id,
                effect_id,
                task = task_name,
                path = %violation.path,
                reason = %violation.reason,
                "Agent output does not match schema"
            );
        }

        if let Some(store) = &self.store {
            store.write_output(&descriptor.io, &value).await?;
        }

        Ok(value)
    }
}

#[async_trait]
impl Orchestrator for LocalOrchestrator {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn log(&self, level: LogLevel, message: &str) {
        let run_id = self.run_id.as_str();
        match level {
            LogLevel::Debug => tracing::debug!(run_id, "{}", message),
            LogLevel::Info => tracing::info!(run_id, "{}", message),
            LogLevel::Warn => tracing::warn!(run_id, "{}", message),
            LogLevel::Error => tracing::error!(run_id, "{}", message),
        }
        self.journal.record(RunEvent::Log {
            level,
            message: message.to_string(),
        });
    }

    async fn task(&self, task: &TaskDef, args: Value) -> Result<TaskOutput, OrchestrationError> {
        let effect_id = self.next_effect_id(task.name());
        let descriptor = task.descriptor(&args, &TaskContext::new(&effect_id));

        tracing::info!(
            run_id = %self.run_id,
            effect_id = %effect_id,
            task = task.name(),
            title = %descriptor.title,
            "Task requested"
        );
        self.journal.record(RunEvent::TaskRequested {
            effect_id: effect_id.clone(),
            task: task.name().to_string(),
            title: descriptor.title.clone(),
        });

        match self
            .execute_effect(&descriptor, &args, task.name(), &effect_id)
            .await
        {
            Ok(value) => {
                tracing::info!(run_id = %self.run_id, effect_id = %effect_id, task = task.name(), "Task completed");
                self.journal.record(RunEvent::TaskCompleted {
                    effect_id,
                    task: task.name().to_string(),
                });
                Ok(TaskOutput::new(value))
            }
            Err(e) => {
                tracing::error!(run_id = %self.run_id, effect_id = %effect_id, task = task.name(), error = %e, "Task failed");
                self.journal.record(RunEvent::TaskFailed {
                    effect_id,
                    task: task.name().to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn breakpoint(
        &self,
        request: BreakpointRequest,
    ) -> Result<BreakpointOutcome, OrchestrationError> {
        let breakpoint = Breakpoint::new(self.run_id.clone(), request);
        let breakpoint_id = breakpoint.id;

        tracing::info!(
            run_id = %self.run_id,
            breakpoint_id = %breakpoint_id,
            title = %breakpoint.title,
            "Awaiting approval"
        );
        self.journal.record(RunEvent::BreakpointRaised {
            breakpoint_id,
            title: breakpoint.title.clone(),
        });

        let outcome = self.gate.resolve(breakpoint).await?;

        tracing::info!(
            run_id = %self.run_id,
            breakpoint_id = %breakpoint_id,
            outcome = outcome.label(),
            "Breakpoint resolved"
        );
        self.journal.record(RunEvent::BreakpointResolved {
            breakpoint_id,
            outcome: outcome.label().to_string(),
        });

        Ok(outcome)
    }
}

fn slugify(name: &str) -> String {
    NON_SLUG
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}
