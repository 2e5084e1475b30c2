//! Orchestration context: the interface process functions run against.
//!
//! Processes never execute agents or talk to humans directly; every step goes
//! through an [`Orchestrator`] injected by the caller:
//!
//! ```text
//! Process::run ──► Orchestrator::task ──► AgentExecutor ──► output.json
//!        │
//!        └──────► Orchestrator::breakpoint ──► ApprovalGate ──► human
//! ```

pub mod journal;
pub mod local;
pub mod parallel;
pub mod store;

pub use journal::{JournalEntry, RunEvent, RunJournal};
pub use local::LocalOrchestrator;
pub use parallel::{parallel_all, parallel_all_limited};
pub use store::EffectStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::breakpoint::{BreakpointOutcome, BreakpointRequest};
use crate::error::OrchestrationError;
use crate::task::{TaskDef, TaskOutput};

/// Severity for [`Orchestrator::log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Operations a process may perform.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Identifier of the current run.
    fn run_id(&self) -> &str;

    fn now(&self) -> DateTime<Utc>;

    fn log(&self, level: LogLevel, message: &str);

    /// Execute one task and return the agent's output.
    async fn task(&self, task: &TaskDef, args: Value) -> Result<TaskOutput, OrchestrationError>;

    /// Pause for a human decision.
    async fn breakpoint(
        &self,
        request: BreakpointRequest,
    ) -> Result<BreakpointOutcome, OrchestrationError>;
}

/// Raise a breakpoint and insist on a positive decision.
///
/// Returns the edited context when the reviewer edited it. Rejection and
/// expiry fail with [`OrchestrationError::Rejected`].
pub async fn require_approval(
    ctx: &dyn Orchestrator,
    request: BreakpointRequest,
) -> Result<Option<Value>, OrchestrationError> {
    let title = request.title.clone();
    match ctx.breakpoint(request).await? {
        BreakpointOutcome::Approved => Ok(None),
        BreakpointOutcome::Edited { context } => Ok(Some(context)),
        BreakpointOutcome::Rejected { reason } => Err(OrchestrationError::Rejected { title, reason }),
        BreakpointOutcome::Expired => Err(OrchestrationError::Rejected {
            title,
            reason: "expired without a decision".to_string(),
        }),
    }
}
