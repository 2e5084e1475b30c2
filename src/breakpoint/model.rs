//! Breakpoint data model: requests, statuses, outcomes and wire messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// What a process asks a human to review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointRequest {
    pub title: String,
    pub question: String,
    #[serde(default)]
    pub context: Value,
}

impl BreakpointRequest {
    pub fn new(title: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            question: question.into(),
            context: Value::Null,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

/// Status of a breakpoint.
///
/// `Pending` moves to exactly one terminal state and never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakpointStatus {
    /// Waiting for a decision.
    Pending,
    Approved,
    Rejected,
    /// Approved with a replacement context.
    Edited,
    /// Nobody answered in time.
    Expired,
}

impl BreakpointStatus {
    pub fn can_transition_to(&self, target: BreakpointStatus) -> bool {
        use BreakpointStatus::*;
        matches!(
            (self, target),
            (Pending, Approved) | (Pending, Rejected) | (Pending, Edited) | (Pending, Expired)
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for BreakpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Edited => "edited",
            Self::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// How a breakpoint was resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BreakpointOutcome {
    Approved,
    Rejected { reason: String },
    Edited { context: Value },
    Expired,
}

impl BreakpointOutcome {
    /// Whether the process may continue.
    pub fn allows_continue(&self) -> bool {
        matches!(self, Self::Approved | Self::Edited { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected { .. } => "rejected",
            Self::Edited { .. } => "edited",
            Self::Expired => "expired",
        }
    }
}

/// A raised breakpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub id: Uuid,
    pub run_id: String,
    pub title: String,
    pub question: String,
    pub context: Value,
    pub status: BreakpointStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_context: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Breakpoint {
    /// Create a new pending breakpoint for a run.
    pub fn new(run_id: impl Into<String>, request: BreakpointRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            run_id: run_id.into(),
            title: request.title,
            question: request.question,
            context: request.context,
            status: BreakpointStatus::Pending,
            reason: None,
            edited_context: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Resolution, or `None` while pending.
    pub fn outcome(&self) -> Option<BreakpointOutcome> {
        match self.status {
            BreakpointStatus::Pending => None,
            BreakpointStatus::Approved => Some(BreakpointOutcome::Approved),
            BreakpointStatus::Rejected => Some(BreakpointOutcome::Rejected {
                reason: self.reason.clone().unwrap_or_default(),
            }),
            BreakpointStatus::Edited => Some(BreakpointOutcome::Edited {
                context: self.edited_context.clone().unwrap_or(Value::Null),
            }),
            BreakpointStatus::Expired => Some(BreakpointOutcome::Expired),
        }
    }
}

/// Actions a client can take on a breakpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BreakpointAction {
    Approve { breakpoint_id: Uuid },
    Reject {
        breakpoint_id: Uuid,
        #[serde(default)]
        reason: String,
    },
    Edit { breakpoint_id: Uuid, context: Value },
}

/// Messages broadcast to WebSocket clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    NewBreakpoint { breakpoint: Breakpoint },
    BreakpointUpdate { id: Uuid, status: BreakpointStatus },
    /// Full pending list (sent on connect and after lag).
    BreakpointsSync { breakpoints: Vec<Breakpoint> },
}
