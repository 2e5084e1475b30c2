//! Approval gates: how a raised breakpoint gets its decision.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

use super::model::{Breakpoint, BreakpointOutcome};
use super::queue::BreakpointQueue;
use crate::error::BreakpointError;

/// Resolves breakpoints raised by a running process.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// Block until the breakpoint is decided.
    async fn resolve(&self, breakpoint: Breakpoint) -> Result<BreakpointOutcome, BreakpointError>;
}

/// Approves everything. Used for unattended runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalGate for AutoApprove {
    async fn resolve(&self, breakpoint: Breakpoint) -> Result<BreakpointOutcome, BreakpointError> {
        tracing::info!(breakpoint_id = %breakpoint.id, title = %breakpoint.title, "Auto-approved breakpoint");
        Ok(BreakpointOutcome::Approved)
    }
}

/// Parks breakpoints in a [`BreakpointQueue`] until a client decides.
pub struct QueueGate {
    queue: Arc<BreakpointQueue>,
    timeout: Option<Duration>,
}

impl QueueGate {
    pub fn new(queue: Arc<BreakpointQueue>, timeout: Option<Duration>) -> Self {
        Self { queue, timeout }
    }
}

#[async_trait]
impl ApprovalGate for QueueGate {
    async fn resolve(&self, breakpoint: Breakpoint) -> Result<BreakpointOutcome, BreakpointError> {
        let id = breakpoint.id;
        self.queue.push(breakpoint).await;

        let Some(timeout) = self.timeout else {
            return self.queue.wait(id).await;
        };

        match tokio::time::timeout(timeout, self.queue.wait(id)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(breakpoint_id = %id, ?timeout, "Breakpoint expired");
                match self.queue.expire(id).await {
                    Ok(_) => Ok(BreakpointOutcome::Expired),
                    // resolved in the same instant the timer fired
                    Err(BreakpointError::AlreadyResolved { .. }) => self.queue.wait(id).await,
                    Err(e) => Err(e),
                }
            }
        }
    }
}

/// Prompts on a line-oriented reader (stdin by default).
///
/// Answers: `y`/`yes`/empty approves, `n [reason]` rejects,
/// `e <json>` approves with an edited context.
pub struct ConsoleGate {
    reader: Mutex<Box<dyn AsyncBufRead + Unpin + Send>>,
}

impl ConsoleGate {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }

    pub fn new(reader: impl AsyncBufRead + Unpin + Send + 'static) -> Self {
        Self {
            reader: Mutex::new(Box::new(reader)),
        }
    }
}

#[async_trait]
impl ApprovalGate for ConsoleGate {
    async fn resolve(&self, breakpoint: Breakpoint) -> Result<BreakpointOutcome, BreakpointError> {
        let mut reader = self.reader.lock().await;

        eprintln!("\n⏸  {}", breakpoint.title);
        eprintln!("   {}", breakpoint.question);
        if !breakpoint.context.is_null() {
            eprintln!("   context: {}", breakpoint.context);
        }

        loop {
            eprint!("   [y]es / [n]o <reason> / [e]dit <json> > ");
            let mut line = String::new();
            let read = reader
                .read_line(&mut line)
                .await
                .map_err(|e| BreakpointError::Input(e.to_string()))?;
            if read == 0 {
                return Err(BreakpointError::Input("input closed before a decision".to_string()));
            }

            match parse_console_answer(&line) {
                Ok(outcome) => return Ok(outcome),
                Err(message) => eprintln!("   {}", message),
            }
        }
    }
}

/// Parse one console answer line.
pub fn parse_console_answer(line: &str) -> Result<BreakpointOutcome, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head.to_lowercase().as_str() {
        "" | "y" | "yes" | "approve" => Ok(BreakpointOutcome::Approved),
        "n" | "no" | "reject" => Ok(BreakpointOutcome::Rejected {
            reason: rest.to_string(),
        }),
        "e" | "edit" => {
            let context: Value =
                serde_json::from_str(rest).map_err(|e| format!("Invalid JSON context: {}", e))?;
            Ok(BreakpointOutcome::Edited { context })
        }
        other => Err(format!("Unrecognized answer '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::model::{BreakpointRequest, BreakpointStatus};
    use serde_json::json;

    fn make_breakpoint() -> Breakpoint {
        Breakpoint::new("run-1", BreakpointRequest::new("Review", "Continue?"))
    }

    #[test]
    fn parses_console_answers() {
        assert_eq!(parse_console_answer("y\n"), Ok(BreakpointOutcome::Approved));
        assert_eq!(parse_console_answer(""), Ok(BreakpointOutcome::Approved));
        assert_eq!(
            parse_console_answer("n  scope too big "),
            Ok(BreakpointOutcome::Rejected {
                reason: "scope too big".into()
            })
        );
        assert_eq!(
            parse_console_answer("e {\"budget\": 10}"),
            Ok(BreakpointOutcome::Edited {
                context: json!({"budget": 10})
            })
        );
        assert!(parse_console_answer("e {broken").is_err());
        assert!(parse_console_answer("maybe").is_err());
    }

    #[tokio::test]
    async fn console_gate_skips_bad_lines() {
        let gate = ConsoleGate::new(BufReader::new(&b"what\nn nope\n"[..]));
        let outcome = gate.resolve(make_breakpoint()).await.unwrap();
        assert_eq!(
            outcome,
            BreakpointOutcome::Rejected {
                reason: "nope".into()
            }
        );
    }

    #[tokio::test]
    async fn console_gate_errors_on_eof() {
        let gate = ConsoleGate::new(BufReader::new(&b""[..]));
        assert!(gate.resolve(make_breakpoint()).await.is_err());
    }

    #[tokio::test]
    async fn queue_gate_expires_after_timeout() {
        let queue = BreakpointQueue::new();
        let gate = QueueGate::new(Arc::clone(&queue), Some(Duration::from_millis(20)));
        let bp = make_breakpoint();
        let id = bp.id;

        let outcome = gate.resolve(bp).await.unwrap();
        assert_eq!(outcome, BreakpointOutcome::Expired);
        assert_eq!(queue.get(id).await.unwrap().status, BreakpointStatus::Expired);
    }

    #[tokio::test]
    async fn queue_gate_waits_for_client() {
        let queue = BreakpointQueue::new();
        let gate = QueueGate::new(Arc::clone(&queue), None);
        let mut rx = queue.subscribe();

        let approver = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                if let Ok(crate::breakpoint::model::WsMessage::NewBreakpoint { breakpoint }) =
                    rx.recv().await
                {
                    queue.approve(breakpoint.id).await.unwrap();
                }
            })
        };

        let outcome = gate.resolve(make_breakpoint()).await.unwrap();
        assert_eq!(outcome, BreakpointOutcome::Approved);
        approver.await.unwrap();
    }
}
