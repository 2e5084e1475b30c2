//! Breakpoint queue: in-memory store of raised breakpoints with broadcast
//! to approval clients.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::{Breakpoint, BreakpointOutcome, BreakpointStatus, WsMessage};
use crate::error::BreakpointError;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Resolved breakpoints kept for history once the queue grows past this.
const MAX_RESOLVED_HISTORY: usize = 100;

/// In-memory breakpoint queue backed by a broadcast channel.
pub struct BreakpointQueue {
    breakpoints: RwLock<VecDeque<Breakpoint>>,
    tx: broadcast::Sender<WsMessage>,
}

impl BreakpointQueue {
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            breakpoints: RwLock::new(VecDeque::new()),
            tx,
        })
    }

    /// Subscribe to real-time breakpoint events.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.tx.subscribe()
    }

    /// Add a pending breakpoint and broadcast it.
    pub async fn push(&self, breakpoint: Breakpoint) {
        info!(
            breakpoint_id = %breakpoint.id,
            run_id = %breakpoint.run_id,
            title = %breakpoint.title,
            "Breakpoint raised"
        );

        let msg = WsMessage::NewBreakpoint {
            breakpoint: breakpoint.clone(),
        };
        {
            let mut breakpoints = self.breakpoints.write().await;
            breakpoints.push_back(breakpoint);
            prune_resolved(&mut breakpoints);
        }

        // ok if nobody is listening yet
        let _ = self.tx.send(msg);
    }

    pub async fn approve(&self, id: Uuid) -> Result<Breakpoint, BreakpointError> {
        self.resolve(id, BreakpointStatus::Approved, |_| {}).await
    }

    pub async fn reject(&self, id: Uuid, reason: impl Into<String>) -> Result<Breakpoint, BreakpointError> {
        let reason = reason.into();
        self.resolve(id, BreakpointStatus::Rejected, move |bp| {
            bp.reason = Some(reason);
        })
        .await
    }

    /// Approve with a replacement context.
    pub async fn edit(&self, id: Uuid, context: Value) -> Result<Breakpoint, BreakpointError> {
        self.resolve(id, BreakpointStatus::Edited, move |bp| {
            bp.edited_context = Some(context);
        })
        .await
    }

    pub async fn expire(&self, id: Uuid) -> Result<Breakpoint, BreakpointError> {
        self.resolve(id, BreakpointStatus::Expired, |_| {}).await
    }

    async fn resolve<F>(
        &self,
        id: Uuid,
        target: BreakpointStatus,
        apply: F,
    ) -> Result<Breakpoint, BreakpointError>
    where
        F: FnOnce(&mut Breakpoint),
    {
        let mut breakpoints = self.breakpoints.write().await;
        let bp = breakpoints
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(BreakpointError::NotFound { id })?;

        if !bp.status.can_transition_to(target) {
            warn!(breakpoint_id = %id, status = %bp.status, target = %target, "Breakpoint already resolved");
            return Err(BreakpointError::AlreadyResolved {
                id,
                status: bp.status.to_string(),
            });
        }

        apply(bp);
        bp.status = target;
        bp.updated_at = chrono::Utc::now();
        let resolved = bp.clone();
        drop(breakpoints);

        info!(breakpoint_id = %id, status = %target, "Breakpoint resolved");
        let _ = self.tx.send(WsMessage::BreakpointUpdate { id, status: target });

        Ok(resolved)
    }

    pub async fn get(&self, id: Uuid) -> Option<Breakpoint> {
        self.breakpoints
            .read()
            .await
            .iter()
            .find(|b| b.id == id)
            .cloned()
    }

    /// All breakpoints still awaiting a decision.
    pub async fn pending(&self) -> Vec<Breakpoint> {
        self.breakpoints
            .read()
            .await
            .iter()
            .filter(|b| b.status == BreakpointStatus::Pending)
            .cloned()
            .collect()
    }

    /// Wait until the breakpoint leaves `Pending` and return its outcome.
    pub async fn wait(&self, id: Uuid) -> Result<BreakpointOutcome, BreakpointError> {
        // Subscribe before checking so a resolution between the two can't be missed.
        let mut rx = self.subscribe();

        loop {
            let current = self.get(id).await.ok_or(BreakpointError::NotFound { id })?;
            if let Some(outcome) = current.outcome() {
                return Ok(outcome);
            }

            loop {
                match rx.recv().await {
                    Ok(WsMessage::BreakpointUpdate { id: updated, .. }) if updated == id => break,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(missed = n, breakpoint_id = %id, "Waiter lagged, re-checking");
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(BreakpointError::Input("breakpoint queue closed".to_string()));
                    }
                }
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.breakpoints.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.breakpoints.read().await.is_empty()
    }
}

fn prune_resolved(breakpoints: &mut VecDeque<Breakpoint>) {
    let resolved = breakpoints
        .iter()
        .filter(|b| b.status.is_terminal())
        .count();
    let mut to_remove = resolved.saturating_sub(MAX_RESOLVED_HISTORY);
    if to_remove == 0 {
        return;
    }
    breakpoints.retain(|b| {
        if b.status.is_terminal() && to_remove > 0 {
            to_remove -= 1;
            false
        } else {
            true
        }
    });
}
