//! Integration tests for the breakpoint approval API.
//!
//! Each test spins up an Axum server on a random port and exercises the real
//! REST / WebSocket contract, including a process run that blocks on a
//! breakpoint until it is approved over HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use procflow::agent::AgentExecutor;
use procflow::breakpoint::{
    Breakpoint, BreakpointAction, BreakpointOutcome, BreakpointQueue, BreakpointRequest,
    BreakpointStatus, QueueGate, breakpoint_routes,
};
use procflow::error::{Error, OrchestrationError};
use procflow::orchestrator::{LocalOrchestrator, Orchestrator};
use procflow::process::ProcessRegistry;
use procflow::task::TaskDescriptor;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start an Axum server on a random port, return (port, queue).
async fn start_server() -> (u16, Arc<BreakpointQueue>) {
    let queue = BreakpointQueue::new();
    let app = breakpoint_routes(Arc::clone(&queue));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, queue)
}

fn make_breakpoint(title: &str) -> Breakpoint {
    Breakpoint::new(
        "run-test",
        BreakpointRequest::new(title, "Continue?").with_context(json!({"score": 0.3})),
    )
}

fn parse_ws_json(msg: &Message) -> Value {
    match msg {
        Message::Text(txt) => serde_json::from_str(txt).expect("invalid JSON from server"),
        other => panic!("expected Text frame, got {:?}", other),
    }
}

/// Wait until the queue holds a pending breakpoint and return it.
async fn first_pending(queue: &BreakpointQueue) -> Breakpoint {
    loop {
        if let Some(bp) = queue.pending().await.into_iter().next() {
            return bp;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Low viability so the market review fires.
struct LowViabilityAgent;

#[async_trait]
impl AgentExecutor for LowViabilityAgent {
    async fn execute(&self, _: &TaskDescriptor, _: &Value) -> Result<Value, OrchestrationError> {
        Ok(json!({"viabilityScore": 0.2, "concerns": ["crowded genre"], "artifacts": []}))
    }
}

// ── REST ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    timeout(TEST_TIMEOUT, async {
        let (port, _queue) = start_server().await;
        let resp: Value = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(resp["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_lists_and_approves_pending() {
    timeout(TEST_TIMEOUT, async {
        let (port, queue) = start_server().await;
        let bp = make_breakpoint("Market Viability Review");
        let id = bp.id;
        queue.push(bp).await;

        let client = reqwest::Client::new();
        let list: Value = client
            .get(format!("http://127.0.0.1:{port}/api/breakpoints"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["title"], "Market Viability Review");

        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/breakpoints/{id}/approve"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "approved");

        assert!(queue.pending().await.is_empty());
        assert_eq!(queue.get(id).await.unwrap().status, BreakpointStatus::Approved);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_reject_records_reason() {
    timeout(TEST_TIMEOUT, async {
        let (port, queue) = start_server().await;
        let bp = make_breakpoint("Risk Review");
        let id = bp.id;
        queue.push(bp).await;

        let resp = reqwest::Client::new()
            .post(format!("http://127.0.0.1:{port}/api/breakpoints/{id}/reject"))
            .json(&json!({"reason": "too risky"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let stored = queue.get(id).await.unwrap();
        assert_eq!(stored.status, BreakpointStatus::Rejected);
        assert_eq!(stored.reason.as_deref(), Some("too risky"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_edit_stores_context() {
    timeout(TEST_TIMEOUT, async {
        let (port, queue) = start_server().await;
        let bp = make_breakpoint("SOP Review");
        let id = bp.id;
        queue.push(bp).await;

        let resp = reqwest::Client::new()
            .post(format!("http://127.0.0.1:{port}/api/breakpoints/{id}/edit"))
            .json(&json!({"context": {"title": "Revised SOP"}}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        assert_eq!(
            queue.get(id).await.unwrap().outcome(),
            Some(BreakpointOutcome::Edited {
                context: json!({"title": "Revised SOP"})
            })
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rest_error_statuses() {
    timeout(TEST_TIMEOUT, async {
        let (port, queue) = start_server().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/breakpoints/not-a-uuid/approve"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);

        let missing = uuid::Uuid::new_v4();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/breakpoints/{missing}/approve"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);

        let bp = make_breakpoint("Once");
        let id = bp.id;
        queue.push(bp).await;
        queue.approve(id).await.unwrap();
        let resp = client
            .post(format!("http://127.0.0.1:{port}/api/breakpoints/{id}/reject"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);
    })
    .await
    .expect("test timed out");
}

// ── WebSocket ─────────────────────────────────────────────────────────

#[tokio::test]
async fn ws_sync_then_new_breakpoint_broadcast() {
    timeout(TEST_TIMEOUT, async {
        let (port, queue) = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .expect("WS connect failed");

        let sync = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(sync["type"], "breakpoints_sync");
        assert!(sync["breakpoints"].as_array().unwrap().is_empty());

        let bp = make_breakpoint("Fun Factor Review");
        let id = bp.id;
        queue.push(bp).await;

        let msg = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(msg["type"], "new_breakpoint");
        assert_eq!(msg["breakpoint"]["id"], id.to_string());
        assert_eq!(msg["breakpoint"]["status"], "pending");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_reject_action_broadcasts_update() {
    timeout(TEST_TIMEOUT, async {
        let (port, queue) = start_server().await;
        let bp = make_breakpoint("Critical Bug Review");
        let id = bp.id;
        queue.push(bp).await;

        let (mut ws, _) = connect_async(format!("ws://127.0.0.1:{port}/ws"))
            .await
            .unwrap();
        let sync = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(sync["breakpoints"].as_array().unwrap().len(), 1);

        let action = BreakpointAction::Reject {
            breakpoint_id: id,
            reason: "ship blocker".into(),
        };
        ws.send(Message::Text(serde_json::to_string(&action).unwrap().into()))
            .await
            .unwrap();

        let msg = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(msg["type"], "breakpoint_update");
        assert_eq!(msg["id"], id.to_string());
        assert_eq!(msg["status"], "rejected");
        assert_eq!(queue.get(id).await.unwrap().reason.as_deref(), Some("ship blocker"));
    })
    .await
    .expect("test timed out");
}

// ── End to end ────────────────────────────────────────────────────────

#[tokio::test]
async fn process_waits_for_http_approval() {
    timeout(TEST_TIMEOUT, async {
        let (port, queue) = start_server().await;
        let gate = Arc::new(QueueGate::new(Arc::clone(&queue), None));
        let orchestrator = Arc::new(LocalOrchestrator::new(Arc::new(LowViabilityAgent), gate));
        let process = ProcessRegistry::builtin().get("game-concept-development").unwrap();

        let run = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                process
                    .run(json!({"gameName": "Orbit"}), orchestrator.as_ref())
                    .await
            })
        };

        let client = reqwest::Client::new();

        let market = first_pending(&queue).await;
        assert_eq!(market.title, "Market Viability Review");
        assert_eq!(market.context["viabilityScore"], 0.2);
        client
            .post(format!("http://127.0.0.1:{port}/api/breakpoints/{}/approve", market.id))
            .send()
            .await
            .unwrap();

        let concept = loop {
            let bp = first_pending(&queue).await;
            if bp.id != market.id {
                break bp;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        };
        assert_eq!(concept.title, "Game Concept Review");
        client
            .post(format!("http://127.0.0.1:{port}/api/breakpoints/{}/approve", concept.id))
            .send()
            .await
            .unwrap();

        let result = run.await.unwrap().unwrap();
        assert!(result.success);
        assert_eq!(result.output("marketAnalysis").unwrap()["viabilityScore"], 0.2);
        assert!(!orchestrator.run_id().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rejected_breakpoint_fails_the_process() {
    timeout(TEST_TIMEOUT, async {
        let (port, queue) = start_server().await;
        let gate = Arc::new(QueueGate::new(Arc::clone(&queue), None));
        let orchestrator = Arc::new(LocalOrchestrator::new(Arc::new(LowViabilityAgent), gate));
        let process = ProcessRegistry::builtin().get("game-concept-development").unwrap();

        let run = {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { process.run(Value::Null, orchestrator.as_ref()).await })
        };

        let market = first_pending(&queue).await;
        reqwest::Client::new()
            .post(format!("http://127.0.0.1:{port}/api/breakpoints/{}/reject", market.id))
            .json(&json!({"reason": "market too small"}))
            .send()
            .await
            .unwrap();

        let err = run.await.unwrap().unwrap_err();
        match err {
            Error::Orchestration(OrchestrationError::Rejected { title, reason }) => {
                assert_eq!(title, "Market Viability Review");
                assert_eq!(reason, "market too small");
            }
            other => panic!("expected rejection, got {other}"),
        }
    })
    .await
    .expect("test timed out");
}
