//! WebSocket server + REST endpoints for resolving breakpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::{Breakpoint, BreakpointAction, WsMessage};
use super::queue::BreakpointQueue;
use crate::error::BreakpointError;

/// Build the Axum router for the approval API.
pub fn breakpoint_routes(queue: Arc<BreakpointQueue>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/breakpoints", get(list_breakpoints))
        .route("/api/breakpoints/{id}", get(get_breakpoint))
        .route("/api/breakpoints/{id}/approve", post(approve_breakpoint))
        .route("/api/breakpoints/{id}/reject", post(reject_breakpoint))
        .route("/api/breakpoints/{id}/edit", post(edit_breakpoint))
        .layer(CorsLayer::permissive())
        .with_state(queue)
}

/// Bind and serve the approval API in the background.
pub async fn spawn_approval_server(
    queue: Arc<BreakpointQueue>,
    port: u16,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    let app = breakpoint_routes(queue);
    info!(port, "Approval API started");
    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Approval API stopped");
        }
    }))
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "procflow-breakpoints"
    }))
}

// ── WebSocket ───────────────────────────────────────────────────────────

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(queue): State<Arc<BreakpointQueue>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, queue))
}

async fn handle_socket(mut socket: WebSocket, queue: Arc<BreakpointQueue>) {
    info!("Approval client connected");

    // Subscribe before the initial sync so nothing raised in between is lost.
    let mut rx = queue.subscribe();

    if !send_sync(&mut socket, &queue).await {
        warn!("Failed to send initial sync, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(msg) => {
                        if !send_json(&mut socket, &msg).await {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "Approval client lagged behind broadcast");
                        if !send_sync(&mut socket, &queue).await {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => handle_client_message(&text, &queue).await,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("Approval client disconnected");
}

async fn send_sync(socket: &mut WebSocket, queue: &BreakpointQueue) -> bool {
    let sync = WsMessage::BreakpointsSync {
        breakpoints: queue.pending().await,
    };
    send_json(socket, &sync).await
}

async fn send_json(socket: &mut WebSocket, msg: &WsMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize WS message");
            true
        }
    }
}

async fn handle_client_message(text: &str, queue: &BreakpointQueue) {
    let action = match serde_json::from_str::<BreakpointAction>(text) {
        Ok(action) => action,
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
            return;
        }
    };

    let result = match action {
        BreakpointAction::Approve { breakpoint_id } => queue.approve(breakpoint_id).await,
        BreakpointAction::Reject {
            breakpoint_id,
            reason,
        } => queue.reject(breakpoint_id, reason).await,
        BreakpointAction::Edit {
            breakpoint_id,
            context,
        } => queue.edit(breakpoint_id, context).await,
    };

    match result {
        Ok(bp) => info!(breakpoint_id = %bp.id, status = %bp.status, "Breakpoint resolved via WS"),
        Err(e) => warn!(error = %e, "WS action failed"),
    }
}

// ── REST Endpoints ──────────────────────────────────────────────────────

async fn list_breakpoints(State(queue): State<Arc<BreakpointQueue>>) -> impl IntoResponse {
    Json(queue.pending().await)
}

async fn get_breakpoint(
    State(queue): State<Arc<BreakpointQueue>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match queue.get(id).await {
        Some(bp) => (StatusCode::OK, Json(serde_json::json!(bp))),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "Breakpoint not found"})),
        ),
    }
}

async fn approve_breakpoint(
    State(queue): State<Arc<BreakpointQueue>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match parse_id(&id) {
        Ok(id) => resolution_response(queue.approve(id).await),
        Err(resp) => resp,
    }
}

#[derive(Deserialize)]
struct RejectRequest {
    #[serde(default)]
    reason: String,
}

async fn reject_breakpoint(
    State(queue): State<Arc<BreakpointQueue>>,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    // body is optional; `{}` or nothing means no reason
    let reason = if body.is_empty() {
        String::new()
    } else {
        match serde_json::from_slice::<RejectRequest>(&body) {
            Ok(req) => req.reason,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": format!("Invalid body: {}", e)})),
                );
            }
        }
    };
    match parse_id(&id) {
        Ok(id) => resolution_response(queue.reject(id, reason).await),
        Err(resp) => resp,
    }
}

#[derive(Deserialize)]
struct EditRequest {
    context: Value,
}

async fn edit_breakpoint(
    State(queue): State<Arc<BreakpointQueue>>,
    Path(id): Path<String>,
    Json(body): Json<EditRequest>,
) -> impl IntoResponse {
    match parse_id(&id) {
        Ok(id) => resolution_response(queue.edit(id, body.context).await),
        Err(resp) => resp,
    }
}

fn parse_id(raw: &str) -> Result<Uuid, (StatusCode, Json<Value>)> {
    Uuid::parse_str(raw).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Invalid breakpoint ID"})),
        )
    })
}

fn resolution_response(
    result: Result<Breakpoint, BreakpointError>,
) -> (StatusCode, Json<Value>) {
    match result {
        Ok(bp) => (StatusCode::OK, Json(serde_json::json!(bp))),
        Err(e @ BreakpointError::NotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
        Err(e @ BreakpointError::AlreadyResolved { .. }) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        ),
    }
}
