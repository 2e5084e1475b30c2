//! Human-in-the-loop breakpoints.
//!
//! A process raises a breakpoint to pause for review. The orchestrator hands
//! it to an [`ApprovalGate`], which decides it automatically, on the console,
//! or by parking it in the [`BreakpointQueue`] for the HTTP/WebSocket API.

pub mod gate;
pub mod model;
pub mod queue;
pub mod routes;

pub use gate::{ApprovalGate, AutoApprove, ConsoleGate, QueueGate};
pub use model::{
    Breakpoint, BreakpointAction, BreakpointOutcome, BreakpointRequest, BreakpointStatus,
    WsMessage,
};
pub use queue::BreakpointQueue;
pub use routes::{breakpoint_routes, spawn_approval_server};
