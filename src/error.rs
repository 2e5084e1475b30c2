//! Error types for procflow.

use std::time::Duration;

use uuid::Uuid;

/// Top-level error type for the runner.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    #[error("Breakpoint error: {0}")]
    Breakpoint(#[from] BreakpointError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures while executing a task or waiting on a breakpoint.
///
/// The process code itself never recovers from these; they propagate to the
/// caller of `Process::run` and fail the whole run.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Task {task} ({effect_id}) failed: {reason}")]
    TaskFailed {
        task: String,
        effect_id: String,
        reason: String,
    },

    #[error("Task {task} ({effect_id}) timed out after {timeout:?}")]
    Timeout {
        task: String,
        effect_id: String,
        timeout: Duration,
    },

    #[error("Output of task {task} does not match its schema at {path}: {reason}")]
    SchemaMismatch {
        task: String,
        path: String,
        reason: String,
    },

    #[error("Breakpoint '{title}' was rejected: {reason}")]
    Rejected { title: String, reason: String },

    #[error("Run {run_id} was cancelled")]
    Cancelled { run_id: String },

    #[error("Breakpoint error: {0}")]
    Breakpoint(#[from] BreakpointError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Process definition / registry errors.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Unknown process: {name}")]
    UnknownProcess { name: String },

    #[error("Invalid inputs for process {process}: {reason}")]
    InvalidInputs { process: String, reason: String },
}

/// Breakpoint queue errors.
#[derive(Debug, thiserror::Error)]
pub enum BreakpointError {
    #[error("Breakpoint {id} not found")]
    NotFound { id: Uuid },

    #[error("Breakpoint {id} already resolved as {status}")]
    AlreadyResolved { id: Uuid, status: String },

    #[error("Approval input error: {0}")]
    Input(String),
}

/// Run-directory persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for the runner.
pub type Result<T> = std::result::Result<T, Error>;
