mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use procflow::breakpoint::{
    ApprovalGate, AutoApprove, BreakpointQueue, ConsoleGate, QueueGate, spawn_approval_server,
};
use procflow::config::{ApprovalMode, RunnerConfig};
use procflow::process::ProcessRegistry;
use procflow::runner::ProcessRunner;

use cli::{Cli, Command};

const LOG_FILE: &str = "procflow.log";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let registry = ProcessRegistry::builtin();

    let outcome = match cli.command {
        Command::List => {
            for process in registry.all() {
                println!("{:<30} {}", process.name(), process.description());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            process,
            inputs,
            run_id,
        } => run(registry, &process, inputs, run_id).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Execute one process run. The log guard lives in this frame, so it is
/// flushed on every return path.
async fn run(
    registry: ProcessRegistry,
    process: &str,
    inputs: Option<PathBuf>,
    run_id: Option<String>,
) -> anyhow::Result<ExitCode> {
    let inputs: Value = match inputs {
        Some(path) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading inputs from {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing inputs from {}", path.display()))?
        }
        None => Value::Null,
    };

    let config = RunnerConfig::from_env()?;
    let run_id = run_id.unwrap_or_else(ProcessRunner::new_run_id);
    let run_dir = config.run_dir.join(&run_id);

    let _log_guard = init_tracing(config.log_to_file.then_some(run_dir.as_path()))?;

    eprintln!("procflow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Process: {}", process);
    eprintln!("   Run: {}", run_dir.display());
    eprintln!("   Approval: {}", config.approval);

    let gate: Arc<dyn ApprovalGate> = match config.approval {
        ApprovalMode::Auto => Arc::new(AutoApprove),
        ApprovalMode::Console => Arc::new(ConsoleGate::stdin()),
        ApprovalMode::Http => {
            let queue = BreakpointQueue::new();
            let _server = spawn_approval_server(Arc::clone(&queue), config.http_port)
                .await
                .with_context(|| format!("binding approval API on port {}", config.http_port))?;
            eprintln!("   Approval API: http://0.0.0.0:{}/api/breakpoints", config.http_port);
            eprintln!("   Approval WS: ws://0.0.0.0:{}/ws", config.http_port);
            Arc::new(QueueGate::new(queue, config.breakpoint_timeout))
        }
    };

    let runner = ProcessRunner::new(registry, config, gate);
    let report = match runner.run(process, inputs, &run_id).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Run {} failed: {}", run_id, e);
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("{}", serde_json::to_string_pretty(&report.result)?);
    Ok(if report.result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Non-blocking writer for `<dir>/procflow.log`. Lines are only guaranteed
/// on disk once the guard is dropped.
fn log_file_writer(dir: &Path) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::never(dir, LOG_FILE);
    Ok(tracing_appender::non_blocking(appender))
}

fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = log_file_writer(dir)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
