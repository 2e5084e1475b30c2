//! procflow: runner for agent process definitions.

pub mod agent;
pub mod artifact;
pub mod breakpoint;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod process;
pub mod runner;
pub mod task;
