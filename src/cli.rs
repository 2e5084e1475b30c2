//! Command-line arguments for the procflow binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Run agent process definitions with human approval breakpoints.
///
/// Runtime settings (run directory, approval mode, timeouts) come from
/// `PROCFLOW_*` environment variables.
#[derive(Parser, Debug)]
#[command(name = "procflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the registered processes.
    List,

    /// Run a process to completion and print its result as JSON.
    Run {
        /// Registered process name, e.g. `game-concept-development`.
        process: String,

        /// JSON file with the process inputs. Defaults apply when omitted.
        inputs: Option<PathBuf>,

        /// Reuse a run id; existing task outputs in that run are replayed.
        #[arg(long)]
        run_id: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_list() {
        let cli = Cli::try_parse_from(["procflow", "list"]).unwrap();
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn parse_run_minimal() {
        let cli = Cli::try_parse_from(["procflow", "run", "game-playtesting"]).unwrap();
        match cli.command {
            Command::Run {
                process,
                inputs,
                run_id,
            } => {
                assert_eq!(process, "game-playtesting");
                assert!(inputs.is_none());
                assert!(run_id.is_none());
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn parse_run_full() {
        let cli = Cli::try_parse_from([
            "procflow",
            "run",
            "contract-review",
            "inputs.json",
            "--run-id",
            "run-7",
        ])
        .unwrap();
        match cli.command {
            Command::Run {
                process,
                inputs,
                run_id,
            } => {
                assert_eq!(process, "contract-review");
                assert_eq!(inputs, Some(PathBuf::from("inputs.json")));
                assert_eq!(run_id.as_deref(), Some("run-7"));
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn run_requires_a_process() {
        assert!(Cli::try_parse_from(["procflow", "run"]).is_err());
        assert!(Cli::try_parse_from(["procflow", "run", "p", "--run-id"]).is_err());
    }
}
