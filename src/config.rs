//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// How breakpoints are resolved when running from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalMode {
    /// Every breakpoint is approved immediately.
    Auto,
    /// Prompt on stdin.
    Console,
    /// Park breakpoints in the queue and serve the approval API.
    Http,
}

impl std::str::FromStr for ApprovalMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "console" | "cli" => Ok(Self::Console),
            "http" => Ok(Self::Http),
            other => Err(format!("Unknown approval mode: {}", other)),
        }
    }
}

impl std::fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Console => write!(f, "console"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Parent directory; each run gets `<run_dir>/<run_id>`.
    pub run_dir: PathBuf,
    /// Breakpoint resolution strategy.
    pub approval: ApprovalMode,
    /// Port for the approval API (http mode only).
    pub http_port: u16,
    /// How often the file agent checks for `output.json`.
    pub poll_interval: Duration,
    /// Per-task timeout. `None` waits forever.
    pub task_timeout: Option<Duration>,
    /// Breakpoint expiry. `None` waits forever.
    pub breakpoint_timeout: Option<Duration>,
    /// Reject agent outputs that do not match their declared schema.
    pub strict_schemas: bool,
    /// Upper bound on concurrently running parallel branches.
    pub max_parallel: usize,
    /// Also write logs to `<run>/procflow.log`.
    pub log_to_file: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            run_dir: PathBuf::from(".procflow/runs"),
            approval: ApprovalMode::Console,
            http_port: 8787,
            poll_interval: Duration::from_millis(500),
            task_timeout: None,
            breakpoint_timeout: None,
            strict_schemas: false,
            max_parallel: 8,
            log_to_file: false,
        }
    }
}

impl RunnerConfig {
    /// Load configuration from `PROCFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let run_dir = lookup("PROCFLOW_RUN_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.run_dir);

        let approval = match lookup("PROCFLOW_APPROVAL") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "PROCFLOW_APPROVAL".to_string(),
                message,
            })?,
            None => defaults.approval,
        };

        let http_port = parse_or(&lookup, "PROCFLOW_HTTP_PORT", defaults.http_port)?;
        let poll_ms = parse_or(&lookup, "PROCFLOW_POLL_INTERVAL_MS", 500u64)?;
        if poll_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PROCFLOW_POLL_INTERVAL_MS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        // 0 means "no timeout"
        let task_timeout = match parse_or(&lookup, "PROCFLOW_TASK_TIMEOUT_SECS", 0u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let breakpoint_timeout = match parse_or(&lookup, "PROCFLOW_BREAKPOINT_TIMEOUT_SECS", 0u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let strict_schemas = parse_bool(&lookup, "PROCFLOW_STRICT_SCHEMAS", defaults.strict_schemas)?;
        let max_parallel = parse_or(&lookup, "PROCFLOW_MAX_PARALLEL", defaults.max_parallel)?.max(1);
        let log_to_file = parse_bool(&lookup, "PROCFLOW_LOG_FILE", defaults.log_to_file)?;

        Ok(Self {
            run_dir,
            approval,
            http_port,
            poll_interval: Duration::from_millis(poll_ms),
            task_timeout,
            breakpoint_timeout,
            strict_schemas,
            max_parallel,
            log_to_file,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|s| s.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off" | "") => Ok(false),
        Some(v) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{}'", v),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = RunnerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.run_dir, PathBuf::from(".procflow/runs"));
        assert_eq!(config.approval, ApprovalMode::Console);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert!(config.task_timeout.is_none());
        assert!(!config.strict_schemas);
    }

    #[test]
    fn reads_overrides() {
        let config = RunnerConfig::from_lookup(lookup_from(&[
            ("PROCFLOW_RUN_DIR", "/tmp/runs"),
            ("PROCFLOW_APPROVAL", "HTTP"),
            ("PROCFLOW_TASK_TIMEOUT_SECS", "30"),
            ("PROCFLOW_STRICT_SCHEMAS", "yes"),
            ("PROCFLOW_MAX_PARALLEL", "0"),
        ]))
        .unwrap();
        assert_eq!(config.run_dir, PathBuf::from("/tmp/runs"));
        assert_eq!(config.approval, ApprovalMode::Http);
        assert_eq!(config.task_timeout, Some(Duration::from_secs(30)));
        assert!(config.strict_schemas);
        // clamped to at least one branch
        assert_eq!(config.max_parallel, 1);
    }

    #[test]
    fn invalid_values_are_reported_with_key() {
        let err = RunnerConfig::from_lookup(lookup_from(&[("PROCFLOW_HTTP_PORT", "nope")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "PROCFLOW_HTTP_PORT"),
            other => panic!("unexpected error: {other}"),
        }

        assert!(RunnerConfig::from_lookup(lookup_from(&[("PROCFLOW_APPROVAL", "maybe")])).is_err());
        assert!(RunnerConfig::from_lookup(lookup_from(&[("PROCFLOW_LOG_FILE", "perhaps")])).is_err());
        assert!(RunnerConfig::from_lookup(lookup_from(&[("PROCFLOW_POLL_INTERVAL_MS", "0")])).is_err());
    }
}
