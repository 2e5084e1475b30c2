//! Effect store: persists task input/output JSON inside the run directory.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};
use tokio::fs;

use crate::error::StoreError;
use crate::task::{TaskDescriptor, TaskIo};

/// File layout rooted at one run directory.
#[derive(Debug, Clone)]
pub struct EffectStore {
    root: PathBuf,
}

impl EffectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `input.json`: the descriptor plus the raw args.
    pub async fn write_input(&self, descriptor: &TaskDescriptor, args: &Value) -> Result<(), StoreError> {
        let doc = json!({
            "descriptor": descriptor,
            "args": args,
        });
        self.write_json(&descriptor.io.input_json_path, &doc).await
    }

    /// Write `output.json` unless an external agent already put it there.
    pub async fn write_output(&self, io: &TaskIo, output: &Value) -> Result<(), StoreError> {
        let path = self.root.join(&io.output_json_path);
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }
        self.write_json(&io.output_json_path, output).await
    }

    /// Write any serializable document at a path relative to the run root.
    pub async fn write_json<T: Serialize + ?Sized>(&self, relative: &str, doc: &T) -> Result<(), StoreError> {
        let path = self.root.join(relative);
        let display = path.display().to_string();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|source| StoreError::Io {
                path: display.clone(),
                source,
            })?;
        }

        let body = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Json {
            path: display.clone(),
            source,
        })?;

        // write-then-rename so readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).await.map_err(|source| StoreError::Io {
            path: display.clone(),
            source,
        })?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io { path: display, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{AgentPrompt, AgentTask, TaskContext, define_task};

    fn build(args: &Value, _ctx: &TaskContext) -> AgentTask {
        AgentTask::new("T", "agent", AgentPrompt::new("r", "t").context(args.clone()))
    }

    #[tokio::test]
    async fn writes_input_and_output_under_effect_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = EffectStore::new(dir.path());
        let desc = define_task("t", build).descriptor(&json!({"a": 1}), &TaskContext::new("0001-t"));

        store.write_input(&desc, &json!({"a": 1})).await.unwrap();
        store.write_output(&desc.io, &json!({"ok": true})).await.unwrap();

        let input: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("tasks/0001-t/input.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(input["args"]["a"], 1);
        assert_eq!(input["descriptor"]["kind"], "agent");

        let output = std::fs::read_to_string(dir.path().join("tasks/0001-t/output.json")).unwrap();
        assert!(output.contains("\"ok\": true"));
    }

    #[tokio::test]
    async fn does_not_overwrite_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let store = EffectStore::new(dir.path());
        let io = TaskIo::for_effect("0002-x");
        let path = dir.path().join(&io.output_json_path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{\"from\":\"agent\"}").unwrap();

        store.write_output(&io, &json!({"from": "runner"})).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"from\":\"agent\"}");
    }
}
