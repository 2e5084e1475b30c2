//! Registry of runnable processes.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ProcessError;
use crate::process::Process;
use crate::process::contract_review::ContractReview;
use crate::process::game_concept::GameConceptDevelopment;
use crate::process::game_playtesting::GamePlaytesting;
use crate::process::game_qa_release::GameQaRelease;
use crate::process::operations_sop::OperationsSopDevelopment;
use crate::process::route_optimization::RouteOptimization;

/// Processes by name.
#[derive(Default)]
pub struct ProcessRegistry {
    processes: BTreeMap<String, Arc<dyn Process>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in process.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GameConceptDevelopment));
        registry.register(Arc::new(GamePlaytesting));
        registry.register(Arc::new(GameQaRelease));
        registry.register(Arc::new(ContractReview));
        registry.register(Arc::new(RouteOptimization));
        registry.register(Arc::new(OperationsSopDevelopment));
        registry
    }

    /// Register a process. A later registration with the same name wins.
    pub fn register(&mut self, process: Arc<dyn Process>) {
        let name = process.name().to_string();
        if self.processes.insert(name.clone(), process).is_some() {
            tracing::warn!(process = %name, "Replaced existing process registration");
        } else {
            tracing::debug!("Registered process: {}", name);
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Process>, ProcessError> {
        self.processes
            .get(name)
            .cloned()
            .ok_or_else(|| ProcessError::UnknownProcess {
                name: name.to_string(),
            })
    }

    /// Names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.processes.keys().map(String::as_str).collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Process>> {
        self.processes.values()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}
