use super::{Executor, TerraformExecutor};
use crate::traits::CommandExecutor;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Trait for executor registry that manages available executors
pub trait ExecutorRegistry: Send + Sync {
    /// Register an executor with the given name
    fn register(&mut self, name: String, executor: Box<dyn Executor>);

    /// Get an executor by name
    fn get(&self, name: &str) -> Result<Arc<dyn Executor>>;

    /// Check if an executor is registered
    fn has(&self, name: &str) -> bool;

    /// List all registered executor names, sorted
    fn list(&self) -> Vec<String>;
}

/// Default implementation of executor registry using a HashMap
pub struct DefaultExecutorRegistry {
    executors: RwLock<HashMap<String, Arc<dyn Executor>>>,
}

impl DefaultExecutorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            executors: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with `terraform` and `opentofu` running through `command`
    pub fn with_defaults(command: Arc<dyn CommandExecutor>) -> Self {
        let mut registry = Self::new();
        registry.register(
            "terraform".to_string(),
            Box::new(TerraformExecutor::terraform(Arc::clone(&command))),
        );
        registry.register(
            "opentofu".to_string(),
            Box::new(TerraformExecutor::opentofu(command)),
        );
        registry
    }
}

impl ExecutorRegistry for DefaultExecutorRegistry {
    fn register(&mut self, name: String, executor: Box<dyn Executor>) {
        if let Ok(mut executors) = self.executors.write() {
            executors.insert(name, Arc::from(executor));
        }
    }

    fn get(&self, name: &str) -> Result<Arc<dyn Executor>> {
        let executors = self
            .executors
            .read()
            .map_err(|_| anyhow::anyhow!("Executor registry lock poisoned"))?;
        executors.get(name).cloned().with_context(|| {
            let mut known: Vec<&String> = executors.keys().collect();
            known.sort();
            format!(
                "Unknown executor: {} (available: {})",
                name,
                known
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }

    fn has(&self, name: &str) -> bool {
        self.executors
            .read()
            .map(|executors| executors.contains_key(name))
            .unwrap_or(false)
    }

    fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .executors
            .read()
            .map(|executors| executors.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for DefaultExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
