//! Check and action registries, and the environment lifecycle collaborator.
//!
//! Checks and actions are owned externally: the engine only dispatches them
//! by name and converts whatever they produce into verdicts and booleans at
//! the boundary.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tracing::info;
use vera_common::{ActionId, Verdict, VeraError};

use crate::store::KeyValueStore;

/// Shared context handed to every check and action invocation.
#[derive(Clone)]
pub struct CheckContext {
    pub store: Arc<dyn KeyValueStore>,
    pub workspace_root: PathBuf,
}

impl CheckContext {
    pub fn new(store: Arc<dyn KeyValueStore>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            workspace_root: workspace_root.into(),
        }
    }
}

pub type CheckFuture = Pin<Box<dyn Future<Output = Result<Verdict, VeraError>> + Send>>;
pub type CheckFn = Arc<dyn Fn(CheckContext) -> CheckFuture + Send + Sync>;

pub type ActionFuture = Pin<Box<dyn Future<Output = Result<bool, VeraError>> + Send>>;
pub type ActionFn = Arc<dyn Fn(CheckContext) -> ActionFuture + Send + Sync>;

/// A registered named check.
#[derive(Clone)]
pub struct RegisteredCheck {
    pub name: String,
    pub description: String,
    check: CheckFn,
}

impl RegisteredCheck {
    pub fn invoke(&self, ctx: &CheckContext) -> CheckFuture {
        (self.check)(ctx.clone())
    }
}

/// Registry of named async checks. Insertion order is preserved for listing;
/// execution order is owned by the suite definition, not the registry.
#[derive(Default)]
pub struct CheckRegistry {
    checks: HashMap<String, RegisteredCheck>,
    order: Vec<String>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, description: impl Into<String>, check: F)
    where
        F: Fn(CheckContext) -> CheckFuture + Send + Sync + 'static,
    {
        let name = name.into();
        if !self.checks.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.checks.insert(
            name.clone(),
            RegisteredCheck {
                name,
                description: description.into(),
                check: Arc::new(check),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredCheck> {
        self.checks.get(name)
    }

    pub fn list(&self) -> Vec<&RegisteredCheck> {
        self.order
            .iter()
            .filter_map(|name| self.checks.get(name))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.checks.len()
    }
}

/// Registry mapping the closed action vocabulary to handlers. Built once at
/// startup; handlers can be overridden for embedding and tests.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<ActionId, ActionFn>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, id: ActionId, handler: F)
    where
        F: Fn(CheckContext) -> ActionFuture + Send + Sync + 'static,
    {
        self.handlers.insert(id, Arc::new(handler));
    }

    pub fn get(&self, id: ActionId) -> Option<&ActionFn> {
        self.handlers.get(&id)
    }

    pub fn count(&self) -> usize {
        self.handlers.len()
    }
}

/// External test-environment lifecycle. `cleanup` is best-effort and must be
/// safe to call exactly once per run on every exit path.
pub trait EnvironmentLifecycle: Send + Sync {
    fn initialize(&self) -> Result<(), VeraError>;
    fn cleanup(&self);
}

/// Lifecycle that does nothing; useful when the embedding owns the
/// environment itself.
pub struct NoopEnvironment;

impl EnvironmentLifecycle for NoopEnvironment {
    fn initialize(&self) -> Result<(), VeraError> {
        Ok(())
    }

    fn cleanup(&self) {}
}

/// Default lifecycle for the CLI: makes sure the store root exists before
/// the run and removes the reachability probe marker afterwards.
pub struct WorkspaceEnvironment {
    store_root: PathBuf,
}

impl WorkspaceEnvironment {
    pub fn new(store_root: impl Into<PathBuf>) -> Self {
        Self {
            store_root: store_root.into(),
        }
    }
}

impl EnvironmentLifecycle for WorkspaceEnvironment {
    fn initialize(&self) -> Result<(), VeraError> {
        std::fs::create_dir_all(&self.store_root)
            .map_err(|e| VeraError::EnvInit(format!("{}: {}", self.store_root.display(), e)))?;
        info!("environment ready at {}", self.store_root.display());
        Ok(())
    }

    fn cleanup(&self) {
        // Best-effort: drop the probe marker left by the bootstrap check.
        let probe = self.store_root.join("health/probe");
        if probe.exists() {
            let _ = std::fs::remove_file(probe);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn test_ctx() -> CheckContext {
        CheckContext::new(Arc::new(MemoryStore::new()), "/tmp")
    }

    #[test]
    fn test_empty_registry() {
        let registry = CheckRegistry::new();
        assert_eq!(registry.count(), 0);
        assert!(registry.get("anything").is_none());
    }

    #[tokio::test]
    async fn test_register_and_invoke_check() {
        let mut registry = CheckRegistry::new();
        registry.register("always-pass", "passes unconditionally", |_ctx| {
            Box::pin(async { Ok(Verdict::pass("ok")) })
        });

        assert_eq!(registry.count(), 1);
        let check = registry.get("always-pass").unwrap();
        let verdict = check.invoke(&test_ctx()).await.unwrap();
        assert_eq!(verdict.outcome, vera_common::Outcome::Pass);
    }

    #[test]
    fn test_re_register_keeps_listing_position() {
        let mut registry = CheckRegistry::new();
        registry.register("a", "first", |_| Box::pin(async { Ok(Verdict::pass("ok")) }));
        registry.register("b", "second", |_| Box::pin(async { Ok(Verdict::pass("ok")) }));
        registry.register("a", "replaced", |_| Box::pin(async { Ok(Verdict::pass("ok")) }));

        let names: Vec<&str> = registry.list().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().description, "replaced");
    }

    #[tokio::test]
    async fn test_action_registry_override() {
        let mut registry = ActionRegistry::new();
        registry.register(ActionId::FlushOtpQueue, |_ctx| Box::pin(async { Ok(false) }));

        let handler = registry.get(ActionId::FlushOtpQueue).unwrap();
        assert_eq!(handler(test_ctx()).await.unwrap(), false);
        assert!(registry.get(ActionId::RestartOtpWorker).is_none());
    }
}
