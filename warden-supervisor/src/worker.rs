//! Worker modules
//!
//! A [`WorkerModule`] is the unit a [`ChildDescriptor`](crate::spec::ChildDescriptor) names.
//! It exports one or more start functions and turns start arguments into a running
//! [`Worker`]. Modules are looked up by name in a [`ModuleRegistry`].

use crate::child::ChildRole;
use crate::spec::{DEFAULT_START_FUNCTION, StartArgs};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A running worker
#[async_trait]
pub trait Worker: Send {
    /// Run until `shutdown` is cancelled or the work is finished
    async fn run(self: Box<Self>, shutdown: CancellationToken);
}

/// Boxed worker returned by [`WorkerModule::init`]
pub type BoxedWorker = Box<dyn Worker>;

/// Factory for workers of one kind
#[async_trait]
pub trait WorkerModule: Send + Sync {
    /// Name used in process specs
    fn name(&self) -> &str;

    /// Start functions this module exports
    fn start_functions(&self) -> &[&str] {
        &[DEFAULT_START_FUNCTION]
    }

    fn role(&self) -> ChildRole {
        ChildRole::Worker
    }

    /// Initialize a worker. An `Err` is reported as an init failure.
    async fn init(&self, function: &str, args: &StartArgs) -> Result<BoxedWorker, String>;
}

/// Name → module lookup
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn WorkerModule>>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `idle` and `command` modules
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(IdleModule));
        registry.register(Arc::new(crate::command::CommandModule));
        registry
    }

    /// Register a module under its own name, replacing any previous one
    pub fn register(&mut self, module: Arc<dyn WorkerModule>) {
        self.modules.insert(module.name().to_string(), module);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, module: Arc<dyn WorkerModule>) -> Self {
        self.register(module);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn WorkerModule>> {
        self.modules.get(name).cloned()
    }

    /// Registered module names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names())
            .finish()
    }
}

/// Module whose workers do nothing until they are told to stop
pub struct IdleModule;

struct IdleWorker;

#[async_trait]
impl Worker for IdleWorker {
    async fn run(self: Box<Self>, shutdown: CancellationToken) {
        shutdown.cancelled().await;
    }
}

#[async_trait]
impl WorkerModule for IdleModule {
    fn name(&self) -> &str {
        "idle"
    }

    async fn init(&self, _function: &str, _args: &StartArgs) -> Result<BoxedWorker, String> {
        Ok(Box::new(IdleWorker))
    }
}
