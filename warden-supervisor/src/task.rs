//! Task-based child supervisor
//!
//! Each child is a tokio task running a [`Worker`](crate::worker::Worker). Start is
//! acknowledged: the worker's `init` runs inside the child task and reports back before
//! `start_child` returns. Children that finish on their own are dropped from the table;
//! nothing is restarted automatically.

use crate::child::{ChildInfo, ChildSupervisor, ProcessHandle};
use crate::error::ChildError;
use crate::spec::ChildDescriptor;
use crate::worker::ModuleRegistry;
use async_trait::async_trait;
use chrono::Utc;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use warden_core::config::SupervisorConfig;

struct ChildEntry {
    seq: u64,
    info: ChildInfo,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

/// Child supervisor running workers as tokio tasks
pub struct TaskSupervisor {
    registry: ModuleRegistry,
    children: Arc<RwLock<HashMap<ProcessHandle, ChildEntry>>>,
    next_seq: AtomicU64,
    config: SupervisorConfig,
}

impl TaskSupervisor {
    /// Create a new task supervisor over the given modules
    pub fn new(registry: ModuleRegistry, config: SupervisorConfig) -> Self {
        Self {
            registry,
            children: Arc::new(RwLock::new(HashMap::new())),
            next_seq: AtomicU64::new(0),
            config,
        }
    }

    /// Stop an entry already removed from the table
    async fn stop_entry(
        &self,
        handle: &ProcessHandle,
        entry: ChildEntry,
    ) -> std::result::Result<(), ChildError> {
        entry.shutdown.cancel();

        let mut task = entry.task;
        match timeout(self.config.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => {
                info!(%handle, "Child stopped gracefully");
                Ok(())
            }
            Ok(Err(e)) if e.is_panic() => {
                let reason = panic_message(e.into_panic());
                warn!(%handle, %reason, "Child crashed during shutdown");
                Err(ChildError::ShutdownCrashed(reason))
            }
            Ok(Err(e)) => {
                warn!(%handle, error = %e, "Child ended abnormally during shutdown");
                Ok(())
            }
            Err(_) => {
                warn!(%handle, "Child shutdown timeout, aborting");
                task.abort();
                let _ = task.await;
                Ok(())
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[async_trait]
impl ChildSupervisor for TaskSupervisor {
    async fn start_child(
        &self,
        descriptor: &ChildDescriptor,
    ) -> std::result::Result<ProcessHandle, ChildError> {
        let module = self
            .registry
            .get(&descriptor.module)
            .ok_or_else(|| ChildError::InvalidModule(descriptor.module.clone()))?;

        if !module
            .start_functions()
            .iter()
            .any(|f| *f == descriptor.function)
        {
            return Err(ChildError::InvalidFunction {
                module: descriptor.module.clone(),
                function: descriptor.function.clone(),
            });
        }

        let handle = ProcessHandle::new();
        let shutdown = CancellationToken::new();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), String>>();
        let (go_tx, go_rx) = oneshot::channel::<()>();

        let task = {
            let module = module.clone();
            let function = descriptor.function.clone();
            let args = descriptor.args.clone();
            let children = self.children.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let worker = match module.init(&function, &args).await {
                    Ok(worker) => worker,
                    Err(reason) => {
                        let _ = ready_tx.send(Err(reason));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() || go_rx.await.is_err() {
                    // starter gave up before registering us
                    return;
                }
                worker.run(shutdown).await;
                if children.write().await.remove(&handle).is_some() {
                    debug!(%handle, "Child exited on its own");
                }
            })
        };

        match timeout(self.config.startup_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(reason))) => {
                let _ = task.await;
                return Err(ChildError::InitFailed(reason));
            }
            Ok(Err(_)) => {
                // init never answered: the task panicked or was cancelled
                let reason = match task.await {
                    Err(e) if e.is_panic() => panic_message(e.into_panic()),
                    Err(e) => e.to_string(),
                    Ok(()) => "worker exited during init".to_string(),
                };
                return Err(ChildError::InitCrashed(reason));
            }
            Err(_) => {
                task.abort();
                let _ = task.await;
                return Err(ChildError::StartupTimeout);
            }
        }

        let info = ChildInfo {
            handle,
            id: descriptor.id.clone(),
            role: module.role(),
            modules: vec![module.name().to_string()],
            started_at: Utc::now(),
        };
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.children.write().await.insert(
            handle,
            ChildEntry {
                seq,
                info,
                shutdown,
                task,
            },
        );
        let _ = go_tx.send(());

        info!(
            %handle,
            module = %descriptor.module,
            function = %descriptor.function,
            "Child started"
        );
        Ok(handle)
    }

    async fn terminate_child(
        &self,
        handle: &ProcessHandle,
    ) -> std::result::Result<(), ChildError> {
        let entry = {
            let mut children = self.children.write().await;
            children.remove(handle)
        };

        match entry {
            Some(entry) => self.stop_entry(handle, entry).await,
            None => {
                debug!(%handle, "Terminate requested for unknown child");
                Err(ChildError::NotFound)
            }
        }
    }

    async fn list_children(&self) -> Vec<ChildInfo> {
        let children = self.children.read().await;
        let mut entries: Vec<&ChildEntry> = children.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.info.clone()).collect()
    }

    async fn is_alive(&self, handle: &ProcessHandle) -> bool {
        self.children.read().await.contains_key(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::child::ChildRole;
    use crate::spec::{ProcessSpec, StartArgs, StartDirective, normalize};
    use crate::worker::{BoxedWorker, IdleModule, Worker, WorkerModule};
    use std::time::Duration;

    struct OneShotModule;

    struct OneShotWorker;

    #[async_trait]
    impl Worker for OneShotWorker {
        async fn run(self: Box<Self>, _shutdown: CancellationToken) {}
    }

    #[async_trait]
    impl WorkerModule for OneShotModule {
        fn name(&self) -> &str {
            "oneshot"
        }

        async fn init(&self, _function: &str, _args: &StartArgs) -> Result<BoxedWorker, String> {
            Ok(Box::new(OneShotWorker))
        }
    }

    struct PanickingModule;

    #[async_trait]
    impl WorkerModule for PanickingModule {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn init(&self, _function: &str, _args: &StartArgs) -> Result<BoxedWorker, String> {
            panic!("boom during init");
        }
    }

    struct StuckModule;

    #[async_trait]
    impl WorkerModule for StuckModule {
        fn name(&self) -> &str {
            "stuck"
        }

        async fn init(&self, _function: &str, _args: &StartArgs) -> Result<BoxedWorker, String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err("unreachable".to_string())
        }
    }

    /// Ignores cancellation entirely
    struct StubbornWorker;

    #[async_trait]
    impl Worker for StubbornWorker {
        async fn run(self: Box<Self>, _shutdown: CancellationToken) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }

    struct StubbornModule;

    #[async_trait]
    impl WorkerModule for StubbornModule {
        fn name(&self) -> &str {
            "stubborn"
        }

        async fn init(&self, _function: &str, _args: &StartArgs) -> Result<BoxedWorker, String> {
            Ok(Box::new(StubbornWorker))
        }
    }

    /// Panics once asked to stop
    struct CrashOnStopWorker;

    #[async_trait]
    impl Worker for CrashOnStopWorker {
        async fn run(self: Box<Self>, shutdown: CancellationToken) {
            shutdown.cancelled().await;
            panic!("lost state while stopping");
        }
    }

    struct CrashOnStopModule;

    #[async_trait]
    impl WorkerModule for CrashOnStopModule {
        fn name(&self) -> &str {
            "crash_on_stop"
        }

        async fn init(&self, _function: &str, _args: &StartArgs) -> Result<BoxedWorker, String> {
            Ok(Box::new(CrashOnStopWorker))
        }
    }

    /// Idle workers reported as nested supervisors
    struct PoolModule;

    #[async_trait]
    impl WorkerModule for PoolModule {
        fn name(&self) -> &str {
            "pool"
        }

        fn role(&self) -> ChildRole {
            ChildRole::Supervisor
        }

        async fn init(&self, function: &str, args: &StartArgs) -> Result<BoxedWorker, String> {
            IdleModule.init(function, args).await
        }
    }

    fn supervisor() -> TaskSupervisor {
        let registry = ModuleRegistry::with_builtin()
            .with(Arc::new(CrashOnStopModule))
            .with(Arc::new(PoolModule))
            .with(Arc::new(OneShotModule))
            .with(Arc::new(PanickingModule))
            .with(Arc::new(StuckModule))
            .with(Arc::new(StubbornModule));
        TaskSupervisor::new(
            registry,
            SupervisorConfig {
                startup_timeout: Duration::from_secs(1),
                shutdown_timeout: Duration::from_secs(1),
            },
        )
    }

    #[tokio::test]
    async fn test_start_list_terminate() {
        let supervisor = supervisor();
        let spec = ProcessSpec::descriptor("w1", StartDirective::new("idle", "start_link", vec![]));

        let handle = supervisor.start_child(&normalize(&spec)).await.unwrap();
        assert!(supervisor.is_alive(&handle).await);

        let children = supervisor.list_children().await;
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].handle, handle);
        assert_eq!(children[0].id.as_deref(), Some("w1"));
        assert_eq!(children[0].role, ChildRole::Worker);
        assert_eq!(children[0].modules, vec!["idle"]);

        supervisor.terminate_child(&handle).await.unwrap();
        assert!(!supervisor.is_alive(&handle).await);
        assert!(supervisor.list_children().await.is_empty());

        assert_eq!(
            supervisor.terminate_child(&handle).await,
            Err(ChildError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_list_is_in_start_order() {
        let supervisor = supervisor();
        let mut handles = Vec::new();
        for _ in 0..3 {
            handles.push(
                supervisor
                    .start_child(&normalize(&ProcessSpec::module("idle")))
                    .await
                    .unwrap(),
            );
        }
        let listed: Vec<_> = supervisor
            .list_children()
            .await
            .into_iter()
            .map(|c| c.handle)
            .collect();
        assert_eq!(listed, handles);
        for handle in &handles {
            supervisor.terminate_child(handle).await.unwrap();
        }
        assert!(supervisor.list_children().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_module_and_function() {
        let supervisor = supervisor();

        let err = supervisor
            .start_child(&normalize(&ProcessSpec::module("missing")))
            .await
            .unwrap_err();
        assert_eq!(err, ChildError::InvalidModule("missing".to_string()));

        let spec = ProcessSpec::descriptor("w", StartDirective::new("idle", "nope", vec![]));
        let err = supervisor.start_child(&normalize(&spec)).await.unwrap_err();
        assert!(matches!(err, ChildError::InvalidFunction { .. }));
    }

    #[tokio::test]
    async fn test_init_panic_is_reported() {
        let supervisor = supervisor();
        let err = supervisor
            .start_child(&normalize(&ProcessSpec::module("panicking")))
            .await
            .unwrap_err();
        assert_eq!(err, ChildError::InitCrashed("boom during init".to_string()));
        assert!(supervisor.list_children().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_timeout() {
        let supervisor = supervisor();
        let err = supervisor
            .start_child(&normalize(&ProcessSpec::module("stuck")))
            .await
            .unwrap_err();
        assert_eq!(err, ChildError::StartupTimeout);
        assert!(supervisor.list_children().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stubborn_worker_is_aborted() {
        let supervisor = supervisor();
        let handle = supervisor
            .start_child(&normalize(&ProcessSpec::module("stubborn")))
            .await
            .unwrap();

        supervisor.terminate_child(&handle).await.unwrap();
        assert!(!supervisor.is_alive(&handle).await);
    }

    #[tokio::test]
    async fn test_finished_worker_leaves_table() {
        let supervisor = supervisor();
        let handle = supervisor
            .start_child(&normalize(&ProcessSpec::module("oneshot")))
            .await
            .unwrap();

        for _ in 0..50 {
            if !supervisor.is_alive(&handle).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!supervisor.is_alive(&handle).await);
    }

    #[tokio::test]
    async fn test_crash_during_shutdown_is_reported() {
        let supervisor = supervisor();
        let handle = supervisor
            .start_child(&normalize(&ProcessSpec::module("crash_on_stop")))
            .await
            .unwrap();

        let err = supervisor.terminate_child(&handle).await.unwrap_err();
        assert_eq!(err, ChildError::ShutdownCrashed("lost state while stopping".to_string()));
        assert!(!supervisor.is_alive(&handle).await);
        assert_eq!(
            supervisor.terminate_child(&handle).await,
            Err(ChildError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_role_comes_from_module() {
        let supervisor = supervisor();
        let pool = supervisor
            .start_child(&normalize(&ProcessSpec::module("pool")))
            .await
            .unwrap();
        let idle = supervisor
            .start_child(&normalize(&ProcessSpec::module("idle")))
            .await
            .unwrap();

        let roles: Vec<_> = supervisor
            .list_children()
            .await
            .into_iter()
            .map(|c| (c.handle, c.role))
            .collect();
        assert_eq!(roles, vec![(pool, ChildRole::Supervisor), (idle, ChildRole::Worker)]);
    }
}
