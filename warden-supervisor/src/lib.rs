//! Warden Supervisor - worker process lifecycle for agent servers
//!
//! Starts, lists, restarts and terminates the auxiliary workers an agent owns, and emits a
//! lifecycle signal for every transition.
//!
//! ## Pieces
//!
//! - [`ProcessSpec`]: four accepted ways to describe a worker, reduced by [`normalize`] to a
//!   [`ChildDescriptor`]
//! - [`ChildSupervisor`]: the primitive that owns workers; [`TaskSupervisor`] runs them as
//!   tokio tasks built from registered [`WorkerModule`]s
//! - [`LifecycleEmitter`]: `process_started` / `process_terminated` / `process_failed` signals
//! - [`ProcessLifecycle`]: the operations, over an [`AgentServerState`]
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_core::prelude::{Dispatcher, SinkDescriptor, SupervisorConfig, signal_channel};
//! use warden_supervisor::*;
//!
//! # async fn run() -> Result<()> {
//! let (tx, mut rx) = signal_channel(64);
//! let supervisor = Arc::new(TaskSupervisor::new(
//!     ModuleRegistry::with_builtin(),
//!     SupervisorConfig::default(),
//! ));
//! let state = AgentServerState::new(
//!     "agent-1",
//!     supervisor,
//!     Dispatcher::builder().sink(SinkDescriptor::direct_async(tx)).build(),
//! );
//!
//! let lifecycle = ProcessLifecycle::new();
//! let (state, handle) = lifecycle.start_one(&state, ProcessSpec::module("idle")).await?;
//! let (state, handle) = lifecycle.restart(&state, &handle, ProcessSpec::module("idle")).await?;
//! lifecycle.terminate(&state, &handle).await?;
//! # Ok(())
//! # }
//! ```

mod adapter;
mod child;
mod command;
mod emitter;
mod error;
mod lifecycle;
mod spec;
mod state;
mod task;
mod worker;

pub use adapter::SupervisorAdapter;
pub use child::{ChildInfo, ChildRole, ChildSupervisor, ProcessHandle};
pub use command::CommandModule;
pub use emitter::{
    EVENT_NAMESPACE, LifecycleCategory, LifecycleEmitter, LifecycleEvent, LifecyclePayload,
};
pub use error::{ChildError, Details, ErrorKind, Result, SupervisorError};
pub use lifecycle::{ProcessLifecycle, StartRequest, Started};
pub use spec::{
    ChildDescriptor, DEFAULT_START_FUNCTION, ProcessSpec, StartArgs, StartDirective, normalize,
};
pub use state::{AgentServerState, AgentStatus};
pub use task::TaskSupervisor;
pub use worker::{BoxedWorker, IdleModule, ModuleRegistry, Worker, WorkerModule};
