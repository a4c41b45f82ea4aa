//! Process lifecycle operations over an agent server state
//!
//! [`ProcessLifecycle`] starts, lists, terminates and restarts an agent's workers. Each call
//! normalizes specs, goes through the [`SupervisorAdapter`], and emits one lifecycle signal
//! per transition. The state is threaded through and handed back unchanged; the child
//! supervisor is the only record of which workers are live.

use crate::adapter::SupervisorAdapter;
use crate::child::{ChildInfo, ProcessHandle};
use crate::emitter::{LifecycleCategory, LifecycleEmitter, LifecyclePayload};
use crate::error::Result;
use crate::spec::{ProcessSpec, normalize};
use crate::state::AgentServerState;
use tracing::{debug, info, warn};

/// What to start: one spec or an ordered batch
#[derive(Debug, Clone, PartialEq)]
pub enum StartRequest {
    One(ProcessSpec),
    Many(Vec<ProcessSpec>),
}

impl From<ProcessSpec> for StartRequest {
    fn from(spec: ProcessSpec) -> Self {
        StartRequest::One(spec)
    }
}

impl From<Vec<ProcessSpec>> for StartRequest {
    fn from(specs: Vec<ProcessSpec>) -> Self {
        StartRequest::Many(specs)
    }
}

impl From<&str> for StartRequest {
    fn from(module: &str) -> Self {
        StartRequest::One(ProcessSpec::from(module))
    }
}

/// Handles produced by [`ProcessLifecycle::start`], mirroring the request shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Started {
    One(ProcessHandle),
    Many(Vec<ProcessHandle>),
}

impl Started {
    /// All handles, in start order
    pub fn handles(&self) -> Vec<ProcessHandle> {
        match self {
            Started::One(handle) => vec![*handle],
            Started::Many(handles) => handles.clone(),
        }
    }
}

/// Start / list / terminate / restart for an agent's workers
#[derive(Debug, Clone, Default)]
pub struct ProcessLifecycle {
    emitter: LifecycleEmitter,
}

impl ProcessLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific emitter (for a custom signal namespace)
    pub fn with_emitter(emitter: LifecycleEmitter) -> Self {
        Self { emitter }
    }

    pub fn emitter(&self) -> &LifecycleEmitter {
        &self.emitter
    }

    /// Start one spec or a batch of specs.
    ///
    /// See [`start_one`](Self::start_one) and [`start_many`](Self::start_many).
    pub async fn start(
        &self,
        state: &AgentServerState,
        request: impl Into<StartRequest>,
    ) -> Result<(AgentServerState, Started)> {
        match request.into() {
            StartRequest::One(spec) => {
                let (state, handle) = self.start_one(state, spec).await?;
                Ok((state, Started::One(handle)))
            }
            StartRequest::Many(specs) => {
                let (state, handles) = self.start_many(state, specs).await?;
                Ok((state, Started::Many(handles)))
            }
        }
    }

    /// Start a single worker.
    ///
    /// Emits `process_started` with the handle and the spec as submitted, or
    /// `process_failed` with the spec and the error.
    pub async fn start_one(
        &self,
        state: &AgentServerState,
        spec: ProcessSpec,
    ) -> Result<(AgentServerState, ProcessHandle)> {
        let descriptor = normalize(&spec);
        debug!(
            agent_id = %state.agent_id,
            module = %descriptor.module,
            function = %descriptor.function,
            "Starting child process"
        );

        let adapter = SupervisorAdapter::new(state.child_supervisor());
        match adapter.start_child(&descriptor).await {
            Ok(handle) => {
                info!(
                    agent_id = %state.agent_id,
                    %handle,
                    module = %descriptor.module,
                    "Child process started"
                );
                self.emitter
                    .emit(
                        state,
                        LifecycleCategory::Started,
                        LifecyclePayload::started(handle, spec),
                    )
                    .await;
                Ok((state.clone(), handle))
            }
            Err(error) => {
                warn!(
                    agent_id = %state.agent_id,
                    module = %descriptor.module,
                    %error,
                    "Child process failed to start"
                );
                self.emitter
                    .emit(
                        state,
                        LifecycleCategory::Failed,
                        LifecyclePayload::start_failed(spec, error.clone()),
                    )
                    .await;
                Err(error)
            }
        }
    }

    /// Start specs in order, one at a time.
    ///
    /// Fail-fast: the first spec that fails to start ends the batch with its error, later
    /// specs are not attempted, and workers already started by this call stay running.
    /// An empty batch starts nothing and emits nothing.
    pub async fn start_many(
        &self,
        state: &AgentServerState,
        specs: Vec<ProcessSpec>,
    ) -> Result<(AgentServerState, Vec<ProcessHandle>)> {
        let mut handles = Vec::with_capacity(specs.len());
        for (index, spec) in specs.into_iter().enumerate() {
            match self.start_one(state, spec).await {
                Ok((_, handle)) => handles.push(handle),
                Err(error) => {
                    warn!(
                        agent_id = %state.agent_id,
                        index,
                        started = handles.len(),
                        "Batch start stopped at first failure"
                    );
                    return Err(error);
                }
            }
        }
        Ok((state.clone(), handles))
    }

    /// Live children, fresh from the supervisor
    pub async fn list(&self, state: &AgentServerState) -> Vec<ChildInfo> {
        SupervisorAdapter::new(state.child_supervisor())
            .list_children()
            .await
    }

    /// Stop a worker.
    ///
    /// Emits `process_terminated` on success. An unknown handle returns a not-found error and
    /// emits nothing.
    pub async fn terminate(&self, state: &AgentServerState, handle: &ProcessHandle) -> Result<()> {
        let adapter = SupervisorAdapter::new(state.child_supervisor());
        match adapter.terminate_child(handle).await {
            Ok(()) => {
                info!(agent_id = %state.agent_id, %handle, "Child process terminated");
                self.emitter
                    .emit(
                        state,
                        LifecycleCategory::Terminated,
                        LifecyclePayload::terminated(*handle),
                    )
                    .await;
                Ok(())
            }
            Err(error) if error.is_not_found() => {
                debug!(agent_id = %state.agent_id, %handle, "Terminate on unknown handle");
                Err(error)
            }
            Err(error) => {
                warn!(
                    agent_id = %state.agent_id,
                    %handle,
                    %error,
                    "Child process failed to terminate"
                );
                self.emitter
                    .emit(
                        state,
                        LifecycleCategory::Failed,
                        LifecyclePayload::terminate_failed(*handle, error.clone()),
                    )
                    .await;
                Err(error)
            }
        }
    }

    /// Replace a worker: terminate `handle`, then start `spec`.
    ///
    /// The old worker is fully stopped before the new one is attempted, so each half emits
    /// its own signal. If `handle` is unknown a single `process_failed` carrying the handle,
    /// the new spec and the not-found error is emitted and nothing is started. If the new
    /// spec fails to start, the old worker stays gone.
    pub async fn restart(
        &self,
        state: &AgentServerState,
        handle: &ProcessHandle,
        spec: ProcessSpec,
    ) -> Result<(AgentServerState, ProcessHandle)> {
        if let Err(error) = self.terminate(state, handle).await {
            if error.is_not_found() {
                warn!(agent_id = %state.agent_id, %handle, "Restart on unknown handle");
                self.emitter
                    .emit(
                        state,
                        LifecycleCategory::Failed,
                        LifecyclePayload::restart_failed(*handle, spec, error.clone()),
                    )
                    .await;
            }
            return Err(error);
        }

        self.start_one(state, spec).await
    }
}
