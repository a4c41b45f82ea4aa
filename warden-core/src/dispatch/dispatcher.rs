//! Fan-out of signals to a list of sinks

use super::sink::{DeliveryMode, LogLevel, SinkDescriptor};
use crate::config::{DispatchConfig, SinkConfig};
use crate::error::{CoreError, Result};
use crate::signal::Signal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Delivers signals to every configured sink, in order.
///
/// Cloning a dispatcher is cheap; clones share the sink list.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sinks: Arc<Vec<SinkDescriptor>>,
    sync_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher over the given sinks with the default sync timeout
    pub fn new(sinks: Vec<SinkDescriptor>) -> Self {
        Self {
            sinks: Arc::new(sinks),
            sync_timeout: DispatchConfig::default().sync_timeout,
        }
    }

    /// Create a dispatcher that drops everything
    pub fn noop() -> Self {
        Self::new(vec![SinkDescriptor::Noop])
    }

    /// Create a dispatcher from configuration
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Start building a dispatcher
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Configured sinks
    pub fn sinks(&self) -> &[SinkDescriptor] {
        &self.sinks
    }

    /// Upper bound on synchronous deliveries
    pub fn sync_timeout(&self) -> Duration {
        self.sync_timeout
    }

    /// Deliver a signal to every sink.
    ///
    /// Every sink is attempted even if an earlier one fails. Failures are collected into a
    /// single [`CoreError::Dispatch`].
    pub async fn dispatch(&self, signal: &Signal) -> Result<()> {
        debug!(
            signal_type = %signal.signal_type,
            sinks = self.sinks.len(),
            "Dispatching signal"
        );

        let mut failures = Vec::new();
        for (index, sink) in self.sinks.iter().enumerate() {
            if let Err(e) = self.deliver(sink, signal.clone()).await {
                failures.push(format!("{}[{}]: {}", sink.kind(), index, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Dispatch(failures.join("; ")))
        }
    }

    async fn deliver(&self, sink: &SinkDescriptor, signal: Signal) -> Result<()> {
        match sink {
            SinkDescriptor::Direct {
                sender,
                mode: DeliveryMode::Sync,
            } => match timeout(self.sync_timeout, sender.send(signal)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err(CoreError::Dispatch("channel closed".to_string())),
                Err(_) => Err(CoreError::Dispatch(format!(
                    "delivery timed out after {:?}",
                    self.sync_timeout
                ))),
            },
            SinkDescriptor::Direct {
                sender,
                mode: DeliveryMode::Async,
            } => sender.try_send(signal).map_err(|e| match e {
                TrySendError::Full(_) => CoreError::Dispatch("channel full".to_string()),
                TrySendError::Closed(_) => CoreError::Dispatch("channel closed".to_string()),
            }),
            SinkDescriptor::Handler {
                handler,
                mode: DeliveryMode::Sync,
            } => match timeout(self.sync_timeout, handler.handle_signal(signal)).await {
                Ok(result) => result,
                Err(_) => Err(CoreError::Dispatch(format!(
                    "handler timed out after {:?}",
                    self.sync_timeout
                ))),
            },
            SinkDescriptor::Handler {
                handler,
                mode: DeliveryMode::Async,
            } => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let signal_type = signal.signal_type.clone();
                    if let Err(e) = handler.handle_signal(signal).await {
                        warn!(signal_type = %signal_type, error = %e, "Signal handler failed");
                    }
                });
                Ok(())
            }
            SinkDescriptor::Logger { level } => {
                log_signal(*level, &signal);
                Ok(())
            }
            SinkDescriptor::Noop => Ok(()),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

fn log_signal(level: LogLevel, signal: &Signal) {
    let id = signal.id;
    let signal_type = signal.signal_type.as_str();
    let source = signal.source.as_str();
    let data = &signal.data;
    match level {
        LogLevel::Trace => tracing::trace!(%id, signal_type, source, %data, "Signal"),
        LogLevel::Debug => tracing::debug!(%id, signal_type, source, %data, "Signal"),
        LogLevel::Info => tracing::info!(%id, signal_type, source, %data, "Signal"),
        LogLevel::Warn => tracing::warn!(%id, signal_type, source, %data, "Signal"),
        LogLevel::Error => tracing::error!(%id, signal_type, source, %data, "Signal"),
    }
}

/// Builder for [`Dispatcher`]
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    sinks: Vec<SinkDescriptor>,
    sync_timeout: Option<Duration>,
}

impl DispatcherBuilder {
    /// Add a sink
    pub fn sink(mut self, sink: SinkDescriptor) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Add the configured sinks and take the configured sync timeout
    pub fn config(mut self, config: &DispatchConfig) -> Self {
        self.sync_timeout = Some(config.sync_timeout);
        self.sinks.extend(config.sinks.iter().map(|sink| match sink {
            SinkConfig::Logger { level } => SinkDescriptor::Logger { level: *level },
            SinkConfig::Noop => SinkDescriptor::Noop,
        }));
        self
    }

    /// Override the sync timeout
    pub fn sync_timeout(mut self, sync_timeout: Duration) -> Self {
        self.sync_timeout = Some(sync_timeout);
        self
    }

    /// Build the dispatcher
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            sinks: Arc::new(self.sinks),
            sync_timeout: self
                .sync_timeout
                .unwrap_or_else(|| DispatchConfig::default().sync_timeout),
        }
    }
}
