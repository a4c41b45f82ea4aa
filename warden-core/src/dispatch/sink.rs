//! Sink descriptors

use crate::error::Result;
use crate::signal::Signal;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Sender half of a signal channel
pub type SignalSender = mpsc::Sender<Signal>;

/// Receiver half of a signal channel
pub type SignalReceiver = mpsc::Receiver<Signal>;

/// Creates a new bounded signal channel.
///
/// The sender goes into a [`SinkDescriptor::Direct`]; the receiver is handed to whoever
/// observes the agent.
pub fn signal_channel(buffer_size: usize) -> (SignalSender, SignalReceiver) {
    mpsc::channel(buffer_size)
}

/// Trait for signal handlers
#[async_trait]
pub trait SignalHandler: Send + Sync {
    /// Handle a delivered signal
    async fn handle_signal(&self, signal: Signal) -> Result<()>;
}

/// How a sink receives signals relative to the emitting call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Emitter waits for delivery (bounded by the dispatch sync timeout)
    Sync,
    /// Emitter hands the signal off and returns immediately
    #[default]
    Async,
}

/// Level used by the logger sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// A destination for signals
#[derive(Clone)]
pub enum SinkDescriptor {
    /// Deliver into a signal channel
    Direct {
        sender: SignalSender,
        mode: DeliveryMode,
    },
    /// Deliver to a handler
    Handler {
        handler: Arc<dyn SignalHandler>,
        mode: DeliveryMode,
    },
    /// Log the signal
    Logger { level: LogLevel },
    /// Drop the signal
    Noop,
}

impl SinkDescriptor {
    /// Direct sink with synchronous delivery
    pub fn direct_sync(sender: SignalSender) -> Self {
        SinkDescriptor::Direct {
            sender,
            mode: DeliveryMode::Sync,
        }
    }

    /// Direct sink with asynchronous delivery
    pub fn direct_async(sender: SignalSender) -> Self {
        SinkDescriptor::Direct {
            sender,
            mode: DeliveryMode::Async,
        }
    }

    /// Handler sink
    pub fn handler(handler: Arc<dyn SignalHandler>, mode: DeliveryMode) -> Self {
        SinkDescriptor::Handler { handler, mode }
    }

    /// Sink kind name
    pub fn kind(&self) -> &'static str {
        match self {
            SinkDescriptor::Direct { .. } => "direct",
            SinkDescriptor::Handler { .. } => "handler",
            SinkDescriptor::Logger { .. } => "logger",
            SinkDescriptor::Noop => "noop",
        }
    }

    /// Delivery mode; logger and noop sinks are always synchronous
    pub fn mode(&self) -> DeliveryMode {
        match self {
            SinkDescriptor::Direct { mode, .. } | SinkDescriptor::Handler { mode, .. } => *mode,
            SinkDescriptor::Logger { .. } | SinkDescriptor::Noop => DeliveryMode::Sync,
        }
    }
}

impl fmt::Debug for SinkDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkDescriptor::Logger { level } => f
                .debug_struct("Logger")
                .field("level", level)
                .finish(),
            other => f
                .debug_struct("SinkDescriptor")
                .field("kind", &other.kind())
                .field("mode", &other.mode())
                .finish(),
        }
    }
}
