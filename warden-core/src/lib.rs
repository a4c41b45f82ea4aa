//! # Warden Core
//!
//! Building blocks shared by the Warden process-supervision layer:
//! - [`signal::Signal`]: namespaced event envelope
//! - [`dispatch`]: sink descriptors and the [`dispatch::Dispatcher`] that fans signals out to them
//! - [`config`]: figment-backed configuration for supervision and dispatch
//!
//! ```rust,no_run
//! use warden_core::prelude::*;
//!
//! # async fn run() -> Result<()> {
//! let (tx, mut rx) = signal_channel(16);
//! let dispatcher = Dispatcher::builder()
//!     .sink(SinkDescriptor::direct_sync(tx))
//!     .build();
//!
//! dispatcher
//!     .dispatch(&Signal::new("demo.ping", "agent-1", serde_json::json!({})))
//!     .await?;
//! let signal = rx.recv().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod signal;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{DispatchConfig, SinkConfig, SupervisorConfig, WardenConfig};
    pub use crate::dispatch::{
        DeliveryMode, Dispatcher, DispatcherBuilder, LogLevel, SignalHandler, SignalReceiver,
        SignalSender, SinkDescriptor, signal_channel,
    };
    pub use crate::error::{CoreError, Result};
    pub use crate::signal::Signal;
}
