//! Signal dispatch
//!
//! A [`Dispatcher`] owns an ordered list of [`SinkDescriptor`]s and delivers each signal to
//! all of them. Direct and handler sinks have a [`DeliveryMode`]:
//!
//! - `Sync` waits for the sink to accept the signal, bounded by the dispatch sync timeout
//! - `Async` hands the signal off without waiting (`try_send` for channels, a spawned task
//!   for handlers)
//!
//! Delivery failures are reported to the caller of [`Dispatcher::dispatch`] and never retried.

mod dispatcher;
mod sink;

#[cfg(test)]
mod tests;

pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use sink::{
    DeliveryMode, LogLevel, SignalHandler, SignalReceiver, SignalSender, SinkDescriptor,
    signal_channel,
};
