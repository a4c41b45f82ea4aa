//! Tests for signal dispatch

use super::*;
use crate::config::{DispatchConfig, SinkConfig};
use crate::error::{CoreError, Result};
use crate::signal::Signal;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

struct RecordingHandler {
    received: Mutex<Vec<Signal>>,
}

#[async_trait]
impl SignalHandler for RecordingHandler {
    async fn handle_signal(&self, signal: Signal) -> Result<()> {
        self.received.lock().await.push(signal);
        Ok(())
    }
}

struct SlowHandler;

#[async_trait]
impl SignalHandler for SlowHandler {
    async fn handle_signal(&self, _signal: Signal) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

struct RejectingHandler;

#[async_trait]
impl SignalHandler for RejectingHandler {
    async fn handle_signal(&self, signal: Signal) -> Result<()> {
        Err(CoreError::Handler(format!("rejected {}", signal.signal_type)))
    }
}

fn test_signal() -> Signal {
    Signal::new("test.ping", "agent-1", serde_json::json!({"n": 1}))
}

#[tokio::test]
async fn test_sync_direct_delivers_before_return() {
    let (tx, mut rx) = signal_channel(4);
    let dispatcher = Dispatcher::new(vec![SinkDescriptor::direct_sync(tx)]);

    let signal = test_signal();
    dispatcher.dispatch(&signal).await.unwrap();

    let received = rx.try_recv().unwrap();
    assert_eq!(received, signal);
}

#[tokio::test]
async fn test_async_direct_uses_try_send() {
    let (tx, mut rx) = signal_channel(1);
    let dispatcher = Dispatcher::new(vec![SinkDescriptor::direct_async(tx)]);

    dispatcher.dispatch(&test_signal()).await.unwrap();

    // second signal does not fit the buffer and is rejected without blocking
    let err = dispatcher.dispatch(&test_signal()).await.unwrap_err();
    assert!(matches!(err, CoreError::Dispatch(ref msg) if msg.contains("channel full")));

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_failure_does_not_stop_fan_out() {
    let (closed_tx, closed_rx) = signal_channel(1);
    drop(closed_rx);
    let (tx, mut rx) = signal_channel(4);

    let dispatcher = Dispatcher::new(vec![
        SinkDescriptor::direct_sync(closed_tx),
        SinkDescriptor::Noop,
        SinkDescriptor::direct_sync(tx),
    ]);

    let err = dispatcher.dispatch(&test_signal()).await.unwrap_err();
    assert!(matches!(err, CoreError::Dispatch(ref msg) if msg.contains("direct[0]")));
    assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn test_sync_handler() {
    let handler = Arc::new(RecordingHandler {
        received: Mutex::new(Vec::new()),
    });
    let dispatcher = Dispatcher::builder()
        .sink(SinkDescriptor::handler(handler.clone(), DeliveryMode::Sync))
        .build();

    dispatcher.dispatch(&test_signal()).await.unwrap();
    assert_eq!(handler.received.lock().await.len(), 1);
}

#[tokio::test]
async fn test_sync_handler_error_is_collected() {
    let (tx, mut rx) = signal_channel(4);
    let dispatcher = Dispatcher::builder()
        .sink(SinkDescriptor::handler(Arc::new(RejectingHandler), DeliveryMode::Sync))
        .sink(SinkDescriptor::direct_sync(tx))
        .build();

    let err = dispatcher.dispatch(&test_signal()).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Dispatch(ref msg)
            if msg == "handler[0]: Handler error: rejected test.ping"
    ));
    assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn test_async_handler_error_is_not_returned() {
    let dispatcher = Dispatcher::builder()
        .sink(SinkDescriptor::handler(Arc::new(RejectingHandler), DeliveryMode::Async))
        .build();

    dispatcher.dispatch(&test_signal()).await.unwrap();
}

#[tokio::test]
async fn test_async_handler_runs_in_background() {
    let handler = Arc::new(RecordingHandler {
        received: Mutex::new(Vec::new()),
    });
    let dispatcher = Dispatcher::builder()
        .sink(SinkDescriptor::handler(handler.clone(), DeliveryMode::Async))
        .build();

    dispatcher.dispatch(&test_signal()).await.unwrap();

    for _ in 0..50 {
        if !handler.received.lock().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(handler.received.lock().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sync_handler_timeout() {
    let dispatcher = Dispatcher::builder()
        .sync_timeout(Duration::from_secs(1))
        .sink(SinkDescriptor::handler(Arc::new(SlowHandler), DeliveryMode::Sync))
        .build();

    let err = dispatcher.dispatch(&test_signal()).await.unwrap_err();
    assert!(matches!(err, CoreError::Dispatch(ref msg) if msg.contains("timed out")));
}

#[tokio::test]
async fn test_from_config() {
    let config = DispatchConfig {
        sync_timeout: Duration::from_millis(500),
        channel_capacity: 8,
        sinks: vec![
            SinkConfig::Logger {
                level: LogLevel::Info,
            },
            SinkConfig::Noop,
        ],
    };

    let dispatcher = Dispatcher::from_config(&config);
    assert_eq!(dispatcher.sync_timeout(), Duration::from_millis(500));
    let kinds: Vec<_> = dispatcher.sinks().iter().map(|s| s.kind()).collect();
    assert_eq!(kinds, vec!["logger", "noop"]);

    dispatcher.dispatch(&test_signal()).await.unwrap();
}

#[tokio::test]
async fn test_config_channel_capacity() {
    let config = DispatchConfig {
        channel_capacity: 2,
        ..Default::default()
    };
    let (tx, mut rx) = config.channel();
    let dispatcher = Dispatcher::builder()
        .config(&config)
        .sink(SinkDescriptor::direct_async(tx))
        .build();

    dispatcher.dispatch(&test_signal()).await.unwrap();
    dispatcher.dispatch(&test_signal()).await.unwrap();
    let err = dispatcher.dispatch(&test_signal()).await.unwrap_err();
    assert!(matches!(err, CoreError::Dispatch(ref msg) if msg.contains("channel full")));

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}
