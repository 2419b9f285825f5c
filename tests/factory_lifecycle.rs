//! Integration tests for factory construction and shutdown.
//!
//! These tests verify:
//! 1. Backend selection from store configuration
//! 2. Aggregated close errors
//! 3. Close racing in-flight broadcasts
//! 4. The construction log line
//!
//! No Redis server is required: connections are created lazily and the
//! race test targets an unroutable address.

use serde_json::json;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use roomcast::adapters::{AdapterFactory, BackendKind, LoopbackBroker};
use roomcast::config::{StoreConfig, StoreType};
use roomcast::domain::{ConnectionError, ConnectionRole, RoomMessage};

// =============================================================================
// Test Infrastructure
// =============================================================================

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.contents())
}

// =============================================================================
// Backend Selection
// =============================================================================

#[tokio::test]
async fn memory_config_uses_no_connections() {
    let factory = AdapterFactory::new(&StoreConfig::memory());

    assert_eq!(factory.backend_kind(), BackendKind::Memory);
    assert_eq!(factory.connection_count(), 0);
    assert!(factory.close().await.is_ok());
}

#[tokio::test]
async fn sentinel_config_names_room_channel() {
    let factory = AdapterFactory::new(&StoreConfig::sentinel(
        ["10.0.0.1:26379"],
        "mymaster",
        "sio",
    ));
    let construct = factory.room_constructor();

    let lobby = construct("lobby".into());

    assert_eq!(factory.backend_kind(), BackendKind::RedisSentinel);
    assert_eq!(lobby.channel(), Some("sio#lobby"));
    lobby.close();
    factory.close().await.unwrap();
}

#[test]
fn unrecognized_config_logs_fallback() {
    let config = StoreConfig {
        store_type: StoreType::Unrecognized,
        ..Default::default()
    };

    let (factory, logs) = capture(|| AdapterFactory::new(&config));

    assert_eq!(factory.backend_kind(), BackendKind::Memory);
    assert!(logs.contains("WARN"));
    assert!(logs.contains("falling back to in-memory"));
}

#[tokio::test]
async fn construction_logs_backend_and_address() {
    let config = StoreConfig::redis("localhost", 6379, 0, "sio");

    let (factory, logs) = capture(|| AdapterFactory::new(&config));

    assert!(logs.contains("INFO"));
    assert!(logs.contains("backend=redis"));
    assert!(logs.contains("host=localhost"));
    assert!(logs.contains("prefix=sio"));
    factory.close().await.unwrap();
}

// =============================================================================
// Close
// =============================================================================

#[tokio::test]
async fn redis_close_twice_references_both_connections() {
    let factory = AdapterFactory::new(&StoreConfig::redis("localhost", 6379, 0, "sio"));
    factory.close().await.unwrap();

    let err = factory.close().await.unwrap_err();

    assert_eq!(err.failures().len(), 2);
    assert!(err
        .failures()
        .iter()
        .all(|f| f.error == ConnectionError::AlreadyClosed));
    let text = err.to_string();
    assert!(text.contains("publish connection"));
    assert!(text.contains("subscribe connection"));
}

#[tokio::test]
async fn failing_closes_are_aggregated() {
    let broker = LoopbackBroker::new();
    let factory =
        AdapterFactory::with_connections(BackendKind::Redis, "sio", Arc::new(broker.connect()));
    broker.fail_closes(true);

    let err = factory.close().await.unwrap_err();
    let roles: Vec<ConnectionRole> = err.failures().iter().map(|f| f.role).collect();

    assert_eq!(roles, vec![ConnectionRole::Publish, ConnectionRole::Subscribe]);
}

#[tokio::test]
async fn close_during_broadcast_fails_cleanly() {
    // Reserved TEST-NET address: the publish never completes on its own.
    let factory = Arc::new(AdapterFactory::new(&StoreConfig::redis(
        "192.0.2.1",
        6379,
        0,
        "sio",
    )));
    let lobby = factory.new_adapter("lobby".into());

    let in_flight = tokio::spawn(async move {
        lobby
            .broadcast(RoomMessage::new("signal", json!(null)))
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    tokio::time::timeout(Duration::from_secs(2), factory.close())
        .await
        .expect("close should not hang")
        .unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), in_flight)
        .await
        .expect("broadcast should not hang")
        .unwrap();

    assert!(result.unwrap_err().is_unavailable());
}
