//! roomcast-relay - joins one room and relays stdin to it.
//!
//! Every line read from stdin is broadcast to the room; every message
//! received on the room is printed to stdout. Running two relays against the
//! same Redis shows cross-instance delivery.
//!
//! ```text
//! ROOMCAST__STORE__TYPE=redis roomcast-relay lobby
//! ```

use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

use roomcast::adapters::AdapterFactory;
use roomcast::config::BackplaneConfig;
use roomcast::domain::{RoomId, RoomMessage};
use roomcast::ports::handler_fn;
use roomcast::telemetry;

const DEFAULT_ROOM: &str = "lobby";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BackplaneConfig::load()?;
    config.validate()?;
    telemetry::init_tracing(&config.logging)?;

    let room = std::env::args()
        .nth(1)
        .map(RoomId::new)
        .unwrap_or_else(|| RoomId::new(DEFAULT_ROOM));

    let factory = AdapterFactory::new(&config.store);
    tracing::info!(room = %room, backend = %factory.describe(), "Relay starting");

    let adapter = factory.new_adapter(room.clone());
    adapter.subscribe(handler_fn("stdout", |message| {
        println!("[{}] {}", message.event, message.payload);
        Ok(())
    }));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    let message = RoomMessage::new("message", json!({ "text": line }));
                    if let Err(e) = adapter.broadcast(message).await {
                        tracing::warn!(error = %e, "Broadcast failed");
                    }
                }
                None => break,
            },
        }
    }

    adapter.close();
    factory.close().await?;
    tracing::info!(room = %room, "Relay stopped");
    Ok(())
}
