//! Subscribe-only Redis connection and its dispatch loop.
//!
//! A single background task per factory owns the pub/sub connection. It
//! subscribes the channels requested by adapters, routes every incoming
//! message through the shared [`HandlerRegistry`], and re-establishes the
//! connection when it drops.
//!
//! ## Reconnection
//!
//! Handlers live in the registry, not in the connection. After a reconnect
//! the loop re-subscribes every channel the registry still knows about, so
//! a reconnect never duplicates or loses handler registrations.
//!
//! ## Graceful Shutdown
//!
//! The loop listens for a shutdown signal at every await point (connecting,
//! waiting between attempts, pumping messages) and exits promptly.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::{PubSub, PubSubSink};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;

use crate::adapters::registry::HandlerRegistry;
use crate::domain::{AdapterError, ConnectionError};
use crate::ports::SubscribeConnection;

use super::options::{unavailable, ConnectionOptions, Endpoint};

/// Delay between two connection attempts of the dispatch loop.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on a single connection attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum Command {
    Subscribe(String),
    Unsubscribe(String),
}

enum LoopExit {
    Shutdown,
    Disconnected(String),
}

/// Shared subscribe connection.
///
/// Subscribe and unsubscribe requests are queued to the dispatch task and
/// never block the caller.
pub struct RedisSubscriber {
    commands: mpsc::UnboundedSender<Command>,
    shutdown: watch::Sender<bool>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl RedisSubscriber {
    /// Spawns the dispatch task on the current Tokio runtime.
    ///
    /// The task connects in the background; nothing here waits on the
    /// network.
    pub fn spawn(options: ConnectionOptions, registry: Arc<HandlerRegistry>) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let dispatch = DispatchLoop {
            endpoint: Endpoint::new(options),
            registry,
            commands: receiver,
            reconnect_delay: RECONNECT_DELAY,
        };
        let task = tokio::spawn(dispatch.run(shutdown_rx));

        Self {
            commands,
            shutdown,
            task: std::sync::Mutex::new(Some(task)),
        }
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.commands.send(command) {
            tracing::debug!(command = ?e.0, "Subscribe connection closed; request ignored");
        }
    }
}

#[async_trait]
impl SubscribeConnection for RedisSubscriber {
    fn subscribe(&self, channel: &str) {
        self.send(Command::Subscribe(channel.to_string()));
    }

    fn unsubscribe(&self, channel: &str) {
        self.send(Command::Unsubscribe(channel.to_string()));
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        if self.shutdown.send_replace(true) {
            return Err(ConnectionError::AlreadyClosed);
        }

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match task {
            Some(task) => task
                .await
                .map_err(|e| ConnectionError::DispatchTask(e.to_string())),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for RedisSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSubscriber")
            .field("closed", &*self.shutdown.borrow())
            .finish_non_exhaustive()
    }
}

struct DispatchLoop {
    endpoint: Endpoint,
    registry: Arc<HandlerRegistry>,
    commands: mpsc::UnboundedReceiver<Command>,
    reconnect_delay: Duration,
}

impl DispatchLoop {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let connected = tokio::select! {
                _ = wait_shutdown(&mut shutdown) => break,
                result = self.connect() => result,
            };

            match connected {
                Ok(pubsub) => match self.pump(pubsub, &mut shutdown).await {
                    LoopExit::Shutdown => break,
                    LoopExit::Disconnected(reason) => {
                        tracing::warn!(%reason, "Subscribe connection lost, reconnecting");
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Subscribe connection unavailable, retrying");
                }
            }

            tokio::select! {
                _ = wait_shutdown(&mut shutdown) => break,
                _ = time::sleep(self.reconnect_delay) => {}
            }
        }

        tracing::debug!("Subscribe dispatch loop stopped");
    }

    async fn connect(&self) -> Result<PubSub, AdapterError> {
        let attempt = async {
            let client = self.endpoint.client().await?;
            client.get_async_pubsub().await
        };
        match time::timeout(CONNECT_TIMEOUT, attempt).await {
            Ok(result) => result.map_err(unavailable),
            Err(_) => Err(AdapterError::unavailable("timed out connecting")),
        }
    }

    async fn pump(&mut self, pubsub: PubSub, shutdown: &mut watch::Receiver<bool>) -> LoopExit {
        let (mut sink, stream) = pubsub.split();
        let mut stream = Box::pin(stream);

        // Requests queued while disconnected are covered by the snapshot below.
        while self.commands.try_recv().is_ok() {}

        let channels = self.registry.channels();
        for channel in &channels {
            if let Err(e) = sink.subscribe(channel).await {
                return LoopExit::Disconnected(e.to_string());
            }
        }
        tracing::info!(channels = channels.len(), "Subscribe connection established");

        loop {
            tokio::select! {
                _ = wait_shutdown(shutdown) => return LoopExit::Shutdown,
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        return LoopExit::Shutdown;
                    };
                    if let Err(e) = apply(&self.registry, &mut sink, command).await {
                        return LoopExit::Disconnected(e.to_string());
                    }
                }
                message = stream.next() => {
                    let Some(message) = message else {
                        return LoopExit::Disconnected("message stream ended".to_string());
                    };
                    self.registry
                        .dispatch(message.get_channel_name(), message.get_payload_bytes())
                        .await;
                }
            }
        }
    }
}

/// Applies a queued request, re-checking the registry so a stale request
/// never undoes a newer one.
async fn apply(
    registry: &HandlerRegistry,
    sink: &mut PubSubSink,
    command: Command,
) -> redis::RedisResult<()> {
    match command {
        Command::Subscribe(channel) if registry.contains(&channel) => {
            sink.subscribe(&channel).await?;
            tracing::debug!(%channel, "Subscribed room channel");
        }
        Command::Unsubscribe(channel) if !registry.contains(&channel) => {
            sink.unsubscribe(&channel).await?;
            tracing::debug!(%channel, "Unsubscribed room channel");
        }
        _ => {}
    }
    Ok(())
}

async fn wait_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}
