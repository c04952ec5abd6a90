use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use serde::Serialize;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::{CoupleId, ItemId};

/// Pub/sub channel a change event is published on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    Corner(CoupleId),
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Corner(couple_id) => write!(f, "corner:{}", couple_id),
        }
    }
}

/// A change to a couple's corner, announced after the write commits
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CornerEvent {
    ItemPlaced {
        couple_id: CoupleId,
        item_id: ItemId,
    },
    ItemUpdated {
        couple_id: CoupleId,
        item_id: ItemId,
        operation: &'static str,
    },
    ItemRemoved {
        couple_id: CoupleId,
        item_id: ItemId,
    },
    ColorsChanged {
        couple_id: CoupleId,
    },
}

impl CornerEvent {
    pub fn couple_id(&self) -> CoupleId {
        match self {
            CornerEvent::ItemPlaced { couple_id, .. }
            | CornerEvent::ItemUpdated { couple_id, .. }
            | CornerEvent::ItemRemoved { couple_id, .. }
            | CornerEvent::ColorsChanged { couple_id } => *couple_id,
        }
    }

    pub fn channel(&self) -> Channel {
        Channel::Corner(self.couple_id())
    }
}

/// Creates a Redis client for change notifications
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Fire-and-forget sender of [`CornerEvent`]s.
///
/// Publishing never blocks a request and never fails it. A disabled notifier
/// only logs.
#[derive(Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<CornerEvent>>,
}

impl Notifier {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// A notifier together with the receiving end of its queue
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CornerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn publish(&self, event: CornerEvent) {
        tracing::debug!(channel = %event.channel(), ?event, "Corner changed");

        if let Some(tx) = &self.tx {
            if let Err(e) = tx.send(event) {
                tracing::error!(error = %e, "Failed to queue corner event");
            }
        }
    }
}

/// Handle for stopping the publisher task once queued events are flushed
pub struct PublisherHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl PublisherHandle {
    /// Signals the publisher and waits until it has drained its queue
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Event publisher shutdown signal sent");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Event publisher task failed");
        }
    }
}

/// Spawns the background task that forwards queued events to Redis `PUBLISH`
pub fn spawn_redis_publisher(
    client: Client,
    events_rx: mpsc::UnboundedReceiver<CornerEvent>,
) -> PublisherHandle {
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let task = tokio::spawn(publisher_task(client, events_rx, shutdown_rx));
    PublisherHandle { shutdown_tx, task }
}

async fn publisher_task(
    client: Client,
    mut events_rx: mpsc::UnboundedReceiver<CornerEvent>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    tracing::info!("Event publisher task started");
    let mut conn: Option<ConnectionManager> = None;

    loop {
        tokio::select! {
            Some(event) = events_rx.recv() => {
                if let Err(e) = publish_to_redis(&client, &mut conn, &event).await {
                    tracing::error!(error = %e, channel = %event.channel(), "Failed to publish corner event");
                }
            }
            _ = shutdown_rx.recv() => {
                events_rx.close();
                tracing::info!("Event publisher shutting down, flushing remaining events");

                while let Some(event) = events_rx.recv().await {
                    if let Err(e) = publish_to_redis(&client, &mut conn, &event).await {
                        tracing::error!(error = %e, "Failed to flush corner event during shutdown");
                    }
                }

                tracing::info!("Event publisher task stopped");
                break;
            }
            else => break,
        }
    }
}

/// Publishes one event, connecting lazily so a Redis outage at startup is not fatal
async fn publish_to_redis(
    client: &Client,
    conn: &mut Option<ConnectionManager>,
    event: &CornerEvent,
) -> AppResult<()> {
    let payload = serde_json::to_string(event)
        .map_err(|e| AppError::Internal(format!("Event serialization error: {}", e)))?;

    let manager = match conn.take() {
        Some(manager) => manager,
        None => ConnectionManager::new(client.clone()).await?,
    };
    let manager = conn.insert(manager);

    let receivers: i64 = manager.publish(event.channel().to_string(), payload).await?;
    tracing::debug!(channel = %event.channel(), receivers, "Corner event published");
    Ok(())
}
