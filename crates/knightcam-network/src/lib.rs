//! In-process fan-out of game events to renderers.

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use knightcam_types::{events::SystemEvent, Result};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

#[async_trait]
pub trait RealtimeServer: Send + Sync {
    async fn run(&self) -> Result<()>;
    async fn publish(&self, event: SystemEvent) -> Result<()>;
    fn subscribe(&self) -> BoxStream<'static, SystemEvent>;
}

/// Broadcast channel shared by every renderer. Slow subscribers skip
/// the events they fell behind on; snapshots supersede each other anyway.
#[derive(Clone)]
pub struct LocalServer {
    tx: broadcast::Sender<SystemEvent>,
}

impl LocalServer {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl RealtimeServer for LocalServer {
    async fn run(&self) -> Result<()> {
        debug!("Local event server ready ({} subscribers)", self.subscriber_count());
        Ok(())
    }

    async fn publish(&self, event: SystemEvent) -> Result<()> {
        // No subscribers is not an error: rendering is optional.
        let _ = self.tx.send(event);
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, SystemEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move {
                match event {
                    Ok(event) => Some(event),
                    Err(err) => {
                        warn!("Renderer fell behind: {err}");
                        None
                    }
                }
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knightcam_types::{
        events::{EventPayload, LifecyclePhase},
        round::RoundState,
    };

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let server = LocalServer::new(8);
        let mut stream = server.subscribe();
        assert_eq!(server.subscriber_count(), 1);

        server
            .publish(SystemEvent::lifecycle(LifecyclePhase::Ready, None))
            .await
            .unwrap();
        server
            .publish(SystemEvent::snapshot(RoundState::default().snapshot(0)))
            .await
            .unwrap();

        let first = stream.next().await.expect("first event");
        assert!(matches!(first.payload, EventPayload::Lifecycle(_)));
        let second = stream.next().await.expect("second event");
        assert!(matches!(second.payload, EventPayload::Snapshot(s) if s.lives == 3));
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_ok() {
        let server = LocalServer::new(1);
        server
            .publish(SystemEvent::lifecycle(LifecyclePhase::Boot, None))
            .await
            .expect("publish");
        server.run().await.expect("run");
    }
}
