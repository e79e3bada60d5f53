//! Realtime broadcaster
//!
//! Owns the [`ConnectionRegistry`] for the lifetime of the server and is
//! called explicitly by the submission and verification services after
//! their writes commit. Transports (WebSocket, SSE) obtain a
//! [`ClientConnection`] and drain it.

mod registry;

pub use registry::{ClientId, ConnectionRegistry, Delivery, SubscriptionHandle};

use std::sync::Arc;

use pollwatch_common::{RealtimeEvent, Topic};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster giving each client a queue of `client_buffer`
    /// events
    pub fn new(client_buffer: usize) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new(client_buffer)),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Fan `event` out to the topics it belongs to. Never fails; returns
    /// the number of clients it was queued for.
    pub fn publish_event(&self, event: RealtimeEvent) -> usize {
        let topics = event.topics();
        let delivered = self.registry.publish_all(&topics, Arc::new(event));
        debug!("Published event on {:?} to {} clients", topics, delivered);
        delivered
    }

    /// Register a client; it is disconnected when the returned value drops
    pub fn connect(&self) -> ClientConnection {
        let (id, receiver) = self.registry.connect();
        ClientConnection {
            id,
            receiver,
            registry: Arc::clone(&self.registry),
        }
    }

    pub fn client_count(&self) -> usize {
        self.registry.client_count()
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.subscription_count()
    }
}

/// A registered realtime client and its outbound queue
pub struct ClientConnection {
    id: ClientId,
    receiver: mpsc::Receiver<Delivery>,
    registry: Arc<ConnectionRegistry>,
}

impl ClientConnection {
    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn subscribe(&self, topic: Topic) -> Option<SubscriptionHandle> {
        self.registry.subscribe(self.id, topic)
    }

    pub fn unsubscribe(&self, topic: &Topic) -> bool {
        self.registry.unsubscribe_topic(self.id, topic)
    }

    /// Next queued event; `None` once the client has been dropped from the
    /// registry
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        self.registry.disconnect(self.id);
    }
}

/// Wire form of a delivered event
#[derive(Debug, Serialize)]
pub struct EventMessage<'a> {
    #[serde(flatten)]
    pub event: &'a RealtimeEvent,
    pub topic: &'a Topic,
}

impl Delivery {
    pub fn message(&self) -> EventMessage<'_> {
        EventMessage {
            event: &self.event,
            topic: &self.topic,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.message())
    }
}
