//! Connection registry
//!
//! Tracks every realtime client (WebSocket or SSE), the topics it is
//! subscribed to, and the bounded queue its transport task drains.
//! Delivery is best-effort: a full or closed queue drops the event for that
//! client only, and closed clients are pruned on the spot.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pollwatch_common::{RealtimeEvent, Topic};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Identity of one realtime connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Returned by [`ConnectionRegistry::subscribe`]; pass back to unsubscribe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    client: ClientId,
    id: u64,
    topic: Topic,
}

impl SubscriptionHandle {
    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

/// One event queued for one client, tagged with the topic it matched
#[derive(Debug, Clone)]
pub struct Delivery {
    pub topic: Topic,
    pub event: Arc<RealtimeEvent>,
}

struct ClientEntry {
    sender: mpsc::Sender<Delivery>,
    subscriptions: Vec<(u64, Topic)>,
}

impl ClientEntry {
    /// First of `topics` this client follows, falling back to `global`
    fn matching_topic(&self, topics: &[Topic]) -> Option<Topic> {
        let follows = |topic: &Topic| self.subscriptions.iter().any(|(_, t)| t == topic);

        topics
            .iter()
            .find(|topic| follows(topic))
            .cloned()
            .or_else(|| follows(&Topic::Global).then_some(Topic::Global))
    }
}

pub struct ConnectionRegistry {
    clients: Mutex<HashMap<ClientId, ClientEntry>>,
    next_subscription: AtomicU64,
    buffer: usize,
}

impl ConnectionRegistry {
    /// Create a registry whose clients each get a queue of `buffer` events
    pub fn new(buffer: usize) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    // Publishing never panics while holding the lock, so a poisoned map is
    // still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<ClientId, ClientEntry>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new client with no subscriptions
    pub fn connect(&self) -> (ClientId, mpsc::Receiver<Delivery>) {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = ClientId::new();

        self.lock().insert(
            id,
            ClientEntry {
                sender,
                subscriptions: Vec::new(),
            },
        );
        debug!("Realtime client {} connected", id);

        (id, receiver)
    }

    /// Subscribe `client` to `topic`
    ///
    /// Subscribing twice to the same topic returns the existing handle.
    /// Returns `None` when the client is not (or no longer) registered.
    pub fn subscribe(&self, client: ClientId, topic: Topic) -> Option<SubscriptionHandle> {
        let mut clients = self.lock();
        let entry = clients.get_mut(&client)?;

        if let Some((id, _)) = entry.subscriptions.iter().find(|(_, t)| *t == topic) {
            return Some(SubscriptionHandle {
                client,
                id: *id,
                topic,
            });
        }

        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        entry.subscriptions.push((id, topic.clone()));
        debug!("Client {} subscribed to {}", client, topic);

        Some(SubscriptionHandle { client, id, topic })
    }

    /// Remove one subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let mut clients = self.lock();
        let Some(entry) = clients.get_mut(&handle.client) else {
            return false;
        };

        let before = entry.subscriptions.len();
        entry.subscriptions.retain(|(id, _)| *id != handle.id);
        before != entry.subscriptions.len()
    }

    /// Remove `client`'s subscription to `topic`, if any
    pub fn unsubscribe_topic(&self, client: ClientId, topic: &Topic) -> bool {
        let mut clients = self.lock();
        let Some(entry) = clients.get_mut(&client) else {
            return false;
        };

        let before = entry.subscriptions.len();
        entry.subscriptions.retain(|(_, t)| t != topic);
        before != entry.subscriptions.len()
    }

    /// Drop a client and every subscription it holds
    pub fn disconnect(&self, client: ClientId) -> bool {
        let removed = self.lock().remove(&client).is_some();
        if removed {
            debug!("Realtime client {} disconnected", client);
        }
        removed
    }

    /// Publish to one topic; see [`publish_all`](Self::publish_all)
    pub fn publish(&self, topic: &Topic, event: Arc<RealtimeEvent>) -> usize {
        self.publish_all(std::slice::from_ref(topic), event)
    }

    /// Queue `event` for every client subscribed to any of `topics` or to
    /// `global`, once per client. Returns the number of clients it was
    /// queued for.
    pub fn publish_all(&self, topics: &[Topic], event: Arc<RealtimeEvent>) -> usize {
        let mut clients = self.lock();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, entry) in clients.iter() {
            let Some(topic) = entry.matching_topic(topics) else {
                continue;
            };

            let delivery = Delivery {
                topic,
                event: Arc::clone(&event),
            };

            match entry.sender.try_send(delivery) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Client {} queue full, dropping {:?} event", id, event.event_type);
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            clients.remove(&id);
            debug!("Pruned closed realtime client {}", id);
        }

        delivered
    }

    /// Number of connected clients
    pub fn client_count(&self) -> usize {
        self.lock().len()
    }

    /// Number of subscriptions across all clients
    pub fn subscription_count(&self) -> usize {
        self.lock().values().map(|c| c.subscriptions.len()).sum()
    }

    /// Topics `client` currently follows
    pub fn topics_of(&self, client: ClientId) -> Vec<Topic> {
        self.lock()
            .get(&client)
            .map(|c| c.subscriptions.iter().map(|(_, t)| t.clone()).collect())
            .unwrap_or_default()
    }
}
