//! Actor events and the event source contract

use crate::errors::{SessionError, SessionResult};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of the player (or anyone else) who produced an event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The message/surface a session's controls are rendered on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub String);

impl SurfaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EventKind {
    /// A button press
    Press,
    /// A selection from a list control
    Select { values: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorEvent {
    pub actor: ActorId,
    pub surface: SurfaceId,
    /// Opaque action id of the control that produced the event
    pub action_id: String,
    pub kind: EventKind,
}

impl ActorEvent {
    pub fn press(actor: ActorId, surface: SurfaceId, action_id: impl Into<String>) -> Self {
        Self {
            actor,
            surface,
            action_id: action_id.into(),
            kind: EventKind::Press,
        }
    }

    pub fn select(
        actor: ActorId,
        surface: SurfaceId,
        action_id: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        Self {
            actor,
            surface,
            action_id: action_id.into(),
            kind: EventKind::Select { values },
        }
    }

    /// First selected value of a select event
    pub fn selected(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Select { values } => values.first().map(String::as_str),
            EventKind::Press => None,
        }
    }
}

pub type SubscriptionId = Uuid;

/// A live stream of events for one surface
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    events: mpsc::UnboundedReceiver<ActorEvent>,
}

impl Subscription {
    pub fn new(id: SubscriptionId, events: mpsc::UnboundedReceiver<ActorEvent>) -> Self {
        Self { id, events }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<ActorEvent> {
        self.events.recv().await
    }

    /// Stop accepting deliveries; anything still buffered is discarded
    pub fn close(&mut self) {
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }
}

/// Delivers actor events scoped to a surface.
///
/// After `unsubscribe` returns no further event may be delivered to that
/// subscription.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn subscribe(&self, surface: &SurfaceId) -> SessionResult<Subscription>;

    async fn unsubscribe(&self, subscription: SubscriptionId);
}

/// In-memory event source: the gateway side publishes, sessions subscribe
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: DashMap<SurfaceId, Vec<(SubscriptionId, mpsc::UnboundedSender<ActorEvent>)>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every subscription on its surface; returns the
    /// number of subscriptions reached
    pub fn publish(&self, event: ActorEvent) -> usize {
        let Some(mut senders) = self.subscribers.get_mut(&event.surface) else {
            tracing::trace!("No subscribers on surface {}", event.surface);
            return 0;
        };

        senders.retain(|(_, sender)| !sender.is_closed());
        senders
            .iter()
            .filter(|(_, sender)| sender.send(event.clone()).is_ok())
            .count()
    }

    pub fn subscriber_count(&self, surface: &SurfaceId) -> usize {
        self.subscribers
            .get(surface)
            .map(|senders| senders.iter().filter(|(_, s)| !s.is_closed()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventSource for EventHub {
    async fn subscribe(&self, surface: &SurfaceId) -> SessionResult<Subscription> {
        if surface.0.is_empty() {
            return Err(SessionError::Subscribe {
                surface: surface.to_string(),
                reason: "empty surface id".to_string(),
            });
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.subscribers
            .entry(surface.clone())
            .or_default()
            .push((id, sender));

        tracing::debug!("Subscription {} opened on surface {}", id, surface);
        Ok(Subscription::new(id, receiver))
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) {
        self.subscribers.retain(|_, senders| {
            senders.retain(|(id, _)| *id != subscription);
            !senders.is_empty()
        });
        tracing::debug!("Subscription {} closed", subscription);
    }
}
