//! Push-event transport seam between the authority and the stage machine.
//!
//! The transport itself is owned by the connection layer. The core only sees
//! named events with JSON payloads, registers handlers through [`Subscription`]
//! handles, and drops outbound intents when no channel is attached.

mod local;

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{dto::outbound::Intent, error::ChannelError};

pub use self::local::{EmittedEvent, LocalChannel};

/// Callback invoked with the payload of an inbound event.
pub type Handler = Arc<dyn Fn(Value) + Send + Sync>;

/// Bidirectional named-event transport.
///
/// Several handlers may share one event name; each registration is keyed by
/// the id it was added with, and `off` removes only that registration.
pub trait EventChannel: Send + Sync {
    /// Register `handler` for `event` under `id`.
    fn on(&self, event: &str, id: Uuid, handler: Handler);
    /// Remove the handler registered for `event` under `id`.
    fn off(&self, event: &str, id: Uuid);
    /// Send `payload` under the name `event`.
    fn emit(&self, event: &str, payload: Value) -> Result<(), ChannelError>;
}

/// Handler registration that is removed from its channel when disposed or dropped.
pub struct Subscription {
    id: Uuid,
    event: &'static str,
    channel: Option<Arc<dyn EventChannel>>,
}

impl Subscription {
    /// Register `handler` on `channel` and keep the handle that undoes it.
    pub fn register(channel: Arc<dyn EventChannel>, event: &'static str, handler: Handler) -> Self {
        let id = Uuid::new_v4();
        channel.on(event, id, handler);
        Self {
            id,
            event,
            channel: Some(channel),
        }
    }

    /// Remove the handler from the channel.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.off(self.event, self.id);
            debug!(id = %self.id, event = self.event, "subscription disposed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Every subscription created by one session.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionRegistry {
    /// Register `handler` for `event` and track the resulting subscription.
    pub fn subscribe(&mut self, channel: &Arc<dyn EventChannel>, event: &'static str, handler: Handler) {
        self.subscriptions
            .push(Subscription::register(channel.clone(), event, handler));
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether no subscription is live.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Dispose every subscription, returning how many were removed.
    pub fn dispose_all(&mut self) -> usize {
        let count = self.subscriptions.len();
        self.subscriptions.drain(..).for_each(Subscription::dispose);
        count
    }
}

/// Outbound side of the current channel, if one is attached.
#[derive(Clone, Default)]
pub struct Outbound {
    channel: Option<Arc<dyn EventChannel>>,
}

impl Outbound {
    /// Wrap an optional live channel.
    pub fn new(channel: Option<Arc<dyn EventChannel>>) -> Self {
        Self { channel }
    }

    /// Swap the live channel.
    pub fn replace(&mut self, channel: Option<Arc<dyn EventChannel>>) {
        self.channel = channel;
    }

    /// Encode and emit `intent`.
    pub fn send(&self, intent: &Intent) -> Result<(), ChannelError> {
        let channel = self
            .channel
            .as_ref()
            .ok_or(ChannelError::ChannelUnavailable)?;
        channel.emit(intent.name(), intent.payload()?)
    }
}
