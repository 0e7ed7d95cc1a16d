use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

use crate::{
    channel::{EventChannel, Handler},
    error::ChannelError,
};

/// Intent captured by a [`LocalChannel`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    /// Intent name.
    pub event: String,
    /// Intent payload.
    pub payload: Value,
}

/// In-process channel: inbound events are pushed with [`LocalChannel::deliver`],
/// emitted intents come out of the receiver returned by [`LocalChannel::new`].
///
/// Several handlers may be registered for one event, like a socket.io client;
/// a leaked registration therefore shows up as a duplicate call.
pub struct LocalChannel {
    handlers: DashMap<String, Vec<(Uuid, Handler)>>,
    outbound: mpsc::UnboundedSender<EmittedEvent>,
}

impl LocalChannel {
    /// Create the channel and the receiver of everything it emits.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<EmittedEvent>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let channel = Arc::new(Self {
            handlers: DashMap::new(),
            outbound,
        });
        (channel, rx)
    }

    /// Invoke every handler registered for `event`. Returns how many ran.
    pub fn deliver(&self, event: &str, payload: Value) -> usize {
        let handlers: Vec<Handler> = match self.handlers.get(event) {
            Some(entry) => entry.value().iter().map(|(_, handler)| handler.clone()).collect(),
            None => {
                trace!(event, "no handler registered");
                return 0;
            }
        };

        for handler in &handlers {
            handler(payload.clone());
        }
        handlers.len()
    }

    /// Number of handlers registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers
            .get(event)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Number of handlers registered across all events.
    pub fn total_handlers(&self) -> usize {
        self.handlers.iter().map(|entry| entry.value().len()).sum()
    }
}

impl EventChannel for LocalChannel {
    fn on(&self, event: &str, id: Uuid, handler: Handler) {
        self.handlers
            .entry(event.to_owned())
            .or_default()
            .push((id, handler));
    }

    fn off(&self, event: &str, id: Uuid) {
        self.handlers
            .remove_if_mut(event, |_, registered| {
                registered.retain(|(registered_id, _)| *registered_id != id);
                registered.is_empty()
            });
    }

    fn emit(&self, event: &str, payload: Value) -> Result<(), ChannelError> {
        self.outbound
            .send(EmittedEvent {
                event: event.to_owned(),
                payload,
            })
            .map_err(|_| ChannelError::Closed)
    }
}
