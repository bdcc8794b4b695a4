//! Event bus implementation

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::event::{Topic, TransportEvent};

/// Listener callback; identity is the `Arc` allocation
pub type Listener = Arc<dyn Fn(&TransportEvent) + Send + Sync>;

/// Wrap a closure as a [`Listener`]
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&TransportEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Synchronous, ordered, multi-listener event bus
#[derive(Default)]
pub struct EventBus {
    topics: Mutex<HashMap<Topic, Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener to a topic
    pub fn subscribe(&self, topic: Topic, listener: Listener) {
        tracing::trace!(topic = %topic, "Listener subscribed");
        self.topics.lock().entry(topic).or_default().push(listener);
    }

    /// Remove the first registration of `listener` on `topic`
    ///
    /// Returns false if it was not registered.
    pub fn unsubscribe(&self, topic: &Topic, listener: &Listener) -> bool {
        let mut topics = self.topics.lock();

        let Some(listeners) = topics.get_mut(topic) else {
            return false;
        };
        let Some(pos) = listeners.iter().position(|l| Arc::ptr_eq(l, listener)) else {
            return false;
        };

        listeners.remove(pos);
        if listeners.is_empty() {
            topics.remove(topic);
        }

        tracing::trace!(topic = %topic, "Listener unsubscribed");
        true
    }

    /// Deliver an event to every listener of its topic, in order
    ///
    /// Returns the number of listeners called.
    pub fn publish(&self, event: &TransportEvent) -> usize {
        let topic = event.topic();

        // Snapshot so listeners can re-enter the bus
        let listeners: Vec<Listener> = match self.topics.lock().get(&topic) {
            Some(listeners) => listeners.clone(),
            None => return 0,
        };

        for listener in &listeners {
            listener(event);
        }

        listeners.len()
    }

    /// Number of listeners currently registered on a topic
    pub fn listener_count(&self, topic: &Topic) -> usize {
        self.topics.lock().get(topic).map_or(0, Vec::len)
    }
}
