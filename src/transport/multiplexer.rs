//! Transport multiplexer implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::bus::{EventBus, Listener, Topic, TransportEvent};
use crate::config::ShareConfig;
use crate::naming::StreamName;

use super::connector::{Connector, SocketChannel};
use super::protocol::{ControlMessage, InboundMessage, MimeMessage};
use super::record::{TransportRecord, TransportState};

/// Owns zero or one socket per stream name
///
/// A record lives while it has subscribers. Cancelling the last
/// [`Subscription`] removes the record and closes its socket, so the next
/// subscriber opens a fresh one.
///
/// Must be held in an `Arc`: socket tasks keep a weak reference back to it
/// and stop once it is dropped.
pub struct TransportMultiplexer {
    /// Open (or opening) sockets keyed by stream name
    records: Mutex<HashMap<StreamName, TransportRecord>>,

    /// Generation handed to each new record
    next_id: AtomicU64,

    bus: Arc<EventBus>,
    connector: Arc<dyn Connector>,
    config: ShareConfig,
}

impl TransportMultiplexer {
    pub fn new(config: ShareConfig, bus: Arc<EventBus>, connector: Arc<dyn Connector>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            bus,
            connector,
            config,
        }
    }

    /// Event bus the multiplexer publishes on
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Register `listener` for both topics of `name` and make sure the socket is open
    ///
    /// Listeners are registered before the socket is touched, so a cached
    /// mime is delivered to this listener before `subscribe` returns.
    pub fn subscribe(self: &Arc<Self>, name: &StreamName, listener: Listener) -> Subscription {
        self.bus
            .subscribe(Topic::Mime(name.clone()), Arc::clone(&listener));
        self.bus
            .subscribe(Topic::Data(name.clone()), Arc::clone(&listener));

        self.open(name, true);

        Subscription {
            mux: Arc::downgrade(self),
            bus: Arc::downgrade(&self.bus),
            stream: name.clone(),
            listener: Some(listener),
        }
    }

    /// Open the socket for `name` unless one already exists
    ///
    /// If the socket exists and its mime is resolved, the mime is published
    /// again right away so late joiners do not wait for a new negotiation.
    /// A record opened this way without any subscriber stays until a
    /// subscriber comes and goes. Requires a tokio runtime.
    pub fn ensure_open(self: &Arc<Self>, name: &StreamName) {
        self.open(name, false);
    }

    fn open(self: &Arc<Self>, name: &StreamName, subscriber: bool) {
        let cached = {
            let mut records = self.records.lock();

            match records.get_mut(name) {
                Some(record) => {
                    if subscriber {
                        record.subscribers += 1;
                    }
                    record.mime.clone()
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let mut record = TransportRecord::new(id);
                    if subscriber {
                        record.subscribers = 1;
                    }
                    record.task = Some(tokio::spawn(run_socket(
                        Arc::downgrade(self),
                        name.clone(),
                        id,
                    )));
                    records.insert(name.clone(), record);

                    tracing::info!(stream = %name, "Opening stream socket");
                    return;
                }
            }
        };

        if let Some(mime) = cached {
            tracing::debug!(stream = %name, mime = %mime, "Replaying cached mime");
            self.bus.publish(&TransportEvent::MimeResolved {
                stream: name.clone(),
                mime,
            });
        }
    }

    /// Drop one subscriber; the last one removes the record
    fn detach(&self, name: &StreamName, listener: &Listener) {
        self.bus.unsubscribe(&Topic::Mime(name.clone()), listener);
        self.bus.unsubscribe(&Topic::Data(name.clone()), listener);

        let removed = {
            let mut records = self.records.lock();
            let Some(record) = records.get_mut(name) else {
                return;
            };

            record.subscribers = record.subscribers.saturating_sub(1);
            if record.subscribers > 0 {
                return;
            }
            records.remove(name)
        };

        // Dropped outside the lock; aborts the socket task
        if removed.is_some() {
            tracing::info!(stream = %name, "Closing stream socket, no subscribers");
        }
    }

    /// Socket state for a stream name
    pub fn state(&self, name: &StreamName) -> Option<TransportState> {
        self.records.lock().get(name).map(|r| r.state)
    }

    /// Resolved mime for a stream name
    pub fn mime(&self, name: &StreamName) -> Option<String> {
        self.records.lock().get(name).and_then(|r| r.mime.clone())
    }

    /// Number of subscribers sharing a stream socket
    pub fn subscriber_count(&self, name: &StreamName) -> usize {
        self.records.lock().get(name).map_or(0, |r| r.subscribers)
    }

    /// Number of tracked sockets
    pub fn transport_count(&self) -> usize {
        self.records.lock().len()
    }

    fn set_state(&self, name: &StreamName, id: u64, state: TransportState) {
        if let Some(record) = self.records.lock().get_mut(name) {
            if record.id == id {
                record.state = state;
            }
        }
    }

    fn handle_inbound(&self, name: &StreamName, id: u64, message: InboundMessage) {
        match message {
            InboundMessage::Text(text) => {
                let mime = match MimeMessage::parse(&text) {
                    Ok(msg) => msg.value,
                    Err(e) => {
                        tracing::warn!(stream = %name, error = %e, "Ignoring unparseable control frame");
                        return;
                    }
                };

                let first = self
                    .records
                    .lock()
                    .get_mut(name)
                    .is_some_and(|record| record.id == id && record.resolve_mime(&mime));

                if !first {
                    tracing::debug!(stream = %name, mime = %mime, "Ignoring repeated mime");
                    return;
                }

                tracing::info!(stream = %name, mime = %mime, "Mime resolved");
                self.bus.publish(&TransportEvent::MimeResolved {
                    stream: name.clone(),
                    mime,
                });
            }
            InboundMessage::Binary(frame) => {
                let current = self
                    .records
                    .lock()
                    .get(name)
                    .is_some_and(|record| record.id == id);
                if !current {
                    return;
                }

                self.bus.publish(&TransportEvent::FrameReceived {
                    stream: name.clone(),
                    frame,
                });
            }
        }
    }
}

/// Drive one stream socket until it ends, its record is removed, or the
/// multiplexer is dropped
async fn run_socket(mux: Weak<TransportMultiplexer>, name: StreamName, id: u64) {
    let (connect, codecs) = {
        let Some(this) = mux.upgrade() else { return };

        let url = match this.config.socket_url(&name) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(stream = %name, error = %e, "Cannot build socket url");
                this.set_state(&name, id, TransportState::Closed);
                return;
            }
        };

        (
            this.connector.connect(url, this.config.authorization()),
            this.config.codec_list(),
        )
    };

    let SocketChannel {
        outbound,
        mut inbound,
    } = match connect.await {
        Ok(channel) => channel,
        Err(e) => {
            tracing::warn!(stream = %name, error = %e, "Stream socket failed to open");
            if let Some(this) = mux.upgrade() {
                this.set_state(&name, id, TransportState::Closed);
            }
            return;
        }
    };

    match ControlMessage::mse(codecs).to_json() {
        Ok(json) => {
            if outbound.send(json).await.is_err() {
                tracing::warn!(stream = %name, "Socket closed before capability announcement");
            }
        }
        Err(e) => tracing::warn!(stream = %name, error = %e, "Cannot encode capability announcement"),
    }

    match mux.upgrade() {
        Some(this) => this.set_state(&name, id, TransportState::Open),
        None => return,
    }
    tracing::debug!(stream = %name, "Stream socket open");

    while let Some(message) = inbound.recv().await {
        let Some(this) = mux.upgrade() else { return };
        this.handle_inbound(&name, id, message);
    }

    tracing::warn!(stream = %name, "Stream socket ended");
    if let Some(this) = mux.upgrade() {
        this.set_state(&name, id, TransportState::Closed);
    }
}

/// Listener registration on both topics of one stream
///
/// Unsubscribes on [`cancel`](Self::cancel) or drop. Cancelling the last
/// subscription of a stream closes its shared socket.
pub struct Subscription {
    mux: Weak<TransportMultiplexer>,
    bus: Weak<EventBus>,
    stream: StreamName,
    listener: Option<Listener>,
}

impl Subscription {
    pub fn stream(&self) -> &StreamName {
        &self.stream
    }

    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }

    /// Remove the listener from both topics; idempotent
    pub fn cancel(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        if let Some(mux) = self.mux.upgrade() {
            mux.detach(&self.stream, &listener);
        } else if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(&Topic::Mime(self.stream.clone()), &listener);
            bus.unsubscribe(&Topic::Data(self.stream.clone()), &listener);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
