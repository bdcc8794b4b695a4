//! Process-wide sharing context

use std::sync::Arc;

use crate::bus::EventBus;
use crate::config::ShareConfig;
use crate::session::{HttpBackend, SessionRegistry, StreamBackend};
use crate::transport::{Connector, TransportMultiplexer, WsConnector};

/// Owns the session registry, the transport multiplexer and their event bus
///
/// Build one at startup, wrap it in an `Arc` and hand it to every
/// [`Player`](crate::Player).
pub struct ShareContext {
    config: ShareConfig,
    bus: Arc<EventBus>,
    sessions: SessionRegistry,
    transport: Arc<TransportMultiplexer>,
}

impl ShareContext {
    /// Context talking HTTP and WebSocket to the configured backend
    pub fn new(config: ShareConfig) -> Self {
        let backend = Arc::new(HttpBackend::new(config.clone()));
        let connector = Arc::new(WsConnector::new(config.channel_capacity));
        Self::with_parts(config, backend, connector)
    }

    /// Context with custom collaborators
    pub fn with_parts(
        config: ShareConfig,
        backend: Arc<dyn StreamBackend>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let bus = Arc::new(EventBus::new());
        let transport = Arc::new(TransportMultiplexer::new(
            config.clone(),
            Arc::clone(&bus),
            connector,
        ));

        Self {
            config,
            bus,
            sessions: SessionRegistry::new(backend),
            transport,
        }
    }

    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn transport(&self) -> &Arc<TransportMultiplexer> {
        &self.transport
    }
}
