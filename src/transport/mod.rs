//! Transport multiplexing
//!
//! Exactly one socket is opened per backend stream name, no matter how many
//! players subscribe to it. The socket negotiates a mime once and then
//! carries binary media frames; both are republished on the [`EventBus`].
//!
//! ```text
//!   ensure_open(name)
//!        │ first call only
//!        ▼
//!   Connector::connect ──► send {"type":"mse","value":codecs}
//!        │
//!        ├── text   {"value":mime} ──► cache ──► bus: mime(name)
//!        └── binary frame           ──────────► bus: data(name)
//! ```
//!
//! [`EventBus`]: crate::bus::EventBus

pub mod connector;
pub mod multiplexer;
pub mod protocol;
pub mod record;

pub use connector::{Connector, SocketChannel, WsConnector};
pub use multiplexer::{Subscription, TransportMultiplexer};
pub use protocol::{ControlMessage, InboundMessage, MimeMessage};
pub use record::{TransportRecord, TransportState};
