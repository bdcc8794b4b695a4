//! Typed publish/subscribe for transport events
//!
//! Each backend stream name has two topics: `mime` (negotiated codec
//! descriptor) and `data` (raw binary frames). Listeners are kept in
//! insertion order per topic and are called synchronously by `publish`.
//!
//! `publish` delivers to a snapshot of the listeners registered when it
//! starts. A listener added while a publish is running only sees later
//! publishes, and listeners may themselves publish or (un)subscribe.

pub mod event;
pub mod hub;

pub use event::{Topic, TransportEvent};
pub use hub::{listener, EventBus, Listener};
