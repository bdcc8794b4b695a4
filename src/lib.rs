//! Session sharing and binary stream buffering for MSE players
//!
//! Many independent players can ask for the same upstream source while the
//! crate keeps a single backend relay session and a single WebSocket per
//! backend stream name.
//!
//! ```text
//!  Player::mount(src) ──► SessionRegistry::acquire ──► PUT /streams (once)
//!         │
//!         └──► TransportMultiplexer::subscribe(name) ──► one socket per name
//!                              │
//!                       EventBus (mime / data topics)
//!                              │
//!              BufferingConsumer ──► MediaSink (one append at a time)
//! ```
//!
//! All shared state lives in one [`ShareContext`] built at startup.

pub mod bus;
pub mod config;
pub mod consumer;
pub mod context;
pub mod error;
pub mod naming;
pub mod player;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ShareConfig;
pub use context::ShareContext;
pub use error::{Error, Result};
pub use naming::StreamName;
pub use player::Player;
