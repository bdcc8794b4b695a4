//! Shared backend sessions
//!
//! Every distinct source id maps to one backend relay session, created when
//! the first player acquires it and deleted when the last one releases it.
//! Backend requests are fire-and-forget: they run as detached tasks whose
//! failures are only logged.

pub mod backend;
pub mod registry;

pub use backend::{HttpBackend, StreamBackend};
pub use registry::{SessionRecord, SessionRegistry};
