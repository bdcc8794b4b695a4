//! Event and topic types

use bytes::Bytes;

use crate::naming::StreamName;

/// Topic key on the event bus
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Mime resolved for a stream
    Mime(StreamName),
    /// Binary frame received for a stream
    Data(StreamName),
}

impl Topic {
    pub fn stream(&self) -> &StreamName {
        match self {
            Topic::Mime(name) | Topic::Data(name) => name,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Mime(name) => write!(f, "mime({})", name),
            Topic::Data(name) => write!(f, "data({})", name),
        }
    }
}

/// Event published by the transport multiplexer
///
/// Cheap to clone: frames are reference counted `Bytes`.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The backend announced the mime for this stream
    MimeResolved { stream: StreamName, mime: String },
    /// A binary media frame arrived, unmodified
    FrameReceived { stream: StreamName, frame: Bytes },
}

impl TransportEvent {
    /// Topic this event is published on
    pub fn topic(&self) -> Topic {
        match self {
            TransportEvent::MimeResolved { stream, .. } => Topic::Mime(stream.clone()),
            TransportEvent::FrameReceived { stream, .. } => Topic::Data(stream.clone()),
        }
    }
}
