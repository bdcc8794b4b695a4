//! Media sink capability

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::SinkError;

/// Segmented buffer accepting ordered binary appends
///
/// An accepted append completes asynchronously; the sink then fires the
/// [`AppendSignal`] it was created with.
pub trait MediaSink: Send {
    /// Start appending `frame`; fails if busy or not ready
    fn append(&mut self, frame: Bytes) -> Result<(), SinkError>;

    /// Whether an append is in flight
    fn is_busy(&self) -> bool;
}

/// Builds sinks for a negotiated mime
pub trait SinkFactory: Send + Sync {
    fn create_sink(&self, mime: &str, signal: AppendSignal)
        -> Result<Box<dyn MediaSink>, SinkError>;
}

/// Append-complete notification handle given to a sink
#[derive(Debug, Clone)]
pub struct AppendSignal {
    tx: mpsc::UnboundedSender<()>,
}

impl AppendSignal {
    /// Create a signal and the receiver its notifications arrive on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report that the last append finished
    pub fn notify(&self) {
        // Receiver gone means the player was unmounted
        let _ = self.tx.send(());
    }
}
