//! Per-stream transport record

use tokio::task::JoinHandle;

/// Lifecycle of a stream socket
///
/// There is no reconnection while subscribers remain: a `Closed` record
/// stays until its last subscriber leaves, then the next subscriber opens
/// a new socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Record created, socket connecting
    Connecting,
    /// Connected and capability announced
    Open,
    /// Socket ended or failed to connect
    Closed,
}

/// One socket shared by every subscriber of a stream name
pub struct TransportRecord {
    /// Generation of this record; socket tasks of removed records are ignored
    pub id: u64,

    /// Current socket state
    pub state: TransportState,

    /// Negotiated mime, resolved at most once
    pub mime: Option<String>,

    /// Active subscriptions sharing the socket
    pub subscribers: usize,

    /// Task driving the socket
    pub(super) task: Option<JoinHandle<()>>,
}

impl TransportRecord {
    pub(super) fn new(id: u64) -> Self {
        Self {
            id,
            state: TransportState::Connecting,
            mime: None,
            subscribers: 0,
            task: None,
        }
    }

    /// Cache the mime; returns false if one was already resolved
    pub(super) fn resolve_mime(&mut self, mime: &str) -> bool {
        if self.mime.is_some() {
            return false;
        }
        self.mime = Some(mime.to_string());
        true
    }
}

impl Drop for TransportRecord {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
