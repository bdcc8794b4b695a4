//! Reference counted session registry

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::naming::StreamName;

use super::backend::StreamBackend;

/// One backend session shared by every player of a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Backend stream name derived from the source id
    pub stream: StreamName,
    /// Number of players currently holding the session
    pub ref_count: u32,
}

/// Source id to backend session map
///
/// A record exists exactly while at least one player references its source.
/// The add request is issued when a record is inserted and the remove
/// request when it is deleted; neither is awaited.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    backend: Arc<dyn StreamBackend>,
}

impl SessionRegistry {
    pub fn new(backend: Arc<dyn StreamBackend>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            backend,
        }
    }

    /// Take a reference on `source`, creating the backend session if needed
    pub fn acquire(&self, source: &str) -> Result<StreamName> {
        if source.is_empty() {
            return Err(Error::InvalidInput("source id must not be empty".into()));
        }

        let mut sessions = self.sessions.lock();

        if let Some(record) = sessions.get_mut(source) {
            record.ref_count += 1;
            tracing::debug!(
                source = source,
                stream = %record.stream,
                refs = record.ref_count,
                "Session reused"
            );
            return Ok(record.stream.clone());
        }

        let stream = StreamName::derive(source)?;
        sessions.insert(
            source.to_string(),
            SessionRecord {
                stream: stream.clone(),
                ref_count: 1,
            },
        );

        tracing::info!(source = source, stream = %stream, "Session created");
        detach(
            "add stream",
            stream.clone(),
            self.backend.add_stream(source, stream.as_str()),
        );

        Ok(stream)
    }

    /// Drop a reference on `source`, tearing the session down on the last one
    ///
    /// Returns the remaining reference count, or `None` (with a warning) if
    /// the source was not registered.
    pub fn release(&self, source: &str) -> Option<u32> {
        let mut sessions = self.sessions.lock();

        let Some(record) = sessions.get_mut(source) else {
            tracing::warn!(source = source, "Release of unknown session");
            return None;
        };

        record.ref_count = record.ref_count.saturating_sub(1);
        let remaining = record.ref_count;

        if remaining == 0 {
            if let Some(record) = sessions.remove(source) {
                tracing::info!(source = source, stream = %record.stream, "Session removed");
                detach(
                    "remove stream",
                    record.stream.clone(),
                    self.backend.remove_stream(record.stream.as_str()),
                );
            }
        } else {
            tracing::debug!(source = source, refs = remaining, "Session released");
        }

        Some(remaining)
    }

    /// Current record for a source
    pub fn get(&self, source: &str) -> Option<SessionRecord> {
        self.sessions.lock().get(source).cloned()
    }

    /// Current reference count for a source
    pub fn ref_count(&self, source: &str) -> Option<u32> {
        self.sessions.lock().get(source).map(|r| r.ref_count)
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

/// Run a backend request in the background, logging its failure
fn detach<F>(op: &'static str, stream: StreamName, request: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(stream = %stream, op = op, "No runtime, backend request skipped");
        return;
    };

    handle.spawn(async move {
        if let Err(e) = request.await {
            tracing::warn!(stream = %stream, op = op, error = %e, "Backend request failed");
        }
    });
}
