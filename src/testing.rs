//! Test doubles for the external collaborators

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

use crate::consumer::{AppendSignal, MediaSink, SinkFactory};
use crate::error::{Error, Result, SinkError};
use crate::session::StreamBackend;
use crate::transport::{Connector, InboundMessage, SocketChannel};

/// Server side of a faked socket
pub struct FakeServer {
    pub url: Url,
    pub authorization: Option<String>,
    /// Text frames the client sent
    pub outbound: mpsc::Receiver<String>,
    /// Push frames to the client
    pub inbound: mpsc::Sender<InboundMessage>,
}

pub struct FakeConnector {
    servers: mpsc::UnboundedSender<FakeServer>,
    connects: AtomicUsize,
    fail: bool,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeServer>) {
        Self::build(false)
    }

    pub fn failing() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeServer>) {
        Self::build(true)
    }

    fn build(fail: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<FakeServer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            servers: tx,
            connects: AtomicUsize::new(0),
            fail,
        });
        (connector, rx)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    fn connect(
        &self,
        url: Url,
        authorization: Option<String>,
    ) -> BoxFuture<'static, Result<SocketChannel>> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return async { Err::<SocketChannel, _>(Error::InvalidConfig("connection refused".into())) }
                .boxed();
        }

        let (out_tx, out_rx) = mpsc::channel(64);
        let (in_tx, in_rx) = mpsc::channel(64);
        let _ = self.servers.send(FakeServer {
            url,
            authorization,
            outbound: out_rx,
            inbound: in_tx,
        });

        async move {
            Ok::<_, Error>(SocketChannel {
                outbound: out_tx,
                inbound: in_rx,
            })
        }
        .boxed()
    }
}

/// Backend request as seen by [`FakeBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Add { source: String, name: String },
    Remove { name: String },
}

/// Records backend requests at call time
#[derive(Default)]
pub struct FakeBackend {
    pub calls: Mutex<Vec<BackendCall>>,
    pub fail: bool,
}

impl FakeBackend {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn adds(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::Add { .. }))
            .count()
    }

    pub fn removes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::Remove { .. }))
            .count()
    }

    fn outcome(&self) -> BoxFuture<'static, Result<()>> {
        let fail = self.fail;
        async move {
            if fail {
                Err(Error::InvalidConfig("backend unreachable".into()))
            } else {
                Ok(())
            }
        }
        .boxed()
    }
}

impl StreamBackend for FakeBackend {
    fn add_stream(&self, source: &str, name: &str) -> BoxFuture<'static, Result<()>> {
        self.calls.lock().push(BackendCall::Add {
            source: source.to_string(),
            name: name.to_string(),
        });
        self.outcome()
    }

    fn remove_stream(&self, name: &str) -> BoxFuture<'static, Result<()>> {
        self.calls.lock().push(BackendCall::Remove {
            name: name.to_string(),
        });
        self.outcome()
    }
}

/// Shared view of a [`FakeSink`]
#[derive(Default)]
pub struct SinkProbe {
    pub appended: Mutex<Vec<Bytes>>,
    pub busy: Mutex<bool>,
    /// Number of upcoming appends to reject
    pub reject_next: AtomicUsize,
    pub created: Mutex<Vec<String>>,
    pub signal: Mutex<Option<AppendSignal>>,
}

impl SinkProbe {
    pub fn appended(&self) -> Vec<Bytes> {
        self.appended.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        *self.busy.lock()
    }

    /// Finish the in-flight append without notifying anyone
    pub fn finish(&self) {
        *self.busy.lock() = false;
    }

    /// Finish the in-flight append and fire the completion signal
    pub fn complete(&self) {
        self.finish();
        if let Some(signal) = self.signal.lock().as_ref() {
            signal.notify();
        }
    }
}

/// Sink that records appends and stays busy until told otherwise
pub struct FakeSink {
    probe: Arc<SinkProbe>,
}

impl MediaSink for FakeSink {
    fn append(&mut self, frame: Bytes) -> std::result::Result<(), SinkError> {
        if self.probe.is_busy() {
            return Err(SinkError::Busy);
        }
        let pending = self.probe.reject_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.probe.reject_next.store(pending - 1, Ordering::SeqCst);
            return Err(SinkError::NotReady);
        }
        *self.probe.busy.lock() = true;
        self.probe.appended.lock().push(frame);
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.probe.is_busy()
    }
}

/// Factory producing [`FakeSink`]s that share one probe
#[derive(Default)]
pub struct FakeSinkFactory {
    pub probe: Arc<SinkProbe>,
    pub unsupported: bool,
}

impl SinkFactory for FakeSinkFactory {
    fn create_sink(
        &self,
        mime: &str,
        signal: AppendSignal,
    ) -> std::result::Result<Box<dyn MediaSink>, SinkError> {
        if self.unsupported {
            return Err(SinkError::UnsupportedMime(mime.to_string()));
        }
        self.probe.created.lock().push(mime.to_string());
        *self.probe.signal.lock() = Some(signal);
        Ok(Box::new(FakeSink {
            probe: Arc::clone(&self.probe),
        }))
    }
}
