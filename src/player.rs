//! Player lifecycle
//!
//! A [`Player`] is one mounted consumer of a source. Mounting takes a
//! reference on the shared backend session and subscribes to the shared
//! socket; unmounting (or dropping) gives both back.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use url::Url;

use crate::bus::listener;
use crate::consumer::{AppendSignal, BufferState, BufferingConsumer, ConsumerStats, SinkFactory};
use crate::context::ShareContext;
use crate::error::Result;
use crate::naming::StreamName;
use crate::transport::Subscription;

/// One mounted player of a source
pub struct Player {
    ctx: Arc<ShareContext>,
    source: String,
    stream: StreamName,
    consumer: Arc<Mutex<BufferingConsumer>>,
    subscription: Option<Subscription>,
    pump: Option<JoinHandle<()>>,
}

impl Player {
    /// Mount a player for `source`, writing into sinks built by `factory`
    ///
    /// Must be called within a tokio runtime. Fails only on an empty source.
    pub fn mount(
        ctx: &Arc<ShareContext>,
        source: &str,
        factory: Arc<dyn SinkFactory>,
    ) -> Result<Self> {
        let stream = ctx.sessions().acquire(source)?;

        let (signal, mut completions) = AppendSignal::channel();
        let consumer = Arc::new(Mutex::new(BufferingConsumer::new(
            stream.clone(),
            factory,
            signal,
        )));

        let weak: Weak<Mutex<BufferingConsumer>> = Arc::downgrade(&consumer);
        let pump = tokio::spawn(async move {
            while completions.recv().await.is_some() {
                let Some(consumer) = weak.upgrade() else { break };
                consumer.lock().on_append_complete();
            }
        });

        let weak = Arc::downgrade(&consumer);
        let subscription = ctx.transport().subscribe(
            &stream,
            listener(move |event| {
                if let Some(consumer) = weak.upgrade() {
                    consumer.lock().on_event(event);
                }
            }),
        );

        tracing::info!(source = source, stream = %stream, "Player mounted");

        Ok(Self {
            ctx: Arc::clone(ctx),
            source: source.to_string(),
            stream,
            consumer,
            subscription: Some(subscription),
            pump: Some(pump),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn stream_name(&self) -> &StreamName {
        &self.stream
    }

    /// Socket URL of the shared stream, credentials included
    pub fn stream_url(&self) -> Result<Url> {
        self.ctx.config().player_url(&self.stream)
    }

    pub fn buffer_state(&self) -> BufferState {
        self.consumer.lock().state()
    }

    pub fn mime(&self) -> Option<String> {
        self.consumer.lock().mime().map(str::to_string)
    }

    pub fn stats(&self) -> ConsumerStats {
        self.consumer.lock().stats()
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Stop consuming and release the session reference
    ///
    /// An append already in flight is not cancelled.
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let Some(mut subscription) = self.subscription.take() else {
            return;
        };
        subscription.cancel();

        if let Some(pump) = self.pump.take() {
            pump.abort();
        }

        self.ctx.sessions().release(&self.source);
        tracing::info!(source = %self.source, stream = %self.stream, "Player unmounted");
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.teardown();
    }
}
