//! Buffering state machine

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;

use crate::bus::TransportEvent;
use crate::naming::StreamName;

use super::sink::{AppendSignal, MediaSink, SinkFactory};
use super::state::{BufferState, ConsumerStats};

/// Serializes frames of one stream into a media sink
///
/// Frames reach the sink in arrival order and never overlap. Three lossy
/// behaviors are part of the contract:
///
/// - A rejected direct append drops that frame; the next frame is tried
///   directly again.
/// - A rejected queued append drops that frame. No completion follows a
///   rejection, so the rest of the queue waits for the next frame (or a
///   stray completion) before it moves again.
/// - The queue is unbounded; a sink slower than the stream grows it
///   without limit.
pub struct BufferingConsumer {
    stream: StreamName,
    factory: Arc<dyn SinkFactory>,
    signal: AppendSignal,

    /// Sink for the resolved mime, created on first mime
    sink: Option<Box<dyn MediaSink>>,
    mime: Option<String>,

    /// Frames waiting for the sink
    queue: VecDeque<Bytes>,
    state: BufferState,
    stats: ConsumerStats,
}

impl BufferingConsumer {
    pub fn new(stream: StreamName, factory: Arc<dyn SinkFactory>, signal: AppendSignal) -> Self {
        Self {
            stream,
            factory,
            signal,
            sink: None,
            mime: None,
            queue: VecDeque::new(),
            state: BufferState::Idle,
            stats: ConsumerStats::default(),
        }
    }

    pub fn stream(&self) -> &StreamName {
        &self.stream
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            queue_len: self.queue.len(),
            ..self.stats.clone()
        }
    }

    /// Dispatch a bus event addressed to this consumer's stream
    pub fn on_event(&mut self, event: &TransportEvent) {
        match event {
            TransportEvent::MimeResolved { stream, mime } if *stream == self.stream => {
                self.on_mime(mime);
            }
            TransportEvent::FrameReceived { stream, frame } if *stream == self.stream => {
                self.on_frame(frame.clone());
            }
            _ => {}
        }
    }

    /// Create the sink for `mime` unless one exists
    pub fn on_mime(&mut self, mime: &str) {
        if let Some(current) = self.mime.as_deref() {
            if current != mime {
                tracing::warn!(
                    stream = %self.stream,
                    current = current,
                    offered = mime,
                    "Ignoring mime change"
                );
            }
            return;
        }

        match self.factory.create_sink(mime, self.signal.clone()) {
            Ok(sink) => {
                self.sink = Some(sink);
                self.mime = Some(mime.to_string());
                self.state = BufferState::AwaitingFirstAppend;
                tracing::debug!(stream = %self.stream, mime = mime, "Sink created");
            }
            Err(e) => {
                tracing::warn!(stream = %self.stream, mime = mime, error = %e, "Cannot create sink");
            }
        }
    }

    /// Accept the next frame from the transport
    pub fn on_frame(&mut self, frame: Bytes) {
        self.stats.frames_received += 1;

        match self.state {
            BufferState::Idle => {
                self.stats.frames_dropped += 1;
                tracing::debug!(stream = %self.stream, "Frame before sink, dropped");
            }
            BufferState::AwaitingFirstAppend => {
                let Some(sink) = self.sink.as_mut() else {
                    return;
                };

                match sink.append(frame) {
                    Ok(()) => {
                        self.stats.frames_appended += 1;
                        self.state = BufferState::Draining;
                    }
                    Err(e) => {
                        // First frame is best effort: drop it, retry directly next time
                        self.stats.frames_dropped += 1;
                        tracing::warn!(stream = %self.stream, error = %e, "Direct append rejected, frame dropped");
                    }
                }
            }
            BufferState::Draining => {
                self.queue.push_back(frame);
                self.stats.queue_high_water = self.stats.queue_high_water.max(self.queue.len());

                if self.sink.as_ref().is_some_and(|s| !s.is_busy()) {
                    self.pump();
                }
            }
        }
    }

    /// The sink finished an append
    pub fn on_append_complete(&mut self) {
        self.pump();
    }

    /// Feed the head of the queue to an idle sink
    fn pump(&mut self) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if sink.is_busy() {
            return;
        }

        let Some(frame) = self.queue.pop_front() else {
            if self.state == BufferState::Draining {
                self.state = BufferState::AwaitingFirstAppend;
                tracing::trace!(stream = %self.stream, "Queue drained");
            }
            return;
        };

        match sink.append(frame) {
            Ok(()) => {
                self.stats.frames_appended += 1;
                self.state = BufferState::Draining;
            }
            Err(e) => {
                self.stats.frames_dropped += 1;
                tracing::warn!(stream = %self.stream, error = %e, "Queued append rejected, frame dropped");
                if self.queue.is_empty() {
                    self.state = BufferState::AwaitingFirstAppend;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{FakeSinkFactory, SinkProbe};

    fn frame(byte: u8) -> Bytes {
        Bytes::copy_from_slice(&[byte])
    }

    fn consumer() -> (BufferingConsumer, Arc<SinkProbe>) {
        let factory = Arc::new(FakeSinkFactory::default());
        let probe = Arc::clone(&factory.probe);
        let (signal, _rx) = AppendSignal::channel();
        let consumer = BufferingConsumer::new(StreamName::from_raw("2sui2"), factory, signal);
        (consumer, probe)
    }

    fn ready_consumer() -> (BufferingConsumer, Arc<SinkProbe>) {
        let (mut consumer, probe) = consumer();
        consumer.on_mime("video/mp4");
        (consumer, probe)
    }

    /// Finish the in-flight append and deliver the completion
    fn complete(consumer: &mut BufferingConsumer, probe: &SinkProbe) {
        probe.finish();
        consumer.on_append_complete();
    }

    #[test]
    fn test_mime_creates_sink_once() {
        let (mut consumer, probe) = consumer();
        assert_eq!(consumer.state(), BufferState::Idle);

        consumer.on_mime("video/mp4");
        consumer.on_mime("video/mp4");
        consumer.on_mime("video/webm");

        assert_eq!(*probe.created.lock(), vec!["video/mp4".to_string()]);
        assert_eq!(consumer.mime(), Some("video/mp4"));
        assert_eq!(consumer.state(), BufferState::AwaitingFirstAppend);
    }

    #[test]
    fn test_frames_before_sink_are_dropped() {
        let (mut consumer, probe) = consumer();

        consumer.on_frame(frame(1));

        assert!(probe.appended().is_empty());
        assert_eq!(consumer.queue_len(), 0);
        assert_eq!(consumer.stats().frames_dropped, 1);
        assert_eq!(consumer.state(), BufferState::Idle);
    }

    #[test]
    fn test_sink_creation_failure_stays_idle() {
        let factory = Arc::new(FakeSinkFactory {
            unsupported: true,
            ..Default::default()
        });
        let (signal, _rx) = AppendSignal::channel();
        let mut consumer = BufferingConsumer::new(StreamName::from_raw("s"), factory, signal);

        consumer.on_mime("video/x-unknown");
        consumer.on_frame(frame(1));

        assert_eq!(consumer.state(), BufferState::Idle);
        assert!(consumer.mime().is_none());
    }

    #[test]
    fn test_first_frame_goes_direct() {
        let (mut consumer, probe) = ready_consumer();

        consumer.on_frame(frame(1));

        assert_eq!(probe.appended(), vec![frame(1)]);
        assert_eq!(consumer.queue_len(), 0);
        assert_eq!(consumer.state(), BufferState::Draining);
    }

    #[test]
    fn test_busy_frames_keep_arrival_order() {
        let (mut consumer, probe) = ready_consumer();

        consumer.on_frame(frame(0));
        consumer.on_frame(frame(1));
        consumer.on_frame(frame(2));
        consumer.on_frame(frame(3));
        assert_eq!(consumer.queue_len(), 3);
        assert_eq!(probe.appended(), vec![frame(0)]);

        for _ in 0..3 {
            complete(&mut consumer, &probe);
        }

        assert_eq!(probe.appended(), vec![frame(0), frame(1), frame(2), frame(3)]);
        assert_eq!(consumer.queue_len(), 0);
        assert_eq!(consumer.stats().queue_high_water, 3);
    }

    #[test]
    fn test_never_appends_while_busy() {
        let (mut consumer, probe) = ready_consumer();

        consumer.on_frame(frame(0));
        // Spurious completion while the sink is still busy
        consumer.on_append_complete();
        consumer.on_frame(frame(1));

        assert_eq!(probe.appended(), vec![frame(0)]);
        assert_eq!(consumer.queue_len(), 1);
    }

    #[test]
    fn test_drained_queue_resets_to_direct_path() {
        let (mut consumer, probe) = ready_consumer();

        consumer.on_frame(frame(0));
        complete(&mut consumer, &probe);
        assert_eq!(consumer.state(), BufferState::AwaitingFirstAppend);

        consumer.on_frame(frame(1));
        assert_eq!(probe.appended(), vec![frame(0), frame(1)]);
        assert_eq!(consumer.queue_len(), 0);
    }

    #[test]
    fn test_idle_sink_pumps_on_enqueue() {
        let (mut consumer, probe) = ready_consumer();

        consumer.on_frame(frame(0));
        // Append finished but the completion has not been delivered yet
        probe.finish();
        consumer.on_frame(frame(1));

        assert_eq!(probe.appended(), vec![frame(0), frame(1)]);
        assert_eq!(consumer.queue_len(), 0);
        assert_eq!(consumer.state(), BufferState::Draining);
    }

    #[test]
    fn test_rejected_first_frame_is_dropped() {
        let (mut consumer, probe) = ready_consumer();
        probe.reject_next.store(1, Ordering::SeqCst);

        consumer.on_frame(frame(1));

        // Lossy by contract: not queued, not started
        assert!(probe.appended().is_empty());
        assert_eq!(consumer.queue_len(), 0);
        assert!(!consumer.state().is_started());
        assert_eq!(consumer.stats().frames_dropped, 1);

        consumer.on_frame(frame(2));
        assert_eq!(probe.appended(), vec![frame(2)]);
        assert_eq!(consumer.queue_len(), 0);
        assert!(consumer.state().is_started());
    }

    #[test]
    fn test_rejected_queued_frame_keeps_order() {
        let (mut consumer, probe) = ready_consumer();

        consumer.on_frame(frame(0));
        consumer.on_frame(frame(1));
        consumer.on_frame(frame(2));

        probe.reject_next.store(1, Ordering::SeqCst);
        complete(&mut consumer, &probe);
        assert_eq!(consumer.queue_len(), 1);

        // Next completion never comes; the next frame pumps instead
        consumer.on_frame(frame(3));
        complete(&mut consumer, &probe);

        assert_eq!(probe.appended(), vec![frame(0), frame(2), frame(3)]);
        assert_eq!(consumer.stats().frames_dropped, 1);
    }

    #[test]
    fn test_rejected_queued_frame_stalls_until_next_event() {
        let (mut consumer, probe) = ready_consumer();

        for i in 0..4u8 {
            consumer.on_frame(frame(i));
        }
        probe.reject_next.store(1, Ordering::SeqCst);
        complete(&mut consumer, &probe);

        // Sink is idle but nothing drives the queue
        assert!(!probe.is_busy());
        assert_eq!(consumer.queue_len(), 2);
        assert_eq!(consumer.state(), BufferState::Draining);
        assert_eq!(probe.appended(), vec![frame(0)]);

        consumer.on_append_complete();
        assert_eq!(probe.appended(), vec![frame(0), frame(2)]);
        assert_eq!(consumer.queue_len(), 1);
    }

    #[test]
    fn test_unbounded_queue_growth() {
        let (mut consumer, probe) = ready_consumer();

        for i in 0..=200u8 {
            consumer.on_frame(frame(i));
        }

        assert_eq!(probe.appended().len(), 1);
        assert_eq!(consumer.queue_len(), 200);
    }

    #[test]
    fn test_events_for_other_streams_are_ignored() {
        let (mut consumer, probe) = consumer();

        consumer.on_event(&TransportEvent::MimeResolved {
            stream: StreamName::from_raw("other"),
            mime: "video/mp4".into(),
        });
        assert_eq!(consumer.state(), BufferState::Idle);

        consumer.on_event(&TransportEvent::MimeResolved {
            stream: StreamName::from_raw("2sui2"),
            mime: "video/mp4".into(),
        });
        consumer.on_event(&TransportEvent::FrameReceived {
            stream: StreamName::from_raw("2sui2"),
            frame: frame(7),
        });

        assert_eq!(probe.appended(), vec![frame(7)]);
    }
}
