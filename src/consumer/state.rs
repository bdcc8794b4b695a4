//! Consumer state and statistics

/// Buffering state of one consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// No sink yet (mime not resolved, or the sink could not be created)
    Idle,
    /// Sink exists and the next frame is appended directly
    AwaitingFirstAppend,
    /// Frames are flowing; new frames go through the queue
    Draining,
}

impl BufferState {
    /// Whether the sink has taken a frame since it last drained
    pub fn is_started(&self) -> bool {
        *self == BufferState::Draining
    }
}

/// Frame counters for one consumer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Frames delivered by the transport
    pub frames_received: u64,
    /// Frames accepted by the sink
    pub frames_appended: u64,
    /// Frames rejected by the sink or received before it existed
    pub frames_dropped: u64,
    /// Frames waiting in the queue
    pub queue_len: usize,
    /// Longest the queue has been
    pub queue_high_water: usize,
}
