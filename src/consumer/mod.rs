//! Per-player buffering into a media sink
//!
//! A [`BufferingConsumer`] receives the negotiated mime and the raw frames of
//! one stream and hands them to a [`MediaSink`] one append at a time. Frames
//! arriving while the sink is busy wait in an unbounded FIFO queue and are
//! pulled out by the sink's append-complete signal.
//!
//! ```text
//!   Idle ──mime──► AwaitingFirstAppend ──append ok──► Draining
//!                     ▲   │ append rejected: frame dropped     │
//!                     │   └──────────────┘                     │
//!                     └──────────── queue drained ─────────────┘
//! ```

pub mod buffer;
pub mod file;
pub mod sink;
pub mod state;

pub use buffer::BufferingConsumer;
pub use file::{FileSink, FileSinkFactory};
pub use sink::{AppendSignal, MediaSink, SinkFactory};
pub use state::{BufferState, ConsumerStats};
