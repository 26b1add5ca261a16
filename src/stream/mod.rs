pub mod aggregator;
pub mod block;
pub mod emitter;
pub mod pipeline;
pub mod sse;

pub use aggregator::{ChunkAction, ChunkMapper, StreamAggregator};
pub use block::{BlockKey, BlockKind, BlockSpec, BlockTable, ContentBlockState, Lifecycle};
pub use emitter::{Emitter, PartCollector, StreamConsumer};
pub use pipeline::{drive_byte_stream, StreamOptions, StreamPipeline};
pub use sse::{sse_event_stream, SseFramer};

/// One complete SSE record.
///
/// `event` is the last `event:` value seen since the previous dispatch;
/// `data` is every `data:` line of the record joined with `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    /// Record with no event name.
    #[must_use]
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    /// Record with an event name.
    #[must_use]
    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }
}
