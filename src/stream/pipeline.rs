//! Bytes in, canonical parts out.
//!
//! [`StreamPipeline`] wires the SSE framer, a vendor aggregator and the
//! emitter together behind the transport's [`ChunkSink`] interface.

use std::ops::ControlFlow;
use std::time::Instant;

use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use super::aggregator::{ChunkMapper, StreamAggregator};
use super::emitter::{Emitter, StreamConsumer};
use super::sse::SseFramer;
use crate::config::StreamConfig;
use crate::error::SdkError;
use crate::observability::log_stream_complete;
use crate::protocol::canonical::{ProviderKind, StreamPart, Warning};
use crate::protocol::mapper_for;
use crate::transport::ChunkSink;

/// Per-stream options.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Name used in logs instead of the dialect name, e.g. the actual
    /// vendor behind an OpenAI-compatible endpoint.
    pub provider_label: Option<String>,
    /// Cap on the framer's partial-line buffer. `None` = unbounded.
    pub max_buffer_bytes: Option<usize>,
    pub include_raw_chunks: bool,
    /// Warnings surfaced on `stream-start`.
    pub warnings: Vec<Warning>,
}

impl From<&StreamConfig> for StreamOptions {
    fn from(config: &StreamConfig) -> Self {
        Self {
            provider_label: None,
            max_buffer_bytes: config.max_buffer_bytes,
            include_raw_chunks: config.include_raw_chunks,
            warnings: Vec::new(),
        }
    }
}

type BoxedMapper = Box<dyn ChunkMapper + Send>;

/// One streaming response, from raw bytes to consumer callbacks.
pub struct StreamPipeline<C> {
    framer: SseFramer,
    aggregator: StreamAggregator<BoxedMapper>,
    emitter: Emitter<C>,
    scratch: Vec<StreamPart>,
    warnings: Option<Vec<Warning>>,
    label: String,
    started_at: Instant,
}

impl<C: StreamConsumer> StreamPipeline<C> {
    /// Pipeline for `provider`'s dialect. The mapper is chosen here, once.
    #[must_use]
    pub fn new(provider: ProviderKind, options: StreamOptions, consumer: C) -> Self {
        Self::with_mapper(mapper_for(provider), options, consumer)
    }

    #[must_use]
    pub fn with_mapper(mapper: BoxedMapper, options: StreamOptions, consumer: C) -> Self {
        let framer = options
            .max_buffer_bytes
            .map_or_else(SseFramer::new, SseFramer::with_max_buffer);
        let label = options
            .provider_label
            .unwrap_or_else(|| mapper.provider().as_str().to_string());
        Self {
            framer,
            aggregator: StreamAggregator::new(mapper).with_raw_chunks(options.include_raw_chunks),
            emitter: Emitter::new(consumer),
            scratch: Vec::new(),
            warnings: Some(options.warnings),
            label,
            started_at: Instant::now(),
        }
    }

    fn ensure_started(&mut self) {
        if let Some(warnings) = self.warnings.take() {
            let _ = self.emitter.start(warnings);
        }
    }

    /// Whether the consumer has been completed (normally, by error or by
    /// cancellation).
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.emitter.is_completed()
    }

    #[must_use]
    pub fn provider_label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn consumer(&self) -> &C {
        self.emitter.consumer()
    }

    #[must_use]
    pub fn into_consumer(self) -> C {
        self.emitter.into_consumer()
    }
}

fn deliver<C: StreamConsumer>(emitter: &mut Emitter<C>, parts: &mut Vec<StreamPart>) {
    for part in parts.drain(..) {
        if emitter.emit(part).is_break() {
            break;
        }
    }
}

impl<C: StreamConsumer> ChunkSink for StreamPipeline<C> {
    fn on_chunk(&mut self, bytes: &[u8]) -> ControlFlow<()> {
        self.ensure_started();
        if self.emitter.is_completed() {
            return ControlFlow::Break(());
        }

        let Self {
            framer,
            aggregator,
            emitter,
            scratch,
            ..
        } = self;
        let fed = framer.feed(bytes, |event| {
            if emitter.is_completed() {
                return;
            }
            aggregator.process_event(&event, scratch);
            deliver(emitter, scratch);
        });

        if let Err(err) = fed {
            warn!(
                provider = %self.label,
                error = %err,
                "terminating stream on framing error"
            );
            self.emitter.complete(Some(err));
            return ControlFlow::Break(());
        }

        if self.emitter.is_completed() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn on_complete(&mut self) {
        self.ensure_started();
        if self.emitter.is_completed() {
            return;
        }
        if self.framer.has_partial_record() {
            debug!(
                buffered = self.framer.buffered_len(),
                "discarding unterminated record at end of stream"
            );
        }

        self.aggregator.finish(&mut self.scratch);
        deliver(&mut self.emitter, &mut self.scratch);
        log_stream_complete(
            &self.label,
            self.aggregator.finish_reason(),
            self.aggregator.usage(),
            self.started_at.elapsed(),
        );
        self.emitter.complete(None);
    }

    fn on_error(&mut self, error: SdkError) {
        self.ensure_started();
        if self.emitter.is_completed() {
            return;
        }
        warn!(
            provider = %self.label,
            error = %error,
            open_blocks = self.aggregator.blocks().open_count(),
            "stream aborted by transport error"
        );
        self.emitter.complete(Some(error));
    }
}

/// Pump a byte stream into `sink` until it ends, fails or the sink stops.
///
/// Transport errors are reported through [`ChunkSink::on_error`] as
/// [`SdkError::Transport`]; a clean end calls [`ChunkSink::on_complete`].
pub async fn drive_byte_stream<S, B, E, K>(byte_stream: S, sink: &mut K)
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    K: ChunkSink + ?Sized,
{
    let mut byte_stream = std::pin::pin!(byte_stream);
    while let Some(item) = byte_stream.next().await {
        match item {
            Ok(bytes) => {
                if sink.on_chunk(bytes.as_ref()).is_break() {
                    return;
                }
            }
            Err(err) => {
                sink.on_error(SdkError::Transport(err.to_string()));
                return;
            }
        }
    }
    sink.on_complete();
}
