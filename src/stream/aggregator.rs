//! Vendor-neutral stream aggregation.
//!
//! A [`ChunkMapper`] turns one decoded SSE record into a list of
//! [`ChunkAction`]s; the [`StreamAggregator`] applies those actions to the
//! block table and the running finish/usage state and produces canonical
//! [`StreamPart`]s.

use tracing::{debug, warn};

use super::block::{BlockKey, BlockSpec, BlockTable};
use super::SseEvent;
use crate::error::SdkError;
use crate::protocol::canonical::{FinishReason, ProviderKind, Source, StreamPart, Usage};

/// A vendor-independent instruction produced by a [`ChunkMapper`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkAction {
    Metadata {
        id: Option<String>,
        model: Option<String>,
    },
    Open(BlockSpec),
    Delta {
        key: BlockKey,
        delta: String,
    },
    Close {
        key: BlockKey,
    },
    Source(Source),
    FinishReason(FinishReason),
    /// Partial usage report, merged field-wise into the running total.
    Usage(Usage),
    /// The vendor reported an error inside the stream.
    ProtocolError(String),
}

/// Decodes the records of one vendor dialect.
///
/// A mapper holds whatever per-stream state its dialect needs (tool-call id
/// tables, counters) and is used for exactly one stream.
pub trait ChunkMapper {
    fn provider(&self) -> ProviderKind;

    /// Decode `event` and append the resulting actions to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Decode`] when the record payload is not valid for
    /// the dialect. Nothing is appended in that case.
    fn map_record(&mut self, event: &SseEvent, out: &mut Vec<ChunkAction>) -> Result<(), SdkError>;
}

impl<M: ChunkMapper + ?Sized> ChunkMapper for Box<M> {
    fn provider(&self) -> ProviderKind {
        (**self).provider()
    }

    fn map_record(&mut self, event: &SseEvent, out: &mut Vec<ChunkAction>) -> Result<(), SdkError> {
        (**self).map_record(event, out)
    }
}

// ---------------------------------------------------------------------------
// StreamAggregator
// ---------------------------------------------------------------------------

/// Applies mapper output to per-stream state and emits canonical parts.
pub struct StreamAggregator<M> {
    mapper: M,
    blocks: BlockTable,
    finish_reason: FinishReason,
    usage: Usage,
    include_raw_chunks: bool,
    actions: Vec<ChunkAction>,
    finished: bool,
}

impl<M: ChunkMapper> StreamAggregator<M> {
    #[must_use]
    pub fn new(mapper: M) -> Self {
        Self {
            mapper,
            blocks: BlockTable::new(),
            finish_reason: FinishReason::Unknown,
            usage: Usage::default(),
            include_raw_chunks: false,
            actions: Vec::new(),
            finished: false,
        }
    }

    /// Also emit every record's decoded JSON as a `raw` part.
    #[must_use]
    pub fn with_raw_chunks(mut self, include: bool) -> Self {
        self.include_raw_chunks = include;
        self
    }

    /// Process one SSE record, appending the resulting parts to `out`.
    ///
    /// A record that fails to decode produces one `error` part and is
    /// otherwise skipped; the stream continues.
    pub fn process_event(&mut self, event: &SseEvent, out: &mut Vec<StreamPart>) {
        if self.finished {
            return;
        }

        if self.include_raw_chunks {
            if let Ok(chunk) = serde_json::from_str::<serde_json::Value>(&event.data) {
                out.push(StreamPart::Raw { chunk });
            }
        }

        let mut actions = std::mem::take(&mut self.actions);
        actions.clear();
        if let Err(err) = self.mapper.map_record(event, &mut actions) {
            warn!(
                provider = %self.mapper.provider(),
                event = event.event.as_deref().unwrap_or(""),
                error = %err,
                "skipping undecodable stream record"
            );
            out.push(StreamPart::Error {
                message: err.to_string(),
            });
            self.actions = actions;
            return;
        }

        for action in actions.drain(..) {
            self.apply(action, out);
        }
        self.actions = actions;
    }

    fn apply(&mut self, action: ChunkAction, out: &mut Vec<StreamPart>) {
        match action {
            ChunkAction::Metadata { id, model } => {
                out.push(StreamPart::ResponseMetadata { id, model });
            }
            ChunkAction::Open(spec) => self.blocks.open(spec, out),
            ChunkAction::Delta { key, delta } => self.blocks.append(key, delta, out),
            ChunkAction::Close { key } => self.blocks.close(&key, out),
            ChunkAction::Source(source) => out.push(StreamPart::Source(source)),
            ChunkAction::FinishReason(reason) => self.finish_reason = reason,
            ChunkAction::Usage(usage) => self.usage.merge(&usage),
            ChunkAction::ProtocolError(message) => {
                debug!(provider = %self.mapper.provider(), %message, "vendor error in stream");
                self.finish_reason = FinishReason::Error;
                out.push(StreamPart::Error { message });
            }
        }
    }

    /// End of stream: close every still-open block in opening order, then
    /// emit the single `finish` part. Later calls are no-ops.
    pub fn finish(&mut self, out: &mut Vec<StreamPart>) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.blocks.close_all(out);
        out.push(StreamPart::Finish {
            reason: self.finish_reason,
            usage: self.usage,
        });
    }

    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.mapper.provider()
    }

    #[must_use]
    pub fn finish_reason(&self) -> FinishReason {
        self.finish_reason
    }

    #[must_use]
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    #[must_use]
    pub fn blocks(&self) -> &BlockTable {
        &self.blocks
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
