use smallvec::SmallVec;
use tracing::debug;

use crate::error::SdkError;
use crate::protocol::canonical::{ProviderKind, Source};
use crate::protocol::mapping::{openai_finish_to_canonical, openai_usage_to_canonical};
use crate::protocol::openai_chat::{OpenAiAnnotation, OpenAiDelta, OpenAiStreamChunk};
use crate::stream::{BlockKey, BlockSpec, ChunkAction, ChunkMapper, SseEvent};

/// Part id of the single free-running text block.
pub const TEXT_PART_ID: &str = "0";
/// Part id of the single reasoning block.
pub const REASONING_PART_ID: &str = "reasoning-0";

/// Highest tool-call index accepted from the wire.
const MAX_TOOL_CALL_INDEX: usize = 255;

/// Parse one Chat Completions stream chunk.
///
/// # Errors
///
/// Returns the JSON error when `data` is not a chunk object.
pub fn parse_openai_stream_chunk(data: &str) -> Result<OpenAiStreamChunk, serde_json::Error> {
    serde_json::from_str(data)
}

/// Build a canonical source from a `url_citation` annotation.
///
/// `next_id` is only called for annotations that produce a source.
pub(crate) fn annotation_to_source(
    annotation: OpenAiAnnotation,
    next_id: impl FnOnce() -> String,
) -> Option<Source> {
    if annotation.type_ != "url_citation" {
        return None;
    }
    let citation = annotation.url_citation?;
    Some(Source {
        id: next_id(),
        url: Some(citation.url),
        title: citation.title,
        cited_text: None,
    })
}

/// Stream mapper for the `OpenAI` Chat Completions dialect.
///
/// Text is one implicit block (`"0"`) that stays open until the stream
/// finishes. Tool calls are addressed by their positional index; a call
/// closes as soon as its accumulated arguments parse as JSON.
#[derive(Debug, Default)]
pub struct OpenAiChunkMapper {
    metadata_sent: bool,
    tool_call_ids: SmallVec<[Option<String>; 4]>,
    source_seq: usize,
}

impl OpenAiChunkMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_source_id(&mut self) -> String {
        let id = format!("source-{}", self.source_seq);
        self.source_seq += 1;
        id
    }

    /// Translate one parsed chunk into actions.
    pub fn map_chunk(&mut self, chunk: OpenAiStreamChunk, out: &mut Vec<ChunkAction>) {
        if let Some(error) = chunk.error {
            out.push(ChunkAction::ProtocolError(error.message));
        }

        if !self.metadata_sent && (chunk.id.is_some() || chunk.model.is_some()) {
            self.metadata_sent = true;
            out.push(ChunkAction::Metadata {
                id: chunk.id,
                model: chunk.model,
            });
        }

        if let Some(usage) = &chunk.usage {
            out.push(ChunkAction::Usage(openai_usage_to_canonical(usage)));
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            return;
        };
        if let Some(delta) = choice.delta {
            self.map_delta(delta, out);
        }
        if let Some(reason) = choice.finish_reason.as_deref() {
            out.push(ChunkAction::FinishReason(openai_finish_to_canonical(reason)));
        }
    }

    fn map_delta(&mut self, mut delta: OpenAiDelta, out: &mut Vec<ChunkAction>) {
        if let Some(reasoning) = delta.take_reasoning() {
            out.push(ChunkAction::Open(BlockSpec::reasoning(
                BlockKey::Reasoning,
                REASONING_PART_ID,
            )));
            out.push(ChunkAction::Delta {
                key: BlockKey::Reasoning,
                delta: reasoning,
            });
        }

        if let Some(content) = delta.content.filter(|text| !text.is_empty()) {
            // Reasoning precedes the answer; the first text closes it.
            out.push(ChunkAction::Close {
                key: BlockKey::Reasoning,
            });
            out.push(ChunkAction::Open(BlockSpec::text(BlockKey::Text, TEXT_PART_ID)));
            out.push(ChunkAction::Delta {
                key: BlockKey::Text,
                delta: content,
            });
        }

        for tool_call in delta.tool_calls.into_iter().flatten() {
            let index = tool_call.index;
            if index > MAX_TOOL_CALL_INDEX {
                debug!(index, "ignoring out-of-range tool call index");
                continue;
            }
            if self.tool_call_ids.len() <= index {
                self.tool_call_ids.resize(index + 1, None);
            }
            let slot = &mut self.tool_call_ids[index];
            if slot.is_none() {
                *slot = tool_call.id.filter(|id| !id.is_empty());
            }

            let Some(function) = tool_call.function else {
                continue;
            };
            let key = BlockKey::ToolCall(index);
            if let Some(name) = function.name.filter(|name| !name.is_empty()) {
                let id = slot.get_or_insert_with(|| format!("call_{index}")).clone();
                out.push(ChunkAction::Open(
                    BlockSpec::tool_call(key.clone(), id, name).closing_on_valid_json(),
                ));
            }
            if let Some(arguments) = function.arguments.filter(|args| !args.is_empty()) {
                out.push(ChunkAction::Delta {
                    key,
                    delta: arguments,
                });
            }
        }

        for annotation in delta.annotations.into_iter().flatten() {
            match annotation_to_source(annotation, || self.next_source_id()) {
                Some(source) => out.push(ChunkAction::Source(source)),
                None => debug!("ignoring non-citation annotation"),
            }
        }
    }
}

impl ChunkMapper for OpenAiChunkMapper {
    fn provider(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn map_record(&mut self, event: &SseEvent, out: &mut Vec<ChunkAction>) -> Result<(), SdkError> {
        let chunk = parse_openai_stream_chunk(&event.data)?;
        self.map_chunk(chunk, out);
        Ok(())
    }
}
