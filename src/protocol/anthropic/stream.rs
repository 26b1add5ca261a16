use serde::Deserialize;
use tracing::debug;

use crate::error::SdkError;
use crate::protocol::anthropic::{
    AnthropicCitation, AnthropicContentBlock, AnthropicDelta, AnthropicStreamEvent,
};
use crate::protocol::canonical::{ProviderKind, Source};
use crate::protocol::mapping::{anthropic_finish_to_canonical, anthropic_usage_to_canonical};
use crate::stream::{BlockKey, BlockSpec, ChunkAction, ChunkMapper, SseEvent};

#[derive(Deserialize)]
struct TypeProbe {
    #[serde(rename = "type", default)]
    type_: Option<String>,
}

/// Parse an Anthropic SSE record into a typed stream event.
///
/// The SSE `event:` name selects the payload shape. Records without a name
/// fall back to the payload's `type` field. Names this crate does not know
/// come back as [`AnthropicStreamEvent::Unknown`].
///
/// # Errors
///
/// Returns the JSON error when the payload does not match its event shape.
pub fn parse_anthropic_stream_event(
    event_type: Option<&str>,
    data: &str,
) -> Result<AnthropicStreamEvent, serde_json::Error> {
    let probed;
    let name = match event_type {
        Some(name) if !name.is_empty() => name,
        _ => {
            probed = serde_json::from_str::<TypeProbe>(data)?.type_.unwrap_or_default();
            probed.as_str()
        }
    };

    Ok(match name {
        "message_start" => AnthropicStreamEvent::MessageStart(serde_json::from_str(data)?),
        "content_block_start" => AnthropicStreamEvent::ContentBlockStart(serde_json::from_str(data)?),
        "content_block_delta" => AnthropicStreamEvent::ContentBlockDelta(serde_json::from_str(data)?),
        "content_block_stop" => AnthropicStreamEvent::ContentBlockStop(serde_json::from_str(data)?),
        "message_delta" => AnthropicStreamEvent::MessageDelta(serde_json::from_str(data)?),
        "message_stop" => AnthropicStreamEvent::MessageStop,
        "ping" => AnthropicStreamEvent::Ping,
        "error" => AnthropicStreamEvent::Error(serde_json::from_str(data)?),
        other => AnthropicStreamEvent::Unknown(other.to_string()),
    })
}

/// Build a canonical source from an Anthropic citation.
pub(crate) fn citation_to_source(citation: AnthropicCitation, id: String) -> Source {
    Source {
        id,
        url: citation.url,
        title: citation.title.or(citation.document_title),
        cited_text: citation.cited_text,
    }
}

/// Stream mapper for the Anthropic Messages dialect.
///
/// Blocks are keyed by content index; text and reasoning parts use the index
/// as their id, tool blocks use the `tool_use` id.
#[derive(Debug, Default)]
pub struct AnthropicChunkMapper {
    source_seq: usize,
}

impl AnthropicChunkMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_source_id(&mut self) -> String {
        let id = format!("source-{}", self.source_seq);
        self.source_seq += 1;
        id
    }

    /// Translate one typed event into actions.
    pub fn map_event(&mut self, event: AnthropicStreamEvent, out: &mut Vec<ChunkAction>) {
        match event {
            AnthropicStreamEvent::MessageStart(start) => {
                let message = start.message;
                out.push(ChunkAction::Metadata {
                    id: message.id,
                    model: message.model,
                });
                if let Some(usage) = message.usage {
                    out.push(ChunkAction::Usage(anthropic_usage_to_canonical(&usage)));
                }
            }
            AnthropicStreamEvent::ContentBlockStart(start) => {
                let key = BlockKey::Index(start.index);
                let part_id = start.index.to_string();
                match start.content_block {
                    AnthropicContentBlock::Text { text, .. } => {
                        out.push(ChunkAction::Open(BlockSpec::text(key.clone(), part_id)));
                        push_delta(out, key, text);
                    }
                    AnthropicContentBlock::Thinking { thinking } => {
                        out.push(ChunkAction::Open(BlockSpec::reasoning(key.clone(), part_id)));
                        push_delta(out, key, thinking);
                    }
                    AnthropicContentBlock::RedactedThinking {} => {
                        out.push(ChunkAction::Open(BlockSpec::reasoning(key, part_id)));
                    }
                    AnthropicContentBlock::ToolUse { id, name, input } => {
                        out.push(ChunkAction::Open(BlockSpec::tool_call(key.clone(), id, name)));
                        // Input normally streams as deltas after an empty `{}`.
                        if input.as_object().is_some_and(|object| !object.is_empty()) {
                            push_delta(out, key, input.to_string());
                        }
                    }
                    AnthropicContentBlock::Other => {
                        debug!(index = start.index, "ignoring unsupported content block");
                    }
                }
            }
            AnthropicStreamEvent::ContentBlockDelta(delta) => {
                let key = BlockKey::Index(delta.index);
                match delta.delta {
                    AnthropicDelta::TextDelta { text } => push_delta(out, key, text),
                    AnthropicDelta::ThinkingDelta { thinking } => push_delta(out, key, thinking),
                    AnthropicDelta::InputJsonDelta { partial_json } => {
                        push_delta(out, key, partial_json);
                    }
                    AnthropicDelta::CitationsDelta { citation } => {
                        let id = self.next_source_id();
                        out.push(ChunkAction::Source(citation_to_source(citation, id)));
                    }
                    AnthropicDelta::SignatureDelta {} | AnthropicDelta::Other => {}
                }
            }
            AnthropicStreamEvent::ContentBlockStop(stop) => {
                out.push(ChunkAction::Close {
                    key: BlockKey::Index(stop.index),
                });
            }
            AnthropicStreamEvent::MessageDelta(delta) => {
                if let Some(reason) = delta.delta.stop_reason.as_deref() {
                    out.push(ChunkAction::FinishReason(anthropic_finish_to_canonical(
                        reason,
                    )));
                }
                if let Some(usage) = delta.usage {
                    out.push(ChunkAction::Usage(anthropic_usage_to_canonical(&usage)));
                }
            }
            AnthropicStreamEvent::MessageStop | AnthropicStreamEvent::Ping => {}
            AnthropicStreamEvent::Error(event) => {
                let error = event.error;
                let message = if error.type_.is_empty() {
                    error.message
                } else {
                    format!("{}: {}", error.type_, error.message)
                };
                out.push(ChunkAction::ProtocolError(message));
            }
            AnthropicStreamEvent::Unknown(name) => {
                debug!(event = %name, "ignoring unknown anthropic stream event");
            }
        }
    }
}

fn push_delta(out: &mut Vec<ChunkAction>, key: BlockKey, delta: String) {
    if !delta.is_empty() {
        out.push(ChunkAction::Delta { key, delta });
    }
}

impl ChunkMapper for AnthropicChunkMapper {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn map_record(&mut self, event: &SseEvent, out: &mut Vec<ChunkAction>) -> Result<(), SdkError> {
        let parsed = parse_anthropic_stream_event(event.event.as_deref(), &event.data)?;
        self.map_event(parsed, out);
        Ok(())
    }
}
