pub mod response_decoder;
pub mod stream;

use serde::Deserialize;

/// Anthropic Messages API response wire type.
///
/// Every field is optional so that partial or error-shaped bodies still
/// deserialize; the decoder decides what is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicResponse {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<AnthropicUsage>,
    #[serde(default)]
    pub error: Option<AnthropicErrorBody>,
}

/// A content block in an Anthropic response or `content_block_start` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: String,
        #[serde(default)]
        citations: Option<Vec<AnthropicCitation>>,
    },
    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(rename = "redacted_thinking")]
    RedactedThinking {},
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

/// A citation on a text block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicCitation {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub document_title: Option<String>,
    #[serde(default)]
    pub cited_text: Option<String>,
}

/// Anthropic usage. Stream events report subsets of these fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
}

/// Error body, both top-level and in stream `error` events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicErrorBody {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub message: String,
}

/// Anthropic SSE stream event.
///
/// Discriminated by the SSE `event:` name, or by the payload's `type` field
/// when the record carries no name.
#[derive(Debug, Clone)]
pub enum AnthropicStreamEvent {
    MessageStart(AnthropicMessageStartEvent),
    ContentBlockStart(AnthropicContentBlockStartEvent),
    ContentBlockDelta(AnthropicContentBlockDeltaEvent),
    ContentBlockStop(AnthropicContentBlockStopEvent),
    MessageDelta(AnthropicMessageDeltaEvent),
    MessageStop,
    Ping,
    Error(AnthropicErrorEvent),
    Unknown(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicMessageStartEvent {
    pub message: AnthropicMessageStart,
}

/// Message envelope carried by `message_start`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicMessageStart {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<AnthropicUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicContentBlockStartEvent {
    pub index: usize,
    pub content_block: AnthropicContentBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicContentBlockDeltaEvent {
    pub index: usize,
    pub delta: AnthropicDelta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicContentBlockStopEvent {
    pub index: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicMessageDeltaEvent {
    #[serde(default)]
    pub delta: AnthropicMessageDeltaBody,
    #[serde(default)]
    pub usage: Option<AnthropicUsage>,
}

/// Message delta body (`stop_reason` etc).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicMessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub stop_sequence: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicErrorEvent {
    #[serde(default)]
    pub error: AnthropicErrorBody,
}

/// Delta variants for content block deltas.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "thinking_delta")]
    ThinkingDelta { thinking: String },
    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
    #[serde(rename = "signature_delta")]
    SignatureDelta {},
    #[serde(rename = "citations_delta")]
    CitationsDelta { citation: AnthropicCitation },
    #[serde(other)]
    Other,
}
