use std::fmt;

use serde::{Deserialize, Serialize};

/// The wire dialect an upstream service speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
    Other,
    #[default]
    Unknown,
}

/// Input-side token counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputUsage {
    pub total: Option<u64>,
    pub no_cache: Option<u64>,
    pub cache_read: Option<u64>,
    pub cache_write: Option<u64>,
}

/// Output-side token counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputUsage {
    pub total: Option<u64>,
    pub text: Option<u64>,
    pub reasoning: Option<u64>,
}

/// Token usage. Every field stays `None` until a vendor reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input: InputUsage,
    pub output: OutputUsage,
}

impl Usage {
    /// Overlay `newer` onto `self`: each reported field replaces the held one,
    /// unreported fields keep their previous value.
    pub fn merge(&mut self, newer: &Usage) {
        fn overlay(slot: &mut Option<u64>, newer: Option<u64>) {
            if newer.is_some() {
                *slot = newer;
            }
        }
        overlay(&mut self.input.total, newer.input.total);
        overlay(&mut self.input.no_cache, newer.input.no_cache);
        overlay(&mut self.input.cache_read, newer.input.cache_read);
        overlay(&mut self.input.cache_write, newer.input.cache_write);
        overlay(&mut self.output.total, newer.output.total);
        overlay(&mut self.output.text, newer.output.text);
        overlay(&mut self.output.reasoning, newer.output.reasoning);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Usage::default()
    }

    #[must_use]
    pub fn total_tokens(&self) -> Option<u64> {
        match (self.input.total, self.output.total) {
            (None, None) => None,
            (input, output) => Some(input.unwrap_or(0).saturating_add(output.unwrap_or(0))),
        }
    }
}

/// A citation attached to the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cited_text: Option<String>,
}

/// A non-fatal note produced while preparing the request, surfaced on
/// `stream_start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Warning {
    Unsupported {
        feature: String,
        details: Option<String>,
    },
    Other {
        message: String,
    },
}

/// A single event delivered to a stream consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamPart {
    StreamStart {
        warnings: Vec<Warning>,
    },
    ResponseMetadata {
        id: Option<String>,
        model: Option<String>,
    },
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    ReasoningStart {
        id: String,
    },
    ReasoningDelta {
        id: String,
        delta: String,
    },
    ReasoningEnd {
        id: String,
    },
    ToolInputStart {
        id: String,
        name: String,
    },
    ToolInputDelta {
        id: String,
        delta: String,
    },
    ToolInputEnd {
        id: String,
    },
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    Source(Source),
    Finish {
        reason: FinishReason,
        usage: Usage,
    },
    Error {
        message: String,
    },
    Raw {
        chunk: serde_json::Value,
    },
}

impl StreamPart {
    /// Short kebab-case label, used for logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            StreamPart::StreamStart { .. } => "stream-start",
            StreamPart::ResponseMetadata { .. } => "response-metadata",
            StreamPart::TextStart { .. } => "text-start",
            StreamPart::TextDelta { .. } => "text-delta",
            StreamPart::TextEnd { .. } => "text-end",
            StreamPart::ReasoningStart { .. } => "reasoning-start",
            StreamPart::ReasoningDelta { .. } => "reasoning-delta",
            StreamPart::ReasoningEnd { .. } => "reasoning-end",
            StreamPart::ToolInputStart { .. } => "tool-input-start",
            StreamPart::ToolInputDelta { .. } => "tool-input-delta",
            StreamPart::ToolInputEnd { .. } => "tool-input-end",
            StreamPart::ToolCall { .. } => "tool-call",
            StreamPart::Source(_) => "source",
            StreamPart::Finish { .. } => "finish",
            StreamPart::Error { .. } => "error",
            StreamPart::Raw { .. } => "raw",
        }
    }
}

/// One structural block of a complete (non-streaming) response.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Text(String),
    Reasoning(String),
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    Source(Source),
}

/// The provider-agnostic view of a complete response.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalResponse {
    pub id: Option<String>,
    pub model: Option<String>,
    pub content: Vec<ContentItem>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl CanonicalResponse {
    /// Concatenated text of all `Text` items.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for item in &self.content {
            if let ContentItem::Text(text) = item {
                out.push_str(text);
            }
        }
        out
    }
}
