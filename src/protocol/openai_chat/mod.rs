pub mod response_decoder;
pub mod stream;

use serde::Deserialize;

/// `OpenAI` Chat Completion response wire type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
    #[serde(default)]
    pub error: Option<OpenAiErrorBody>,
}

/// A single choice in the response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: OpenAiMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message in a complete response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(default)]
    pub annotations: Option<Vec<OpenAiAnnotation>>,
}

/// First non-empty of `reasoning_content` and `reasoning`. Compatible
/// vendors use either key and some send both.
fn first_reasoning(reasoning_content: Option<String>, reasoning: Option<String>) -> Option<String> {
    reasoning_content
        .filter(|text| !text.is_empty())
        .or_else(|| reasoning.filter(|text| !text.is_empty()))
}

impl OpenAiMessage {
    pub fn take_reasoning(&mut self) -> Option<String> {
        first_reasoning(self.reasoning_content.take(), self.reasoning.take())
    }
}

/// A complete tool call within a message.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub function: OpenAiToolCallFunction,
}

/// The function part of a complete tool call.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiToolCallFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Message annotation; only `url_citation` is mapped.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiAnnotation {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub url_citation: Option<OpenAiUrlCitation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiUrlCitation {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Usage info. Compatible vendors omit fields freely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiUsage {
    #[serde(default)]
    pub prompt_tokens: Option<u64>,
    #[serde(default)]
    pub completion_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
    #[serde(default)]
    pub prompt_tokens_details: Option<OpenAiPromptTokensDetails>,
    #[serde(default)]
    pub completion_tokens_details: Option<OpenAiCompletionTokensDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiPromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiCompletionTokensDetails {
    #[serde(default)]
    pub reasoning_tokens: Option<u64>,
}

/// Error object, top-level in bodies and mid-stream chunks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

/// A streaming chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiStreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<OpenAiStreamChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
    #[serde(default)]
    pub error: Option<OpenAiErrorBody>,
}

/// A choice within a stream chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiStreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Option<OpenAiDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Delta content within a stream choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAiStreamToolCall>>,
    #[serde(default)]
    pub annotations: Option<Vec<OpenAiAnnotation>>,
}

impl OpenAiDelta {
    pub fn take_reasoning(&mut self) -> Option<String> {
        first_reasoning(self.reasoning_content.take(), self.reasoning.take())
    }
}

/// A tool call delta in streaming.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiStreamToolCall {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<OpenAiStreamToolCallFunction>,
}

/// Function delta within a streaming tool call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiStreamToolCallFunction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}
