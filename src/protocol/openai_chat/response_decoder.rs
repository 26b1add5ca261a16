use crate::error::SdkError;
use crate::protocol::canonical::{CanonicalResponse, ContentItem, FinishReason};
use crate::protocol::mapping::{openai_finish_to_canonical, openai_usage_to_canonical, parse_tool_input};

use super::stream::annotation_to_source;
use super::OpenAiChatResponse;

/// Decode a complete Chat Completions response body.
///
/// # Errors
///
/// Returns [`SdkError::Decode`] when the body is not valid JSON for the
/// response shape, and the errors of [`decode_openai_chat_response`].
pub fn decode_openai_chat_response_bytes(body: &[u8]) -> Result<CanonicalResponse, SdkError> {
    let response: OpenAiChatResponse = serde_json::from_slice(body)?;
    decode_openai_chat_response(response)
}

/// Decode a parsed Chat Completions response into canonical form.
///
/// Only the first choice is mapped. Content order is reasoning, text, tool
/// calls, then sources.
///
/// # Errors
///
/// Returns [`SdkError::Protocol`] when the body is an error object or has no
/// choices.
pub fn decode_openai_chat_response(
    response: OpenAiChatResponse,
) -> Result<CanonicalResponse, SdkError> {
    if let Some(error) = response.error {
        return Err(SdkError::Protocol(error.message));
    }

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| SdkError::Protocol("OpenAI response has no choices".into()))?;
    let mut message = choice.message;

    // --- content ---
    let mut content = Vec::new();
    if let Some(reasoning) = message.take_reasoning() {
        content.push(ContentItem::Reasoning(reasoning));
    }
    if let Some(text) = message.content.filter(|text| !text.is_empty()) {
        content.push(ContentItem::Text(text));
    }
    for (index, tool_call) in message.tool_calls.into_iter().flatten().enumerate() {
        content.push(ContentItem::ToolCall {
            id: tool_call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{index}")),
            input: parse_tool_input(&tool_call.function.arguments),
            name: tool_call.function.name,
        });
    }
    let mut source_seq = 0usize;
    for annotation in message.annotations.into_iter().flatten() {
        let source = annotation_to_source(annotation, || {
            let id = format!("source-{source_seq}");
            source_seq += 1;
            id
        });
        content.extend(source.map(ContentItem::Source));
    }

    // --- finish reason ---
    let finish_reason = choice
        .finish_reason
        .as_deref()
        .map_or(FinishReason::Unknown, openai_finish_to_canonical);

    // --- usage ---
    let usage = response
        .usage
        .as_ref()
        .map(openai_usage_to_canonical)
        .unwrap_or_default();

    Ok(CanonicalResponse {
        id: response.id,
        model: response.model,
        content,
        finish_reason,
        usage,
    })
}
