use crate::error::SdkError;
use crate::protocol::anthropic::stream::citation_to_source;
use crate::protocol::anthropic::{AnthropicContentBlock, AnthropicResponse};
use crate::protocol::canonical::{CanonicalResponse, ContentItem, FinishReason};
use crate::protocol::mapping::{anthropic_finish_to_canonical, anthropic_usage_to_canonical};

/// Decode a complete Anthropic Messages response body.
///
/// # Errors
///
/// Returns [`SdkError::Decode`] when the body is not valid JSON for the
/// response shape, and [`SdkError::Protocol`] when the body is an error
/// object.
pub fn decode_anthropic_response_bytes(body: &[u8]) -> Result<CanonicalResponse, SdkError> {
    let response: AnthropicResponse = serde_json::from_slice(body)?;
    decode_anthropic_response(response)
}

/// Decode a parsed Anthropic Messages response into canonical form.
///
/// # Errors
///
/// Returns [`SdkError::Protocol`] when the response is an error object.
pub fn decode_anthropic_response(
    response: AnthropicResponse,
) -> Result<CanonicalResponse, SdkError> {
    if let Some(error) = response.error {
        return Err(SdkError::Protocol(if error.type_.is_empty() {
            error.message
        } else {
            format!("{}: {}", error.type_, error.message)
        }));
    }
    if response.type_.as_deref() == Some("error") {
        return Err(SdkError::Protocol("error response without details".into()));
    }

    // --- content blocks ---
    let mut content = Vec::with_capacity(response.content.len());
    let mut source_seq = 0usize;
    for block in response.content {
        match block {
            AnthropicContentBlock::Text { text, citations } => {
                content.push(ContentItem::Text(text));
                for citation in citations.into_iter().flatten() {
                    let id = format!("source-{source_seq}");
                    source_seq += 1;
                    content.push(ContentItem::Source(citation_to_source(citation, id)));
                }
            }
            AnthropicContentBlock::Thinking { thinking } => {
                content.push(ContentItem::Reasoning(thinking));
            }
            AnthropicContentBlock::ToolUse { id, name, input } => {
                let input = if input.is_null() {
                    serde_json::Value::Object(serde_json::Map::new())
                } else {
                    input
                };
                content.push(ContentItem::ToolCall { id, name, input });
            }
            AnthropicContentBlock::RedactedThinking {} | AnthropicContentBlock::Other => {}
        }
    }

    // --- finish reason ---
    let finish_reason = response
        .stop_reason
        .as_deref()
        .map_or(FinishReason::Unknown, anthropic_finish_to_canonical);

    // --- usage ---
    let usage = response
        .usage
        .as_ref()
        .map(anthropic_usage_to_canonical)
        .unwrap_or_default();

    Ok(CanonicalResponse {
        id: response.id,
        model: response.model,
        content,
        finish_reason,
        usage,
    })
}
