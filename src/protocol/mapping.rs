use super::anthropic::AnthropicUsage;
use super::canonical::{FinishReason, InputUsage, OutputUsage, Usage};
use super::openai_chat::OpenAiUsage;

// ---------------------------------------------------------------------------
// Finish reason mappings
// ---------------------------------------------------------------------------

#[must_use]
pub fn openai_finish_to_canonical(s: &str) -> FinishReason {
    match s {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        // Documented by OpenAI-compatible vendors but without a canonical bucket.
        "insufficient_system_resource" => FinishReason::Other,
        _ => FinishReason::Unknown,
    }
}

#[must_use]
pub fn anthropic_finish_to_canonical(s: &str) -> FinishReason {
    match s {
        "end_turn" | "stop_sequence" | "pause_turn" => FinishReason::Stop,
        "max_tokens" | "model_context_window_exceeded" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        "refusal" => FinishReason::ContentFilter,
        _ => FinishReason::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Usage mappings
// ---------------------------------------------------------------------------

/// Convert an `OpenAI` usage object to canonical usage.
#[must_use]
pub fn openai_usage_to_canonical(usage: &OpenAiUsage) -> Usage {
    let cached = usage
        .prompt_tokens_details
        .as_ref()
        .and_then(|details| details.cached_tokens);
    let reasoning = usage
        .completion_tokens_details
        .as_ref()
        .and_then(|details| details.reasoning_tokens);

    Usage {
        input: InputUsage {
            total: usage.prompt_tokens,
            no_cache: usage
                .prompt_tokens
                .map(|prompt| prompt.saturating_sub(cached.unwrap_or(0))),
            cache_read: cached,
            cache_write: None,
        },
        output: OutputUsage {
            total: usage.completion_tokens,
            text: usage
                .completion_tokens
                .map(|completion| completion.saturating_sub(reasoning.unwrap_or(0))),
            reasoning,
        },
    }
}

/// Convert an Anthropic usage object to canonical usage.
///
/// Anthropic reports cache reads and writes separately from `input_tokens`,
/// so the canonical input total is their sum.
#[must_use]
pub fn anthropic_usage_to_canonical(usage: &AnthropicUsage) -> Usage {
    let input_total = usage.input_tokens.map(|input| {
        input
            .saturating_add(usage.cache_read_input_tokens.unwrap_or(0))
            .saturating_add(usage.cache_creation_input_tokens.unwrap_or(0))
    });

    Usage {
        input: InputUsage {
            total: input_total,
            no_cache: usage.input_tokens,
            cache_read: usage.cache_read_input_tokens,
            cache_write: usage.cache_creation_input_tokens,
        },
        output: OutputUsage {
            total: usage.output_tokens,
            text: None,
            reasoning: None,
        },
    }
}

// ---------------------------------------------------------------------------
// Tool input
// ---------------------------------------------------------------------------

/// Parse accumulated tool-call argument text into a JSON value.
///
/// Empty input means "no arguments" and yields `{}`. Malformed input also
/// degrades to `{}`; a tool call is never dropped because of its arguments.
#[must_use]
pub fn parse_tool_input(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::Value::Object(serde_json::Map::new());
    }
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, len = raw.len(), "malformed tool input, using empty object");
            serde_json::Value::Object(serde_json::Map::new())
        }
    }
}

/// Whether `raw` is already one complete JSON document.
#[must_use]
pub fn is_complete_json(raw: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(raw).is_ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
