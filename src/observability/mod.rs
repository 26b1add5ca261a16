use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::protocol::canonical::{FinishReason, Usage};

/// Map a configured log level to a tracing filter directive.
///
/// - "DISABLED" -> `None`, no subscriber should be installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (TRACE, DEBUG, INFO, WARN, ERROR)
#[must_use]
pub fn filter_directive(log_level: &str) -> Option<String> {
    let level = log_level.to_uppercase();
    match level.as_str() {
        "DISABLED" => None,
        "WARNING" => Some("WARN".to_string()),
        "CRITICAL" => Some("ERROR".to_string()),
        _ => Some(level),
    }
}

/// Install a global tracing subscriber at the configured log level.
///
/// Intended for binaries and examples embedding the SDK; the library itself
/// only emits events. Calling this twice, or after another subscriber was
/// installed, leaves the existing subscriber in place.
pub fn init_tracing(log_level: &str) {
    let Some(directive) = filter_directive(log_level) else {
        return;
    };

    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("INFO"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Log the outcome of a completed stream.
pub fn log_stream_complete(
    provider: &str,
    finish_reason: FinishReason,
    usage: &Usage,
    elapsed: Duration,
) {
    info!(
        provider,
        finish_reason = ?finish_reason,
        input_tokens = usage.input.total.unwrap_or(0),
        output_tokens = usage.output.total.unwrap_or(0),
        cache_read_tokens = usage.input.cache_read.unwrap_or(0),
        reasoning_tokens = usage.output.reasoning.unwrap_or(0),
        duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "stream complete"
    );
}
