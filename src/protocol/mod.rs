pub mod anthropic;
pub mod canonical;
pub mod mapping;
pub mod openai_chat;

use crate::error::SdkError;
use crate::stream::ChunkMapper;

use self::anthropic::response_decoder::decode_anthropic_response_bytes;
use self::anthropic::stream::AnthropicChunkMapper;
use self::canonical::{CanonicalResponse, ProviderKind};
use self::openai_chat::response_decoder::decode_openai_chat_response_bytes;
use self::openai_chat::stream::OpenAiChunkMapper;

/// Fresh stream mapper for `provider`. Each stream needs its own mapper.
#[must_use]
pub fn mapper_for(provider: ProviderKind) -> Box<dyn ChunkMapper + Send> {
    match provider {
        ProviderKind::OpenAi => Box::new(OpenAiChunkMapper::new()),
        ProviderKind::Anthropic => Box::new(AnthropicChunkMapper::new()),
    }
}

/// Decode a complete (non-streaming) response body from `provider`.
///
/// # Errors
///
/// Returns [`SdkError::Decode`] for bodies that are not valid JSON of the
/// vendor's response shape and [`SdkError::Protocol`] for error bodies.
pub fn decode_response(provider: ProviderKind, body: &[u8]) -> Result<CanonicalResponse, SdkError> {
    match provider {
        ProviderKind::OpenAi => decode_openai_chat_response_bytes(body),
        ProviderKind::Anthropic => decode_anthropic_response_bytes(body),
    }
}
