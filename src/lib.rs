pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod stream;
pub mod transport;

pub use error::SdkError;
pub use protocol::canonical::{
    CanonicalResponse, ContentItem, FinishReason, ProviderKind, Source, StreamPart, Usage, Warning,
};
pub use protocol::{decode_response, mapper_for};
pub use stream::{PartCollector, SseEvent, SseFramer, StreamConsumer, StreamOptions, StreamPipeline};
pub use transport::{ChunkSink, HttpTransport};
