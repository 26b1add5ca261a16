mod http_transport;

pub use http_transport::HttpTransport;

use std::ops::ControlFlow;

use crate::error::SdkError;

/// Receiver for the raw body of a streaming response.
///
/// The transport calls `on_chunk` for every body chunk in arrival order and
/// then exactly one of `on_complete` or `on_error`, unless `on_chunk` returned
/// [`ControlFlow::Break`], in which case it stops reading and calls nothing
/// further.
pub trait ChunkSink {
    fn on_chunk(&mut self, bytes: &[u8]) -> ControlFlow<()>;
    fn on_complete(&mut self);
    fn on_error(&mut self, error: SdkError);
}
