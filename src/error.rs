use crate::config::ConfigError;

/// Error type shared by the framer, the aggregator, the one-shot mappers and
/// the transport adapter.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("SSE buffer limit exceeded: buffered={buffered}, incoming={incoming}, limit={limit}")]
    BufferLimitExceeded {
        buffered: usize,
        incoming: usize,
        limit: usize,
    },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Stream cancelled by consumer")]
    Cancelled,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Broad error class, used to label diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Framing,
    Decode,
    Transport,
    Protocol,
    Cancelled,
    Config,
}

impl SdkError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SdkError::BufferLimitExceeded { .. } => ErrorKind::Framing,
            SdkError::Decode(_) => ErrorKind::Decode,
            SdkError::Transport(_) | SdkError::Upstream { .. } => ErrorKind::Transport,
            SdkError::Protocol(_) => ErrorKind::Protocol,
            SdkError::Cancelled => ErrorKind::Cancelled,
            SdkError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the error ends the stream it occurred on.
    ///
    /// Decode and protocol errors are reported inline and the stream keeps
    /// going; everything else is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Decode | ErrorKind::Protocol)
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for SdkError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return SdkError::Upstream {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        SdkError::Transport(err.to_string())
    }
}
