//! Ordered delivery of stream parts to a consumer.

use std::ops::ControlFlow;

use tracing::{debug, warn};

use crate::error::SdkError;
use crate::protocol::canonical::{FinishReason, StreamPart, Usage, Warning};

/// Receives the canonical parts of one stream.
///
/// Returning [`ControlFlow::Break`] from `on_part` cancels the stream; the
/// consumer then sees `on_complete(Some(SdkError::Cancelled))` and nothing
/// else.
pub trait StreamConsumer {
    fn on_part(&mut self, part: &StreamPart) -> ControlFlow<()>;

    /// Called exactly once. `None` means the stream finished normally.
    fn on_complete(&mut self, error: Option<&SdkError>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmitterState {
    Idle,
    Streaming,
    Completed,
}

/// Delivery guard around a [`StreamConsumer`].
///
/// Guarantees: `stream-start` is the first part and is delivered once, at
/// most one `finish` is delivered, completion is signalled once, and nothing
/// is delivered after completion.
pub struct Emitter<C> {
    consumer: C,
    state: EmitterState,
    finish_sent: bool,
}

impl<C: StreamConsumer> Emitter<C> {
    #[must_use]
    pub fn new(consumer: C) -> Self {
        Self {
            consumer,
            state: EmitterState::Idle,
            finish_sent: false,
        }
    }

    /// Deliver `stream-start`. Only the first call has an effect.
    pub fn start(&mut self, warnings: Vec<Warning>) -> ControlFlow<()> {
        match self.state {
            EmitterState::Completed => return ControlFlow::Break(()),
            EmitterState::Streaming => return ControlFlow::Continue(()),
            EmitterState::Idle => {}
        }
        self.state = EmitterState::Streaming;
        self.deliver(&StreamPart::StreamStart { warnings })
    }

    /// Deliver one part, starting the stream first if needed.
    pub fn emit(&mut self, part: StreamPart) -> ControlFlow<()> {
        if self.state == EmitterState::Idle {
            self.start(Vec::new())?;
        }
        if self.state == EmitterState::Completed {
            debug!(part = part.label(), "dropping part after completion");
            return ControlFlow::Break(());
        }
        match part {
            StreamPart::StreamStart { .. } => {
                debug!("dropping duplicate stream-start");
                return ControlFlow::Continue(());
            }
            StreamPart::Finish { .. } if self.finish_sent => {
                debug!("dropping duplicate finish");
                return ControlFlow::Continue(());
            }
            StreamPart::Finish { .. } => self.finish_sent = true,
            _ => {}
        }
        self.deliver(&part)
    }

    /// Signal completion. Only the first call has an effect.
    ///
    /// A normal completion without a preceding `finish` gets a synthetic
    /// `finish` with an unknown reason first.
    pub fn complete(&mut self, error: Option<SdkError>) {
        if self.state == EmitterState::Completed {
            return;
        }
        if error.is_none() && !self.finish_sent {
            warn!("completing stream without finish, emitting one");
            if self
                .emit(StreamPart::Finish {
                    reason: FinishReason::Unknown,
                    usage: Usage::default(),
                })
                .is_break()
            {
                return;
            }
        }
        self.state = EmitterState::Completed;
        self.consumer.on_complete(error.as_ref());
    }

    fn deliver(&mut self, part: &StreamPart) -> ControlFlow<()> {
        let flow = self.consumer.on_part(part);
        if flow.is_break() {
            debug!(part = part.label(), "consumer cancelled stream");
            self.complete(Some(SdkError::Cancelled));
        }
        flow
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state != EmitterState::Idle
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == EmitterState::Completed
    }

    #[must_use]
    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    #[must_use]
    pub fn into_consumer(self) -> C {
        self.consumer
    }
}

// ---------------------------------------------------------------------------
// PartCollector
// ---------------------------------------------------------------------------

/// Consumer that records everything it receives.
#[derive(Debug, Default)]
pub struct PartCollector {
    pub parts: Vec<StreamPart>,
    /// Number of `on_complete` calls seen.
    pub completions: usize,
    /// Display form of the completion error, if any.
    pub error: Option<String>,
    cancel_after: Option<usize>,
}

impl PartCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector that cancels the stream after receiving `count` parts.
    #[must_use]
    pub fn cancel_after(count: usize) -> Self {
        Self {
            cancel_after: Some(count),
            ..Self::default()
        }
    }

    /// Labels of the received parts, in order.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        self.parts.iter().map(StreamPart::label).collect()
    }

    /// Concatenation of all text deltas.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let StreamPart::TextDelta { delta, .. } = part {
                out.push_str(delta);
            }
        }
        out
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completions > 0
    }
}

impl StreamConsumer for PartCollector {
    fn on_part(&mut self, part: &StreamPart) -> ControlFlow<()> {
        self.parts.push(part.clone());
        match self.cancel_after {
            Some(limit) if self.parts.len() >= limit => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }

    fn on_complete(&mut self, error: Option<&SdkError>) {
        self.completions += 1;
        self.error = error.map(ToString::to_string);
    }
}
