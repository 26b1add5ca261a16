/// SSE (Server-Sent Events) framer and stream utilities.
///
/// Splits a raw byte stream into `(event, data)` records, buffering partial
/// lines across chunk boundaries. Line handling follows the
/// [SSE specification](https://html.spec.whatwg.org/multipage/server-sent-events.html)
/// with two deliberate narrowings: lines without a `:` are ignored, and a
/// record whose data is exactly `[DONE]` is swallowed.
use super::SseEvent;
use crate::error::SdkError;
use futures_util::Stream;
use memchr::{memchr, memchr2};
use smallvec::SmallVec;

const DONE_SENTINEL: &str = "[DONE]";

struct PendingEvents {
    events: SmallVec<[SseEvent; 8]>,
    head: usize,
}

impl PendingEvents {
    #[inline]
    fn new() -> Self {
        Self {
            events: SmallVec::new(),
            head: 0,
        }
    }

    #[inline]
    fn pop_front(&mut self) -> Option<SseEvent> {
        if self.head >= self.events.len() {
            return None;
        }
        let event = std::mem::take(&mut self.events[self.head]);
        self.head += 1;
        if self.head == self.events.len() {
            self.events.clear();
            self.head = 0;
        }
        Some(event)
    }

    #[inline]
    fn push(&mut self, event: SseEvent) {
        self.events.push(event);
    }
}

// ---------------------------------------------------------------------------
// RecordState: fields of the record being assembled
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RecordState {
    event_type: Option<String>,
    data: String,
    has_data: bool,
}

impl RecordState {
    fn process_line<F: FnMut(SseEvent)>(&mut self, line: &[u8], on_event: &mut F) {
        if line.is_empty() {
            self.dispatch(on_event);
            return;
        }

        // Comment line, ignored
        if line[0] == b':' {
            return;
        }

        let Some(colon) = memchr(b':', line) else {
            return;
        };
        let field = &line[..colon];
        let value = &line[colon + 1..];
        let value = value.strip_prefix(b" ").unwrap_or(value);

        match field {
            b"data" => {
                if self.has_data {
                    self.data.push('\n');
                } else {
                    self.has_data = true;
                }
                self.data.push_str(&String::from_utf8_lossy(value));
            }
            b"event" => {
                self.event_type = Some(String::from_utf8_lossy(value).into_owned());
            }
            // id, retry and unknown field names carry nothing we surface
            _ => {}
        }
    }

    fn dispatch<F: FnMut(SseEvent)>(&mut self, on_event: &mut F) {
        let event_type = self.event_type.take();
        if !self.has_data {
            return;
        }
        self.has_data = false;
        if self.data == DONE_SENTINEL {
            self.data.clear();
            return;
        }
        on_event(SseEvent {
            event: event_type,
            data: std::mem::take(&mut self.data),
        });
    }

    fn is_empty(&self) -> bool {
        !self.has_data && self.event_type.is_none()
    }
}

// ---------------------------------------------------------------------------
// SseFramer: incremental byte-level SSE framer
// ---------------------------------------------------------------------------

/// Incremental SSE framer.
///
/// Feed it raw bytes in arbitrary pieces; complete records are dispatched
/// before `feed` returns, in arrival order. The dispatched sequence does not
/// depend on where the input was split, including splits inside a multi-byte
/// UTF-8 sequence or between `\r` and `\n`.
pub struct SseFramer {
    line: Vec<u8>,
    pending_cr: bool,
    record: RecordState,
    max_buffer: Option<usize>,
}

impl SseFramer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            line: Vec::new(),
            pending_cr: false,
            record: RecordState::default(),
            max_buffer: None,
        }
    }

    /// Framer that rejects input once the held bytes (unterminated line plus
    /// the data of the undispatched record) would exceed `limit`.
    #[must_use]
    pub fn with_max_buffer(limit: usize) -> Self {
        Self {
            max_buffer: Some(limit),
            ..Self::new()
        }
    }

    /// Feed raw bytes, dispatching every completed record to `on_event`.
    ///
    /// Line rules:
    /// - `\n`, `\r\n` and bare `\r` all terminate a line
    /// - an empty line dispatches the buffered record (if it has data)
    /// - `:`-prefixed lines are comments; lines without `:` are ignored
    /// - one leading space after the field colon is stripped
    /// - `event:` sets the type of the next record (last value wins)
    /// - `data:` lines accumulate, joined with `\n`
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::BufferLimitExceeded`] without consuming any input
    /// when the held bytes plus `chunk` would exceed the limit.
    pub fn feed<F: FnMut(SseEvent)>(&mut self, chunk: &[u8], mut on_event: F) -> Result<(), SdkError> {
        if let Some(limit) = self.max_buffer {
            let buffered = self.buffered_len();
            if buffered.saturating_add(chunk.len()) > limit {
                return Err(SdkError::BufferLimitExceeded {
                    buffered,
                    incoming: chunk.len(),
                    limit,
                });
            }
        }

        let mut bytes = chunk;
        if self.pending_cr && !bytes.is_empty() {
            self.pending_cr = false;
            if bytes[0] == b'\n' {
                bytes = &bytes[1..];
            }
        }

        let mut start = 0usize;
        while let Some(rel_pos) = memchr2(b'\n', b'\r', &bytes[start..]) {
            let line_end = start + rel_pos;
            if self.line.is_empty() {
                self.record.process_line(&bytes[start..line_end], &mut on_event);
            } else {
                self.line.extend_from_slice(&bytes[start..line_end]);
                let line = std::mem::take(&mut self.line);
                self.record.process_line(&line, &mut on_event);
                self.line = line;
                self.line.clear();
            }

            let mut next = line_end + 1;
            if bytes[line_end] == b'\r' {
                if next == bytes.len() {
                    self.pending_cr = true;
                } else if bytes[next] == b'\n' {
                    next += 1;
                }
            }
            start = next;
        }

        self.line.extend_from_slice(&bytes[start..]);
        Ok(())
    }

    /// Feed raw bytes and append complete events into a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// See [`SseFramer::feed`].
    pub fn feed_into(&mut self, chunk: &[u8], out: &mut Vec<SseEvent>) -> Result<(), SdkError> {
        self.feed(chunk, |event| out.push(event))
    }

    /// Feed raw bytes and return the completed events.
    ///
    /// # Errors
    ///
    /// See [`SseFramer::feed`].
    pub fn feed_vec(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, SdkError> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out)?;
        Ok(out)
    }

    /// Drop all buffered state so the framer can be reused for a new stream.
    pub fn reset(&mut self) {
        self.line.clear();
        self.pending_cr = false;
        self.record = RecordState::default();
    }

    /// Bytes held between records: the unterminated line plus the data
    /// accumulated for the record not yet dispatched.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.line.len().saturating_add(self.record.data.len())
    }

    /// Whether a partial line or an undispatched record is held.
    #[must_use]
    pub fn has_partial_record(&self) -> bool {
        !self.line.is_empty() || !self.record.is_empty()
    }
}

impl Default for SseFramer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Stream utility
// ---------------------------------------------------------------------------

/// Split a byte stream into SSE events using [`SseFramer`].
///
/// A transport error or a framing error is yielded once as `Err` and ends
/// the stream. A partial record left at end of input is discarded.
pub fn sse_event_stream<S, B, E>(
    byte_stream: S,
    max_buffer: Option<usize>,
) -> impl Stream<Item = Result<SseEvent, SdkError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send + 'static,
{
    use futures_util::StreamExt;

    let framer = max_buffer.map_or_else(SseFramer::new, SseFramer::with_max_buffer);

    futures_util::stream::unfold(
        (Box::pin(byte_stream), framer, PendingEvents::new(), false),
        |(mut stream, mut framer, mut pending, done)| async move {
            loop {
                if let Some(event) = pending.pop_front() {
                    return Some((Ok(event), (stream, framer, pending, done)));
                }
                if done {
                    return None;
                }

                match stream.as_mut().next().await {
                    Some(Ok(bytes)) => {
                        if let Err(err) = framer.feed(bytes.as_ref(), |event| pending.push(event)) {
                            return Some((Err(err), (stream, framer, pending, true)));
                        }
                    }
                    Some(Err(err)) => {
                        let err = SdkError::Transport(err.to_string());
                        return Some((Err(err), (stream, framer, pending, true)));
                    }
                    None => return None,
                }
            }
        },
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
