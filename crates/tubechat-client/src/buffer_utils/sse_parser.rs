use futures::{Stream, StreamExt};

use super::buffering::CircularLineBuffer;
use crate::error::{GatewayError, Result};
use crate::traits::EventStream;

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
    pub retry: Option<u64>,
}

impl SseFrame {
    /// Frames without an `event:` field (or `event: message`) carry updates
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

/// Incremental EventSource decoder
///
/// Feed raw body chunks with [`SseDecoder::push`]; a frame is dispatched on
/// each blank line. Call [`SseDecoder::finish`] at end of body to flush a
/// trailing frame that was never terminated.
pub struct SseDecoder {
    buffer: CircularLineBuffer,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
    retry: Option<u64>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self {
            buffer: CircularLineBuffer::with_capacity(4096),
            event: None,
            data: Vec::new(),
            id: None,
            retry: None,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<SseFrame>> {
        self.buffer.extend(bytes);

        let mut frames = Vec::new();
        while let Some(line_result) = self.buffer.next_line() {
            match line_result {
                Ok(line) => {
                    if let Some(frame) = self.process_line(&line) {
                        frames.push(Ok(frame));
                    }
                }
                Err(e) => frames.push(Err(e)),
            }
        }
        frames
    }

    pub fn finish(&mut self) -> Option<Result<SseFrame>> {
        match self.buffer.take_remaining() {
            Some(Ok(line)) => {
                if let Some(frame) = self.process_line(&line) {
                    return Some(Ok(frame));
                }
            }
            Some(Err(e)) => return Some(Err(e)),
            None => {}
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch().and_then(|r| r.ok());
        }

        // comment / keep-alive
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse() {
                    self.retry = Some(ms);
                }
            }
            other => tracing::trace!(field = other, "Ignoring unknown SSE field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<Result<SseFrame>> {
        let event = self.event.take();
        let retry = self.retry.take();
        if self.data.is_empty() {
            return None;
        }

        Some(Ok(SseFrame {
            event,
            data: std::mem::take(&mut self.data).join("\n"),
            id: self.id.clone(),
            retry,
        }))
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a chunked response body into the `data` payloads of its message
/// events. Transport errors are yielded once and end the stream.
pub fn decode_event_stream<S, B, E>(body: S) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Send,
    GatewayError: From<E>,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(body);
        let mut decoder = SseDecoder::new();

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    for frame in decoder.push(bytes.as_ref()) {
                        match frame {
                            Ok(frame) if frame.is_message() => yield Ok(frame.data),
                            Ok(frame) => {
                                tracing::debug!(event = ?frame.event, "Skipping non-message SSE event");
                            }
                            Err(e) => yield Err(e),
                        }
                    }
                }
                Err(e) => {
                    yield Err(GatewayError::from(e));
                    return;
                }
            }
        }

        match decoder.finish() {
            Some(Ok(frame)) if frame.is_message() => yield Ok(frame.data),
            Some(Err(e)) => yield Err(e),
            _ => {}
        }
    })
}
