use std::collections::VecDeque;

use crate::error::{GatewayError, Result};

/// Circular buffer for line-based parsing of a chunked byte stream
/// Chunks may split lines (and UTF-8 sequences) anywhere
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
}

impl CircularLineBuffer {
    /// Create a new buffer with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    /// Add bytes to the buffer
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Extract next line (up to \n) from buffer, without its line ending.
    /// Returns None if no complete line is available
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(decode_line(line_bytes))
    }

    /// Drain whatever is left after the last newline (end of body)
    pub fn take_remaining(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        let line_bytes: Vec<u8> = self.buffer.drain(..).collect();
        Some(decode_line(line_bytes))
    }

    /// Current buffer size
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn decode_line(mut line_bytes: Vec<u8>) -> Result<String> {
    if line_bytes.last() == Some(&b'\n') {
        line_bytes.pop();
    }
    if line_bytes.last() == Some(&b'\r') {
        line_bytes.pop();
    }

    String::from_utf8(line_bytes)
        .map_err(|e| GatewayError::Stream(format!("Invalid UTF-8: {}", e)))
}
