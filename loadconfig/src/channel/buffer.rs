//! Frame buffer with incremental delimiter search.
//!
//! NETCONF 1.0 terminates every message with `]]>]]>`. Replies can be large
//! (a full `show | compare` on a core router), so the buffer remembers how far
//! it has already scanned and only searches the newly arrived tail, backing up
//! just enough to catch a delimiter split across two reads.

use bytes::{Bytes, BytesMut};
use memchr::memmem;

/// End-of-message marker for NETCONF base:1.0 framing (RFC 6242 §4.3).
pub const END_OF_MESSAGE: &[u8] = b"]]>]]>";

/// Buffer for accumulating stream bytes and splitting them into messages.
#[derive(Debug)]
pub struct FrameBuffer {
    /// The accumulated, not yet framed, bytes.
    buffer: BytesMut,

    /// Offset up to which the buffer holds no complete delimiter.
    scanned: usize,
}

impl FrameBuffer {
    /// Create an empty frame buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            scanned: 0,
        }
    }

    /// Append newly received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Split off the next complete message, without its delimiter.
    ///
    /// Returns `None` when no delimiter has arrived yet. Bytes after the
    /// delimiter stay buffered for the next call.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        let start = self.scanned.saturating_sub(END_OF_MESSAGE.len() - 1);
        match memmem::find(&self.buffer[start..], END_OF_MESSAGE) {
            Some(pos) => {
                let end = start + pos;
                let frame = self.buffer.split_to(end).freeze();
                let _ = self.buffer.split_to(END_OF_MESSAGE.len());
                self.scanned = 0;
                Some(frame)
            }
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }

    /// Number of buffered bytes not yet returned as a frame.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether only whitespace is buffered (what devices send after the last frame).
    pub fn is_blank(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
