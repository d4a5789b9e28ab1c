//! Response buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for buffer management. A response is complete
//! once the accumulated bytes end with the ACK token; the buffer is then
//! split off and reset for the next response.
//!
//! # Example
//!
//! ```
//! use betwire_client::protocol::ResponseBuffer;
//!
//! let mut buffer = ResponseBuffer::new("PONG");
//!
//! assert!(buffer.push(b"PROCESSING|PO").is_none());
//! let response = buffer.push(b"NG").unwrap();
//! assert_eq!(&response[..], b"PROCESSING|PONG");
//! ```

use bytes::{Bytes, BytesMut};

/// Buffer for accumulating response bytes until the ACK suffix arrives.
///
/// The whole response is returned, including whatever came before the ACK.
pub struct ResponseBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Terminator the response must end with.
    ack: Bytes,
}

impl ResponseBuffer {
    /// Create a buffer terminated by `ack`.
    pub fn new(ack: &str) -> Self {
        Self::with_capacity(ack, 1024)
    }

    /// Create a buffer with a custom initial capacity.
    pub fn with_capacity(ack: &str, capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            ack: Bytes::copy_from_slice(ack.as_bytes()),
        }
    }

    /// Push data from a read and return the full response once complete.
    ///
    /// Returns `None` while the accumulated bytes do not end with the ACK
    /// token. On completion the buffer is reset for the next response.
    pub fn push(&mut self, data: &[u8]) -> Option<Bytes> {
        self.buffer.extend_from_slice(data);

        if self.buffer.ends_with(&self.ack) {
            Some(self.buffer.split().freeze())
        } else {
            None
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The bytes received so far, for diagnostics on failed reads.
    pub fn partial(&self) -> &[u8] {
        &self.buffer
    }
}
