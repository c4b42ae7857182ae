//! Framed message channel for NETCONF sessions.

use std::time::Duration;

use bytes::Bytes;
use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::buffer::{END_OF_MESSAGE, FrameBuffer};
use crate::error::NetconfError;

/// Size of each read from the underlying stream.
const READ_CHUNK: usize = 4096;

/// Message channel over an SSH subsystem (or any byte stream).
///
/// Writes whole messages followed by the end-of-message marker and reads
/// until the next complete message has been received.
pub struct FramedChannel<S> {
    /// Underlying byte stream.
    stream: S,

    /// Received bytes awaiting framing.
    buffer: FrameBuffer,

    /// Default timeout for reads.
    timeout: Duration,

    /// Whether the channel is open.
    is_open: bool,
}

impl<S> FramedChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a stream with the given read timeout.
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            stream,
            buffer: FrameBuffer::new(),
            timeout,
            is_open: true,
        }
    }

    /// Send one message followed by the end-of-message marker.
    pub async fn send(&mut self, message: &str) -> Result<(), NetconfError> {
        if !self.is_open {
            return Err(NetconfError::Closed);
        }
        trace!("netconf >> {}", message);

        let mut frame = Vec::with_capacity(message.len() + END_OF_MESSAGE.len());
        frame.extend_from_slice(message.as_bytes());
        frame.extend_from_slice(END_OF_MESSAGE);

        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read the next complete message within the channel timeout.
    pub async fn recv(&mut self) -> Result<Bytes, NetconfError> {
        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.recv_frame())
            .await
            .map_err(|_| NetconfError::Timeout(timeout))?
    }

    async fn recv_frame(&mut self) -> Result<Bytes, NetconfError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.buffer.next_frame() {
                trace!("netconf << {}", String::from_utf8_lossy(&frame));
                return Ok(frame);
            }

            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                self.is_open = false;
                return Err(NetconfError::Closed);
            }
            self.buffer.extend(&chunk[..n]);
        }
    }

    /// Shut down the write half of the stream.
    pub async fn shutdown(&mut self) -> Result<(), NetconfError> {
        self.is_open = false;
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Check if the channel is open.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Get the read timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether anything other than whitespace was received but never framed.
    pub fn has_unread(&self) -> bool {
        !self.buffer.is_blank()
    }
}
