use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_message, StreamConfig};
use crate::error::{MsgError, Result};
use crate::wire::Wire;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes size-prefixed messages to any `Write` stream.
///
/// Each message goes out as one contiguous buffer (prefix then body).
pub struct MessageWriter<W> {
    inner: W,
    buf: BytesMut,
    config: StreamConfig,
}

impl<W: Write> MessageWriter<W> {
    /// Create a new message writer with default configuration.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, StreamConfig::default())
    }

    /// Create a new message writer with explicit configuration.
    pub fn with_config(inner: W, config: StreamConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and write one message (blocking).
    pub fn write_message<M: Wire + ?Sized>(&mut self, msg: &M) -> Result<()> {
        let size = msg.size();
        if size > self.config.max_message_size {
            return Err(MsgError::MessageTooLarge {
                size,
                max: self.config.max_message_size,
            });
        }

        self.buf.clear();
        encode_message(msg, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(MsgError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(MsgError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(MsgError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}
