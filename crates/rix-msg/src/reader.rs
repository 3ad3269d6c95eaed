use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{decode_body, StreamConfig};
use crate::error::{MsgError, Result};
use crate::message::Message;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads size-prefixed messages from any `Read` stream.
///
/// Handles partial reads internally; callers only ever see whole messages.
/// Works with both blocking and non-blocking sources.
pub struct MessageReader<R> {
    inner: R,
    buf: BytesMut,
    config: StreamConfig,
}

impl<R: Read> MessageReader<R> {
    /// Create a new message reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, StreamConfig::default())
    }

    /// Create a new message reader with explicit configuration.
    pub fn with_config(inner: R, config: StreamConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete message.
    ///
    /// Returns `Ok(None)` when a non-blocking source has no more data for now,
    /// and `Err(MsgError::ConnectionClosed)` at end of stream. A body that
    /// fails to decode is dropped and its error returned; the next call
    /// resumes at the following message.
    pub fn read_message<M: Message>(&mut self) -> Result<Option<M>> {
        loop {
            if let Some(body) = decode_body(&mut self.buf, self.config.max_message_size)? {
                trace!(size = body.len(), "decoding message body");
                return M::from_bytes(&body).map(Some);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(err) => return Err(MsgError::Io(err)),
            };

            if read == 0 {
                return Err(MsgError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes received but not yet returned as a message.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::encode_message;
    use crate::writer::MessageWriter;

    crate::message! {
        struct Note {
            id: u16,
            text: String,
        }
    }

    fn note(id: u16, text: &str) -> Note {
        Note {
            id,
            text: text.to_string(),
        }
    }

    fn wire(notes: &[Note]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for n in notes {
            encode_message(n, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_multiple_messages() {
        let bytes = wire(&[note(1, "one"), note(2, "two"), note(3, "three")]);
        let mut reader = MessageReader::new(Cursor::new(bytes));

        for (id, text) in [(1, "one"), (2, "two"), (3, "three")] {
            let msg: Note = reader.read_message().unwrap().unwrap();
            assert_eq!(msg, note(id, text));
        }
        assert!(matches!(
            reader.read_message::<Note>(),
            Err(MsgError::ConnectionClosed)
        ));
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[note(4, "slow")]),
            pos: 0,
        };
        let mut reader = MessageReader::new(byte_reader);

        let msg: Note = reader.read_message().unwrap().unwrap();
        assert_eq!(msg, note(4, "slow"));
    }

    #[test]
    fn connection_closed_mid_message() {
        let mut bytes = wire(&[note(5, "cut short")]);
        bytes.truncate(bytes.len() - 2);

        let mut reader = MessageReader::new(Cursor::new(bytes));
        let err = reader.read_message::<Note>().unwrap_err();
        assert!(matches!(err, MsgError::ConnectionClosed));
        assert!(reader.buffered() > 0);
    }

    #[test]
    fn oversized_message_in_stream() {
        let cfg = StreamConfig {
            max_message_size: 4,
        };
        let mut reader = MessageReader::with_config(
            Cursor::new(wire(&[note(6, "too long for the limit")])),
            cfg,
        );
        let err = reader.read_message::<Note>().unwrap_err();
        assert!(matches!(err, MsgError::MessageTooLarge { .. }));
    }

    #[test]
    fn undecodable_body_is_skipped() {
        let mut bytes = 3u32.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);
        bytes.extend(wire(&[note(7, "after")]));

        let mut reader = MessageReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read_message::<Note>(),
            Err(MsgError::Truncated { .. })
        ));
        let msg: Note = reader.read_message().unwrap().unwrap();
        assert_eq!(msg, note(7, "after"));
    }

    #[test]
    fn would_block_returns_none_then_resumes() {
        let source = WouldBlockThenData {
            blocked: false,
            bytes: wire(&[note(8, "ok")]),
            pos: 0,
        };
        let mut reader = MessageReader::new(source);
        assert!(reader.read_message::<Note>().unwrap().is_none());

        let msg: Note = reader.read_message().unwrap().unwrap();
        assert_eq!(msg, note(8, "ok"));
    }

    #[test]
    fn interrupted_read_retries() {
        let source = InterruptedThenData {
            interrupted: false,
            bytes: wire(&[note(9, "retry")]),
            pos: 0,
        };
        let mut reader = MessageReader::new(source);
        let msg: Note = reader.read_message().unwrap().unwrap();
        assert_eq!(msg, note(9, "retry"));
    }

    #[test]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        writer.write_message(&note(10, "ping")).unwrap();
        writer.write_message(&note(11, "pong")).unwrap();

        let first: Note = reader.read_message().unwrap().unwrap();
        let second: Note = reader.read_message().unwrap().unwrap();
        assert_eq!((first.id, second.id), (10, 11));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = MessageReader::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(reader.config().max_message_size, crate::DEFAULT_MAX_MESSAGE);
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct WouldBlockThenData {
        blocked: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.blocked {
                self.blocked = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
