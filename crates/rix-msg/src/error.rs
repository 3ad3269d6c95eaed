/// Errors that can occur while encoding, decoding or streaming messages.
#[derive(Debug, thiserror::Error)]
pub enum MsgError {
    /// A read would run past the end of the supplied buffer.
    #[error("truncated input: need {needed} bytes at offset {offset}, buffer holds {len}")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },

    /// A string field does not contain valid UTF-8.
    #[error("string field is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A bool field holds a byte other than 0 or 1.
    #[error("invalid bool byte {0:#04x}")]
    InvalidBool(u8),

    /// The message exceeds the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing messages.
    #[error("message I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete message was received.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, MsgError>;
