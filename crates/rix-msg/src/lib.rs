//! Self-describing binary messages and size-prefixed stream framing.
//!
//! A message is a flat run of its fields in declaration order:
//! - numbers as their native-endian byte image
//! - strings and vectors as a `u32` count followed by the elements
//! - fixed arrays and nested messages inline, with no count
//!
//! On a byte stream each message is preceded by its size as a `u32`.
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod error;
pub mod geometry;
pub mod message;
pub mod reader;
pub mod standard;
pub mod wire;
pub mod writer;

pub use codec::{
    decode_body, decode_message, encode_message, StreamConfig, DEFAULT_MAX_MESSAGE, SIZE_PREFIX,
};
pub use error::{MsgError, Result};
pub use message::Message;
pub use reader::MessageReader;
pub use wire::{Wire, LEN_PREFIX_SIZE};
pub use writer::MessageWriter;
