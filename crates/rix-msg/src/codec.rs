use bytes::{Buf, Bytes, BytesMut};

use crate::error::{MsgError, Result};
use crate::message::Message;
use crate::wire::{Wire, LEN_PREFIX_SIZE};

/// Stream prefix: the body size as a `u32` in the wire encoding.
pub const SIZE_PREFIX: usize = LEN_PREFIX_SIZE;

/// Default maximum message body size: 1 MiB.
pub const DEFAULT_MAX_MESSAGE: usize = 1024 * 1024;

/// Append a size-prefixed message to `dst`.
///
/// Stream format:
/// ```text
/// ┌──────────────┬──────────────────────────┐
/// │ Size (4B)    │ Message body              │
/// │ u32 native   │ (Size bytes, wire format) │
/// └──────────────┴──────────────────────────┘
/// ```
pub fn encode_message<M: Wire + ?Sized>(msg: &M, dst: &mut BytesMut) -> Result<()> {
    let size = msg.size();
    if size > u32::MAX as usize {
        return Err(MsgError::MessageTooLarge {
            size,
            max: u32::MAX as usize,
        });
    }

    let start = dst.len();
    dst.resize(start + SIZE_PREFIX + size, 0);
    let mut offset = start;
    (size as u32).serialize(&mut dst[..], &mut offset);
    msg.serialize(&mut dst[..], &mut offset);
    debug_assert_eq!(offset, dst.len());
    Ok(())
}

/// Split the next complete message body off the front of `src`.
///
/// Returns `Ok(None)` if `src` doesn't hold a whole message yet. An oversize
/// prefix is rejected before any body bytes are awaited.
pub fn decode_body(src: &mut BytesMut, max_size: usize) -> Result<Option<Bytes>> {
    if src.len() < SIZE_PREFIX {
        return Ok(None);
    }

    let mut size = 0u32;
    let mut offset = 0;
    size.deserialize(&src[..SIZE_PREFIX], &mut offset)?;
    let size = size as usize;

    if size > max_size {
        return Err(MsgError::MessageTooLarge {
            size,
            max: max_size,
        });
    }

    if src.len() < SIZE_PREFIX + size {
        return Ok(None);
    }

    src.advance(SIZE_PREFIX);
    Ok(Some(src.split_to(size).freeze()))
}

/// Decode the next complete message from the front of `src`.
///
/// The body is consumed even when it fails to decode, so the stream stays
/// aligned on the following message.
pub fn decode_message<M: Message>(src: &mut BytesMut, max_size: usize) -> Result<Option<M>> {
    match decode_body(src, max_size)? {
        Some(body) => M::from_bytes(&body).map(Some),
        None => Ok(None),
    }
}

/// Configuration for message streams.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Maximum message body size in bytes. Default: 1 MiB.
    pub max_message_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE,
        }
    }
}
