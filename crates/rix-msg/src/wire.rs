//! Value kinds and their byte encodings.
//!
//! Wire format:
//! ```text
//! Number      raw native-endian image, size_of::<T>() bytes, no tag
//! String      u32 byte length │ UTF-8 bytes (no terminator)
//! [T; N]      N consecutive T encodings, no prefix
//! Vec<T>      u32 element count │ count T encodings
//! message     its fields in declaration order, no framing
//! ```
//!
//! Numbers are copied by raw byte image, so producer and consumer must share
//! endianness and float representation. The format carries no field tags or
//! version; the reader must know the layout out of band.

use crate::error::{MsgError, Result};

/// Size of the `u32` length/count prefix on strings and vectors.
pub const LEN_PREFIX_SIZE: usize = 4;

/// A value that can be sized, serialized and deserialized.
///
/// `size()` always equals the number of bytes `serialize` writes.
pub trait Wire {
    /// Encoded size in bytes.
    fn size(&self) -> usize;

    /// Write exactly `size()` bytes at `*offset` and advance it.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is shorter than `*offset + self.size()`, or if a string
    /// or vector is longer than `u32::MAX`. Callers size the buffer first.
    fn serialize(&self, dst: &mut [u8], offset: &mut usize);

    /// Decode from `src` at `*offset`, replacing `self`, and advance `offset`.
    ///
    /// Every read is bounds-checked against `src.len()` before it happens.
    /// On error `self` and `*offset` are left in an unspecified state.
    fn deserialize(&mut self, src: &[u8], offset: &mut usize) -> Result<()>;
}

/// Borrow `n` bytes at `*offset` and advance past them.
pub fn take<'a>(src: &'a [u8], offset: &mut usize, n: usize) -> Result<&'a [u8]> {
    let start = *offset;
    let end = start
        .checked_add(n)
        .filter(|&end| end <= src.len())
        .ok_or(MsgError::Truncated {
            offset: start,
            needed: n,
            len: src.len(),
        })?;
    *offset = end;
    Ok(&src[start..end])
}

/// Copy `bytes` to `*offset` and advance past them.
pub fn put(dst: &mut [u8], offset: &mut usize, bytes: &[u8]) {
    let end = *offset + bytes.len();
    dst[*offset..end].copy_from_slice(bytes);
    *offset = end;
}

fn put_len(dst: &mut [u8], offset: &mut usize, len: usize) {
    assert!(
        len <= u32::MAX as usize,
        "length {len} does not fit the u32 prefix"
    );
    (len as u32).serialize(dst, offset);
}

fn take_len(src: &[u8], offset: &mut usize) -> Result<usize> {
    let mut len = 0u32;
    len.deserialize(src, offset)?;
    Ok(len as usize)
}

macro_rules! impl_wire_number {
    ($($ty:ty),* $(,)?) => {$(
        impl Wire for $ty {
            fn size(&self) -> usize {
                std::mem::size_of::<$ty>()
            }

            fn serialize(&self, dst: &mut [u8], offset: &mut usize) {
                put(dst, offset, &self.to_ne_bytes());
            }

            fn deserialize(&mut self, src: &[u8], offset: &mut usize) -> Result<()> {
                let bytes = take(src, offset, std::mem::size_of::<$ty>())?;
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                *self = <$ty>::from_ne_bytes(raw);
                Ok(())
            }
        }
    )*};
}

impl_wire_number!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Wire for bool {
    fn size(&self) -> usize {
        1
    }

    fn serialize(&self, dst: &mut [u8], offset: &mut usize) {
        put(dst, offset, &[u8::from(*self)]);
    }

    fn deserialize(&mut self, src: &[u8], offset: &mut usize) -> Result<()> {
        *self = match take(src, offset, 1)?[0] {
            0 => false,
            1 => true,
            other => return Err(MsgError::InvalidBool(other)),
        };
        Ok(())
    }
}

impl Wire for String {
    fn size(&self) -> usize {
        LEN_PREFIX_SIZE + self.len()
    }

    fn serialize(&self, dst: &mut [u8], offset: &mut usize) {
        put_len(dst, offset, self.len());
        put(dst, offset, self.as_bytes());
    }

    fn deserialize(&mut self, src: &[u8], offset: &mut usize) -> Result<()> {
        let len = take_len(src, offset)?;
        let text = std::str::from_utf8(take(src, offset, len)?)?;
        self.clear();
        self.push_str(text);
        Ok(())
    }
}

impl<T: Wire, const N: usize> Wire for [T; N] {
    fn size(&self) -> usize {
        self.iter().map(Wire::size).sum()
    }

    fn serialize(&self, dst: &mut [u8], offset: &mut usize) {
        for item in self {
            item.serialize(dst, offset);
        }
    }

    fn deserialize(&mut self, src: &[u8], offset: &mut usize) -> Result<()> {
        for item in self.iter_mut() {
            item.deserialize(src, offset)?;
        }
        Ok(())
    }
}

impl<T: Wire + Default> Wire for Vec<T> {
    fn size(&self) -> usize {
        LEN_PREFIX_SIZE + self.iter().map(Wire::size).sum::<usize>()
    }

    fn serialize(&self, dst: &mut [u8], offset: &mut usize) {
        put_len(dst, offset, self.len());
        for item in self {
            item.serialize(dst, offset);
        }
    }

    fn deserialize(&mut self, src: &[u8], offset: &mut usize) -> Result<()> {
        let count = take_len(src, offset)?;
        let remaining = src.len().saturating_sub(*offset);
        // Zero-size elements consume no input, so the count alone would
        // bound the loop. Cap it at one element per remaining byte.
        if count > remaining && T::default().size() == 0 {
            return Err(MsgError::Truncated {
                offset: *offset,
                needed: count,
                len: src.len(),
            });
        }
        self.clear();
        // The count is untrusted; never reserve more than the input could hold.
        self.reserve(count.min(remaining));
        for _ in 0..count {
            let mut item = T::default();
            item.deserialize(src, offset)?;
            self.push(item);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: Wire>(value: &T) -> Vec<u8> {
        let mut buf = vec![0u8; value.size()];
        let mut offset = 0;
        value.serialize(&mut buf, &mut offset);
        assert_eq!(offset, buf.len(), "size() must match bytes written");
        buf
    }

    fn decode<T: Wire + Default>(src: &[u8]) -> Result<(T, usize)> {
        let mut value = T::default();
        let mut offset = 0;
        value.deserialize(src, &mut offset)?;
        Ok((value, offset))
    }

    fn assert_truncation_fails<T: Wire + Default>(value: &T) {
        let bytes = encode(value);
        for n in 0..bytes.len() {
            let Err(err) = decode::<T>(&bytes[..n]) else {
                panic!("prefix of {n} bytes decoded");
            };
            assert!(
                matches!(err, MsgError::Truncated { .. }),
                "prefix of {n} bytes gave {err}"
            );
        }
    }

    #[test]
    fn test_number_uses_native_byte_image() {
        assert_eq!(encode(&0x0102_0304u32), 0x0102_0304u32.to_ne_bytes());
        assert_eq!(encode(&-2i16), (-2i16).to_ne_bytes());
        assert_eq!(encode(&1.5f64), 1.5f64.to_ne_bytes());

        let (value, offset) = decode::<u64>(&u64::MAX.to_ne_bytes()).unwrap();
        assert_eq!(value, u64::MAX);
        assert_eq!(offset, 8);
    }

    #[test]
    fn test_truncated_u32_is_rejected() {
        let err = decode::<u32>(&[0x07, 0x00, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            MsgError::Truncated {
                offset: 0,
                needed: 4,
                len: 3
            }
        ));
    }

    #[test]
    fn test_deserialize_respects_starting_offset() {
        let mut buf = vec![0xFFu8; 2];
        buf.extend_from_slice(&9u16.to_ne_bytes());
        let mut value = 0u16;
        let mut offset = 2;
        value.deserialize(&buf, &mut offset).unwrap();
        assert_eq!((value, offset), (9, 4));

        let mut offset = 3;
        assert!(value.deserialize(&buf, &mut offset).is_err());
    }

    #[test]
    fn test_bool_rejects_non_canonical_bytes() {
        assert_eq!(encode(&true), [1]);
        assert!(!decode::<bool>(&[0]).unwrap().0);
        assert!(matches!(
            decode::<bool>(&[2]),
            Err(MsgError::InvalidBool(2))
        ));
    }

    #[test]
    fn test_string_is_length_prefixed() {
        let bytes = encode(&"abc".to_string());
        assert_eq!(&bytes[..4], &3u32.to_ne_bytes());
        assert_eq!(&bytes[4..], b"abc");

        let (text, offset) = decode::<String>(&bytes).unwrap();
        assert_eq!(text, "abc");
        assert_eq!(offset, 7);
    }

    #[test]
    fn test_empty_string_and_vector_are_bare_prefix() {
        assert_eq!(encode(&String::new()), [0, 0, 0, 0]);
        assert_eq!(encode(&Vec::<u64>::new()), [0, 0, 0, 0]);
        assert!(decode::<Vec<u64>>(&[0, 0, 0, 0]).unwrap().0.is_empty());
    }

    #[test]
    fn test_string_rejects_invalid_utf8() {
        let mut bytes = 2u32.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&[0xC3, 0x28]);
        assert!(matches!(
            decode::<String>(&bytes),
            Err(MsgError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_string_length_past_end_is_truncated() {
        let mut bytes = 10u32.to_ne_bytes().to_vec();
        bytes.extend_from_slice(b"short");
        assert!(matches!(
            decode::<String>(&bytes),
            Err(MsgError::Truncated {
                offset: 4,
                needed: 10,
                len: 9
            })
        ));
    }

    #[test]
    fn test_size_laws() {
        let text = "héllo".to_string();
        assert_eq!(text.size(), 4 + text.len());

        let numbers = vec![1u16, 2, 3];
        assert_eq!(numbers.size(), 4 + 3 * 2);

        let strings = vec!["a".to_string(), "bcd".to_string()];
        assert_eq!(strings.size(), 4 + (4 + 1) + (4 + 3));

        let fixed = [0f32; 5];
        assert_eq!(fixed.size(), 5 * 4);
    }

    #[test]
    fn test_fixed_array_has_no_prefix() {
        let bytes = encode(&[1u8, 2, 3]);
        assert_eq!(bytes, [1, 2, 3]);
        let (value, _) = decode::<[u8; 3]>(&bytes).unwrap();
        assert_eq!(value, [1, 2, 3]);
    }

    #[test]
    fn test_fixed_array_of_strings() {
        let value = ["x".to_string(), String::new(), "yz".to_string()];
        let bytes = encode(&value);
        let (decoded, offset) = decode::<[String; 3]>(&bytes).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(offset, bytes.len());
    }

    #[test]
    fn test_vector_of_strings_round_trips() {
        let value = vec!["one".to_string(), "".to_string(), "three".to_string()];
        let bytes = encode(&value);
        let (decoded, offset) = decode::<Vec<String>>(&bytes).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(offset, value.size());
    }

    #[test]
    fn test_huge_vector_count_fails_without_allocating() {
        let mut bytes = u32::MAX.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2, 3]);
        let mut value: Vec<u64> = Vec::new();
        let mut offset = 0;
        assert!(matches!(
            value.deserialize(&bytes, &mut offset),
            Err(MsgError::Truncated { .. })
        ));
        assert!(value.capacity() <= bytes.len());
    }

    #[derive(Default)]
    struct Nothing;

    impl Wire for Nothing {
        fn size(&self) -> usize {
            0
        }

        fn serialize(&self, _dst: &mut [u8], _offset: &mut usize) {}

        fn deserialize(&mut self, _src: &[u8], _offset: &mut usize) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_zero_size_element_count_is_bounded_by_input() {
        let bytes = u32::MAX.to_ne_bytes();
        let mut value: Vec<Nothing> = Vec::new();
        let mut offset = 0;
        assert!(matches!(
            value.deserialize(&bytes, &mut offset),
            Err(MsgError::Truncated {
                offset: 4,
                len: 4,
                ..
            })
        ));
        assert!(value.is_empty());

        let mut bytes = 2u32.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        let mut offset = 0;
        value.deserialize(&bytes, &mut offset).unwrap();
        assert_eq!(value.len(), 2);
        assert_eq!(offset, 4);
    }

    #[test]
    fn test_deserialize_replaces_previous_contents() {
        let mut value = vec![9u8; 10];
        let mut offset = 0;
        value.deserialize(&encode(&vec![1u8]), &mut offset).unwrap();
        assert_eq!(value, [1]);

        let mut text = "stale".to_string();
        let mut offset = 0;
        text.deserialize(&encode(&"new".to_string()), &mut offset)
            .unwrap();
        assert_eq!(text, "new");
    }

    #[test]
    fn test_truncation_law_for_composites() {
        assert_truncation_fails(&0xABCDu16);
        assert_truncation_fails(&"payload".to_string());
        assert_truncation_fails(&vec![1u32, 2, 3]);
        assert_truncation_fails(&vec!["a".to_string(), "bc".to_string()]);
        assert_truncation_fails(&[7i64, 8]);
    }

    #[test]
    #[should_panic]
    fn test_serialize_into_short_buffer_panics() {
        let mut buf = [0u8; 2];
        let mut offset = 0;
        7u32.serialize(&mut buf, &mut offset);
    }
}
