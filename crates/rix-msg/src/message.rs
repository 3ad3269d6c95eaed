use crate::error::Result;
use crate::wire::Wire;

/// A structured record made of [`Wire`] fields laid out in declaration order.
///
/// Messages nest: any message is itself a valid field of another message,
/// array or vector. Implement it with the [`message!`](crate::message) macro.
pub trait Message: Wire + Default {
    /// Serialize into a freshly allocated buffer of exactly `size()` bytes.
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.size()];
        let mut offset = 0;
        self.serialize(&mut buf, &mut offset);
        debug_assert_eq!(offset, buf.len());
        buf
    }

    /// Decode a message from the start of `src`.
    ///
    /// Trailing bytes after the message are ignored.
    fn from_bytes(src: &[u8]) -> Result<Self> {
        let mut msg = Self::default();
        let mut offset = 0;
        msg.deserialize(src, &mut offset)?;
        Ok(msg)
    }
}

/// Declare a message struct and derive its wire encoding from the field list.
///
/// Fields are encoded in the order written, with no padding or tags. Every
/// field type must implement [`Wire`] and `Default`; the struct also derives
/// `Debug`, `Clone`, `Default` and `PartialEq`.
///
/// ```
/// rix_msg::message! {
///     /// A labelled reading.
///     pub struct Reading {
///         pub id: u32,
///         pub label: String,
///         pub samples: Vec<f32>,
///     }
/// }
///
/// use rix_msg::{Message, Wire};
///
/// let reading = Reading { id: 1, label: "imu".into(), samples: vec![0.5] };
/// let bytes = reading.to_bytes();
/// assert_eq!(bytes.len(), reading.size());
/// assert_eq!(Reading::from_bytes(&bytes).unwrap(), reading);
/// ```
#[macro_export]
macro_rules! message {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Wire for $name {
            fn size(&self) -> usize {
                0 $( + $crate::Wire::size(&self.$field) )*
            }

            #[allow(unused_variables)]
            fn serialize(&self, dst: &mut [u8], offset: &mut usize) {
                $( $crate::Wire::serialize(&self.$field, dst, offset); )*
            }

            #[allow(unused_variables)]
            fn deserialize(
                &mut self,
                src: &[u8],
                offset: &mut usize,
            ) -> $crate::Result<()> {
                $( $crate::Wire::deserialize(&mut self.$field, src, offset)?; )*
                Ok(())
            }
        }

        impl $crate::Message for $name {}
    };
}
