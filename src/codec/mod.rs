//! Binary stream codec
//!
//! Maps typed values to and from the firmware's packed, little-endian byte
//! layout. Everything the agent exchanges with the DSP goes through this
//! module.
//!
//! # Value categories
//!
//! - **Integers**: copied verbatim in little-endian order
//! - **Enumerations**: always four bytes on the wire, see [`FirmwareEnum`]
//! - **Fixed-size arrays**: element by element
//! - **Compound types**: implement [`Streamable`] field by field
//! - **Sequences**: a count of caller-chosen width ([`SizeType`]) followed by
//!   the elements, see [`ByteStreamReader::read_vec`]
//!
//! # Example
//!
//! ```ignore
//! use dsp_debug_agent::codec::{ByteStreamReader, ByteStreamWriter};
//!
//! let mut writer = ByteStreamWriter::new();
//! writer.write_vec::<u32, u16>(&[1, 2, 3]);
//!
//! let bytes = writer.into_inner();
//! let mut reader = ByteStreamReader::new(&bytes);
//! let values = reader.read_vec::<u32, u16>()?;
//! assert!(reader.is_eos());
//! ```

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{StreamError, StreamResult};
pub use reader::ByteStreamReader;
pub use writer::ByteStreamWriter;

/// A value with a fixed firmware wire representation.
pub trait Streamable: Sized {
    /// Encoded size when it does not depend on the value
    const WIRE_SIZE: Option<usize> = None;

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self>;

    fn write_to(&self, writer: &mut ByteStreamWriter);
}

/// Firmware enumerations travel as `u32` whatever their native width.
///
/// Decoding never fails: values outside the known set are kept as raw
/// numbers so they can be reported.
pub trait FirmwareEnum: Copy {
    fn to_raw(self) -> u32;
    fn from_raw(raw: u32) -> Self;
}

/// Integer types usable as a sequence count prefix.
pub trait SizeType: Streamable + Copy {
    fn to_count(self) -> usize;
    fn from_count(count: usize) -> Self;
    fn fits(count: usize) -> bool;
}

macro_rules! impl_integer {
    ($($ty:ty),+) => {
        $(
            impl Streamable for $ty {
                const WIRE_SIZE: Option<usize> = Some(std::mem::size_of::<$ty>());

                #[inline]
                fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
                    Ok(<$ty>::from_le_bytes(reader.read_bytes()?))
                }

                #[inline]
                fn write_to(&self, writer: &mut ByteStreamWriter) {
                    writer.write_raw(&self.to_le_bytes());
                }
            }
        )+
    };
}

impl_integer!(u8, u16, u32, u64, i8, i16, i32, i64);

macro_rules! impl_size_type {
    ($($ty:ty),+) => {
        $(
            impl SizeType for $ty {
                #[inline]
                fn to_count(self) -> usize {
                    self as usize
                }

                #[inline]
                fn from_count(count: usize) -> Self {
                    count as $ty
                }

                #[inline]
                fn fits(count: usize) -> bool {
                    <$ty>::try_from(count).is_ok()
                }
            }
        )+
    };
}

impl_size_type!(u8, u16, u32);

impl<T: Streamable, const N: usize> Streamable for [T; N] {
    const WIRE_SIZE: Option<usize> = match T::WIRE_SIZE {
        Some(size) => Some(size * N),
        None => None,
    };

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(reader.read::<T>()?);
        }
        items
            .try_into()
            .map_err(|_| StreamError::Invalid(format!("expected {} array elements", N)))
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        for item in self {
            writer.write(item);
        }
    }
}

/// Declares a firmware enumeration with its display names.
///
/// The generated type has one variant per known value plus `Unknown(u32)`,
/// and implements [`FirmwareEnum`], [`Streamable`] and `Display`.
#[macro_export]
macro_rules! firmware_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr => $label:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)+
            /// Value not known to this agent
            Unknown(u32),
        }

        impl $name {
            /// Every known variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Unknown(_) => "unknown",
                }
            }

            pub fn is_known(self) -> bool {
                !matches!(self, $name::Unknown(_))
            }
        }

        impl $crate::codec::FirmwareEnum for $name {
            fn to_raw(self) -> u32 {
                match self {
                    $($name::$variant => $value,)+
                    $name::Unknown(raw) => raw,
                }
            }

            fn from_raw(raw: u32) -> Self {
                match raw {
                    $(v if v == $value => $name::$variant,)+
                    other => $name::Unknown(other),
                }
            }
        }

        impl $crate::codec::Streamable for $name {
            const WIRE_SIZE: Option<usize> = Some(4);

            fn read_from(
                reader: &mut $crate::codec::ByteStreamReader<'_>,
            ) -> $crate::codec::StreamResult<Self> {
                reader
                    .read::<u32>()
                    .map(<$name as $crate::codec::FirmwareEnum>::from_raw)
            }

            fn write_to(&self, writer: &mut $crate::codec::ByteStreamWriter) {
                writer.write(&<$name as $crate::codec::FirmwareEnum>::to_raw(*self));
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $name::Unknown(raw) => write!(f, "unknown ({})", raw),
                    known => f.write_str(known.name()),
                }
            }
        }
    };
}

/// Encode a single value into a fresh buffer
pub fn encode<T: Streamable>(value: &T) -> Vec<u8> {
    let mut writer = ByteStreamWriter::new();
    writer.write(value);
    writer.into_inner()
}

/// Decode a single value from the start of `bytes`.
///
/// Trailing bytes are ignored; use [`decode_exact`] when the buffer must hold
/// exactly one value.
pub fn decode<T: Streamable>(bytes: &[u8]) -> StreamResult<T> {
    ByteStreamReader::new(bytes).read()
}

/// Decode a value that must span the whole buffer
pub fn decode_exact<T: Streamable>(bytes: &[u8]) -> StreamResult<T> {
    let mut reader = ByteStreamReader::new(bytes);
    let value = reader.read()?;
    if !reader.is_eos() {
        return Err(StreamError::Invalid(format!(
            "{} trailing bytes after value",
            reader.remaining()
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    firmware_enum! {
        /// Enumeration used by the codec tests
        pub enum Color {
            Red = 0 => "red",
            Green = 1 => "green",
            Blue = 0x10 => "blue",
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Sample {
        id: u16,
        color: Color,
        levels: [u8; 3],
        values: Vec<i32>,
    }

    impl Streamable for Sample {
        fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
            Ok(Self {
                id: reader.read()?,
                color: reader.read()?,
                levels: reader.read()?,
                values: reader.read_vec::<u16, i32>()?,
            })
        }

        fn write_to(&self, writer: &mut ByteStreamWriter) {
            writer.write(&self.id);
            writer.write(&self.color);
            writer.write(&self.levels);
            writer.write_vec::<u16, i32>(&self.values);
        }
    }

    #[test]
    fn test_enum_is_four_bytes() {
        assert_eq!(encode(&Color::Blue), vec![0x10, 0, 0, 0]);
        assert_eq!(<Color as Streamable>::WIRE_SIZE, Some(4));
    }

    #[test]
    fn test_enum_unknown_value_preserved() {
        let color: Color = decode(&[0x42, 0, 0, 0]).unwrap();
        assert_eq!(color, Color::Unknown(0x42));
        assert!(!color.is_known());
        assert_eq!(encode(&color), vec![0x42, 0, 0, 0]);
        assert_eq!(color.to_string(), "unknown (66)");
    }

    #[test]
    fn test_compound_layout() {
        let sample = Sample {
            id: 0x0102,
            color: Color::Green,
            levels: [1, 2, 3],
            values: vec![-1],
        };
        let bytes = encode(&sample);
        assert_eq!(
            bytes,
            vec![
                0x02, 0x01, // id
                0x01, 0x00, 0x00, 0x00, // color
                1, 2, 3, // levels
                0x01, 0x00, // count
                0xFF, 0xFF, 0xFF, 0xFF, // values[0]
            ]
        );
        assert_eq!(decode::<Sample>(&bytes).unwrap(), sample);
    }

    #[test]
    fn test_array_wire_size() {
        assert_eq!(<[u32; 4] as Streamable>::WIRE_SIZE, Some(16));
        assert_eq!(<[Sample; 2] as Streamable>::WIRE_SIZE, None);
    }

    #[test]
    fn test_decode_exact_rejects_trailing_bytes() {
        assert_eq!(decode_exact::<u16>(&[1, 0]).unwrap(), 1);
        assert!(matches!(
            decode_exact::<u16>(&[1, 0, 0]),
            Err(StreamError::Invalid(_))
        ));
    }

    use proptest::prelude::*;

    fn color_strategy() -> impl Strategy<Value = Color> {
        prop_oneof![
            Just(Color::Red),
            Just(Color::Green),
            Just(Color::Blue),
            (0x11u32..).prop_map(Color::Unknown),
        ]
    }

    proptest! {
        #[test]
        fn test_compound_round_trip(
            id in any::<u16>(),
            color in color_strategy(),
            levels in any::<[u8; 3]>(),
            values in prop::collection::vec(any::<i32>(), 0..64),
        ) {
            let sample = Sample { id, color, levels, values };
            let bytes = encode(&sample);
            prop_assert_eq!(decode_exact::<Sample>(&bytes).unwrap(), sample);
        }

        #[test]
        fn test_truncated_buffer_is_eos(values in prop::collection::vec(any::<u32>(), 1..32)) {
            let mut writer = ByteStreamWriter::new();
            writer.write_vec::<u32, u32>(&values);
            let bytes = writer.into_inner();

            for cut in 0..bytes.len() {
                let mut reader = ByteStreamReader::new(&bytes[..cut]);
                prop_assert_eq!(reader.read_vec::<u32, u32>(), Err(StreamError::EndOfStream));
                prop_assert!(reader.is_eos());
            }
        }

        #[test]
        fn test_integer_round_trip(a in any::<u64>(), b in any::<i64>(), c in any::<i8>()) {
            let mut writer = ByteStreamWriter::new();
            writer.write(&a);
            writer.write(&b);
            writer.write(&c);
            let bytes = writer.into_inner();
            prop_assert_eq!(bytes.len(), 17);

            let mut reader = ByteStreamReader::new(&bytes);
            prop_assert_eq!(reader.read::<u64>().unwrap(), a);
            prop_assert_eq!(reader.read::<i64>().unwrap(), b);
            prop_assert_eq!(reader.read::<i8>().unwrap(), c);
            prop_assert!(reader.is_eos());
        }
    }
}
