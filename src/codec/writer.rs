//! Append-only writer producing firmware wire bytes.

use super::{SizeType, Streamable};

/// Serializes values into a growable buffer. There is no capacity limit.
#[derive(Debug, Default, Clone)]
pub struct ByteStreamWriter {
    buffer: Vec<u8>,
}

impl ByteStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write<T: Streamable>(&mut self, value: &T) {
        value.write_to(self);
    }

    /// Write a count of type `C` followed by every element.
    ///
    /// Callers keep sequences within the range of `C`; firmware structures
    /// never come close to it.
    pub fn write_vec<C: SizeType, T: Streamable>(&mut self, values: &[T]) {
        debug_assert!(C::fits(values.len()));
        self.write(&C::from_count(values.len()));
        for value in values {
            self.write(value);
        }
    }

    /// Append bytes verbatim, without a size prefix
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}
