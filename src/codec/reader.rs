//! Cursor-based reader over an immutable byte buffer.

use super::error::{StreamError, StreamResult};
use super::{SizeType, Streamable};

/// Reads firmware values from a byte slice.
///
/// Every read either consumes exactly the bytes of the value or fails. A read
/// that runs past the end moves the cursor to the end of the buffer, so
/// [`is_eos`](Self::is_eos) keeps reporting `true` after the failure.
#[derive(Debug, Clone)]
pub struct ByteStreamReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteStreamReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// True once every byte has been consumed (or a read overran the buffer)
    #[inline]
    pub fn is_eos(&self) -> bool {
        self.position >= self.buffer.len()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// The whole underlying buffer, independent of the cursor
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Bytes not read yet
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.buffer[self.position.min(self.buffer.len())..]
    }

    fn take(&mut self, len: usize) -> StreamResult<&'a [u8]> {
        match self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.buffer.len())
        {
            Some(end) => {
                let bytes = &self.buffer[self.position..end];
                self.position = end;
                Ok(bytes)
            }
            None => {
                self.position = self.buffer.len();
                Err(StreamError::EndOfStream)
            }
        }
    }

    /// Read a fixed number of bytes into an array
    pub fn read_bytes<const N: usize>(&mut self) -> StreamResult<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read `len` raw bytes without any size prefix.
    ///
    /// The bounds check happens before anything is allocated, so a bogus
    /// length taken from the stream cannot trigger a huge allocation.
    pub fn read_raw(&mut self, len: usize) -> StreamResult<Vec<u8>> {
        self.take(len).map(<[u8]>::to_vec)
    }

    /// Read one value
    pub fn read<T: Streamable>(&mut self) -> StreamResult<T> {
        T::read_from(self)
    }

    /// Read a sequence prefixed by a count of type `C`.
    ///
    /// The count is untrusted: elements are appended one by one so that a
    /// corrupt count ends with [`StreamError::EndOfStream`] instead of an
    /// allocation sized by the count.
    pub fn read_vec<C: SizeType, T: Streamable>(&mut self) -> StreamResult<Vec<T>> {
        let count = self.read::<C>()?.to_count();
        let mut values = Vec::new();
        for _ in 0..count {
            values.push(self.read::<T>()?);
        }
        Ok(values)
    }
}
