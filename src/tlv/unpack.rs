//! Record-by-record TLV decoding.

use super::dictionary::{TlvDictionary, TlvResponseHandler};
use super::error::TlvError;
use crate::codec::ByteStreamReader;

/// Walks a TLV list and dispatches every record to the handler's dictionary.
///
/// Creating the unpacker invalidates every field of the handler, so values
/// from an earlier response never survive a failed parse.
///
/// # Example
///
/// ```ignore
/// let mut config = FwConfig::default();
/// let mut unpack = TlvUnpack::new(&mut config, &bytes);
/// loop {
///     match unpack.read_next() {
///         Ok(true) => {}
///         Ok(false) => break,
///         Err(e) => tracing::warn!("{}", e),
///     }
/// }
/// ```
pub struct TlvUnpack<'h, 'b> {
    dictionary: TlvDictionary<'h>,
    reader: ByteStreamReader<'b>,
}

impl<'h, 'b> TlvUnpack<'h, 'b> {
    pub fn new<H: TlvResponseHandler + ?Sized>(handler: &'h mut H, bytes: &'b [u8]) -> Self {
        let mut dictionary = handler.dictionary();
        dictionary.invalidate_all();
        Self {
            dictionary,
            reader: ByteStreamReader::new(bytes),
        }
    }

    /// Decode the next record.
    ///
    /// Returns `Ok(false)` once the buffer is exhausted. After an error the
    /// cursor is already past the faulty record (or at the end of the
    /// buffer), so calling again continues with the following record.
    pub fn read_next(&mut self) -> Result<bool, TlvError> {
        if self.reader.is_eos() {
            return Ok(false);
        }

        let tag: u32 = self.reader.read().map_err(TlvError::Read)?;
        let length: u32 = self.reader.read().map_err(TlvError::Read)?;
        let value = self
            .reader
            .read_raw(length as usize)
            .map_err(TlvError::Read)?;

        let wrapper = self
            .dictionary
            .get_mut(tag)
            .ok_or(TlvError::UnknownTag(tag))?;

        if !wrapper.is_valid_size(value.len()) {
            return Err(TlvError::InvalidSize {
                tag,
                size: value.len(),
            });
        }

        wrapper
            .decode(&value)
            .map_err(|source| TlvError::Value { tag, source })?;
        Ok(true)
    }

    /// Decode every record, collecting the per-record errors instead of
    /// stopping at the first one
    pub fn read_all(&mut self) -> Vec<TlvError> {
        let mut errors = Vec::new();
        loop {
            match self.read_next() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => errors.push(e),
            }
        }
        errors
    }

    /// Byte offset of the next record
    pub fn position(&self) -> usize {
        self.reader.position()
    }
}
