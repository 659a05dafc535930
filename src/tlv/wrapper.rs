//! Field wrappers binding a TLV tag to a shadow field.
//!
//! A wrapper borrows the field it fills for as long as the dictionary lives,
//! so decoded values land directly in the response handler.

use super::error::ValueError;
use crate::codec::{ByteStreamReader, Streamable};

/// Capabilities every dictionary entry provides
pub trait TlvWrapper {
    /// Whether a record value of `size` bytes may be handed to [`decode`](Self::decode)
    fn is_valid_size(&self, size: usize) -> bool;

    /// Decode the record value into the shadow field
    fn decode(&mut self, bytes: &[u8]) -> Result<(), ValueError>;

    /// Reset the shadow field to "not received"
    fn invalidate(&mut self);
}

/// A single value with a validity flag, modelled as `Option<T>`.
///
/// The value must span the whole record. Fixed-size types reject any other
/// length up front; for the rest a short record fails with an end-of-stream
/// error and leftover bytes fail the decode.
pub struct ScalarWrapper<'a, T> {
    slot: &'a mut Option<T>,
}

impl<'a, T: Streamable> ScalarWrapper<'a, T> {
    pub fn new(slot: &'a mut Option<T>) -> Self {
        *slot = None;
        Self { slot }
    }
}

impl<T: Streamable> TlvWrapper for ScalarWrapper<'_, T> {
    fn is_valid_size(&self, size: usize) -> bool {
        T::WIRE_SIZE.map_or(true, |wire_size| wire_size == size)
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<(), ValueError> {
        let mut reader = ByteStreamReader::new(bytes);
        let value = reader.read::<T>().map_err(ValueError::Read)?;
        if !reader.is_eos() {
            return Err(ValueError::NotFullyConsumed);
        }
        *self.slot = Some(value);
        Ok(())
    }

    fn invalidate(&mut self) {
        *self.slot = None;
    }
}

/// A list of values; an empty list means the tag was not received.
///
/// An empty record is therefore meaningless and rejected, as is a length
/// that does not divide into whole fixed-size elements.
pub struct SequenceWrapper<'a, T> {
    slot: &'a mut Vec<T>,
}

impl<'a, T: Streamable> SequenceWrapper<'a, T> {
    pub fn new(slot: &'a mut Vec<T>) -> Self {
        slot.clear();
        Self { slot }
    }
}

impl<T: Streamable> TlvWrapper for SequenceWrapper<'_, T> {
    fn is_valid_size(&self, size: usize) -> bool {
        match T::WIRE_SIZE {
            _ if size == 0 => false,
            Some(element_size) if element_size > 0 => size % element_size == 0,
            _ => true,
        }
    }

    fn decode(&mut self, bytes: &[u8]) -> Result<(), ValueError> {
        self.slot.clear();
        let mut reader = ByteStreamReader::new(bytes);
        while !reader.is_eos() {
            match reader.read::<T>() {
                Ok(value) => self.slot.push(value),
                Err(e) => {
                    self.slot.clear();
                    return Err(ValueError::Element(e));
                }
            }
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.slot.clear();
    }
}

/// Accepts and discards any value, including an empty one.
///
/// Used to acknowledge tags the handler knowingly ignores, as opposed to
/// tags nobody declared, which stay fatal.
#[derive(Debug, Default, Clone, Copy)]
pub struct VoidWrapper;

impl TlvWrapper for VoidWrapper {
    fn is_valid_size(&self, _size: usize) -> bool {
        true
    }

    fn decode(&mut self, _bytes: &[u8]) -> Result<(), ValueError> {
        Ok(())
    }

    fn invalidate(&mut self) {}
}
