//! Tag to field mapping used by the unpacker.

use super::wrapper::{ScalarWrapper, SequenceWrapper, TlvWrapper, VoidWrapper};
use crate::codec::{FirmwareEnum, Streamable};
use std::collections::BTreeMap;

/// Maps every tag a response may contain to the wrapper filling its field.
///
/// Built with chained calls over mutable borrows of the handler's fields:
///
/// ```ignore
/// TlvDictionary::new()
///     .scalar(FwConfigTag::FwVersion, &mut self.fw_version)
///     .sequence(FwConfigTag::LlPriorities, &mut self.ll_priorities)
///     .ignore(FwConfigTag::TraceLog)
/// ```
///
/// Every field is invalidated when it is registered.
#[derive(Default)]
pub struct TlvDictionary<'a> {
    entries: BTreeMap<u32, Box<dyn TlvWrapper + 'a>>,
}

/// Anything usable as a tag: raw numbers or firmware tag enumerations.
pub trait TlvTag {
    fn tag_value(self) -> u32;
}

impl TlvTag for u32 {
    fn tag_value(self) -> u32 {
        self
    }
}

impl<E: FirmwareEnum> TlvTag for E {
    fn tag_value(self) -> u32 {
        self.to_raw()
    }
}

impl<'a> TlvDictionary<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wrapper; a later registration for the same tag wins
    pub fn insert(mut self, tag: u32, mut wrapper: Box<dyn TlvWrapper + 'a>) -> Self {
        wrapper.invalidate();
        self.entries.insert(tag, wrapper);
        self
    }

    pub fn scalar<T: Streamable + 'a>(self, tag: impl TlvTag, slot: &'a mut Option<T>) -> Self {
        self.insert(tag.tag_value(), Box::new(ScalarWrapper::new(slot)))
    }

    pub fn sequence<T: Streamable + 'a>(self, tag: impl TlvTag, slot: &'a mut Vec<T>) -> Self {
        self.insert(tag.tag_value(), Box::new(SequenceWrapper::new(slot)))
    }

    /// Accept `tag` but discard its value
    pub fn ignore(self, tag: impl TlvTag) -> Self {
        self.insert(tag.tag_value(), Box::new(VoidWrapper))
    }

    pub fn get_mut(&mut self, tag: u32) -> Option<&mut (dyn TlvWrapper + 'a)> {
        self.entries.get_mut(&tag).map(|wrapper| wrapper.as_mut())
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.entries.contains_key(&tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn invalidate_all(&mut self) {
        for wrapper in self.entries.values_mut() {
            wrapper.invalidate();
        }
    }
}

/// A response type decoded from a TLV list.
///
/// Implementors expose their shadow fields through a dictionary; after
/// unpacking, each field is either valid or reports "not received".
pub trait TlvResponseHandler {
    fn dictionary(&mut self) -> TlvDictionary<'_>;
}
