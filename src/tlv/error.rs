//! TLV-specific error types.

use crate::codec::StreamError;
use thiserror::Error;

/// Failure to decode the value bytes of one record into its field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Can not read tlv value: {0}")]
    Read(StreamError),

    #[error("The value buffer has not been fully consumed")]
    NotFullyConsumed,

    #[error("Can not read array element: {0}")]
    Element(StreamError),
}

/// Failure to unpack one TLV record.
///
/// Each error is fatal to the record being read only. The unpacker has
/// already moved past that record, so the caller can keep reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TlvError {
    /// Tag, length or value bytes missing from the buffer
    #[error("Unable to read tlv: {0}")]
    Read(StreamError),

    /// Tag absent from the dictionary
    #[error("Cannot parse unknown tag {0}")]
    UnknownTag(u32),

    /// Length rejected by the field wrapper
    #[error("Invalid value size {size} for tag {tag}")]
    InvalidSize { tag: u32, size: usize },

    #[error("Error reading value for tag {tag}: {source}")]
    Value {
        tag: u32,
        #[source]
        source: ValueError,
    },
}

impl TlvError {
    /// Tag of the faulty record, when it could be read
    pub fn tag(&self) -> Option<u32> {
        match self {
            TlvError::Read(_) => None,
            TlvError::UnknownTag(tag)
            | TlvError::InvalidSize { tag, .. }
            | TlvError::Value { tag, .. } => Some(*tag),
        }
    }
}
