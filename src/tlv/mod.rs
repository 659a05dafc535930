//! Tag-length-value decoding
//!
//! Firmware configuration blobs are flat lists of `(tag: u32, length: u32,
//! value)` records. A response type declares which tags it understands by
//! building a [`TlvDictionary`] over its own fields; [`TlvUnpack`] then
//! decodes a buffer record by record into those fields.
//!
//! Tags the response knowingly ignores are registered with
//! [`TlvDictionary::ignore`]. Any other unexpected tag is an error for that
//! record.

pub mod dictionary;
pub mod error;
pub mod unpack;
pub mod wrapper;

pub use dictionary::{TlvDictionary, TlvResponseHandler, TlvTag};
pub use error::{TlvError, ValueError};
pub use unpack::TlvUnpack;
pub use wrapper::{ScalarWrapper, SequenceWrapper, TlvWrapper, VoidWrapper};
