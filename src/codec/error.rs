//! Codec-specific error types.

use thiserror::Error;

/// Errors raised while decoding a byte stream.
///
/// Decoding failures are local to the value being read: values decoded before
/// the failure are left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The reader needed more bytes than the buffer holds
    #[error("Read failed: end of stream reached")]
    EndOfStream,

    /// The bytes were present but do not form a valid value
    #[error("Invalid value: {0}")]
    Invalid(String),
}

pub type StreamResult<T> = std::result::Result<T, StreamError>;
