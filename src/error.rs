//! Error handling for the debug agent
//!
//! This module defines the crate-level error type and a Result alias. The
//! codec, TLV and probe modules have their own error enums which convert
//! into [`AgentError`].

use crate::codec::StreamError;
use crate::probe::ProbeError;
use crate::tlv::TlvError;
use thiserror::Error;

/// Main error type for debug agent operations
#[derive(Error, Debug)]
pub enum AgentError {
    /// Malformed or truncated firmware bytes
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// A TLV record that could not be decoded
    #[error(transparent)]
    Tlv(#[from] TlvError),

    /// Errors reported by the driver channel
    #[error("{0}")]
    Transport(String),

    /// Firmware replies that contradict its own configuration
    #[error("{0}")]
    Firmware(String),

    /// Pipeline data that cannot be turned into a graph
    #[error("Topology inconsistency: {0}")]
    Topology(String),

    /// Errors of the probe subsystem
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied values out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AgentError>,
    },
}

impl AgentError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AgentError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, past every context layer
    pub fn root_cause(&self) -> &AgentError {
        match self {
            AgentError::WithContext { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type alias for debug agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<AgentError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
