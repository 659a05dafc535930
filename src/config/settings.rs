//! Sections of the agent configuration file
//!
//! Every section has defaults matching a stock Linux audio driver, so an
//! empty file (or no file) is a valid configuration.

use crate::transport::debugfs::{CORE_POWER_PATH, SET_GET_CTRL_PATH};
use crate::transport::power::DEFAULT_CORE_ID;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default byte budget of each probe queue (5 MiB)
pub const DEFAULT_QUEUE_SIZE_BYTES: usize = 5 * 1024 * 1024;

/// Default wait of the probe workers on their driver stream
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Default log filter of the binary
pub const DEFAULT_LOG_FILTER: &str = "info,dsp_debug_agent=debug";

/// Where firmware accesses go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// debugfs entry carrying module parameter accesses
    pub set_get_ctrl_path: String,
    /// debugfs entry controlling core power
    pub core_power_path: String,
    /// Core kept awake during each access
    pub core_id: u32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            set_get_ctrl_path: SET_GET_CTRL_PATH.to_string(),
            core_power_path: CORE_POWER_PATH.to_string(),
            core_id: DEFAULT_CORE_ID,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Byte budget of each extraction and injection queue
    pub queue_size_bytes: usize,
    /// How long a worker waits on its driver stream before checking for stop
    pub poll_interval_ms: u64,
}

impl ProbeSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            queue_size_bytes: DEFAULT_QUEUE_SIZE_BYTES,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologySettings {
    /// Build the topology as soon as the agent starts
    pub refresh_on_start: bool,
}

impl Default for TopologySettings {
    fn default() -> Self {
        Self {
            refresh_on_start: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter used when `RUST_LOG` is not set
    pub filter: String,
    /// Also write daily rolling log files into this directory
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            directory: None,
        }
    }
}
