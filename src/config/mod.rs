//! Configuration of the debug agent
//!
//! The configuration is a TOML file with one table per concern:
//!
//! ```toml
//! [transport]
//! set_get_ctrl_path = "/sys/kernel/debug/snd_soc_skl/modules/set_get_ctrl"
//! core_id = 0
//!
//! [probe]
//! queue_size_bytes = 5242880
//! poll_interval_ms = 10
//!
//! [topology]
//! refresh_on_start = true
//!
//! [logging]
//! filter = "info,dsp_debug_agent=debug"
//! directory = "/var/log/dsp-debug-agent"
//! ```
//!
//! # File Location
//!
//! Without an explicit path, the agent reads `agent.toml` from the
//! platform configuration directory:
//! - **Linux**: `~/.config/dsp-debug-agent/`
//! - **macOS**: `~/Library/Application Support/dsp-debug-agent/`
//! - **Windows**: `%APPDATA%\dsp-debug-agent\`
//!
//! # Example
//!
//! ```ignore
//! use dsp_debug_agent::config::AgentConfig;
//!
//! let config = AgentConfig::load_or_default();
//! config.validate()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name under the platform configuration directory
pub const APP_DIR: &str = "dsp-debug-agent";

/// Configuration filename
pub const CONFIG_FILE: &str = "agent.toml";

/// Path of the default configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub transport: TransportSettings,
    pub probe: ProbeSettings,
    pub topology: TopologySettings,
    pub logging: LoggingSettings,
}

impl AgentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            AgentError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load the default configuration file, falling back to defaults when it
    /// is missing or unreadable
    pub fn load_or_default() -> Self {
        let Some(path) = default_config_path() else {
            tracing::debug!("No configuration directory on this platform, using defaults");
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load configuration, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AgentError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| AgentError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            AgentError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject values the agent cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.probe.queue_size_bytes == 0 {
            return Err(AgentError::Config(
                "probe.queue_size_bytes must be greater than 0".to_string(),
            ));
        }
        if self.probe.poll_interval_ms == 0 {
            return Err(AgentError::Config(
                "probe.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.transport.set_get_ctrl_path.is_empty() {
            return Err(AgentError::Config(
                "transport.set_get_ctrl_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
