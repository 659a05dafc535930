//! DSP core power votes.
//!
//! The driver keeps a per-core reference count: every `wake` vote must be
//! matched by a `sleep` vote or the core never powers down. [`CorePowerGuard`]
//! ties the pair to a scope.

use super::debugfs::CommandDevice;
use crate::error::{AgentError, Result};
use std::sync::Arc;

/// Core whose vote keeps every core awake
pub const DEFAULT_CORE_ID: u32 = 0;

pub struct CorePower<D: CommandDevice> {
    device: Arc<D>,
    path: String,
    core_id: u32,
}

impl<D: CommandDevice> CorePower<D> {
    pub fn new(device: Arc<D>, path: impl Into<String>, core_id: u32) -> Self {
        Self {
            device,
            path: path.into(),
            core_id,
        }
    }

    pub fn core_id(&self) -> u32 {
        self.core_id
    }

    /// Vote against the core going to sleep
    pub fn prevent_sleep(&self) -> Result<()> {
        self.set_core_power(false)
    }

    /// Withdraw a previous [`prevent_sleep`](Self::prevent_sleep) vote
    pub fn allow_sleep(&self) -> Result<()> {
        self.set_core_power(true)
    }

    /// Prevent sleep until the returned guard is dropped
    pub fn hold(&self) -> Result<CorePowerGuard<'_, D>> {
        self.prevent_sleep()?;
        Ok(CorePowerGuard { power: self })
    }

    fn command(sleep_allowed: bool, core_id: u32) -> String {
        let verb = if sleep_allowed { "sleep" } else { "wake" };
        format!("{} {}", verb, core_id)
    }

    fn set_core_power(&self, sleep_allowed: bool) -> Result<()> {
        let command = Self::command(sleep_allowed, self.core_id);
        tracing::trace!(core_id = self.core_id, "core power: {}", command);
        self.device
            .command_write(&self.path, command.as_bytes())
            .map_err(|e| AgentError::Transport(format!("Could not set core power: {}", e)))
    }
}

/// Keeps the core awake for as long as it lives.
///
/// Only a successful [`CorePower::hold`] creates a guard, so every release
/// matches an acquire.
#[must_use = "the core may sleep again as soon as the guard is dropped"]
pub struct CorePowerGuard<'a, D: CommandDevice> {
    power: &'a CorePower<D>,
}

impl<D: CommandDevice> Drop for CorePowerGuard<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.power.allow_sleep() {
            tracing::warn!(core_id = self.power.core_id, "Failed to release core power: {}", e);
        }
    }
}
