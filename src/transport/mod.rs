//! Transport to the DSP firmware
//!
//! The agent never talks to the firmware directly: every module parameter
//! access goes through a [`Transport`]. Two implementations ship with the
//! crate:
//!
//! - [`DebugFsTransport`] frames accesses as the messages the Linux audio
//!   driver expects on its debugfs control entry
//! - `SimulatedFirmware` (feature `mock-dsp`) answers from an in-memory
//!   firmware image, for demos without hardware
//!
//! # Example
//!
//! ```ignore
//! use dsp_debug_agent::transport::{DebugFsTransport, FileCommandDevice, Transport};
//! use dsp_debug_agent::firmware::{BaseFwParam, ParameterId};
//!
//! let transport = DebugFsTransport::new(FileCommandDevice::default());
//! let reply = transport.query(0, 0, ParameterId::from(BaseFwParam::FwConfig), 2048)?;
//! ```

pub mod debugfs;
pub mod power;
#[cfg(feature = "mock-dsp")]
pub mod simulated;

pub use debugfs::{
    requires_tunneled_access, CommandDevice, DebugFsTransport, FileCommandDevice,
    LargeConfigAccess, LargeConfigCmd, ModuleConfigAccess, ModuleConfigCmd, CORE_POWER_PATH,
    SET_GET_CTRL_PATH,
};
pub use power::{CorePower, CorePowerGuard};
#[cfg(feature = "mock-dsp")]
pub use simulated::{FirmwareImage, SimulatedFirmware};

use crate::error::Result;
use crate::firmware::ParameterId;
use std::sync::Arc;

/// Counters of the accesses made through a transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Successful parameter reads
    pub queries: u64,
    /// Successful parameter writes
    pub configures: u64,
    /// Accesses the driver rejected or answered with an unusable reply
    pub failures: u64,
    /// Payload bytes received
    pub bytes_received: u64,
}

impl TransportStats {
    pub fn record_query(&mut self, bytes: usize) {
        self.queries += 1;
        self.bytes_received += bytes as u64;
    }

    pub fn record_configure(&mut self) {
        self.configures += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Share of accesses that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        let succeeded = self.queries + self.configures;
        let total = succeeded + self.failures;
        if total == 0 {
            100.0
        } else {
            (succeeded as f64 / total as f64) * 100.0
        }
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Channel carrying module parameter accesses to the firmware.
///
/// Implementations are shared between the topology builder and the probe
/// service, so every method takes `&self`.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Read parameter `param` of a module instance.
    ///
    /// `max_reply_size` is the largest reply the caller can make sense of;
    /// the returned buffer may be shorter.
    fn query(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        max_reply_size: usize,
    ) -> Result<Vec<u8>>;

    /// Write parameter `param` of a module instance
    fn configure(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        payload: &[u8],
    ) -> Result<()>;

    /// Access counters, when the implementation keeps them
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn query(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        max_reply_size: usize,
    ) -> Result<Vec<u8>> {
        (**self).query(module_id, instance_id, param, max_reply_size)
    }

    fn configure(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        payload: &[u8],
    ) -> Result<()> {
        (**self).configure(module_id, instance_id, param, payload)
    }

    fn stats(&self) -> TransportStats {
        (**self).stats()
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn query(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        max_reply_size: usize,
    ) -> Result<Vec<u8>> {
        (**self).query(module_id, instance_id, param, max_reply_size)
    }

    fn configure(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        payload: &[u8],
    ) -> Result<()> {
        (**self).configure(module_id, instance_id, param, payload)
    }

    fn stats(&self) -> TransportStats {
        (**self).stats()
    }
}
