//! Performance measurement service
//!
//! Wraps the firmware's global performance data into per-core and
//! per-module reports. Each module item gets the UUID of its module type
//! and a KCPS budget derived from the instance props: cycles per chunk,
//! times chunks per second on input pin 0.
//!
//! # Example
//!
//! ```ignore
//! use dsp_debug_agent::perf::PerfService;
//! use dsp_debug_agent::firmware::PerfState;
//!
//! let perf = PerfService::new(&handler);
//! perf.set_state(PerfState::Started)?;
//! for item in perf.data()?.modules {
//!     println!("{} #{}: {} / {} KCPS", item.uuid, item.instance_id, item.average, item.budget);
//! }
//! ```

use crate::error::{AgentError, Result, ResultExt};
use crate::firmware::{ModuleEntry, ModuleInstanceProps, PerfDataItem, PerfState};
use crate::handler::ModuleHandler;
use crate::transport::Transport;
use serde::Serialize;

/// UUID placeholder of core items
pub const CORE_UUID: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerMode {
    D0,
    D0i3,
}

/// One performance item, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerfItem {
    pub uuid: String,
    pub instance_id: u16,
    pub power_mode: PowerMode,
    pub is_removed: bool,
    /// KCPS the instance is expected to need, 0 when unknown
    pub budget: u32,
    pub peak: u32,
    pub average: u32,
}

/// Performance items split by resource kind, in firmware order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompoundPerfData {
    pub cores: Vec<PerfItem>,
    pub modules: Vec<PerfItem>,
}

/// KCPS budget of a module instance.
///
/// Instances without an input pin or with no input buffer size have no
/// budget.
pub fn compute_budget(props: &ModuleInstanceProps) -> Result<u32> {
    let Some(pin) = props.input_pins.first() else {
        return Ok(0);
    };
    if props.ibs_bytes == 0 {
        return Ok(0);
    }

    let format = &pin.format;
    if format.bit_depth % 8 != 0 {
        return Err(AgentError::Firmware(format!(
            "The bit depth for module instance ({}, {}) is not a multiple of 8.",
            props.id.module_id, props.id.instance_id
        )));
    }

    let bytes_per_second = f64::from(format.sampling_frequency)
        * f64::from(format.number_of_channels)
        * f64::from(format.bit_depth / 8);
    let kcps = f64::from(props.cpc) * bytes_per_second / f64::from(props.ibs_bytes) / 1000.0;
    if kcps > f64::from(u32::MAX) {
        return Err(AgentError::Firmware(
            "Budget kCPS computation overflow.".to_string(),
        ));
    }
    Ok(kcps as u32)
}

/// Performance measurements of the firmware.
///
/// Dropping the service disables the measurements.
pub struct PerfService<'a, T: Transport> {
    handler: &'a ModuleHandler<T>,
}

impl<'a, T: Transport> PerfService<'a, T> {
    pub fn new(handler: &'a ModuleHandler<T>) -> Self {
        Self { handler }
    }

    pub fn state(&self) -> Result<PerfState> {
        self.handler.perf_state()
    }

    pub fn set_state(&self, state: PerfState) -> Result<()> {
        tracing::info!(state = %state, "Setting performance measurement state");
        self.handler.set_perf_state(state)
    }

    /// Fetch the current measurements.
    ///
    /// A module instance that cannot be queried keeps a zero budget; any
    /// other failure fails the whole report.
    pub fn data(&self) -> Result<CompoundPerfData> {
        let raw = self
            .handler
            .perf_items()
            .context("When getting perf items from firmware")?;

        let mut entries: Option<Vec<ModuleEntry>> = None;
        let mut result = CompoundPerfData::default();
        for item in &raw {
            if item.resource_id.module_id == 0 {
                result.cores.push(perf_item(item, CORE_UUID.to_string(), 0));
                continue;
            }

            let budget = if item.is_removed() {
                0
            } else {
                self.budget_of(item)?
            };

            if entries.is_none() {
                entries = Some(
                    self.handler
                        .module_entries()
                        .context("When getting perf items from firmware")?,
                );
            }
            let module_id = item.resource_id.module_id;
            let uuid = entries
                .iter()
                .flatten()
                .find(|entry| entry.module_id == module_id)
                .map(ModuleEntry::uuid_string)
                .ok_or_else(|| {
                    AgentError::Firmware(format!(
                        "When trying to find module entry {}: no such module",
                        module_id
                    ))
                })?;
            result.modules.push(perf_item(item, uuid, budget));
        }
        Ok(result)
    }

    fn budget_of(&self, item: &PerfDataItem) -> Result<u32> {
        let id = item.resource_id;
        match self.handler.module_instance_props(id.module_id, id.instance_id) {
            Ok(props) => compute_budget(&props),
            Err(e) => {
                tracing::warn!(
                    "Couldn't retrieve module instance {} when trying to compute its KCPS budget: {}",
                    id,
                    e
                );
                Ok(0)
            }
        }
    }
}

impl<T: Transport> Drop for PerfService<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.handler.set_perf_state(PerfState::Disabled) {
            tracing::error!("Unable to stop driver perf service: {}", e);
        }
    }
}

fn perf_item(item: &PerfDataItem, uuid: String, budget: u32) -> PerfItem {
    PerfItem {
        uuid,
        instance_id: item.resource_id.instance_id,
        power_mode: if item.power_mode() {
            PowerMode::D0i3
        } else {
            PowerMode::D0
        },
        is_removed: item.is_removed(),
        budget,
        peak: item.peak,
        average: item.average,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::{AudioDataFormatIpc, CompoundModuleId, PinProps};

    fn props(cpc: u32, ibs_bytes: u32, format: AudioDataFormatIpc) -> ModuleInstanceProps {
        let mut props = ModuleInstanceProps::new(CompoundModuleId::new(5, 2));
        props.cpc = cpc;
        props.ibs_bytes = ibs_bytes;
        props.input_pins = vec![PinProps::pcm(format, 0)];
        props
    }

    #[test]
    fn test_budget() {
        // 48 kHz 16-bit stereo: 192000 bytes/s, 384-byte chunks: 500 chunks/s
        let budget = compute_budget(&props(20_000, 384, AudioDataFormatIpc::default())).unwrap();
        assert_eq!(budget, 10_000);
    }

    #[test]
    fn test_budget_without_input() {
        let mut source = props(20_000, 384, AudioDataFormatIpc::default());
        source.input_pins.clear();
        assert_eq!(compute_budget(&source).unwrap(), 0);
        assert_eq!(
            compute_budget(&props(20_000, 0, AudioDataFormatIpc::default())).unwrap(),
            0
        );
    }

    #[test]
    fn test_budget_rejects_odd_bit_depth() {
        let format = AudioDataFormatIpc {
            bit_depth: 20,
            ..AudioDataFormatIpc::default()
        };
        let err = compute_budget(&props(1, 1, format)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The bit depth for module instance (5, 2) is not a multiple of 8."
        );
    }

    #[test]
    fn test_budget_overflow() {
        let format = AudioDataFormatIpc {
            sampling_frequency: u32::MAX,
            bit_depth: 32,
            number_of_channels: 8,
            ..AudioDataFormatIpc::default()
        };
        let err = compute_budget(&props(u32::MAX, 1, format)).unwrap_err();
        assert_eq!(err.to_string(), "Budget kCPS computation overflow.");
    }

    #[test]
    fn test_item_conversion() {
        let raw = PerfDataItem::new(CompoundModuleId::new(0, 1), true, false, 30, 20);
        let item = perf_item(&raw, CORE_UUID.to_string(), 0);
        assert_eq!(item.power_mode, PowerMode::D0i3);
        assert_eq!(item.instance_id, 1);
        assert_eq!((item.peak, item.average), (30, 20));
    }
}
