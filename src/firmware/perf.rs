//! Global performance measurements.

use super::ids::CompoundModuleId;
use crate::codec::{ByteStreamReader, ByteStreamWriter, StreamResult, Streamable};
use serde::Serialize;

crate::firmware_enum! {
    /// State of the firmware performance measurement service
    pub enum PerfState {
        Disabled = 0 => "disabled",
        Stopped = 1 => "stopped",
        Started = 2 => "started",
        Paused = 3 => "paused",
    }
}

/// Cycle consumption of one module instance or core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PerfDataItem {
    pub resource_id: CompoundModuleId,
    /// bit 0: power mode (0 = D0, 1 = D0i3), bit 31: resource removed
    pub details: u32,
    /// Peak KCPS
    pub peak: u32,
    /// Average KCPS
    pub average: u32,
}

impl PerfDataItem {
    pub const WIRE_BYTES: usize = 16;

    const POWER_MODE_BIT: u32 = 1;
    const IS_REMOVED_BIT: u32 = 1 << 31;

    pub fn new(
        resource_id: CompoundModuleId,
        power_mode: bool,
        is_removed: bool,
        peak: u32,
        average: u32,
    ) -> Self {
        let mut details = 0;
        if power_mode {
            details |= Self::POWER_MODE_BIT;
        }
        if is_removed {
            details |= Self::IS_REMOVED_BIT;
        }
        Self {
            resource_id,
            details,
            peak,
            average,
        }
    }

    pub fn power_mode(&self) -> bool {
        self.details & Self::POWER_MODE_BIT != 0
    }

    pub fn is_removed(&self) -> bool {
        self.details & Self::IS_REMOVED_BIT != 0
    }
}

impl Streamable for PerfDataItem {
    const WIRE_SIZE: Option<usize> = Some(Self::WIRE_BYTES);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            resource_id: reader.read()?,
            details: reader.read()?,
            peak: reader.read()?,
            average: reader.read()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.resource_id);
        writer.write(&self.details);
        writer.write(&self.peak);
        writer.write(&self.average);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlobalPerfData {
    pub items: Vec<PerfDataItem>,
}

impl GlobalPerfData {
    pub fn allocation_size(count: usize) -> usize {
        4 + count * PerfDataItem::WIRE_BYTES
    }
}

impl Streamable for GlobalPerfData {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            items: reader.read_vec::<u32, PerfDataItem>()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write_vec::<u32, PerfDataItem>(&self.items);
    }
}
