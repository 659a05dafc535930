//! Firmware data model
//!
//! The structures exchanged with the DSP firmware, with their exact wire
//! layouts. Every type here implements [`Streamable`](crate::codec::Streamable);
//! the TLV-based replies ([`FwConfig`], [`HwConfig`], [`GlobalMemoryState`])
//! also implement [`TlvResponseHandler`](crate::tlv::TlvResponseHandler).
//!
//! # Main Types
//!
//! - [`CompoundModuleId`] - `(module, instance)` key of a running instance
//! - [`ModuleEntry`] - static module type description
//! - [`ModuleInstanceProps`] - runtime props of an instance, including its pins
//! - [`PipelineProps`] - ordered list of instances plus scheduling data
//! - [`SchedulersInfo`] - tasks of one core and the instances they run
//! - [`GatewayProps`] - DMA gateways connecting the DSP to the host or links
//! - [`ProbePointId`] / [`Packet`] - probe addressing and extraction packets

pub mod audio_format;
pub mod config;
pub mod gateway;
pub mod ids;
pub mod memory_state;
pub mod module_entry;
pub mod module_instance;
pub mod perf;
pub mod pipeline;
pub mod probe_point;
pub mod scheduler;

pub use audio_format::{AudioDataFormatIpc, ChannelConfig, InterleavingStyle, SampleType};
pub use config::{
    DmaBufferConfig, FwConfig, FwConfigTag, FwVersion, GpdmaCaps, HwConfig, HwConfigTag, I2sCaps,
};
pub use gateway::{GatewayProps, GatewaysInfo};
pub use ids::{
    BaseFwParam, BaseModuleParam, CompoundModuleId, ConnectorNodeId, GatewayType, ParameterId,
    BASE_FW_INSTANCE_ID, BASE_FW_MODULE_ID, LOADABLE_MODULE_ID,
};
pub use memory_state::{GlobalMemoryState, MemoryStateTag, SramStateInfo};
pub use module_entry::{ModuleEntry, ModuleType, ModulesInfo, SegmentDesc, SegmentFlags};
pub use module_instance::{ModuleInstanceProps, PinProps, StreamType};
pub use perf::{GlobalPerfData, PerfDataItem, PerfState};
pub use pipeline::{PipelineProps, PipelinesListInfo};
pub use probe_point::{Packet, ProbePointId, ProbeType, PACKET_SYNC_WORD};
pub use scheduler::{SchedulerProps, SchedulersInfo, TaskProps};

/// Width of the count prefix of every firmware array
pub type ArraySize = u32;

/// Largest parameter payload a single module access may carry
pub const MAX_PARAMETER_PAYLOAD_SIZE: usize = 4096;

/// Reply buffer size of the TLV configuration queries
pub const CAVS_TLV_BUFFER_SIZE: usize = 2048;
