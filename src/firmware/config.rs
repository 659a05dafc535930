//! Firmware and hardware configuration, both delivered as TLV lists.

use crate::codec::{ByteStreamReader, ByteStreamWriter, StreamResult, Streamable};
use crate::tlv::{TlvDictionary, TlvResponseHandler};
use serde::Serialize;
use std::fmt;

crate::firmware_enum! {
    /// Tags of the firmware configuration TLV list
    pub enum FwConfigTag {
        FwVersion = 0 => "fw version",
        MemoryReclaimed = 1 => "memory reclaimed",
        SlowClockFreqHz = 2 => "slow clock frequency",
        FastClockFreqHz = 3 => "fast clock frequency",
        DmaBufferConfig = 4 => "dma buffer config",
        AlhSupportLevel = 5 => "alh support level",
        IpcDlMailboxBytes = 6 => "ipc dl mailbox bytes",
        IpcUlMailboxBytes = 7 => "ipc ul mailbox bytes",
        TraceLogBytes = 8 => "trace log bytes",
        MaxPplCount = 9 => "max pipeline count",
        MaxAstateCount = 10 => "max astate count",
        MaxModulePinCount = 11 => "max module pin count",
        ModulesCount = 12 => "modules count",
        MaxModInstCount = 13 => "max module instance count",
        MaxLlTasksPerPriCount = 14 => "max ll tasks per priority",
        LlPriCount = 15 => "ll priority count",
        MaxDpTasksCount = 16 => "max dp tasks count",
        MaxLibsCount = 17 => "max libraries count",
    }
}

crate::firmware_enum! {
    /// Tags of the hardware configuration TLV list
    pub enum HwConfigTag {
        CavsVersion = 0 => "cavs version",
        DspCores = 1 => "dsp cores",
        MemPageBytes = 2 => "memory page bytes",
        TotalPhysMemPages = 3 => "total physical memory pages",
        I2sCaps = 4 => "i2s capabilities",
        GpdmaCaps = 5 => "gpdma capabilities",
        GatewayCount = 6 => "gateway count",
        HpEbbCount = 7 => "hp ebb count",
        LpEbbCount = 8 => "lp ebb count",
        EbbSizeBytes = 9 => "ebb size bytes",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FwVersion {
    pub major: u16,
    pub minor: u16,
    pub hotfix: u16,
    pub build: u16,
}

impl Streamable for FwVersion {
    const WIRE_SIZE: Option<usize> = Some(8);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            major: reader.read()?,
            minor: reader.read()?,
            hotfix: reader.read()?,
            build: reader.read()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.major);
        writer.write(&self.minor);
        writer.write(&self.hotfix);
        writer.write(&self.build);
    }
}

impl fmt::Display for FwVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.hotfix, self.build
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DmaBufferConfig {
    pub min_size_bytes: u32,
    pub max_size_bytes: u32,
}

impl Streamable for DmaBufferConfig {
    const WIRE_SIZE: Option<usize> = Some(8);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            min_size_bytes: reader.read()?,
            max_size_bytes: reader.read()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.min_size_bytes);
        writer.write(&self.max_size_bytes);
    }
}

/// Firmware configuration; every field is `None` until received
#[derive(Debug, Clone, Default, Serialize)]
pub struct FwConfig {
    pub fw_version: Option<FwVersion>,
    pub memory_reclaimed: Option<u32>,
    pub slow_clock_freq_hz: Option<u32>,
    pub fast_clock_freq_hz: Option<u32>,
    pub dma_buffer_config: Vec<DmaBufferConfig>,
    pub alh_support_level: Option<u32>,
    pub ipc_dl_mailbox_bytes: Option<u32>,
    pub ipc_ul_mailbox_bytes: Option<u32>,
    pub trace_log_bytes: Option<u32>,
    pub max_ppl_count: Option<u32>,
    pub max_astate_count: Option<u32>,
    pub max_module_pin_count: Option<u32>,
    pub modules_count: Option<u32>,
    pub max_mod_inst_count: Option<u32>,
    pub max_ll_tasks_per_pri_count: Option<u32>,
    pub ll_pri_count: Option<u32>,
    pub max_dp_tasks_count: Option<u32>,
    pub max_libs_count: Option<u32>,
}

impl TlvResponseHandler for FwConfig {
    fn dictionary(&mut self) -> TlvDictionary<'_> {
        use FwConfigTag as Tag;

        TlvDictionary::new()
            .scalar(Tag::FwVersion, &mut self.fw_version)
            .scalar(Tag::MemoryReclaimed, &mut self.memory_reclaimed)
            .scalar(Tag::SlowClockFreqHz, &mut self.slow_clock_freq_hz)
            .scalar(Tag::FastClockFreqHz, &mut self.fast_clock_freq_hz)
            .sequence(Tag::DmaBufferConfig, &mut self.dma_buffer_config)
            .scalar(Tag::AlhSupportLevel, &mut self.alh_support_level)
            .scalar(Tag::IpcDlMailboxBytes, &mut self.ipc_dl_mailbox_bytes)
            .scalar(Tag::IpcUlMailboxBytes, &mut self.ipc_ul_mailbox_bytes)
            .scalar(Tag::TraceLogBytes, &mut self.trace_log_bytes)
            .scalar(Tag::MaxPplCount, &mut self.max_ppl_count)
            .scalar(Tag::MaxAstateCount, &mut self.max_astate_count)
            .scalar(Tag::MaxModulePinCount, &mut self.max_module_pin_count)
            .scalar(Tag::ModulesCount, &mut self.modules_count)
            .scalar(Tag::MaxModInstCount, &mut self.max_mod_inst_count)
            .scalar(Tag::MaxLlTasksPerPriCount, &mut self.max_ll_tasks_per_pri_count)
            .scalar(Tag::LlPriCount, &mut self.ll_pri_count)
            .scalar(Tag::MaxDpTasksCount, &mut self.max_dp_tasks_count)
            .scalar(Tag::MaxLibsCount, &mut self.max_libs_count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct I2sCaps {
    pub version: u32,
    pub controller_base_addr: Vec<u32>,
}

impl Streamable for I2sCaps {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            version: reader.read()?,
            controller_base_addr: reader.read_vec::<u32, u32>()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.version);
        writer.write_vec::<u32, u32>(&self.controller_base_addr);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GpdmaCaps {
    pub lp_gateways: Vec<u32>,
    pub hp_gateways: Vec<u32>,
}

impl Streamable for GpdmaCaps {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            lp_gateways: reader.read_vec::<u32, u32>()?,
            hp_gateways: reader.read_vec::<u32, u32>()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write_vec::<u32, u32>(&self.lp_gateways);
        writer.write_vec::<u32, u32>(&self.hp_gateways);
    }
}

/// Hardware configuration; every field is `None` until received
#[derive(Debug, Clone, Default, Serialize)]
pub struct HwConfig {
    pub cavs_version: Option<u32>,
    pub dsp_core_count: Option<u32>,
    pub mem_page_bytes: Option<u32>,
    pub total_phys_mem_pages: Option<u32>,
    pub i2s_caps: Option<I2sCaps>,
    pub gpdma_caps: Option<GpdmaCaps>,
    pub gateway_count: Option<u32>,
    pub hp_ebb_count: Option<u32>,
    pub lp_ebb_count: Option<u32>,
    pub ebb_size_bytes: Option<u32>,
}

impl TlvResponseHandler for HwConfig {
    fn dictionary(&mut self) -> TlvDictionary<'_> {
        use HwConfigTag as Tag;

        TlvDictionary::new()
            .scalar(Tag::CavsVersion, &mut self.cavs_version)
            .scalar(Tag::DspCores, &mut self.dsp_core_count)
            .scalar(Tag::MemPageBytes, &mut self.mem_page_bytes)
            .scalar(Tag::TotalPhysMemPages, &mut self.total_phys_mem_pages)
            .scalar(Tag::I2sCaps, &mut self.i2s_caps)
            .scalar(Tag::GpdmaCaps, &mut self.gpdma_caps)
            .scalar(Tag::GatewayCount, &mut self.gateway_count)
            .scalar(Tag::HpEbbCount, &mut self.hp_ebb_count)
            .scalar(Tag::LpEbbCount, &mut self.lp_ebb_count)
            .scalar(Tag::EbbSizeBytes, &mut self.ebb_size_bytes)
    }
}

/// Appends one TLV record; used to build configuration blobs
pub fn write_tlv<T: Streamable>(writer: &mut ByteStreamWriter, tag: u32, value: &T) {
    let bytes = crate::codec::encode(value);
    writer.write(&tag);
    writer.write(&(bytes.len() as u32));
    writer.write_raw(&bytes);
}
