//! Firmware query orchestration
//!
//! [`ModuleHandler`] issues every firmware query the agent needs and checks
//! the replies against the limits the firmware itself reported. The firmware
//! and hardware configurations are fetched once, at construction; every list
//! query then sizes its reply buffer from them.
//!
//! # Error policy
//!
//! - Transport failures are fatal and carry the parameter and target ids
//! - Malformed TLV records are logged and skipped
//! - A reply whose element count contradicts the configuration is an error
//! - Bytes left over after a decoded reply only produce a warning
//!
//! # Example
//!
//! ```ignore
//! use dsp_debug_agent::handler::ModuleHandler;
//!
//! let handler = ModuleHandler::new(transport)?;
//! for id in handler.pipeline_ids()? {
//!     let props = handler.pipeline_props(id)?;
//!     println!("pipeline {} priority {}", props.id, props.priority);
//! }
//! ```

use crate::codec::{ByteStreamReader, FirmwareEnum, Streamable};
use crate::error::{AgentError, Result, ResultExt};
use crate::firmware::{
    BaseFwParam, BaseModuleParam, FwConfig, FwConfigTag, FwVersion, GatewayProps, GatewaysInfo,
    GlobalMemoryState, GlobalPerfData, HwConfig, HwConfigTag, ModuleEntry, ModuleInstanceProps,
    ModulesInfo, ParameterId, PerfDataItem, PerfState, PipelineProps, PipelinesListInfo,
    SchedulersInfo, BASE_FW_INSTANCE_ID, BASE_FW_MODULE_ID, CAVS_TLV_BUFFER_SIZE,
    MAX_PARAMETER_PAYLOAD_SIZE,
};
use crate::tlv::{TlvResponseHandler, TlvUnpack};
use crate::transport::Transport;
use serde::Serialize;

/// Configuration values every query depends on.
///
/// Construction of a [`ModuleHandler`] fails unless the firmware reported
/// all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FirmwareLimits {
    pub fw_version: FwVersion,
    pub modules_count: u32,
    pub max_ppl_count: u32,
    pub max_mod_inst_count: u32,
    pub gateway_count: u32,
    pub dsp_core_count: u32,
}

impl FirmwareLimits {
    pub fn from_configs(fw_config: &FwConfig, hw_config: &HwConfig) -> Result<Self> {
        let mut missing = Vec::new();
        if fw_config.fw_version.is_none() {
            missing.push(FwConfigTag::FwVersion.name());
        }
        if fw_config.modules_count.is_none() {
            missing.push(FwConfigTag::ModulesCount.name());
        }
        if fw_config.max_ppl_count.is_none() {
            missing.push(FwConfigTag::MaxPplCount.name());
        }
        if fw_config.max_mod_inst_count.is_none() {
            missing.push(FwConfigTag::MaxModInstCount.name());
        }
        if hw_config.gateway_count.is_none() {
            missing.push(HwConfigTag::GatewayCount.name());
        }
        if hw_config.dsp_core_count.is_none() {
            missing.push(HwConfigTag::DspCores.name());
        }

        match (
            fw_config.fw_version,
            fw_config.modules_count,
            fw_config.max_ppl_count,
            fw_config.max_mod_inst_count,
            hw_config.gateway_count,
            hw_config.dsp_core_count,
        ) {
            (
                Some(fw_version),
                Some(modules_count),
                Some(max_ppl_count),
                Some(max_mod_inst_count),
                Some(gateway_count),
                Some(dsp_core_count),
            ) => Ok(Self {
                fw_version,
                modules_count,
                max_ppl_count,
                max_mod_inst_count,
                gateway_count,
                dsp_core_count,
            }),
            _ => Err(AgentError::Firmware(format!(
                "Incomplete firmware configuration, missing: {}",
                missing.join(", ")
            ))),
        }
    }

    /// Entries of the global performance data: one per instance plus one
    /// per core
    pub fn max_perf_items(&self) -> u32 {
        self.max_mod_inst_count + self.dsp_core_count
    }
}

/// Issues firmware queries and validates their replies
pub struct ModuleHandler<T: Transport> {
    transport: T,
    fw_config: FwConfig,
    hw_config: HwConfig,
    limits: FirmwareLimits,
}

impl<T: Transport> ModuleHandler<T> {
    /// Fetch the firmware and hardware configurations.
    ///
    /// Fails when the transport fails or when a mandatory configuration
    /// value is missing.
    pub fn new(transport: T) -> Result<Self> {
        let mut fw_config = FwConfig::default();
        query_tlv(&transport, BaseFwParam::FwConfig, &mut fw_config)
            .context("Unable to read firmware configuration")?;

        let mut hw_config = HwConfig::default();
        query_tlv(&transport, BaseFwParam::HwConfigGet, &mut hw_config)
            .context("Unable to read hardware configuration")?;

        let limits = FirmwareLimits::from_configs(&fw_config, &hw_config)?;
        tracing::info!(
            fw_version = %limits.fw_version,
            modules = limits.modules_count,
            cores = limits.dsp_core_count,
            "Firmware configuration loaded"
        );

        Ok(Self {
            transport,
            fw_config,
            hw_config,
            limits,
        })
    }

    pub fn fw_config(&self) -> &FwConfig {
        &self.fw_config
    }

    pub fn hw_config(&self) -> &HwConfig {
        &self.hw_config
    }

    pub fn limits(&self) -> &FirmwareLimits {
        &self.limits
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The module table, checked against the declared module count
    pub fn module_entries(&self) -> Result<Vec<ModuleEntry>> {
        self.module_entries_with_count(self.limits.modules_count)
    }

    pub fn module_entries_with_count(&self, count: u32) -> Result<Vec<ModuleEntry>> {
        let info: ModulesInfo = self.base_fw_get(
            BaseFwParam::ModulesInfoGet.into(),
            ModulesInfo::allocation_size(count as usize),
        )?;
        if info.modules.len() != count as usize {
            return Err(AgentError::Firmware(format!(
                "Firmware has returned an invalid module count: {} instead of {}",
                info.modules.len(),
                count
            )));
        }
        Ok(info.modules)
    }

    /// Ids of the pipelines currently instantiated
    pub fn pipeline_ids(&self) -> Result<Vec<u32>> {
        self.pipeline_ids_with_max(self.limits.max_ppl_count)
    }

    pub fn pipeline_ids_with_max(&self, max_count: u32) -> Result<Vec<u32>> {
        let info: PipelinesListInfo = self.base_fw_get(
            BaseFwParam::PipelineListInfoGet.into(),
            PipelinesListInfo::allocation_size(max_count as usize),
        )?;
        check_max_count("pipeline", info.ppl_ids.len(), max_count)?;
        Ok(info.ppl_ids)
    }

    pub fn gateways(&self) -> Result<Vec<GatewayProps>> {
        self.gateways_with_max(self.limits.gateway_count)
    }

    pub fn gateways_with_max(&self, max_count: u32) -> Result<Vec<GatewayProps>> {
        let info: GatewaysInfo = self.base_fw_get(
            BaseFwParam::GatewaysInfoGet.into(),
            GatewaysInfo::allocation_size(max_count as usize),
        )?;
        check_max_count("gateway", info.gateways.len(), max_count)?;
        Ok(info.gateways)
    }

    pub fn perf_items(&self) -> Result<Vec<PerfDataItem>> {
        self.perf_items_with_max(self.limits.max_perf_items())
    }

    pub fn perf_items_with_max(&self, max_count: u32) -> Result<Vec<PerfDataItem>> {
        let data: GlobalPerfData = self.base_fw_get(
            BaseFwParam::GlobalPerfData.into(),
            GlobalPerfData::allocation_size(max_count as usize),
        )?;
        check_max_count("performance entries", data.items.len(), max_count)?;
        Ok(data.items)
    }

    pub fn pipeline_props(&self, pipeline_id: u32) -> Result<PipelineProps> {
        let param = ParameterId::extended(BaseFwParam::PipelinePropsGet.to_raw(), pipeline_id)?;
        self.base_fw_get(param, MAX_PARAMETER_PAYLOAD_SIZE)
    }

    pub fn schedulers_info(&self, core_id: u32) -> Result<SchedulersInfo> {
        let param = ParameterId::extended(BaseFwParam::SchedulersInfoGet.to_raw(), core_id)?;
        self.base_fw_get(param, MAX_PARAMETER_PAYLOAD_SIZE)
    }

    pub fn module_instance_props(
        &self,
        module_id: u16,
        instance_id: u16,
    ) -> Result<ModuleInstanceProps> {
        let reply = self.query(
            module_id,
            instance_id,
            BaseModuleParam::ModInstProps.into(),
            MAX_PARAMETER_PAYLOAD_SIZE,
        )?;
        decode_reply(&reply)
    }

    pub fn global_memory_state(&self) -> Result<GlobalMemoryState> {
        let mut state = GlobalMemoryState::default();
        query_tlv(&self.transport, BaseFwParam::MemoryStateInfoGet, &mut state)?;
        Ok(state)
    }

    pub fn perf_state(&self) -> Result<PerfState> {
        self.base_fw_get(BaseFwParam::PerfMeasurementsState.into(), 4)
    }

    pub fn set_perf_state(&self, state: PerfState) -> Result<()> {
        self.set_module_parameter(
            BASE_FW_MODULE_ID,
            BASE_FW_INSTANCE_ID,
            BaseFwParam::PerfMeasurementsState.into(),
            &state.to_raw().to_le_bytes(),
        )
    }

    /// Write a raw module parameter
    pub fn set_module_parameter(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        payload: &[u8],
    ) -> Result<()> {
        if payload.len() > MAX_PARAMETER_PAYLOAD_SIZE {
            return Err(AgentError::InvalidArgument(format!(
                "Cannot set module parameter: payload too big: {} max: {}",
                payload.len(),
                MAX_PARAMETER_PAYLOAD_SIZE
            )));
        }
        self.transport
            .configure(module_id, instance_id, param, payload)
            .with_context(|| {
                format!(
                    "Unable to set parameter {} of module {} instance {}",
                    param, module_id, instance_id
                )
            })
    }

    /// Read a raw module parameter of at most `size` bytes
    pub fn get_module_parameter(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        size: usize,
    ) -> Result<Vec<u8>> {
        self.query(module_id, instance_id, param, size.min(MAX_PARAMETER_PAYLOAD_SIZE))
    }

    fn query(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        size: usize,
    ) -> Result<Vec<u8>> {
        query_param(&self.transport, module_id, instance_id, param, size)
    }

    fn base_fw_get<V: Streamable>(&self, param: ParameterId, size: usize) -> Result<V> {
        let reply = self.query(BASE_FW_MODULE_ID, BASE_FW_INSTANCE_ID, param, size)?;
        decode_reply(&reply)
    }
}

fn query_param<T: Transport + ?Sized>(
    transport: &T,
    module_id: u16,
    instance_id: u16,
    param: ParameterId,
    size: usize,
) -> Result<Vec<u8>> {
    tracing::debug!(module_id, instance_id, param = param.0, size, "query");
    transport
        .query(module_id, instance_id, param, size)
        .with_context(|| {
            format!(
                "Unable to query parameter {} of module {} instance {}",
                param, module_id, instance_id
            )
        })
}

/// Fetch a TLV list from the base firmware into `handler`.
///
/// Malformed records are logged and skipped.
fn query_tlv<T: Transport + ?Sized, H: TlvResponseHandler>(
    transport: &T,
    param: BaseFwParam,
    handler: &mut H,
) -> Result<()> {
    let size = match param {
        BaseFwParam::FwConfig | BaseFwParam::HwConfigGet => CAVS_TLV_BUFFER_SIZE,
        _ => MAX_PARAMETER_PAYLOAD_SIZE,
    };
    let reply = query_param(
        transport,
        BASE_FW_MODULE_ID,
        BASE_FW_INSTANCE_ID,
        param.into(),
        size,
    )?;

    for error in TlvUnpack::new(handler, &reply).read_all() {
        tracing::warn!(param = %param, "Skipping TLV record: {}", error);
    }
    Ok(())
}

fn decode_reply<V: Streamable>(reply: &[u8]) -> Result<V> {
    let mut reader = ByteStreamReader::new(reply);
    let value = reader.read::<V>().context("Can not decode fw parameter")?;
    if !reader.is_eos() {
        tracing::warn!(
            "Firmware parameter not fully consumed: {} bytes left out of {}",
            reader.remaining(),
            reply.len()
        );
    }
    Ok(value)
}

fn check_max_count(what: &str, count: usize, max_count: u32) -> Result<()> {
    if count > max_count as usize {
        return Err(AgentError::Firmware(format!(
            "Firmware has returned an invalid {} count: {} max is: {}",
            what, count, max_count
        )));
    }
    Ok(())
}
