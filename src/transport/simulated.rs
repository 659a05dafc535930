//! Simulated DSP firmware
//!
//! Answers module parameter queries from an in-memory [`FirmwareImage`]
//! instead of a real device, so the agent can run without audio hardware.
//!
//! # Enabling
//!
//! Only available with the `mock-dsp` feature:
//!
//! ```bash
//! cargo run --features mock-dsp
//! ```
//!
//! # Example
//!
//! ```ignore
//! use dsp_debug_agent::transport::SimulatedFirmware;
//! use dsp_debug_agent::ModuleHandler;
//!
//! let handler = ModuleHandler::new(SimulatedFirmware::demo())?;
//! let modules = handler.module_entries()?;
//! ```

use super::{Transport, TransportStats};
use crate::codec::{encode, ByteStreamWriter, FirmwareEnum};
use crate::error::{AgentError, Result};
use crate::firmware::config::write_tlv;
use crate::firmware::{
    AudioDataFormatIpc, BaseFwParam, BaseModuleParam, CompoundModuleId, ConnectorNodeId,
    FwConfigTag, FwVersion, GatewayProps, GatewayType, GatewaysInfo, GlobalPerfData,
    HwConfigTag, MemoryStateTag, ModuleEntry, ModuleInstanceProps, ModulesInfo, ParameterId,
    PerfDataItem, PinProps, PipelineProps, PipelinesListInfo, SchedulerProps, SchedulersInfo,
    SramStateInfo, StreamType, TaskProps,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Everything the simulated firmware knows about itself
#[derive(Debug, Clone, Default)]
pub struct FirmwareImage {
    pub fw_version: FwVersion,
    pub max_ppl_count: u32,
    pub max_mod_inst_count: u32,
    pub dsp_core_count: u32,
    pub modules: Vec<ModuleEntry>,
    /// Pipelines in the order the firmware lists them
    pub pipelines: Vec<PipelineProps>,
    /// Schedulers of each core, indexed by core id
    pub schedulers: Vec<SchedulersInfo>,
    pub gateways: Vec<GatewayProps>,
    pub instances: BTreeMap<CompoundModuleId, ModuleInstanceProps>,
    pub perf_items: Vec<PerfDataItem>,
    pub lpsram: Option<SramStateInfo>,
    pub hpsram: Option<SramStateInfo>,
}

impl FirmwareImage {
    /// Firmware configuration TLV list
    pub fn fw_config_tlv(&self) -> Vec<u8> {
        let mut writer = ByteStreamWriter::new();
        write_tlv(&mut writer, FwConfigTag::FwVersion.to_raw(), &self.fw_version);
        write_tlv(
            &mut writer,
            FwConfigTag::ModulesCount.to_raw(),
            &(self.modules.len() as u32),
        );
        write_tlv(&mut writer, FwConfigTag::MaxPplCount.to_raw(), &self.max_ppl_count);
        write_tlv(
            &mut writer,
            FwConfigTag::MaxModInstCount.to_raw(),
            &self.max_mod_inst_count,
        );
        writer.into_inner()
    }

    /// Hardware configuration TLV list
    pub fn hw_config_tlv(&self) -> Vec<u8> {
        let mut writer = ByteStreamWriter::new();
        write_tlv(&mut writer, HwConfigTag::DspCores.to_raw(), &self.dsp_core_count);
        write_tlv(
            &mut writer,
            HwConfigTag::GatewayCount.to_raw(),
            &(self.gateways.len() as u32),
        );
        writer.into_inner()
    }

    fn memory_state_tlv(&self) -> Vec<u8> {
        let mut writer = ByteStreamWriter::new();
        if let Some(lpsram) = &self.lpsram {
            write_tlv(&mut writer, MemoryStateTag::LpsramState.to_raw(), lpsram);
        }
        if let Some(hpsram) = &self.hpsram {
            write_tlv(&mut writer, MemoryStateTag::HpsramState.to_raw(), hpsram);
        }
        writer.into_inner()
    }

    /// A small board: one playback and one capture pipeline on a single core.
    ///
    /// Playback runs host gateway -> copier -> gain -> copier -> HDA link,
    /// capture runs DMIC -> copier -> noise suppression -> host gateway.
    pub fn demo() -> Self {
        const COPIER: u16 = 0;
        const GAIN: u16 = 5;
        const NS: u16 = 9;

        let format = AudioDataFormatIpc::default();
        let pins = |queues: &[u32]| -> Vec<PinProps> {
            queues
                .iter()
                .map(|&phys_queue_id| PinProps {
                    stream_type: StreamType::Pcm,
                    format,
                    phys_queue_id,
                })
                .collect()
        };
        let instance = |module_id, instance_id, inputs: &[u32], outputs: &[u32]| {
            let mut props = ModuleInstanceProps::new(CompoundModuleId::new(module_id, instance_id));
            props.input_pins = pins(inputs);
            props.output_pins = pins(outputs);
            props
        };

        let host_out = ConnectorNodeId::new(GatewayType::HdaHostOutput, 0);
        let link_out = ConnectorNodeId::new(GatewayType::HdaLinkOutput, 0);
        let dmic_in = ConnectorNodeId::new(GatewayType::DmicLinkInput, 0);
        let host_in = ConnectorNodeId::new(GatewayType::HdaHostInput, 0);

        let mut playback_in = instance(COPIER, 0, &[], &[0]);
        playback_in.input_gateway = host_out;
        let playback_gain = instance(GAIN, 0, &[0], &[1]);
        let mut playback_out = instance(COPIER, 1, &[1], &[]);
        playback_out.output_gateway = link_out;

        let mut capture_in = instance(COPIER, 2, &[], &[2]);
        capture_in.input_gateway = dmic_in;
        let capture_ns = instance(NS, 0, &[2], &[3]);
        let mut capture_out = instance(COPIER, 3, &[3], &[]);
        capture_out.output_gateway = host_in;

        let instances: BTreeMap<_, _> = [
            playback_in,
            playback_gain,
            playback_out,
            capture_in,
            capture_ns,
            capture_out,
        ]
        .into_iter()
        .map(|props| (props.id, props))
        .collect();

        let playback_ids: Vec<_> = [(COPIER, 0), (GAIN, 0), (COPIER, 1)]
            .iter()
            .map(|&(m, i)| CompoundModuleId::new(m, i))
            .collect();
        let capture_ids: Vec<_> = [(COPIER, 2), (NS, 0), (COPIER, 3)]
            .iter()
            .map(|&(m, i)| CompoundModuleId::new(m, i))
            .collect();

        let perf_items = instances
            .keys()
            .map(|&id| PerfDataItem::new(id, false, false, 1200, 800))
            .collect();

        Self {
            fw_version: FwVersion {
                major: 9,
                minor: 22,
                hotfix: 1,
                build: 4323,
            },
            max_ppl_count: 8,
            max_mod_inst_count: 16,
            dsp_core_count: 1,
            modules: vec![
                ModuleEntry::named(COPIER, "copier"),
                ModuleEntry::named(GAIN, "gain"),
                ModuleEntry::named(NS, "ns"),
            ],
            pipelines: vec![
                PipelineProps::new(1, 0, playback_ids.clone()),
                PipelineProps::new(2, 0, capture_ids.clone()),
            ],
            schedulers: vec![SchedulersInfo {
                schedulers: vec![SchedulerProps {
                    processing_domain: 0,
                    core_id: 0,
                    tasks: vec![
                        TaskProps {
                            task_id: 1,
                            module_instances: playback_ids,
                        },
                        TaskProps {
                            task_id: 2,
                            module_instances: capture_ids,
                        },
                    ],
                }],
            }],
            gateways: [host_out, link_out, dmic_in, host_in]
                .into_iter()
                .map(GatewayProps::new)
                .collect(),
            instances,
            perf_items,
            lpsram: Some(SramStateInfo {
                free_phys_mem_pages: 12,
                ebb_states: vec![0x3],
                page_alloc: vec![0xFFFF, 0x00FF],
            }),
            hpsram: None,
        }
    }
}

/// [`Transport`] answering from a [`FirmwareImage`].
///
/// Parameters written with `configure` are stored and served back by later
/// queries of the same parameter.
pub struct SimulatedFirmware {
    image: FirmwareImage,
    parameters: Mutex<HashMap<(u16, u16, u32), Vec<u8>>>,
    stats: Mutex<TransportStats>,
}

impl SimulatedFirmware {
    pub fn new(image: FirmwareImage) -> Self {
        Self {
            image,
            parameters: Mutex::new(HashMap::new()),
            stats: Mutex::new(TransportStats::default()),
        }
    }

    pub fn demo() -> Self {
        Self::new(FirmwareImage::demo())
    }

    pub fn image(&self) -> &FirmwareImage {
        &self.image
    }

    fn base_fw_reply(&self, param: ParameterId) -> Result<Vec<u8>> {
        let image = &self.image;
        let reply = match BaseFwParam::from_raw(param.type_tag()) {
            BaseFwParam::FwConfig => image.fw_config_tlv(),
            BaseFwParam::HwConfigGet => image.hw_config_tlv(),
            BaseFwParam::ModulesInfoGet => encode(&ModulesInfo {
                modules: image.modules.clone(),
            }),
            BaseFwParam::PipelineListInfoGet => encode(&PipelinesListInfo {
                ppl_ids: image.pipelines.iter().map(|ppl| ppl.id).collect(),
            }),
            BaseFwParam::PipelinePropsGet => {
                let ppl_id = param.sub_id();
                let props = image
                    .pipelines
                    .iter()
                    .find(|ppl| ppl.id == ppl_id)
                    .ok_or_else(|| {
                        AgentError::Transport(format!("Unknown pipeline id {}", ppl_id))
                    })?;
                encode(props)
            }
            BaseFwParam::SchedulersInfoGet => {
                let core_id = param.sub_id();
                let info = image.schedulers.get(core_id as usize).ok_or_else(|| {
                    AgentError::Transport(format!("Unknown core id {}", core_id))
                })?;
                encode(info)
            }
            BaseFwParam::GatewaysInfoGet => encode(&GatewaysInfo {
                gateways: image.gateways.clone(),
            }),
            BaseFwParam::MemoryStateInfoGet => image.memory_state_tlv(),
            BaseFwParam::GlobalPerfData => encode(&GlobalPerfData {
                items: image.perf_items.clone(),
            }),
            _ => return self.stored_parameter(0, 0, param),
        };
        Ok(reply)
    }

    fn stored_parameter(&self, module_id: u16, instance_id: u16, param: ParameterId) -> Result<Vec<u8>> {
        let parameters = self
            .parameters
            .lock()
            .map_err(|_| AgentError::Transport("simulator state poisoned".to_string()))?;
        parameters
            .get(&(module_id, instance_id, param.0))
            .cloned()
            .ok_or_else(|| {
                AgentError::Transport(format!(
                    "Unsupported parameter {} of module {} instance {}",
                    param, module_id, instance_id
                ))
            })
    }

    fn record(&self, result: &Result<Vec<u8>>) {
        if let Ok(mut stats) = self.stats.lock() {
            match result {
                Ok(reply) => stats.record_query(reply.len()),
                Err(_) => stats.record_failure(),
            }
        }
    }
}

impl Transport for SimulatedFirmware {
    fn query(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        max_reply_size: usize,
    ) -> Result<Vec<u8>> {
        let result = if module_id == 0 && instance_id == 0 {
            self.base_fw_reply(param)
        } else if param.0 == BaseModuleParam::ModInstProps.to_raw() {
            self.image
                .instances
                .get(&CompoundModuleId::new(module_id, instance_id))
                .map(encode)
                .ok_or_else(|| {
                    AgentError::Transport(format!(
                        "No module instance ({},{})",
                        module_id, instance_id
                    ))
                })
        } else {
            self.stored_parameter(module_id, instance_id, param)
        };

        // The driver never returns more than the caller asked for
        let result = result.map(|mut reply| {
            reply.truncate(max_reply_size);
            reply
        });
        self.record(&result);
        result
    }

    fn configure(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        payload: &[u8],
    ) -> Result<()> {
        let mut parameters = self
            .parameters
            .lock()
            .map_err(|_| AgentError::Transport("simulator state poisoned".to_string()))?;
        parameters.insert((module_id, instance_id, param.0), payload.to_vec());
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_configure();
        }
        Ok(())
    }

    fn stats(&self) -> TransportStats {
        self.stats.lock().map(|stats| stats.clone()).unwrap_or_default()
    }
}
