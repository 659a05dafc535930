//! Snapshot acquisition
//!
//! The builder issues the queries in dependency order so that every
//! instance referenced by a pipeline or a scheduler task is fetched before
//! links are computed.

use super::Topology;
use crate::error::{Result, ResultExt};
use crate::firmware::CompoundModuleId;
use crate::handler::ModuleHandler;
use crate::transport::Transport;
use std::collections::BTreeSet;

pub struct TopologyBuilder<'a, T: Transport> {
    handler: &'a ModuleHandler<T>,
}

impl<'a, T: Transport> TopologyBuilder<'a, T> {
    pub fn new(handler: &'a ModuleHandler<T>) -> Self {
        Self { handler }
    }

    /// Query a complete snapshot and compute its links
    pub fn build(&self) -> Result<Topology> {
        let handler = self.handler;

        let mut pipelines = Vec::new();
        for id in handler.pipeline_ids().context("Unable to list pipelines")? {
            pipelines.push(handler.pipeline_props(id)?);
        }

        let mut schedulers = Vec::new();
        for core_id in 0..handler.limits().dsp_core_count {
            schedulers.push(handler.schedulers_info(core_id)?);
        }

        let gateways = handler.gateways().context("Unable to list gateways")?;

        let referenced: BTreeSet<CompoundModuleId> = pipelines
            .iter()
            .flat_map(|ppl| ppl.module_instances.iter().copied())
            .chain(schedulers.iter().flat_map(|info| info.module_instances()))
            .collect();

        let mut instances = Vec::with_capacity(referenced.len());
        for id in referenced {
            instances.push(handler.module_instance_props(id.module_id, id.instance_id)?);
        }

        tracing::info!(
            pipelines = pipelines.len(),
            schedulers = schedulers.len(),
            gateways = gateways.len(),
            instances = instances.len(),
            "Topology snapshot acquired"
        );

        let mut topology = Topology::new(instances, gateways, pipelines, schedulers);
        topology.compute_links()?;
        Ok(topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode, ByteStreamWriter, FirmwareEnum};
    use crate::error::AgentError;
    use crate::firmware::config::write_tlv;
    use crate::firmware::{
        BaseFwParam, BaseModuleParam, FwConfigTag, FwVersion, GatewaysInfo, HwConfigTag,
        ModuleInstanceProps, ParameterId, PinProps, PipelineProps, PipelinesListInfo,
        SchedulerProps, SchedulersInfo, TaskProps,
    };
    use crate::transport::MockTransport;

    fn config_reply(param: BaseFwParam) -> Vec<u8> {
        let mut writer = ByteStreamWriter::new();
        if param == BaseFwParam::FwConfig {
            let version = FwVersion {
                major: 9,
                minor: 0,
                hotfix: 0,
                build: 1,
            };
            write_tlv(&mut writer, FwConfigTag::FwVersion.to_raw(), &version);
            write_tlv(&mut writer, FwConfigTag::ModulesCount.to_raw(), &3u32);
            write_tlv(&mut writer, FwConfigTag::MaxPplCount.to_raw(), &4u32);
            write_tlv(&mut writer, FwConfigTag::MaxModInstCount.to_raw(), &4u32);
        } else {
            write_tlv(&mut writer, HwConfigTag::DspCores.to_raw(), &1u32);
            write_tlv(&mut writer, HwConfigTag::GatewayCount.to_raw(), &2u32);
        }
        writer.into_inner()
    }

    fn instance(module_id: u16, instance_id: u16, inputs: &[u32], outputs: &[u32]) -> ModuleInstanceProps {
        let pins = |queues: &[u32]| {
            queues
                .iter()
                .map(|&phys_queue_id| PinProps {
                    phys_queue_id,
                    ..PinProps::default()
                })
                .collect()
        };
        let mut props = ModuleInstanceProps::new(CompoundModuleId::new(module_id, instance_id));
        props.input_pins = pins(inputs);
        props.output_pins = pins(outputs);
        props
    }

    /// One pipeline `(1,0) -> (2,0)` plus an instance `(3,0)` only known to
    /// the scheduler
    fn firmware(module_id: u16, instance_id: u16, param: ParameterId, _: usize) -> Result<Vec<u8>> {
        if param == BaseModuleParam::ModInstProps.into() && module_id != 0 {
            return match (module_id, instance_id) {
                (1, 0) => Ok(encode(&instance(1, 0, &[], &[0]))),
                (2, 0) => Ok(encode(&instance(2, 0, &[0], &[]))),
                (3, 0) => Ok(encode(&instance(3, 0, &[], &[]))),
                _ => Err(AgentError::Transport("no such instance".to_string())),
            };
        }

        match BaseFwParam::from_raw(param.type_tag()) {
            param @ (BaseFwParam::FwConfig | BaseFwParam::HwConfigGet) => Ok(config_reply(param)),
            BaseFwParam::PipelineListInfoGet => Ok(encode(&PipelinesListInfo { ppl_ids: vec![1] })),
            BaseFwParam::PipelinePropsGet => Ok(encode(&PipelineProps::new(
                1,
                0,
                vec![CompoundModuleId::new(1, 0), CompoundModuleId::new(2, 0)],
            ))),
            BaseFwParam::SchedulersInfoGet => Ok(encode(&SchedulersInfo {
                schedulers: vec![SchedulerProps {
                    processing_domain: 0,
                    core_id: param.sub_id(),
                    tasks: vec![TaskProps {
                        task_id: 1,
                        module_instances: vec![CompoundModuleId::new(3, 0)],
                    }],
                }],
            })),
            BaseFwParam::GatewaysInfoGet => Ok(encode(&GatewaysInfo { gateways: Vec::new() })),
            other => Err(AgentError::Transport(format!("unexpected {}", other))),
        }
    }

    #[test]
    fn test_build_fetches_every_referenced_instance() {
        let mut transport = MockTransport::new();
        transport.expect_query().returning(firmware);
        let handler = ModuleHandler::new(transport).unwrap();

        let topology = TopologyBuilder::new(&handler).build().unwrap();
        assert_eq!(topology.module_instances.len(), 3);
        assert!(topology.instance(CompoundModuleId::new(3, 0)).is_ok());
        assert_eq!(topology.links.len(), 1);
        assert!(topology.unresolved.is_empty());
        assert_eq!(topology.schedulers.len(), 1);
    }

    #[test]
    fn test_build_propagates_query_failure() {
        let mut transport = MockTransport::new();
        transport
            .expect_query()
            .returning(|module_id, instance_id, param, size| match (module_id, instance_id) {
                (2, 0) => Err(AgentError::Transport("timeout".to_string())),
                _ => firmware(module_id, instance_id, param, size),
            });
        let handler = ModuleHandler::new(transport).unwrap();

        let err = TopologyBuilder::new(&handler).build().unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
