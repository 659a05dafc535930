//! Test data builders for firmware objects

use dsp_debug_agent::firmware::{
    AudioDataFormatIpc, CompoundModuleId, ConnectorNodeId, FwVersion, GatewayProps, GatewayType,
    InterleavingStyle, ModuleEntry, ModuleInstanceProps, PinProps, PipelineProps, SchedulerProps,
    SchedulersInfo, TaskProps,
};

pub const COPIER: u16 = 0;
pub const AEC: u16 = 1;
pub const GAIN: u16 = 5;
pub const NS: u16 = 9;
pub const MIXIN: u16 = 1024;
pub const SRC: u16 = 4012;
pub const MIXOUT: u16 = 4100;

// Physical queue ids of the sample topology
pub const PIPE1: u32 = 0;
pub const PIPE2: u32 = 1;
pub const PIPE3: u32 = 2;
pub const PIPE4: u32 = 3;
pub const PIPE1_3: u32 = 4;
pub const PIPE2_3: u32 = 5;
pub const PIPE3_4: u32 = 6;

pub fn id(module_id: u16, instance_id: u16) -> CompoundModuleId {
    CompoundModuleId::new(module_id, instance_id)
}

/// 48 kHz 16-bit mono PCM in blocks
pub fn sample_format() -> AudioDataFormatIpc {
    AudioDataFormatIpc {
        interleaving_style: InterleavingStyle::Blocks,
        number_of_channels: 1,
        ..AudioDataFormatIpc::default()
    }
}

/// Builder for module instance props
pub struct InstanceBuilder {
    props: ModuleInstanceProps,
    format: AudioDataFormatIpc,
}

impl InstanceBuilder {
    pub fn new(module_id: u16, instance_id: u16) -> Self {
        Self {
            props: ModuleInstanceProps::new(id(module_id, instance_id)),
            format: sample_format(),
        }
    }

    pub fn format(mut self, format: AudioDataFormatIpc) -> Self {
        self.format = format;
        self
    }

    /// One input pin per queue id
    pub fn inputs(mut self, queues: &[u32]) -> Self {
        self.props.input_pins = queues.iter().map(|&q| PinProps::pcm(self.format, q)).collect();
        self
    }

    /// One output pin per queue id
    pub fn outputs(mut self, queues: &[u32]) -> Self {
        self.props.output_pins = queues.iter().map(|&q| PinProps::pcm(self.format, q)).collect();
        self
    }

    pub fn input_gateway(mut self, gateway_type: GatewayType, index: u8) -> Self {
        self.props.input_gateway = ConnectorNodeId::new(gateway_type, index);
        self
    }

    pub fn output_gateway(mut self, gateway_type: GatewayType, index: u8) -> Self {
        self.props.output_gateway = ConnectorNodeId::new(gateway_type, index);
        self
    }

    pub fn build(self) -> ModuleInstanceProps {
        self.props
    }
}

/// Builder for pipeline props
pub struct PipelineBuilder {
    props: PipelineProps,
}

impl PipelineBuilder {
    pub fn new(pipeline_id: u32, priority: u32) -> Self {
        Self {
            props: PipelineProps::new(pipeline_id, priority, Vec::new()),
        }
    }

    pub fn instance(mut self, module_id: u16, instance_id: u16) -> Self {
        self.props.module_instances.push(id(module_id, instance_id));
        self
    }

    pub fn ll_tasks(mut self, tasks: &[u32]) -> Self {
        self.props.ll_tasks = tasks.to_vec();
        self
    }

    pub fn build(self) -> PipelineProps {
        self.props
    }
}

/// Everything a fake firmware serves
#[derive(Debug, Clone)]
pub struct FirmwareSample {
    pub fw_version: FwVersion,
    pub max_ppl_count: u32,
    pub max_mod_inst_count: u32,
    pub dsp_core_count: u32,
    pub modules: Vec<ModuleEntry>,
    /// In the order the firmware lists them
    pub pipelines: Vec<PipelineProps>,
    /// Indexed by core id
    pub schedulers: Vec<SchedulersInfo>,
    pub gateways: Vec<GatewayProps>,
    pub instances: Vec<ModuleInstanceProps>,
}

impl FirmwareSample {
    pub fn instance(&self, id: CompoundModuleId) -> Option<&ModuleInstanceProps> {
        self.instances.iter().find(|props| props.id == id)
    }
}

fn task(task_id: u32, instances: &[(u16, u16)]) -> TaskProps {
    TaskProps {
        task_id,
        module_instances: instances.iter().map(|&(m, i)| id(m, i)).collect(),
    }
}

/// Four pipelines on one core.
///
/// Pipelines 1 and 2 each start at a host gateway and feed the mixer of
/// pipeline 3, which ends at an HDA link. Pipeline 4 starts at a DMIC and
/// feeds both pipeline 3 (as a reference) and a host gateway.
pub fn canonical_sample() -> FirmwareSample {
    let instances = vec![
        // pipeline 1
        InstanceBuilder::new(COPIER, 1)
            .outputs(&[PIPE1])
            .input_gateway(GatewayType::HdaHostInput, 1)
            .build(),
        InstanceBuilder::new(AEC, 2).inputs(&[PIPE1]).outputs(&[PIPE1]).build(),
        InstanceBuilder::new(GAIN, 5).inputs(&[PIPE1]).outputs(&[PIPE1_3]).build(),
        // pipeline 2
        InstanceBuilder::new(GAIN, 4)
            .outputs(&[PIPE2])
            .input_gateway(GatewayType::HdaHostInput, 2)
            .build(),
        InstanceBuilder::new(AEC, 5).inputs(&[PIPE2]).outputs(&[PIPE2]).build(),
        InstanceBuilder::new(NS, 6).inputs(&[PIPE2]).outputs(&[PIPE2_3]).build(),
        // pipeline 3
        InstanceBuilder::new(MIXIN, 1)
            .inputs(&[PIPE1_3, PIPE2_3])
            .outputs(&[PIPE3])
            .build(),
        InstanceBuilder::new(SRC, 0).inputs(&[PIPE3]).outputs(&[PIPE3]).build(),
        InstanceBuilder::new(GAIN, 9)
            .inputs(&[PIPE3, PIPE3_4])
            .output_gateway(GatewayType::HdaLinkOutput, 1)
            .build(),
        // pipeline 4
        InstanceBuilder::new(GAIN, 1)
            .outputs(&[PIPE3_4, PIPE4])
            .input_gateway(GatewayType::DmicLinkInput, 1)
            .build(),
        InstanceBuilder::new(NS, 2).inputs(&[PIPE4]).outputs(&[PIPE4]).build(),
        InstanceBuilder::new(MIXOUT, 3)
            .inputs(&[PIPE4])
            .output_gateway(GatewayType::HdaHostOutput, 1)
            .build(),
    ];

    let gateways = [
        (GatewayType::HdaHostInput, 1),
        (GatewayType::HdaHostInput, 2),
        (GatewayType::HdaLinkOutput, 1),
        (GatewayType::DmicLinkInput, 1),
        (GatewayType::HdaHostOutput, 1),
    ]
    .into_iter()
    .map(|(gateway_type, index)| GatewayProps::new(ConnectorNodeId::new(gateway_type, index)))
    .collect();

    let schedulers = vec![SchedulersInfo {
        schedulers: vec![SchedulerProps {
            processing_domain: 0,
            core_id: 0,
            tasks: vec![
                task(1, &[(COPIER, 1)]),
                task(2, &[(AEC, 2), (GAIN, 5)]),
                task(3, &[(GAIN, 4)]),
                task(9, &[(AEC, 5), (NS, 6)]),
                task(4, &[(MIXIN, 1), (SRC, 0), (GAIN, 9)]),
                task(5, &[(GAIN, 1)]),
                task(6, &[(NS, 2), (MIXOUT, 3)]),
            ],
        }],
    }];

    // Listed out of priority order on purpose
    let pipelines = vec![
        PipelineBuilder::new(4, 40)
            .instance(GAIN, 1)
            .instance(NS, 2)
            .instance(MIXOUT, 3)
            .ll_tasks(&[5, 6])
            .build(),
        PipelineBuilder::new(2, 20)
            .instance(GAIN, 4)
            .instance(AEC, 5)
            .instance(NS, 6)
            .ll_tasks(&[3, 9])
            .build(),
        PipelineBuilder::new(1, 10)
            .instance(COPIER, 1)
            .instance(AEC, 2)
            .instance(GAIN, 5)
            .ll_tasks(&[1, 2])
            .build(),
        PipelineBuilder::new(3, 30)
            .instance(MIXIN, 1)
            .instance(SRC, 0)
            .instance(GAIN, 9)
            .ll_tasks(&[4])
            .build(),
    ];

    let modules = [
        (COPIER, "copier"),
        (AEC, "aec"),
        (GAIN, "gain"),
        (NS, "ns"),
        (MIXIN, "mixin"),
        (SRC, "src"),
        (MIXOUT, "mixout"),
    ]
    .into_iter()
    .map(|(module_id, name)| ModuleEntry::named(module_id, name))
    .collect();

    FirmwareSample {
        fw_version: FwVersion {
            major: 1,
            minor: 2,
            hotfix: 3,
            build: 4,
        },
        max_ppl_count: 10,
        max_mod_inst_count: 4,
        dsp_core_count: 1,
        modules,
        pipelines,
        schedulers,
        gateways,
        instances,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_builder() {
        let props = InstanceBuilder::new(GAIN, 3)
            .inputs(&[7])
            .output_gateway(GatewayType::HdaLinkOutput, 2)
            .build();

        assert_eq!(props.id, id(GAIN, 3));
        assert_eq!(props.input_pins[0].phys_queue_id, 7);
        assert_eq!(props.input_pins[0].format.number_of_channels, 1);
        assert!(props.output_pins.is_empty());
        assert!(props.output_gateway.is_valid());
        assert!(!props.input_gateway.is_valid());
    }
}
