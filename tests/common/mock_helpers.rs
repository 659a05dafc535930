//! Fake firmware and fake probe driver

use super::builders::FirmwareSample;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use dsp_debug_agent::codec::{encode, ByteStreamWriter, FirmwareEnum};
use dsp_debug_agent::firmware::config::write_tlv;
use dsp_debug_agent::firmware::{
    BaseFwParam, BaseModuleParam, CompoundModuleId, FwConfigTag, GatewaysInfo, HwConfigTag,
    ModulesInfo, ParameterId, PipelinesListInfo,
};
use dsp_debug_agent::probe::driver::ChannelKind;
use dsp_debug_agent::probe::{
    ChannelId, ExtractionSource, InjectionSink, ProbeConfig, ProbeDriver, ProbeError, ProbeResult,
    ProbeState,
};
use dsp_debug_agent::transport::{Transport, TransportStats};
use dsp_debug_agent::{AgentError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// [`Transport`] serving a [`FirmwareSample`].
///
/// Base firmware parameters can be made to fail with [`FakeFirmware::fail`].
pub struct FakeFirmware {
    sample: FirmwareSample,
    failing: Mutex<Vec<BaseFwParam>>,
    parameters: Mutex<HashMap<(u16, u16, u32), Vec<u8>>>,
    stats: Mutex<TransportStats>,
}

impl FakeFirmware {
    pub fn new(sample: FirmwareSample) -> Self {
        Self {
            sample,
            failing: Mutex::new(Vec::new()),
            parameters: Mutex::new(HashMap::new()),
            stats: Mutex::new(TransportStats::default()),
        }
    }

    pub fn sample(&self) -> &FirmwareSample {
        &self.sample
    }

    /// Make every later query of `param` fail
    pub fn fail(&self, param: BaseFwParam) {
        self.failing.lock().unwrap().push(param);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn fw_config_tlv(&self) -> Vec<u8> {
        let sample = &self.sample;
        let mut writer = ByteStreamWriter::new();
        write_tlv(&mut writer, FwConfigTag::FwVersion.to_raw(), &sample.fw_version);
        write_tlv(
            &mut writer,
            FwConfigTag::ModulesCount.to_raw(),
            &(sample.modules.len() as u32),
        );
        write_tlv(&mut writer, FwConfigTag::MaxPplCount.to_raw(), &sample.max_ppl_count);
        write_tlv(
            &mut writer,
            FwConfigTag::MaxModInstCount.to_raw(),
            &sample.max_mod_inst_count,
        );
        writer.into_inner()
    }

    fn hw_config_tlv(&self) -> Vec<u8> {
        let mut writer = ByteStreamWriter::new();
        write_tlv(&mut writer, HwConfigTag::DspCores.to_raw(), &self.sample.dsp_core_count);
        write_tlv(
            &mut writer,
            HwConfigTag::GatewayCount.to_raw(),
            &(self.sample.gateways.len() as u32),
        );
        writer.into_inner()
    }

    fn base_fw_reply(&self, param: ParameterId) -> Result<Vec<u8>> {
        let base = BaseFwParam::from_raw(param.type_tag());
        if self.failing.lock().unwrap().contains(&base) {
            return Err(AgentError::Transport(format!("injected failure on {}", base)));
        }

        let sample = &self.sample;
        match base {
            BaseFwParam::FwConfig => Ok(self.fw_config_tlv()),
            BaseFwParam::HwConfigGet => Ok(self.hw_config_tlv()),
            BaseFwParam::ModulesInfoGet => Ok(encode(&ModulesInfo {
                modules: sample.modules.clone(),
            })),
            BaseFwParam::PipelineListInfoGet => Ok(encode(&PipelinesListInfo {
                ppl_ids: sample.pipelines.iter().map(|ppl| ppl.id).collect(),
            })),
            BaseFwParam::PipelinePropsGet => sample
                .pipelines
                .iter()
                .find(|ppl| ppl.id == param.sub_id())
                .map(encode)
                .ok_or_else(|| AgentError::Transport("unknown pipeline".to_string())),
            BaseFwParam::SchedulersInfoGet => sample
                .schedulers
                .get(param.sub_id() as usize)
                .map(encode)
                .ok_or_else(|| AgentError::Transport("unknown core".to_string())),
            BaseFwParam::GatewaysInfoGet => Ok(encode(&GatewaysInfo {
                gateways: sample.gateways.clone(),
            })),
            _ => self.stored(0, 0, param),
        }
    }

    fn stored(&self, module_id: u16, instance_id: u16, param: ParameterId) -> Result<Vec<u8>> {
        self.parameters
            .lock()
            .unwrap()
            .get(&(module_id, instance_id, param.0))
            .cloned()
            .ok_or_else(|| AgentError::Transport(format!("no parameter {}", param)))
    }
}

impl Transport for FakeFirmware {
    fn query(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        max_reply_size: usize,
    ) -> Result<Vec<u8>> {
        let result = if module_id == 0 && instance_id == 0 {
            self.base_fw_reply(param)
        } else if param == BaseModuleParam::ModInstProps.into() {
            self.sample
                .instance(CompoundModuleId::new(module_id, instance_id))
                .map(encode)
                .ok_or_else(|| AgentError::Transport("unknown instance".to_string()))
        } else {
            self.stored(module_id, instance_id, param)
        };

        let mut stats = self.stats.lock().unwrap();
        match &result {
            Ok(reply) => stats.record_query(reply.len()),
            Err(_) => stats.record_failure(),
        }
        result.map(|mut reply| {
            reply.truncate(max_reply_size);
            reply
        })
    }

    fn configure(
        &self,
        module_id: u16,
        instance_id: u16,
        param: ParameterId,
        payload: &[u8],
    ) -> Result<()> {
        self.parameters
            .lock()
            .unwrap()
            .insert((module_id, instance_id, param.0), payload.to_vec());
        self.stats.lock().unwrap().record_configure();
        Ok(())
    }

    fn stats(&self) -> TransportStats {
        self.stats.lock().unwrap().clone()
    }
}

/// What the fake driver saw
#[derive(Debug)]
pub struct DriverLog {
    pub state: ProbeState,
    pub transitions: Vec<(ProbeState, ProbeState)>,
    pub channel_writes: Vec<(ChannelKind, ChannelId, ProbeConfig)>,
    /// Bytes written to each injection sink, prefill included
    pub injected: BTreeMap<ChannelId, Vec<u8>>,
}

/// Test side of a [`FakeProbeDriver`]
#[derive(Clone)]
pub struct FakeDriverHandle {
    pub log: Arc<Mutex<DriverLog>>,
    /// Chunks of the extraction stream; dropping every sender ends it
    pub stream: Sender<Vec<u8>>,
}

impl FakeDriverHandle {
    pub fn state(&self) -> ProbeState {
        self.log.lock().unwrap().state
    }

    pub fn injected(&self, channel: ChannelId) -> Vec<u8> {
        self.log
            .lock()
            .unwrap()
            .injected
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }
}

/// [`ProbeDriver`] keeping its state in memory.
///
/// Injection sinks hold 8 bytes and free 8 bytes on every wait.
pub struct FakeProbeDriver {
    max_extraction: usize,
    max_injection: usize,
    log: Arc<Mutex<DriverLog>>,
    stream: Receiver<Vec<u8>>,
    fail_entering: Option<ProbeState>,
}

pub const FAKE_SINK_SIZE: usize = 8;

impl FakeProbeDriver {
    pub fn new(max_extraction: usize, max_injection: usize) -> (Self, FakeDriverHandle) {
        let (tx, rx) = unbounded();
        let log = Arc::new(Mutex::new(DriverLog {
            state: ProbeState::Idle,
            transitions: Vec::new(),
            channel_writes: Vec::new(),
            injected: BTreeMap::new(),
        }));
        let driver = Self {
            max_extraction,
            max_injection,
            log: Arc::clone(&log),
            stream: rx,
            fail_entering: None,
        };
        (driver, FakeDriverHandle { log, stream: tx })
    }

    /// Reject every transition into `state`
    pub fn failing_on(mut self, state: ProbeState) -> Self {
        self.fail_entering = Some(state);
        self
    }
}

impl ProbeDriver for FakeProbeDriver {
    fn max_extraction_channels(&self) -> usize {
        self.max_extraction
    }

    fn max_injection_channels(&self) -> usize {
        self.max_injection
    }

    fn state(&self) -> ProbeResult<ProbeState> {
        Ok(self.log.lock().unwrap().state)
    }

    fn set_state(&mut self, from: ProbeState, to: ProbeState) -> ProbeResult<()> {
        if self.fail_entering == Some(to) {
            return Err(ProbeError::driver(format!("cannot enter {}", to)));
        }
        let mut log = self.log.lock().unwrap();
        assert_eq!(log.state, from, "transition from a state the driver is not in");
        log.state = to;
        log.transitions.push((from, to));
        Ok(())
    }

    fn write_channel(
        &mut self,
        kind: ChannelKind,
        channel: ChannelId,
        config: &ProbeConfig,
    ) -> ProbeResult<()> {
        self.log
            .lock()
            .unwrap()
            .channel_writes
            .push((kind, channel, *config));
        Ok(())
    }

    fn open_extraction(&mut self) -> ProbeResult<Box<dyn ExtractionSource>> {
        Ok(Box::new(FakeSource {
            stream: self.stream.clone(),
        }))
    }

    fn open_injection(&mut self, channel: ChannelId) -> ProbeResult<Box<dyn InjectionSink>> {
        Ok(Box::new(FakeSink {
            channel,
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeSource {
    stream: Receiver<Vec<u8>>,
}

impl ExtractionSource for FakeSource {
    fn read_chunk(&mut self, timeout: Duration) -> ProbeResult<Option<Vec<u8>>> {
        match self.stream.recv_timeout(timeout) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(RecvTimeoutError::Timeout) => Ok(Some(Vec::new())),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }
}

struct FakeSink {
    channel: ChannelId,
    log: Arc<Mutex<DriverLog>>,
}

impl InjectionSink for FakeSink {
    fn size(&self) -> usize {
        FAKE_SINK_SIZE
    }

    fn wait_available(&mut self, timeout: Duration) -> ProbeResult<usize> {
        std::thread::sleep(timeout);
        Ok(FAKE_SINK_SIZE)
    }

    fn write(&mut self, data: &[u8]) -> ProbeResult<()> {
        self.log
            .lock()
            .unwrap()
            .injected
            .entry(self.channel)
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }
}
