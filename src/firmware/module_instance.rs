//! Runtime properties of a module instance and its pins.

use super::audio_format::AudioDataFormatIpc;
use super::ids::{CompoundModuleId, ConnectorNodeId};
use crate::codec::{ByteStreamReader, ByteStreamWriter, StreamResult, Streamable};
use serde::Serialize;

crate::firmware_enum! {
    pub enum StreamType {
        Pcm = 0 => "PCM",
        Mp3 = 1 => "MP3",
        Aac = 2 => "AAC",
    }
}

/// One input or output pin of a module instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinProps {
    pub stream_type: StreamType,
    pub format: AudioDataFormatIpc,
    /// Queue shared with the peer pin, [`PinProps::INVALID_QUEUE_ID`] when unconnected
    pub phys_queue_id: u32,
}

impl PinProps {
    pub const INVALID_QUEUE_ID: u32 = u32::MAX;

    /// PCM pin on queue `phys_queue_id`
    pub fn pcm(format: AudioDataFormatIpc, phys_queue_id: u32) -> Self {
        Self {
            stream_type: StreamType::Pcm,
            format,
            phys_queue_id,
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.phys_queue_id != Self::INVALID_QUEUE_ID
    }
}

impl Default for PinProps {
    fn default() -> Self {
        Self::pcm(AudioDataFormatIpc::default(), Self::INVALID_QUEUE_ID)
    }
}

impl Streamable for PinProps {
    const WIRE_SIZE: Option<usize> = Some(32);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            stream_type: reader.read()?,
            format: reader.read()?,
            phys_queue_id: reader.read()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.stream_type);
        writer.write(&self.format);
        writer.write(&self.phys_queue_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInstanceProps {
    pub id: CompoundModuleId,
    pub dp_queue_type: u32,
    pub queue_alignment: u32,
    pub cp_usage_mask: u32,
    pub stack_bytes: u32,
    pub bss_total_bytes: u32,
    pub bss_used_bytes: u32,
    pub ibs_bytes: u32,
    pub obs_bytes: u32,
    pub cpc: u32,
    pub cpc_peak: u32,
    pub input_pins: Vec<PinProps>,
    pub output_pins: Vec<PinProps>,
    pub input_gateway: ConnectorNodeId,
    pub output_gateway: ConnectorNodeId,
}

impl ModuleInstanceProps {
    /// Props with no pins and no gateway
    pub fn new(id: CompoundModuleId) -> Self {
        Self {
            id,
            dp_queue_type: 0,
            queue_alignment: 0,
            cp_usage_mask: 0,
            stack_bytes: 0,
            bss_total_bytes: 0,
            bss_used_bytes: 0,
            ibs_bytes: 0,
            obs_bytes: 0,
            cpc: 0,
            cpc_peak: 0,
            input_pins: Vec::new(),
            output_pins: Vec::new(),
            input_gateway: ConnectorNodeId::INVALID,
            output_gateway: ConnectorNodeId::INVALID,
        }
    }
}

impl Streamable for ModuleInstanceProps {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            id: reader.read()?,
            dp_queue_type: reader.read()?,
            queue_alignment: reader.read()?,
            cp_usage_mask: reader.read()?,
            stack_bytes: reader.read()?,
            bss_total_bytes: reader.read()?,
            bss_used_bytes: reader.read()?,
            ibs_bytes: reader.read()?,
            obs_bytes: reader.read()?,
            cpc: reader.read()?,
            cpc_peak: reader.read()?,
            input_pins: reader.read_vec::<u32, PinProps>()?,
            output_pins: reader.read_vec::<u32, PinProps>()?,
            input_gateway: reader.read()?,
            output_gateway: reader.read()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.id);
        writer.write(&self.dp_queue_type);
        writer.write(&self.queue_alignment);
        writer.write(&self.cp_usage_mask);
        writer.write(&self.stack_bytes);
        writer.write(&self.bss_total_bytes);
        writer.write(&self.bss_used_bytes);
        writer.write(&self.ibs_bytes);
        writer.write(&self.obs_bytes);
        writer.write(&self.cpc);
        writer.write(&self.cpc_peak);
        writer.write_vec::<u32, PinProps>(&self.input_pins);
        writer.write_vec::<u32, PinProps>(&self.output_pins);
        writer.write(&self.input_gateway);
        writer.write(&self.output_gateway);
    }
}
