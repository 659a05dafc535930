//! Probe point addressing and the extraction packet format.

use crate::codec::{
    ByteStreamReader, ByteStreamWriter, FirmwareEnum, StreamError, StreamResult, Streamable,
};
use crate::error::{AgentError, Result};
use serde::Serialize;
use std::fmt;

crate::firmware_enum! {
    /// Which side of a module a probe point sits on
    pub enum ProbeType {
        Input = 0 => "Input",
        Output = 1 => "Output",
        Internal = 2 => "Internal",
    }
}

/// A probe point packed into one `u32`:
/// `module_id:16 | instance_id:8 | type:2 | index:6`, low bits first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct ProbePointId(pub u32);

impl ProbePointId {
    const MODULE_ID_BITS: u32 = 16;
    const INSTANCE_ID_BITS: u32 = 8;
    const TYPE_BITS: u32 = 2;
    const INDEX_BITS: u32 = 6;

    const INSTANCE_ID_SHIFT: u32 = Self::MODULE_ID_BITS;
    const TYPE_SHIFT: u32 = Self::INSTANCE_ID_SHIFT + Self::INSTANCE_ID_BITS;
    const INDEX_SHIFT: u32 = Self::TYPE_SHIFT + Self::TYPE_BITS;

    pub fn new(module_id: u32, instance_id: u32, probe_type: ProbeType, index: u32) -> Result<Self> {
        let mut id = Self(0);
        id.set_module_id(module_id)?;
        id.set_instance_id(instance_id)?;
        id.set_type(probe_type)?;
        id.set_index(index)?;
        Ok(id)
    }

    #[inline]
    fn mask(bits: u32) -> u32 {
        (1 << bits) - 1
    }

    fn set_field(&mut self, shift: u32, bits: u32, value: u32) {
        let mask = Self::mask(bits) << shift;
        self.0 = (self.0 & !mask) | ((value << shift) & mask);
    }

    fn field(self, shift: u32, bits: u32) -> u32 {
        (self.0 >> shift) & Self::mask(bits)
    }

    pub fn set_module_id(&mut self, module_id: u32) -> Result<()> {
        if module_id >= 1 << Self::MODULE_ID_BITS {
            return Err(AgentError::InvalidArgument(format!(
                "Module id too large ({})",
                module_id
            )));
        }
        self.set_field(0, Self::MODULE_ID_BITS, module_id);
        Ok(())
    }

    pub fn set_instance_id(&mut self, instance_id: u32) -> Result<()> {
        if instance_id >= 1 << Self::INSTANCE_ID_BITS {
            return Err(AgentError::InvalidArgument(format!(
                "Instance id too large ({})",
                instance_id
            )));
        }
        self.set_field(Self::INSTANCE_ID_SHIFT, Self::INSTANCE_ID_BITS, instance_id);
        Ok(())
    }

    pub fn set_type(&mut self, probe_type: ProbeType) -> Result<()> {
        let raw = probe_type.to_raw();
        if !probe_type.is_known() || raw >= 1 << Self::TYPE_BITS {
            return Err(AgentError::InvalidArgument(format!(
                "Invalid probe type ({})",
                raw
            )));
        }
        self.set_field(Self::TYPE_SHIFT, Self::TYPE_BITS, raw);
        Ok(())
    }

    pub fn set_index(&mut self, index: u32) -> Result<()> {
        if index >= 1 << Self::INDEX_BITS {
            return Err(AgentError::InvalidArgument(format!(
                "Pin index too large ({})",
                index
            )));
        }
        self.set_field(Self::INDEX_SHIFT, Self::INDEX_BITS, index);
        Ok(())
    }

    pub fn module_id(self) -> u32 {
        self.field(0, Self::MODULE_ID_BITS)
    }

    pub fn instance_id(self) -> u32 {
        self.field(Self::INSTANCE_ID_SHIFT, Self::INSTANCE_ID_BITS)
    }

    pub fn probe_type(self) -> ProbeType {
        ProbeType::from_raw(self.field(Self::TYPE_SHIFT, Self::TYPE_BITS))
    }

    pub fn index(self) -> u32 {
        self.field(Self::INDEX_SHIFT, Self::INDEX_BITS)
    }
}

impl fmt::Debug for ProbePointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "moduleId={} instanceId={} type={} index={}",
            self.module_id(),
            self.instance_id(),
            self.probe_type(),
            self.index()
        )
    }
}

impl fmt::Display for ProbePointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Streamable for ProbePointId {
    const WIRE_SIZE: Option<usize> = Some(4);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        reader.read().map(Self)
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.0);
    }
}

/// Marks the start of every extraction packet
pub const PACKET_SYNC_WORD: u32 = 0xBABE_BEBA;

/// One block of samples extracted at a probe point.
///
/// Wire layout: sync word, probe point, format, wall clock high and low
/// words, `u32`-counted data, then a checksum: the sum of the header words
/// and the data length. The firmware sends a 64-bit checksum.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    pub probe_point_id: ProbePointId,
    pub format: u32,
    pub dsp_wall_clock_ts_hw: u32,
    pub dsp_wall_clock_ts_lw: u32,
    pub data: Vec<u8>,
}

impl Packet {
    /// Bytes before the data: five header words and the data count
    pub const HEADER_SIZE: usize = 24;
    /// Size of the checksum trailing a packet as the firmware sends it
    pub const CHECKSUM_SIZE: usize = 8;

    /// Read the data count of the packet starting at `header`.
    ///
    /// Only the sync word is checked, so the caller can decide whether the
    /// rest of the packet is worth waiting for.
    pub fn peek_data_size(header: &[u8]) -> StreamResult<usize> {
        let mut reader = ByteStreamReader::new(header);
        read_sync_word(&mut reader)?;
        // probe point, format and both wall clock words
        reader.read_bytes::<16>()?;
        let count: u32 = reader.read()?;
        Ok(count as usize)
    }

    pub fn checksum(&self) -> u64 {
        PACKET_SYNC_WORD as u64
            + self.probe_point_id.0 as u64
            + self.format as u64
            + self.dsp_wall_clock_ts_hw as u64
            + self.dsp_wall_clock_ts_lw as u64
            + self.data.len() as u64
    }

    fn write_header_and_data(&self, writer: &mut ByteStreamWriter) {
        writer.write(&PACKET_SYNC_WORD);
        writer.write(&self.probe_point_id);
        writer.write(&self.format);
        writer.write(&self.dsp_wall_clock_ts_hw);
        writer.write(&self.dsp_wall_clock_ts_lw);
        writer.write_vec::<u32, u8>(&self.data);
    }

    /// Encode with a 32-bit checksum, the form extraction clients read
    pub fn write_compact(&self, writer: &mut ByteStreamWriter) {
        self.write_header_and_data(writer);
        writer.write(&(self.checksum() as u32));
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Probe packet header {{ probe point id {{{}}} syncWord={:#x}, format={:#x}, \
             dspWallClockTsHw={:#x}, dspWallClockTsLw={:#x}, dataSize={:#x} }}",
            self.probe_point_id,
            PACKET_SYNC_WORD,
            self.format,
            self.dsp_wall_clock_ts_hw,
            self.dsp_wall_clock_ts_lw,
            self.data.len()
        )
    }
}

impl Streamable for Packet {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        read_sync_word(reader)?;

        let packet = Self {
            probe_point_id: reader.read()?,
            format: reader.read()?,
            dsp_wall_clock_ts_hw: reader.read()?,
            dsp_wall_clock_ts_lw: reader.read()?,
            data: reader.read_vec::<u32, u8>()?,
        };

        let checksum: u64 = reader.read()?;
        if checksum != packet.checksum() {
            return Err(StreamError::Invalid(format!(
                "Header checksum mismatch. Expected {}, found {}. While checking integrity of {}",
                packet.checksum(),
                checksum,
                packet
            )));
        }
        Ok(packet)
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        self.write_header_and_data(writer);
        writer.write(&self.checksum());
    }
}

fn read_sync_word(reader: &mut ByteStreamReader<'_>) -> StreamResult<()> {
    let sync: u32 = reader.read()?;
    if sync != PACKET_SYNC_WORD {
        return Err(StreamError::Invalid(format!(
            "Invalid sync word in extracted probe packet header. Expected {}, found {}",
            PACKET_SYNC_WORD, sync
        )));
    }
    Ok(())
}
