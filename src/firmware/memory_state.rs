//! Global memory state, delivered as a TLV list.

use crate::codec::{ByteStreamReader, ByteStreamWriter, StreamResult, Streamable};
use crate::tlv::{TlvDictionary, TlvResponseHandler};
use serde::Serialize;

crate::firmware_enum! {
    pub enum MemoryStateTag {
        LpsramState = 0 => "lpsram state",
        HpsramState = 1 => "hpsram state",
    }
}

/// State of one SRAM bank.
///
/// `ebb_states` and `page_alloc` entries are bitsets; the full state is
/// their concatenation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SramStateInfo {
    pub free_phys_mem_pages: u32,
    pub ebb_states: Vec<u32>,
    pub page_alloc: Vec<u16>,
}

impl Streamable for SramStateInfo {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            free_phys_mem_pages: reader.read()?,
            ebb_states: reader.read_vec::<u32, u32>()?,
            page_alloc: reader.read_vec::<u32, u16>()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.free_phys_mem_pages);
        writer.write_vec::<u32, u32>(&self.ebb_states);
        writer.write_vec::<u32, u16>(&self.page_alloc);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalMemoryState {
    pub lpsram: Option<SramStateInfo>,
    pub hpsram: Option<SramStateInfo>,
}

impl TlvResponseHandler for GlobalMemoryState {
    fn dictionary(&mut self) -> TlvDictionary<'_> {
        TlvDictionary::new()
            .scalar(MemoryStateTag::LpsramState, &mut self.lpsram)
            .scalar(MemoryStateTag::HpsramState, &mut self.hpsram)
    }
}
