//! Gateway list.

use super::ids::ConnectorNodeId;
use crate::codec::{ByteStreamReader, ByteStreamWriter, StreamResult, Streamable};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayProps {
    pub id: ConnectorNodeId,
    pub attribs: u32,
}

impl GatewayProps {
    pub fn new(id: ConnectorNodeId) -> Self {
        Self { id, attribs: 0 }
    }

    /// Buffer allocated from low-power memory
    pub fn lp_buffer_alloc(&self) -> bool {
        self.attribs & 1 != 0
    }
}

impl Streamable for GatewayProps {
    const WIRE_SIZE: Option<usize> = Some(8);

    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            id: reader.read()?,
            attribs: reader.read()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.id);
        writer.write(&self.attribs);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GatewaysInfo {
    pub gateways: Vec<GatewayProps>,
}

impl GatewaysInfo {
    pub fn allocation_size(count: usize) -> usize {
        4 + count * 8
    }
}

impl Streamable for GatewaysInfo {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            gateways: reader.read_vec::<u32, GatewayProps>()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write_vec::<u32, GatewayProps>(&self.gateways);
    }
}
