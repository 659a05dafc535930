//! Pipeline list and pipeline properties.

use super::ids::CompoundModuleId;
use crate::codec::{ByteStreamReader, ByteStreamWriter, StreamResult, Streamable};
use serde::Serialize;

/// Properties of one pipeline; `module_instances` is in processing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineProps {
    pub id: u32,
    pub priority: u32,
    pub state: u32,
    pub total_memory_bytes: u32,
    pub used_memory_bytes: u32,
    pub context_pages: u32,
    pub module_instances: Vec<CompoundModuleId>,
    pub ll_tasks: Vec<u32>,
    pub dp_tasks: Vec<u32>,
}

impl PipelineProps {
    pub fn new(id: u32, priority: u32, module_instances: Vec<CompoundModuleId>) -> Self {
        Self {
            id,
            priority,
            state: 0,
            total_memory_bytes: 0,
            used_memory_bytes: 0,
            context_pages: 0,
            module_instances,
            ll_tasks: Vec::new(),
            dp_tasks: Vec::new(),
        }
    }
}

impl Streamable for PipelineProps {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            id: reader.read()?,
            priority: reader.read()?,
            state: reader.read()?,
            total_memory_bytes: reader.read()?,
            used_memory_bytes: reader.read()?,
            context_pages: reader.read()?,
            module_instances: reader.read_vec::<u32, CompoundModuleId>()?,
            ll_tasks: reader.read_vec::<u32, u32>()?,
            dp_tasks: reader.read_vec::<u32, u32>()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.id);
        writer.write(&self.priority);
        writer.write(&self.state);
        writer.write(&self.total_memory_bytes);
        writer.write(&self.used_memory_bytes);
        writer.write(&self.context_pages);
        writer.write_vec::<u32, CompoundModuleId>(&self.module_instances);
        writer.write_vec::<u32, u32>(&self.ll_tasks);
        writer.write_vec::<u32, u32>(&self.dp_tasks);
    }
}

/// Reply of the pipeline list query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelinesListInfo {
    pub ppl_ids: Vec<u32>,
}

impl PipelinesListInfo {
    /// Reply buffer size for up to `count` pipelines
    pub fn allocation_size(count: usize) -> usize {
        4 + count * 4
    }
}

impl Streamable for PipelinesListInfo {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            ppl_ids: reader.read_vec::<u32, u32>()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write_vec::<u32, u32>(&self.ppl_ids);
    }
}
