//! Per-core scheduler information.

use super::ids::CompoundModuleId;
use crate::codec::{ByteStreamReader, ByteStreamWriter, StreamResult, Streamable};
use serde::Serialize;

/// A task and the module instances it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskProps {
    pub task_id: u32,
    pub module_instances: Vec<CompoundModuleId>,
}

impl Streamable for TaskProps {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            task_id: reader.read()?,
            module_instances: reader.read_vec::<u32, CompoundModuleId>()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.task_id);
        writer.write_vec::<u32, CompoundModuleId>(&self.module_instances);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerProps {
    pub processing_domain: u32,
    pub core_id: u32,
    pub tasks: Vec<TaskProps>,
}

impl Streamable for SchedulerProps {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            processing_domain: reader.read()?,
            core_id: reader.read()?,
            tasks: reader.read_vec::<u32, TaskProps>()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write(&self.processing_domain);
        writer.write(&self.core_id);
        writer.write_vec::<u32, TaskProps>(&self.tasks);
    }
}

/// Schedulers of one DSP core
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SchedulersInfo {
    pub schedulers: Vec<SchedulerProps>,
}

impl SchedulersInfo {
    /// Every module instance referenced by any task, in encounter order
    pub fn module_instances(&self) -> impl Iterator<Item = CompoundModuleId> + '_ {
        self.schedulers
            .iter()
            .flat_map(|scheduler| scheduler.tasks.iter())
            .flat_map(|task| task.module_instances.iter().copied())
    }
}

impl Streamable for SchedulersInfo {
    fn read_from(reader: &mut ByteStreamReader<'_>) -> StreamResult<Self> {
        Ok(Self {
            schedulers: reader.read_vec::<u32, SchedulerProps>()?,
        })
    }

    fn write_to(&self, writer: &mut ByteStreamWriter) {
        writer.write_vec::<u32, SchedulerProps>(&self.schedulers);
    }
}
