//! Link resolution between module instance pins
//!
//! Two pins are connected when they report the same physical queue id.
//! Resolution runs in two passes over priority-sorted pipelines: first
//! between consecutive instances of each pipeline, then between the pins
//! left at pipeline boundaries.

use crate::error::{AgentError, Result};
use crate::firmware::{CompoundModuleId, ModuleInstanceProps, PinProps, PipelineProps};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A directed connection from an output pin to an input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Link {
    pub from: CompoundModuleId,
    pub from_output: u32,
    pub to: CompoundModuleId,
    pub to_input: u32,
}

impl Link {
    pub const fn new(from: CompoundModuleId, from_output: u32, to: CompoundModuleId, to_input: u32) -> Self {
        Self {
            from,
            from_output,
            to,
            to_input,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:out{} -> {}:in{}",
            self.from, self.from_output, self.to, self.to_input
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Output,
}

impl fmt::Display for PinDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// One link candidate: a pin of an instance and the queue it uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PinRef {
    pub instance: CompoundModuleId,
    pub direction: PinDirection,
    pub index: u32,
    pub queue_id: u32,
}

impl PinRef {
    pub fn describe_unconnected(&self) -> String {
        format!(
            "Unconnected {} pin #{} of module instance ID #{} (Module ID #{}): \
             expecting connection through queue ID #{}",
            self.direction,
            self.index,
            self.instance.instance_id,
            self.instance.module_id,
            self.queue_id
        )
    }
}

/// Links found plus the pins that matched nothing
#[derive(Debug, Default)]
pub struct Resolution {
    pub links: Vec<Link>,
    /// Unresolved outputs first, then unresolved inputs
    pub unresolved: Vec<PinRef>,
}

/// Compute every link of the given pipelines, which must already be in
/// priority order.
pub fn resolve(
    instances: &BTreeMap<CompoundModuleId, ModuleInstanceProps>,
    pipelines: &[PipelineProps],
) -> Result<Resolution> {
    let mut resolver = Resolver {
        instances,
        links: Vec::new(),
        outputs: Vec::new(),
        inputs: Vec::new(),
    };

    for pipeline in pipelines {
        resolver.resolve_pipeline(pipeline)?;
    }
    resolver.resolve_boundaries();

    let Resolver {
        links,
        mut outputs,
        inputs,
        ..
    } = resolver;
    outputs.extend(inputs);
    Ok(Resolution {
        links,
        unresolved: outputs,
    })
}

struct Resolver<'a> {
    instances: &'a BTreeMap<CompoundModuleId, ModuleInstanceProps>,
    links: Vec<Link>,
    outputs: Vec<PinRef>,
    inputs: Vec<PinRef>,
}

impl Resolver<'_> {
    fn props(&self, id: CompoundModuleId) -> Result<&ModuleInstanceProps> {
        self.instances
            .get(&id)
            .ok_or_else(|| AgentError::Topology(format!("undefined module instance {}", id)))
    }

    fn candidates(&self, id: CompoundModuleId, direction: PinDirection) -> Result<Vec<PinRef>> {
        let props = self.props(id)?;
        let (pins, gateway) = match direction {
            PinDirection::Input => (&props.input_pins, props.input_gateway),
            PinDirection::Output => (&props.output_pins, props.output_gateway),
        };
        // Pin 0 is fed by the gateway when there is one
        let first = usize::from(gateway.is_valid());

        Ok(pins
            .iter()
            .enumerate()
            .skip(first)
            .filter(|(_, pin)| pin.phys_queue_id != PinProps::INVALID_QUEUE_ID)
            .map(|(index, pin)| PinRef {
                instance: id,
                direction,
                index: index as u32,
                queue_id: pin.phys_queue_id,
            })
            .collect())
    }

    fn resolve_pipeline(&mut self, pipeline: &PipelineProps) -> Result<()> {
        let (Some(&first), Some(&last)) = (
            pipeline.module_instances.first(),
            pipeline.module_instances.last(),
        ) else {
            return Ok(());
        };

        let boundary_inputs = self.candidates(first, PinDirection::Input)?;
        self.inputs.extend(boundary_inputs);
        let boundary_outputs = self.candidates(last, PinDirection::Output)?;
        self.outputs.extend(boundary_outputs);

        for pair in pipeline.module_instances.windows(2) {
            self.resolve_pair(pair[0], pair[1])?;
        }
        Ok(())
    }

    fn resolve_pair(&mut self, source: CompoundModuleId, destination: CompoundModuleId) -> Result<()> {
        let outputs = self.candidates(source, PinDirection::Output)?;
        let mut inputs = self.candidates(destination, PinDirection::Input)?;

        for output in outputs {
            match inputs.iter().position(|input| input.queue_id == output.queue_id) {
                Some(pos) => {
                    let input = inputs.remove(pos);
                    self.links
                        .push(Link::new(output.instance, output.index, input.instance, input.index));
                }
                None => self.outputs.push(output),
            }
        }
        self.inputs.extend(inputs);
        Ok(())
    }

    fn resolve_boundaries(&mut self) {
        let outputs = std::mem::take(&mut self.outputs);
        for output in outputs {
            match self.inputs.iter().position(|input| input.queue_id == output.queue_id) {
                Some(pos) => {
                    let input = self.inputs.remove(pos);
                    self.links
                        .push(Link::new(output.instance, output.index, input.instance, input.index));
                }
                None => self.outputs.push(output),
            }
        }
    }
}
