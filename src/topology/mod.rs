//! Runtime topology of the DSP
//!
//! The firmware reports pipelines, schedulers and module instances as
//! unrelated lists. This module rebuilds the audio graph from them: two pins
//! are linked when they use the same physical queue.
//!
//! # Main Types
//!
//! - [`Topology`] - one consistent snapshot of the firmware objects plus the
//!   derived links
//! - [`Link`] - a directed connection from an output pin to an input pin
//! - [`TopologyBuilder`] - queries a complete snapshot through a
//!   [`ModuleHandler`](crate::handler::ModuleHandler)
//! - [`SharedTopology`] - publishes snapshots to concurrent readers
//!
//! # Example
//!
//! ```ignore
//! use dsp_debug_agent::topology::{SharedTopology, TopologyBuilder};
//!
//! let shared = SharedTopology::default();
//! shared.rebuild(&TopologyBuilder::new(&handler))?;
//!
//! let topology = shared.snapshot();
//! for link in &topology.links {
//!     println!("{}", link);
//! }
//! ```

pub mod builder;
pub mod links;
pub mod shared;

pub use builder::TopologyBuilder;
pub use links::{Link, PinRef};
pub use shared::SharedTopology;

use crate::error::{AgentError, Result};
use crate::firmware::{
    CompoundModuleId, GatewayProps, ModuleInstanceProps, PipelineProps, SchedulersInfo,
};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A snapshot of the firmware objects and the graph derived from them.
///
/// `links`, `unresolved` and `gateway_peers` are only meaningful after
/// [`compute_links`](Self::compute_links) ran on a complete snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    pub captured_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_instances")]
    pub module_instances: BTreeMap<CompoundModuleId, ModuleInstanceProps>,
    pub gateways: Vec<GatewayProps>,
    /// Sorted by priority once links are computed
    pub pipelines: Vec<PipelineProps>,
    pub schedulers: Vec<SchedulersInfo>,
    pub links: Vec<Link>,
    /// Pins left without a peer
    pub unresolved: Vec<PinRef>,
    /// Instances attached to each gateway, keyed by raw gateway id
    pub gateway_peers: BTreeMap<u32, Vec<CompoundModuleId>>,
}

fn serialize_instances<S: Serializer>(
    instances: &BTreeMap<CompoundModuleId, ModuleInstanceProps>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(instances.values())
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }
}

impl Topology {
    pub fn new(
        module_instances: impl IntoIterator<Item = ModuleInstanceProps>,
        gateways: Vec<GatewayProps>,
        pipelines: Vec<PipelineProps>,
        schedulers: Vec<SchedulersInfo>,
    ) -> Self {
        Self {
            captured_at: Utc::now(),
            module_instances: module_instances
                .into_iter()
                .map(|props| (props.id, props))
                .collect(),
            gateways,
            pipelines,
            schedulers,
            links: Vec::new(),
            unresolved: Vec::new(),
            gateway_peers: BTreeMap::new(),
        }
    }

    pub fn instance(&self, id: CompoundModuleId) -> Result<&ModuleInstanceProps> {
        self.module_instances
            .get(&id)
            .ok_or_else(|| AgentError::Topology(format!("undefined module instance {}", id)))
    }

    /// Pipeline ids in link-resolution order
    pub fn pipeline_order(&self) -> Vec<u32> {
        self.pipelines.iter().map(|ppl| ppl.id).collect()
    }

    /// Sort pipelines by priority, then recompute links and gateway peers.
    ///
    /// Pins left unconnected are logged and kept in `unresolved`; only a
    /// reference to an unknown instance is an error, in which case the
    /// topology is left untouched.
    pub fn compute_links(&mut self) -> Result<()> {
        let mut pipelines = self.pipelines.clone();
        pipelines.sort_by_key(|ppl| ppl.priority);

        let resolution = links::resolve(&self.module_instances, &pipelines)?;
        for pin in &resolution.unresolved {
            tracing::warn!("{}", pin.describe_unconnected());
        }
        self.pipelines = pipelines;
        self.links = resolution.links;
        self.unresolved = resolution.unresolved;
        self.gateway_peers = self.compute_gateway_peers();

        tracing::debug!(
            links = self.links.len(),
            unresolved = self.unresolved.len(),
            "Topology links computed"
        );
        Ok(())
    }

    fn compute_gateway_peers(&self) -> BTreeMap<u32, Vec<CompoundModuleId>> {
        let mut peers = BTreeMap::new();
        for gateway in &self.gateways {
            let attached: Vec<_> = self
                .module_instances
                .values()
                .filter(|props| props.input_gateway == gateway.id || props.output_gateway == gateway.id)
                .map(|props| props.id)
                .collect();
            if attached.is_empty() {
                tracing::debug!(gateway = %gateway.id, "Gateway has no module instance attached");
            }
            peers.insert(gateway.id.0, attached);
        }
        peers
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| AgentError::Serialization(e.to_string()))
    }
}
