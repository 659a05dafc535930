use super::{Topology, TopologyBuilder};
use crate::error::Result;
use crate::transport::Transport;
use std::sync::{Arc, RwLock};

/// The current topology, swapped in whole on every rebuild.
///
/// Readers hold an `Arc` to the snapshot they got, so a rebuild never
/// changes a graph under their feet.
#[derive(Debug, Clone, Default)]
pub struct SharedTopology {
    current: Arc<RwLock<Arc<Topology>>>,
}

impl SharedTopology {
    pub fn new(topology: Topology) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(topology))),
        }
    }

    pub fn publish(&self, topology: Topology) -> Arc<Topology> {
        let topology = Arc::new(topology);
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Arc::clone(&topology);
        topology
    }

    pub fn snapshot(&self) -> Arc<Topology> {
        let current = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&current)
    }

    /// Build a fresh topology and publish it.
    ///
    /// On failure the previous snapshot stays in place.
    pub fn rebuild<T: Transport>(&self, builder: &TopologyBuilder<'_, T>) -> Result<Arc<Topology>> {
        match builder.build() {
            Ok(topology) => Ok(self.publish(topology)),
            Err(e) => {
                tracing::error!("Topology rebuild failed, keeping previous snapshot: {}", e);
                Err(e)
            }
        }
    }
}
