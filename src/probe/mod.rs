//! Probe subsystem
//!
//! Probes tap the signal at a module instance pin. An extraction probe
//! copies the samples flowing through the pin to the host; an injection
//! probe replaces them with samples provided by the host.
//!
//! # Architecture
//!
//! ```text
//! ProbeService ──► Prober ──► ProbeDriver (state, channel controls)
//!                    │
//!                    ├── Extractor thread: ExtractionSource ──► extraction queues ──► dequeue_extraction_block
//!                    └── Injector threads: enqueue_injection_block ──► injection queues ──► InjectionSink
//! ```
//!
//! The driver walks a linear state machine, `Idle → Owned → Allocated →
//! Active`. Streaming workers only run while the driver is `Active`.
//!
//! # Identifiers
//!
//! A [`ProbeId`] is a slot of the session configuration, chosen by the
//! user. A [`ChannelId`] is the driver channel an active probe got
//! assigned: active probes are packed on the lowest channels, so the two
//! never coincide in general.
//!
//! # Example
//!
//! ```ignore
//! use dsp_debug_agent::probe::{ProbeConfig, ProbeId, ProbePurpose, ProbeService};
//!
//! let service = ProbeService::new(prober, &handler);
//! service.set_configuration(ProbeId(0), ProbeConfig::new(point, ProbePurpose::Extract))?;
//! service.set_state(true)?;
//!
//! while let Some(block) = service.prober().dequeue_extraction_block(ProbeId(0))? {
//!     sink.write_all(&block)?;
//! }
//! ```

pub mod driver;
pub mod error;
pub mod extractor;
pub mod injector;
pub mod prober;
pub mod queue;
pub mod service;
pub mod state_machine;

pub use driver::{ExtractionSource, InjectionSink, ProbeDriver};
pub use error::{ProbeError, ProbeResult};
pub use extractor::Extractor;
pub use injector::Injector;
pub use prober::Prober;
pub use queue::{BlockingQueue, QueueGuard};
pub use service::ProbeService;
pub use state_machine::{ProbeStateMachine, StateTarget};

use crate::firmware::ProbePointId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Slot of a probe in the session configuration
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct ProbeId(pub usize);

impl ProbeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProbeId({})", self.0)
    }
}

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Driver channel assigned to an active probe
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct ChannelId(pub usize);

impl ChannelId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of the driver probe service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProbeState {
    Idle,
    Owned,
    Allocated,
    Active,
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Owned => "Owned",
            Self::Allocated => "Allocated",
            Self::Active => "Active",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ProbePurpose {
    #[default]
    Extract,
    Inject,
    /// Inject, then extract the injected signal back
    InjectReextract,
}

impl ProbePurpose {
    pub fn extracts(self) -> bool {
        matches!(self, Self::Extract | Self::InjectReextract)
    }

    pub fn injects(self) -> bool {
        matches!(self, Self::Inject | Self::InjectReextract)
    }
}

/// Configuration of one probe slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProbeConfig {
    pub enabled: bool,
    pub probe_point: ProbePointId,
    pub purpose: ProbePurpose,
}

impl ProbeConfig {
    /// An enabled probe
    pub fn new(probe_point: ProbePointId, purpose: ProbePurpose) -> Self {
        Self {
            enabled: true,
            probe_point,
            purpose,
        }
    }
}

/// One configuration per probe slot; the length is fixed by the driver
pub type SessionProbes = Vec<ProbeConfig>;

/// Sample size in bytes of every active injection probe
pub type InjectionSampleSizes = BTreeMap<ProbeId, usize>;

/// Enabled probes of a session, split by direction.
///
/// An `InjectReextract` probe appears in both lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSession {
    pub extraction: Vec<ProbeId>,
    pub injection: Vec<ProbeId>,
}

impl ActiveSession {
    pub fn from_probes(probes: &[ProbeConfig]) -> Self {
        let mut session = Self::default();
        for (index, probe) in probes.iter().enumerate() {
            if !probe.enabled {
                continue;
            }
            if probe.purpose.extracts() {
                session.extraction.push(ProbeId(index));
            }
            if probe.purpose.injects() {
                session.injection.push(ProbeId(index));
            }
        }
        session
    }
}

/// Notifications sent by the streaming workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeWorkerEvent {
    /// The extraction source reached its end
    ExtractionFinished,
    ExtractionAborted(String),
    InjectionAborted { channel: ChannelId, reason: String },
    /// A packet was dropped because its queue was full or closed
    PacketDropped(ChannelId),
}
