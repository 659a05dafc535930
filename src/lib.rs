//! # dsp-debug-agent: host-side debug agent for audio DSP firmware
//!
//! The agent talks to the firmware through module parameter accesses. On top
//! of that channel it reads the firmware and hardware configuration, lists
//! module types, pipelines, schedulers and gateways, rebuilds the audio
//! topology as a graph, and drives probes that extract or inject audio at
//! any module pin.
//!
//! ## Architecture
//!
//! - **Codec** (`codec`): little-endian stream reader and writer plus the
//!   `Streamable` trait every firmware structure implements
//! - **TLV** (`tlv`): dictionary-driven unpacking of tag-length-value lists
//! - **Firmware** (`firmware`): the firmware data model and its wire layout
//! - **Transport** (`transport`): the module parameter access channel
//! - **Handler** (`handler`): typed queries against the base firmware
//! - **Perf** (`perf`): performance reports with per-instance KCPS budgets
//! - **Topology** (`topology`): links between module instances, rebuilt
//!   from pipeline and scheduler listings
//! - **Probe** (`probe`): probe session state machine and streaming workers
//!
//! ## Configuration
//!
//! Settings are read from `agent.toml` in the platform configuration
//! directory under `dsp-debug-agent`:
//!
//! - **Linux**: `~/.config/dsp-debug-agent/`
//! - **macOS**: `~/Library/Application Support/dsp-debug-agent/`
//! - **Windows**: `%APPDATA%\dsp-debug-agent\`
//!
//! ## Example
//!
//! ```ignore
//! use dsp_debug_agent::{
//!     config::AgentConfig,
//!     handler::ModuleHandler,
//!     topology::{SharedTopology, TopologyBuilder},
//!     transport::{DebugFsTransport, FileCommandDevice},
//! };
//!
//! let config = AgentConfig::load_or_default();
//! let handler = ModuleHandler::new(DebugFsTransport::new(FileCommandDevice::default()))?;
//!
//! let topology = SharedTopology::default();
//! let snapshot = topology.rebuild(&TopologyBuilder::new(&handler))?;
//! for link in &snapshot.links {
//!     println!("{}", link);
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod firmware;
pub mod handler;
pub mod perf;
pub mod probe;
pub mod tlv;
pub mod topology;
pub mod transport;

pub use error::{AgentError, Result};
