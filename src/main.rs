//! DSP debug agent - Main Entry Point
//!
//! Connects to the firmware, rebuilds the audio topology and prints it as
//! JSON. An optional argument names the configuration file to use instead
//! of the default one.

use anyhow::Context;
use dsp_debug_agent::{
    config::AgentConfig,
    handler::ModuleHandler,
    topology::{SharedTopology, TopologyBuilder},
    transport::Transport,
};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "dsp-debug-agent.log";

fn main() -> anyhow::Result<()> {
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => AgentConfig::load(&path)?,
        None => AgentConfig::load_or_default(),
    };
    config.validate()?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(&config);

    tracing::info!("Starting DSP debug agent");

    let transport = build_transport(&config);
    let handler = ModuleHandler::new(transport).context("Unable to read firmware configuration")?;
    let limits = handler.limits();
    tracing::info!(
        fw_version = %limits.fw_version,
        modules = limits.modules_count,
        cores = limits.dsp_core_count,
        "Connected to firmware"
    );

    let topology = SharedTopology::default();
    if config.topology.refresh_on_start {
        let snapshot = topology
            .rebuild(&TopologyBuilder::new(&handler))
            .context("Unable to build topology")?;
        tracing::info!(
            instances = snapshot.module_instances.len(),
            links = snapshot.links.len(),
            unresolved = snapshot.unresolved.len(),
            "Topology ready"
        );
        println!("{}", snapshot.to_json_pretty()?);
    }

    let stats = handler.transport().stats();
    tracing::info!(
        queries = stats.queries,
        failures = stats.failures,
        bytes = stats.bytes_received,
        "Transport success rate: {:.1}%",
        stats.success_rate()
    );
    Ok(())
}

fn init_logging(config: &AgentConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    let (file_layer, guard) = match &config.logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

#[cfg(feature = "mock-dsp")]
fn build_transport(_config: &AgentConfig) -> dsp_debug_agent::transport::SimulatedFirmware {
    tracing::info!("Using simulated firmware");
    dsp_debug_agent::transport::SimulatedFirmware::demo()
}

#[cfg(not(feature = "mock-dsp"))]
fn build_transport(
    config: &AgentConfig,
) -> dsp_debug_agent::transport::DebugFsTransport<dsp_debug_agent::transport::FileCommandDevice> {
    use dsp_debug_agent::transport::{DebugFsTransport, FileCommandDevice};

    let settings = &config.transport;
    tracing::debug!(path = %settings.set_get_ctrl_path, "Using debugfs transport");
    DebugFsTransport::with_paths(
        FileCommandDevice::default(),
        settings.set_get_ctrl_path.as_str(),
        settings.core_power_path.as_str(),
        settings.core_id,
    )
}
