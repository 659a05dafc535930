//! Seams to the platform probe driver
//!
//! The driver exposes the probe service state, one control per probe
//! channel, and the streams the workers read from and write to.

use super::{ChannelId, ProbeConfig, ProbeResult, ProbeState};
use std::time::Duration;

/// Direction of a driver probe channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Extraction,
    Injection,
}

#[cfg_attr(test, mockall::automock)]
pub trait ProbeDriver: Send {
    /// Number of extraction channels the driver offers
    fn max_extraction_channels(&self) -> usize;

    /// Number of injection channels the driver offers
    fn max_injection_channels(&self) -> usize;

    fn state(&self) -> ProbeResult<ProbeState>;

    /// Perform the single transition `from -> to`
    fn set_state(&mut self, from: ProbeState, to: ProbeState) -> ProbeResult<()>;

    /// Program the probe point and purpose of one channel
    fn write_channel(
        &mut self,
        kind: ChannelKind,
        channel: ChannelId,
        config: &ProbeConfig,
    ) -> ProbeResult<()>;

    /// The multiplexed stream of extraction packets
    fn open_extraction(&mut self) -> ProbeResult<Box<dyn ExtractionSource>>;

    fn open_injection(&mut self, channel: ChannelId) -> ProbeResult<Box<dyn InjectionSink>>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ExtractionSource: Send {
    /// Read the next chunk of the packet stream.
    ///
    /// An empty chunk means nothing arrived within `timeout`; `None` means
    /// the stream ended.
    fn read_chunk(&mut self, timeout: Duration) -> ProbeResult<Option<Vec<u8>>>;
}

#[cfg_attr(test, mockall::automock)]
pub trait InjectionSink: Send {
    /// Capacity of the driver buffer in bytes
    fn size(&self) -> usize;

    /// Wait up to `timeout` for room, and return the free byte count
    fn wait_available(&mut self, timeout: Duration) -> ProbeResult<usize>;

    fn write(&mut self, data: &[u8]) -> ProbeResult<()>;
}
