//! Extraction worker
//!
//! The driver multiplexes every extraction probe into one packet stream.
//! The extractor thread reassembles packets from the chunks it reads,
//! routes each one to the queue of its channel by probe point id, and
//! re-encodes it with the 32-bit checksum clients expect.
//!
//! A packet that does not fit in its queue is dropped with a warning. Any
//! malformed packet aborts the extraction, including a header announcing
//! more data than the largest queue can hold.

use super::driver::ExtractionSource;
use super::{BlockingQueue, ChannelId, ProbeError, ProbeResult, ProbeWorkerEvent};
use crate::codec::{ByteStreamReader, ByteStreamWriter};
use crate::firmware::{Packet, ProbePointId};
use crossbeam_channel::Sender;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub type ProbePointMap = BTreeMap<ProbePointId, ChannelId>;
pub type ExtractionQueues = Arc<Vec<BlockingQueue<Vec<u8>>>>;

/// Reassembles packets and dispatches them to the channel queues
pub struct PacketRouter {
    queues: ExtractionQueues,
    probe_points: ProbePointMap,
    pending: Vec<u8>,
    /// Start of the first packet not routed yet
    offset: usize,
    /// Largest data count accepted in a header
    max_data_size: usize,
    events: Sender<ProbeWorkerEvent>,
    /// Packets pushed to a queue
    pub routed: u64,
    /// Packets lost on a full or closed queue
    pub dropped: u64,
}

impl PacketRouter {
    /// The data size limit is the largest queue budget: a bigger packet
    /// could not be queued anyway.
    pub fn new(
        queues: ExtractionQueues,
        probe_points: ProbePointMap,
        events: Sender<ProbeWorkerEvent>,
    ) -> Self {
        let max_data_size = queues
            .iter()
            .map(BlockingQueue::max_memory_size)
            .max()
            .unwrap_or(0);
        Self {
            queues,
            probe_points,
            pending: Vec::new(),
            offset: 0,
            max_data_size,
            events,
            routed: 0,
            dropped: 0,
        }
    }

    /// Append a chunk of the stream and route every packet it completes
    pub fn feed(&mut self, chunk: &[u8]) -> ProbeResult<()> {
        self.pending.extend_from_slice(chunk);
        let result = self.route_complete_packets();

        if self.offset > 0 {
            self.pending.drain(..self.offset);
            self.offset = 0;
        }
        result
    }

    fn route_complete_packets(&mut self) -> ProbeResult<()> {
        loop {
            let available = &self.pending[self.offset..];
            if available.len() < Packet::HEADER_SIZE {
                return Ok(());
            }

            let data_size = Packet::peek_data_size(&available[..Packet::HEADER_SIZE])
                .map_err(|e| ProbeError::driver(e.to_string()))?;
            if data_size > self.max_data_size {
                return Err(ProbeError::driver(format!(
                    "Extracted packet data size {} exceeds the limit of {} bytes",
                    data_size, self.max_data_size
                )));
            }
            if available.len() < Packet::HEADER_SIZE + data_size + Packet::CHECKSUM_SIZE {
                // the rest of the packet is still to come
                return Ok(());
            }

            let mut reader = ByteStreamReader::new(available);
            let packet = reader
                .read::<Packet>()
                .map_err(|e| ProbeError::driver(e.to_string()))?;
            self.offset += reader.position();
            self.route(&packet)?;
        }
    }

    fn route(&mut self, packet: &Packet) -> ProbeResult<()> {
        let channel = *self.probe_points.get(&packet.probe_point_id).ok_or_else(|| {
            ProbeError::driver(format!(
                "Packet with unknown probe point id: {}",
                packet.probe_point_id
            ))
        })?;
        let queue = self.queues.get(channel.index()).ok_or_else(|| {
            ProbeError::driver(format!("Packet with wrong probe id: {}", channel))
        })?;

        let mut writer = ByteStreamWriter::new();
        packet.write_compact(&mut writer);
        if queue.try_push(writer.into_inner()) {
            self.routed += 1;
        } else {
            self.dropped += 1;
            tracing::warn!(channel = %channel, "Extraction packet dropped");
            let _ = self.events.send(ProbeWorkerEvent::PacketDropped(channel));
        }
        Ok(())
    }

    /// Bytes of an incomplete packet waiting for the next chunk
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

pub struct Extractor {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Extractor {
    /// Clear the extraction queues and start the extraction thread.
    ///
    /// Queues are cleared at start rather than at stop so that clients can
    /// still read a finished session.
    pub fn start(
        mut source: Box<dyn ExtractionSource>,
        queues: ExtractionQueues,
        probe_points: ProbePointMap,
        events: Sender<ProbeWorkerEvent>,
        poll_interval: Duration,
    ) -> ProbeResult<Self> {
        for queue in queues.iter() {
            queue.clear();
        }

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let mut router = PacketRouter::new(queues, probe_points, events.clone());

        let handle = std::thread::Builder::new()
            .name("probe-extractor".to_string())
            .spawn(move || {
                tracing::debug!("Probe extraction started");
                while flag.load(Ordering::SeqCst) {
                    let chunk = match source.read_chunk(poll_interval) {
                        Ok(Some(chunk)) => chunk,
                        Ok(None) => {
                            let _ = events.send(ProbeWorkerEvent::ExtractionFinished);
                            break;
                        }
                        Err(e) => {
                            abort(&events, e);
                            break;
                        }
                    };
                    if let Err(e) = router.feed(&chunk) {
                        abort(&events, e);
                        break;
                    }
                }
                flag.store(false, Ordering::SeqCst);
                tracing::debug!(
                    routed = router.routed,
                    dropped = router.dropped,
                    "Probe extraction stopped"
                );
            })
            .map_err(|e| ProbeError::driver(format!("Could not start extraction thread: {}", e)))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Probe extraction thread panicked");
            }
        }
    }
}

impl Drop for Extractor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn abort(events: &Sender<ProbeWorkerEvent>, error: ProbeError) {
    let error = ProbeError::WorkerAborted {
        worker: "extraction",
        reason: error.to_string(),
    };
    tracing::error!("{}", error);
    let _ = events.send(ProbeWorkerEvent::ExtractionAborted(error.to_string()));
}
