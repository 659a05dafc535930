//! Injection worker
//!
//! One injector runs per active injection probe. It keeps the driver sink
//! fed with whole samples: whatever the host has not provided in time is
//! replaced by silence, so the stream never loses sample alignment.

use super::driver::InjectionSink;
use super::{BlockingQueue, ChannelId, ProbeError, ProbeResult, ProbeWorkerEvent};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Pulls whole samples out of a queue of arbitrarily sized blocks
pub struct SampleFeeder {
    queue: Arc<BlockingQueue<Vec<u8>>>,
    sample_bytes: usize,
    /// Tail of the last block, not yet injected
    carry: Vec<u8>,
}

impl SampleFeeder {
    pub fn new(queue: Arc<BlockingQueue<Vec<u8>>>, sample_bytes: usize) -> Self {
        Self {
            queue,
            sample_bytes,
            carry: Vec::new(),
        }
    }

    /// Produce exactly `sample_count` samples, padding with silence when
    /// the queue runs dry
    pub fn next_samples(&mut self, sample_count: usize) -> Vec<u8> {
        let wanted = sample_count * self.sample_bytes;
        let mut out = Vec::with_capacity(wanted);

        let take = self.carry.len().min(wanted);
        out.extend(self.carry.drain(..take));

        while out.len() < wanted {
            let Some(block) = self.queue.try_pop() else {
                break;
            };
            let take = block.len().min(wanted - out.len());
            out.extend_from_slice(&block[..take]);
            self.carry.extend_from_slice(&block[take..]);
        }

        out.resize(wanted, 0);
        out
    }
}

pub struct Injector {
    channel: ChannelId,
    queue: Arc<BlockingQueue<Vec<u8>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Injector {
    /// Prefill the sink with a full buffer, then start the injection thread
    pub fn start(
        channel: ChannelId,
        mut sink: Box<dyn InjectionSink>,
        queue: Arc<BlockingQueue<Vec<u8>>>,
        sample_bytes: usize,
        events: Sender<ProbeWorkerEvent>,
        poll_interval: Duration,
    ) -> ProbeResult<Self> {
        let mut feeder = SampleFeeder::new(Arc::clone(&queue), sample_bytes);
        let prefill = sink.size() / sample_bytes;
        sink.write(&feeder.next_samples(prefill))?;

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name(format!("probe-injector-{}", channel))
            .spawn(move || {
                tracing::debug!(channel = %channel, "Probe injection started");
                while flag.load(Ordering::SeqCst) {
                    let step = sink.wait_available(poll_interval).and_then(|available| {
                        let samples = available / sample_bytes;
                        if samples > 0 {
                            sink.write(&feeder.next_samples(samples))?;
                        }
                        Ok(())
                    });
                    if let Err(e) = step {
                        let error = ProbeError::WorkerAborted {
                            worker: "injection",
                            reason: e.to_string(),
                        };
                        tracing::error!(channel = %channel, "{}", error);
                        let _ = events.send(ProbeWorkerEvent::InjectionAborted {
                            channel,
                            reason: error.to_string(),
                        });
                        break;
                    }
                }
                flag.store(false, Ordering::SeqCst);
                tracing::debug!(channel = %channel, "Probe injection stopped");
            })
            .map_err(|e| ProbeError::driver(format!("Could not start injection thread: {}", e)))?;

        Ok(Self {
            channel,
            queue,
            running,
            handle: Some(handle),
        })
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the thread and drop what is left in the input queue.
    ///
    /// The queue is cleared at stop so that a later session does not inject
    /// stale samples.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(channel = %self.channel, "Probe injection thread panicked");
            }
            self.queue.clear();
        }
    }
}

impl Drop for Injector {
    fn drop(&mut self) {
        self.stop();
    }
}
