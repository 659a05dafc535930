//! Probe session owner
//!
//! The [`Prober`] owns the driver, the session configuration and one queue
//! per driver channel. Streaming workers are started on the way into
//! `Active` and stopped on the way out, so they only ever run while the
//! driver streams.
//!
//! The configuration is pushed to the driver channels whenever the driver
//! becomes `Owned`. Setting it while the driver is already `Owned` pushes it
//! at once.

use super::driver::{ChannelKind, ProbeDriver};
use super::extractor::{ExtractionQueues, Extractor, ProbePointMap};
use super::injector::Injector;
use super::state_machine::{ProbeStateMachine, StateTarget};
use super::{
    ActiveSession, BlockingQueue, ChannelId, InjectionSampleSizes, ProbeConfig, ProbeError,
    ProbeId, ProbeResult, ProbeState, ProbeWorkerEvent, SessionProbes,
};
use crate::config::ProbeSettings;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type ChannelMap = BTreeMap<ProbeId, ChannelId>;
type InjectionQueues = Vec<Arc<BlockingQueue<Vec<u8>>>>;

pub struct Prober<D: ProbeDriver> {
    inner: Mutex<ProberInner<D>>,
    extraction_queues: ExtractionQueues,
    injection_queues: InjectionQueues,
    events: Receiver<ProbeWorkerEvent>,
}

/// Everything a state transition touches
struct ProberInner<D> {
    driver: D,
    probes: SessionProbes,
    sample_sizes: InjectionSampleSizes,
    extraction_map: ChannelMap,
    injection_map: ChannelMap,
    extraction_queues: ExtractionQueues,
    injection_queues: InjectionQueues,
    events: Sender<ProbeWorkerEvent>,
    poll_interval: Duration,
    extractor: Option<Extractor>,
    injectors: Vec<Injector>,
}

impl<D: ProbeDriver> Prober<D> {
    pub fn new(driver: D, settings: &ProbeSettings) -> Self {
        let extraction_queues: ExtractionQueues = Arc::new(
            (0..driver.max_extraction_channels())
                .map(|_| BlockingQueue::for_blocks(settings.queue_size_bytes))
                .collect(),
        );
        let injection_queues: InjectionQueues = (0..driver.max_injection_channels())
            .map(|_| Arc::new(BlockingQueue::for_blocks(settings.queue_size_bytes)))
            .collect();
        let (tx, rx) = unbounded();

        let probe_count = extraction_queues.len() + injection_queues.len();
        tracing::debug!(
            extraction = extraction_queues.len(),
            injection = injection_queues.len(),
            "Prober created"
        );

        Self {
            inner: Mutex::new(ProberInner {
                driver,
                probes: vec![ProbeConfig::default(); probe_count],
                sample_sizes: InjectionSampleSizes::new(),
                extraction_map: ChannelMap::new(),
                injection_map: ChannelMap::new(),
                extraction_queues: Arc::clone(&extraction_queues),
                injection_queues: injection_queues.clone(),
                events: tx,
                poll_interval: settings.poll_interval(),
                extractor: None,
                injectors: Vec::new(),
            }),
            extraction_queues,
            injection_queues,
            events: rx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProberInner<D>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn max_extraction_channels(&self) -> usize {
        self.extraction_queues.len()
    }

    pub fn max_injection_channels(&self) -> usize {
        self.injection_queues.len()
    }

    /// Number of probe slots of a session configuration
    pub fn max_probe_count(&self) -> usize {
        self.max_extraction_channels() + self.max_injection_channels()
    }

    /// Validate and cache a session configuration.
    ///
    /// Active probes get the lowest driver channels, in slot order. The
    /// configuration cannot change while streaming: the workers hold the
    /// channel maps of the running session.
    pub fn set_probes_config(
        &self,
        probes: SessionProbes,
        sample_sizes: InjectionSampleSizes,
    ) -> ProbeResult<()> {
        if probes.len() != self.max_probe_count() {
            return Err(ProbeError::ProbeCount {
                expected: self.max_probe_count(),
                actual: probes.len(),
            });
        }

        let session = ActiveSession::from_probes(&probes);
        if session.extraction.len() > self.max_extraction_channels() {
            return Err(ProbeError::TooManyExtractionProbes(session.extraction.len()));
        }
        if session.injection.len() > self.max_injection_channels() {
            return Err(ProbeError::TooManyInjectionProbes(session.injection.len()));
        }

        let compact = |ids: &[ProbeId]| -> ChannelMap {
            ids.iter()
                .enumerate()
                .map(|(channel, id)| (*id, ChannelId(channel)))
                .collect()
        };

        let mut inner = self.lock();
        let state = inner
            .driver
            .state()
            .map_err(|e| ProbeError::StateRead(e.to_string()))?;
        if state == ProbeState::Active {
            return Err(ProbeError::ConfigWhileActive);
        }

        inner.extraction_map = compact(&session.extraction);
        inner.injection_map = compact(&session.injection);
        inner.probes = probes;
        inner.sample_sizes = sample_sizes;

        if state == ProbeState::Owned {
            inner.push_config()?;
        }
        Ok(())
    }

    pub fn probes_config(&self) -> SessionProbes {
        self.lock().probes.clone()
    }

    pub fn set_state(&self, active: bool) -> ProbeResult<()> {
        let mut inner = self.lock();
        ProbeStateMachine::set_state(&mut *inner, active)
    }

    pub fn is_active(&self) -> ProbeResult<bool> {
        let inner = self.lock();
        ProbeStateMachine::is_active(&*inner)
    }

    /// Take the next block of an extraction probe, waiting for one.
    ///
    /// Returns `None` once the session stopped and the queue is drained.
    pub fn dequeue_extraction_block(&self, probe: ProbeId) -> ProbeResult<Option<Vec<u8>>> {
        let channel = self.channel_of(probe, ChannelKind::Extraction)?;
        let queue = self
            .extraction_queues
            .get(channel.index())
            .ok_or(ProbeError::WrongProbe(probe))?;
        Ok(queue.pop())
    }

    /// Queue a block for an injection probe, waiting for room.
    ///
    /// Returns false when the queue closed before the block got in.
    pub fn enqueue_injection_block(&self, probe: ProbeId, block: &[u8]) -> ProbeResult<bool> {
        let channel = self.channel_of(probe, ChannelKind::Injection)?;
        let queue = self
            .injection_queues
            .get(channel.index())
            .ok_or(ProbeError::WrongProbe(probe))?;
        Ok(queue.push(block.to_vec()))
    }

    /// Look up the channel under the lock; the blocking queue access happens
    /// after it is released
    fn channel_of(&self, probe: ProbeId, kind: ChannelKind) -> ProbeResult<ChannelId> {
        let inner = self.lock();
        let map = match kind {
            ChannelKind::Extraction => &inner.extraction_map,
            ChannelKind::Injection => &inner.injection_map,
        };
        map.get(&probe).copied().ok_or(ProbeError::UnknownProbe(probe))
    }

    /// Notifications of the streaming workers
    pub fn worker_events(&self) -> Receiver<ProbeWorkerEvent> {
        self.events.clone()
    }
}

impl<D: ProbeDriver> Drop for Prober<D> {
    fn drop(&mut self) {
        let mut inner = self.lock();
        ProbeStateMachine::stop_no_throw(&mut *inner);
    }
}

impl<D: ProbeDriver> ProberInner<D> {
    /// Program every driver channel; unused channels get a disabled probe
    fn push_config(&mut self) -> ProbeResult<()> {
        let extraction = self.channel_configs(&self.extraction_map, self.extraction_queues.len());
        for (channel, config) in extraction.iter().enumerate() {
            self.driver
                .write_channel(ChannelKind::Extraction, ChannelId(channel), config)
                .map_err(|e| {
                    ProbeError::driver(format!(
                        "Failed to write extraction probe control settings: {}",
                        e
                    ))
                })?;
        }

        let injection = self.channel_configs(&self.injection_map, self.injection_queues.len());
        for (channel, config) in injection.iter().enumerate() {
            self.driver
                .write_channel(ChannelKind::Injection, ChannelId(channel), config)
                .map_err(|e| {
                    ProbeError::driver(format!(
                        "Failed to write injection probe control settings: {}",
                        e
                    ))
                })?;
        }
        tracing::debug!(
            extraction = self.extraction_map.len(),
            injection = self.injection_map.len(),
            "Probe configuration pushed to driver"
        );
        Ok(())
    }

    fn channel_configs(&self, map: &ChannelMap, channel_count: usize) -> Vec<ProbeConfig> {
        let mut configs = vec![ProbeConfig::default(); channel_count];
        for (probe, channel) in map {
            if let (Some(slot), Some(config)) =
                (configs.get_mut(channel.index()), self.probes.get(probe.index()))
            {
                *slot = *config;
            }
        }
        configs
    }

    fn start_streaming(&mut self) -> ProbeResult<()> {
        if let Err(e) = self.try_start_streaming() {
            self.stop_streaming();
            return Err(e);
        }
        Ok(())
    }

    fn try_start_streaming(&mut self) -> ProbeResult<()> {
        if !self.extraction_map.is_empty() {
            let mut probe_points = ProbePointMap::new();
            for (probe, channel) in &self.extraction_map {
                self.extraction_queues[channel.index()].open();
                let point = self.probes[probe.index()].probe_point;
                if probe_points.insert(point, *channel).is_some() {
                    return Err(ProbeError::DuplicateProbePoint(point));
                }
            }

            let source = self.driver.open_extraction()?;
            self.extractor = Some(Extractor::start(
                source,
                Arc::clone(&self.extraction_queues),
                probe_points,
                self.events.clone(),
                self.poll_interval,
            )?);
        }

        let injection: Vec<(ProbeId, ChannelId)> =
            self.injection_map.iter().map(|(p, c)| (*p, *c)).collect();
        for (probe, channel) in injection {
            let queue = Arc::clone(&self.injection_queues[channel.index()]);
            queue.open();

            let sample_bytes = *self
                .sample_sizes
                .get(&probe)
                .ok_or(ProbeError::MissingSampleSize(probe))?;
            if sample_bytes == 0 {
                return Err(ProbeError::ZeroSampleSize(probe));
            }

            let sink = self.driver.open_injection(channel)?;
            self.injectors.push(Injector::start(
                channel,
                sink,
                queue,
                sample_bytes,
                self.events.clone(),
                self.poll_interval,
            )?);
        }

        tracing::info!(
            extraction = self.extraction_map.len(),
            injection = self.injectors.len(),
            "Probe streaming started"
        );
        Ok(())
    }

    /// Stop the workers, then close every queue
    fn stop_streaming(&mut self) {
        let was_streaming = self.extractor.is_some() || !self.injectors.is_empty();

        if let Some(mut extractor) = self.extractor.take() {
            extractor.stop();
        }
        for mut injector in self.injectors.drain(..) {
            injector.stop();
        }
        for queue in self.extraction_queues.iter() {
            queue.close();
        }
        for queue in &self.injection_queues {
            queue.close();
        }

        if was_streaming {
            tracing::info!("Probe streaming stopped");
        }
    }
}

impl<D: ProbeDriver> StateTarget for ProberInner<D> {
    fn current_state(&self) -> ProbeResult<ProbeState> {
        self.driver.state()
    }

    fn transition(&mut self, from: ProbeState, to: ProbeState) -> ProbeResult<()> {
        if to == ProbeState::Active {
            self.start_streaming()?;
        } else {
            self.stop_streaming();
        }

        self.driver.set_state(from, to)?;

        if from == ProbeState::Idle && to == ProbeState::Owned {
            self.push_config()?;
        }
        Ok(())
    }
}
