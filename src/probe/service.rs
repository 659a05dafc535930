//! User-facing probe service
//!
//! Keeps the session configuration edited by the user and, on start,
//! derives the injection sample sizes from the firmware pin formats before
//! handing everything to the [`Prober`].

use super::{
    ActiveSession, InjectionSampleSizes, ProbeConfig, ProbeDriver, ProbeError, ProbeId, Prober,
    SessionProbes,
};
use crate::error::Result;
use crate::firmware::{ProbePointId, ProbeType};
use crate::handler::ModuleHandler;
use crate::transport::Transport;
use std::sync::{Mutex, MutexGuard};

pub struct ProbeService<'a, D: ProbeDriver, T: Transport> {
    prober: Prober<D>,
    handler: &'a ModuleHandler<T>,
    probes: Mutex<SessionProbes>,
}

impl<'a, D: ProbeDriver, T: Transport> ProbeService<'a, D, T> {
    pub fn new(prober: Prober<D>, handler: &'a ModuleHandler<T>) -> Self {
        let probes = vec![ProbeConfig::default(); prober.max_probe_count()];
        Self {
            prober,
            handler,
            probes: Mutex::new(probes),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionProbes> {
        self.probes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn prober(&self) -> &Prober<D> {
        &self.prober
    }

    pub fn set_configuration(&self, id: ProbeId, config: ProbeConfig) -> Result<()> {
        let mut probes = self.lock();
        let slot = probes
            .get_mut(id.index())
            .ok_or(ProbeError::InvalidProbeIndex(id.index()))?;
        *slot = config;
        Ok(())
    }

    pub fn configuration(&self, id: ProbeId) -> Result<ProbeConfig> {
        let probes = self.lock();
        let config = probes
            .get(id.index())
            .ok_or(ProbeError::InvalidProbeIndex(id.index()))?;
        Ok(*config)
    }

    /// Start or stop the session.
    ///
    /// Starting pushes the current configuration first, so a failure on the
    /// firmware side leaves the driver untouched.
    pub fn set_state(&self, active: bool) -> Result<()> {
        if active {
            let probes = self.lock().clone();
            let sample_sizes = self.injection_sample_sizes(&probes)?;
            self.prober.set_probes_config(probes, sample_sizes)?;
        }
        self.prober.set_state(active)?;
        Ok(())
    }

    pub fn is_active(&self) -> Result<bool> {
        Ok(self.prober.is_active()?)
    }

    /// Byte size of one sample of each enabled injection probe
    pub fn injection_sample_sizes(&self, probes: &[ProbeConfig]) -> Result<InjectionSampleSizes> {
        let session = ActiveSession::from_probes(probes);
        let mut sizes = InjectionSampleSizes::new();
        for id in session.injection {
            let size = self.sample_size(probes[id.index()].probe_point)?;
            tracing::debug!(probe = %id, size, "Injection sample size");
            sizes.insert(id, size);
        }
        Ok(sizes)
    }

    fn sample_size(&self, point: ProbePointId) -> Result<usize> {
        let props = self
            .handler
            .module_instance_props(point.module_id() as u16, point.instance_id() as u16)?;

        let pins = match point.probe_type() {
            ProbeType::Input => &props.input_pins,
            ProbeType::Output => &props.output_pins,
            other => return Err(ProbeError::UnsupportedPinType(other).into()),
        };
        let pin = pins
            .get(point.index() as usize)
            .ok_or(ProbeError::InvalidPinIndex {
                index: point.index(),
                count: pins.len(),
            })?;

        let size = pin
            .format
            .sample_bytes()
            .ok_or(ProbeError::UnsupportedBitDepth(pin.format.valid_bit_depth.into()))?;
        Ok(size)
    }
}
