//! Driver probe service state machine
//!
//! The driver only accepts single-step transitions along
//! `Idle ⇄ Owned ⇄ Allocated ⇄ Active`. Reaching `Active` from `Idle`
//! therefore takes three transitions, each of which may fail. A failed start
//! is rolled back to `Idle` so the driver is never left half-started.
//!
//! The current state always comes from the driver; nothing is cached here.

use super::{ProbeError, ProbeResult, ProbeState};

/// What the state machine drives: a state source plus a transition step
pub trait StateTarget {
    fn current_state(&self) -> ProbeResult<ProbeState>;

    /// Perform the single transition `from -> to`
    fn transition(&mut self, from: ProbeState, to: ProbeState) -> ProbeResult<()>;
}

/// Marker for the transition tables
pub struct ProbeStateMachine;

impl ProbeStateMachine {
    /// Next state on the way to `Active`
    pub fn next_start(state: ProbeState) -> Option<ProbeState> {
        match state {
            ProbeState::Idle => Some(ProbeState::Owned),
            ProbeState::Owned => Some(ProbeState::Allocated),
            ProbeState::Allocated => Some(ProbeState::Active),
            ProbeState::Active => None,
        }
    }

    /// Next state on the way to `Idle`
    pub fn next_stop(state: ProbeState) -> Option<ProbeState> {
        match state {
            ProbeState::Active => Some(ProbeState::Allocated),
            ProbeState::Allocated => Some(ProbeState::Owned),
            ProbeState::Owned => Some(ProbeState::Idle),
            ProbeState::Idle => None,
        }
    }

    /// Walk to `Active` (or `Idle` when `active` is false).
    ///
    /// When starting fails, the target is brought back to `Idle` before the
    /// original error is returned.
    pub fn set_state<S: StateTarget + ?Sized>(target: &mut S, active: bool) -> ProbeResult<()> {
        if !active {
            return Self::stop(target);
        }
        if let Err(e) = Self::walk(target, Self::next_start) {
            Self::stop_no_throw(target);
            return Err(e);
        }
        Ok(())
    }

    pub fn stop<S: StateTarget + ?Sized>(target: &mut S) -> ProbeResult<()> {
        Self::walk(target, Self::next_stop)
    }

    /// Stop, logging instead of returning a failure
    pub fn stop_no_throw<S: StateTarget + ?Sized>(target: &mut S) {
        if let Err(e) = Self::stop(target) {
            tracing::error!("Unable to stop driver probe service: {}", e);
        }
    }

    /// `Owned` and `Allocated` are transient: seeing one here means the
    /// driver was left inconsistent.
    pub fn is_active<S: StateTarget + ?Sized>(target: &S) -> ProbeResult<bool> {
        match Self::read_state(target)? {
            ProbeState::Idle => Ok(false),
            ProbeState::Active => Ok(true),
            other => Err(ProbeError::UnexpectedState(other)),
        }
    }

    fn read_state<S: StateTarget + ?Sized>(target: &S) -> ProbeResult<ProbeState> {
        target
            .current_state()
            .map_err(|e| ProbeError::StateRead(e.to_string()))
    }

    fn walk<S: StateTarget + ?Sized>(
        target: &mut S,
        next: fn(ProbeState) -> Option<ProbeState>,
    ) -> ProbeResult<()> {
        let mut state = Self::read_state(target)?;
        while let Some(to) = next(state) {
            tracing::debug!(from = %state, to = %to, "Probe state transition");
            target.transition(state, to).map_err(|e| match e {
                ProbeError::Driver(message) => ProbeError::StateWrite(message),
                other => other,
            })?;
            state = to;
        }
        Ok(())
    }
}
