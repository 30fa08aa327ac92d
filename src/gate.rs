//! Admission control for pipeline tasks.
//!
//! An [`AdmissionGate`] is a counting gate of fixed capacity. A task must
//! hold an [`AdmissionToken`] before it opens its source file, and the token
//! is returned when it is dropped. Returning on drop covers every exit path:
//! normal completion, early return on an I/O error, and unwinding.
//!
//! The gate also keeps the highest number of tokens ever outstanding at once,
//! which the run report exposes and the tests use to check the ceiling.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct GateState {
    outstanding: usize,
    peak: usize,
    granted: u64,
}

#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    state: Mutex<GateState>,
    freed: Condvar,
}

/// One unit of gate capacity. Released on drop.
#[derive(Debug)]
#[must_use = "the token is released as soon as it is dropped"]
pub struct AdmissionToken<'g> {
    gate: &'g AdmissionGate,
}

impl AdmissionGate {
    /// A gate admitting at most `capacity` holders at once (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(GateState::default()),
            freed: Condvar::new(),
        }
    }

    // Holders never panic while the lock is held, so a poisoned lock still
    // guards consistent counters.
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn grant(&self, state: &mut GateState) -> AdmissionToken<'_> {
        state.outstanding += 1;
        state.granted += 1;
        state.peak = state.peak.max(state.outstanding);
        AdmissionToken { gate: self }
    }

    /// Block the calling thread until a token is free, then take it.
    pub fn acquire(&self) -> AdmissionToken<'_> {
        let mut state = self.lock();
        while state.outstanding >= self.capacity {
            state = self
                .freed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        self.grant(&mut state)
    }

    /// Take a token only if one is free right now.
    #[cfg(test)]
    fn try_acquire(&self) -> Option<AdmissionToken<'_>> {
        let mut state = self.lock();
        (state.outstanding < self.capacity).then(|| self.grant(&mut state))
    }

    fn release(&self) {
        let mut state = self.lock();
        debug_assert!(state.outstanding > 0, "token released twice");
        state.outstanding = state.outstanding.saturating_sub(1);
        drop(state);
        self.freed.notify_one();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens currently held.
    #[cfg(test)]
    fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    /// Most tokens ever held at the same time.
    pub fn peak(&self) -> usize {
        self.lock().peak
    }

    /// Tokens handed out over the gate's lifetime.
    #[cfg(test)]
    fn granted(&self) -> u64 {
        self.lock().granted
    }
}

impl Drop for AdmissionToken<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
