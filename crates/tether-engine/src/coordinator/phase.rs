use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase of a [`Coordinator`](super::Coordinator).
///
/// `Idle` ends one parking session; parking again re-enters `Parking`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum Phase {
    /// Library initialized, affinity thread not parked yet.
    Initialized = 0,
    /// Waiting for events and draining while contexts are alive.
    Parking = 1,
    /// Last context gone; flushing remaining tasks.
    Draining = 2,
    /// Parking loop returned.
    Idle = 3,
}

#[derive(Debug)]
pub(super) struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub(super) fn new(phase: Phase) -> Self {
        Self(AtomicU8::new(phase as u8))
    }

    pub(super) fn get(&self) -> Phase {
        match self.0.load(Ordering::Acquire) {
            0 => Phase::Initialized,
            1 => Phase::Parking,
            2 => Phase::Draining,
            _ => Phase::Idle,
        }
    }

    pub(super) fn set(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::Release);
    }
}
