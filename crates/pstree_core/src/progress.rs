//! Workload accounting for load progress reporting.

use std::cell::Cell;

/// Work units a structure load reserves: one for the document fetch, one for
/// materializing the whole tree.
pub const STRUCTURE_LOAD_UNITS: u32 = 2;

/// A shared counter of expected and completed work units.
pub trait WorkloadCounter {
    /// Announce `units` more units of expected work.
    fn increment_total(&self, units: u32);

    /// Report `units` units of work as done.
    fn increment_done(&self, units: u32);
}

/// Simple single-threaded [`WorkloadCounter`].
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total: Cell<u32>,
    done: Cell<u32>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u32 {
        self.total.get()
    }

    pub fn done(&self) -> u32 {
        self.done.get()
    }

    /// Completed fraction in `[0, 1]`; 0 when nothing is expected.
    pub fn fraction(&self) -> f32 {
        match self.total.get() {
            0 => 0.0,
            total => (self.done.get() as f32 / total as f32).min(1.0),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.done.get() >= self.total.get()
    }
}

impl WorkloadCounter for ProgressTracker {
    fn increment_total(&self, units: u32) {
        self.total.set(self.total.get() + units);
        log::debug!("Workload: {}/{}", self.done(), self.total());
    }

    fn increment_done(&self, units: u32) {
        self.done.set(self.done.get() + units);
        log::debug!("Workload: {}/{}", self.done(), self.total());
    }
}
