//! CPU Clock.
use std::{
    thread,
    time::{Duration, Instant},
};

/// Time accounting for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBudget {
    /// How long a cycle is supposed to take.
    pub target: Duration,
    /// How long the cycle actually took, before any waiting.
    pub elapsed: Duration,
}

impl CycleBudget {
    /// Time left over in the cycle. Zero when the cycle ran late.
    pub fn remaining(&self) -> Duration {
        self.target.saturating_sub(self.elapsed)
    }
}

/// Scheduling contract of the cycle driver.
///
/// The driver calls [`Pacer::start`] at the top of every cycle and
/// [`Pacer::finish`] once the cycle's work is done.
pub trait Pacer {
    fn start(&mut self);

    /// Ends the current cycle, waiting out the remaining budget if the pacer keeps real time.
    fn finish(&mut self) -> CycleBudget;
}

/// Timer to synchronize thread with the software clock of the virtual CPU.
pub struct Clock {
    interval: Duration,
    start: Instant,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            start: Instant::now(),
        }
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.start = Instant::now()
    }

    fn budget(&self) -> CycleBudget {
        CycleBudget {
            target: self.interval,
            elapsed: self.start.elapsed(),
        }
    }
}

impl Pacer for Clock {
    fn start(&mut self) {
        self.reset();
    }

    fn finish(&mut self) -> CycleBudget {
        let budget = self.budget();
        let remaining = budget.remaining();

        // A cycle that ran late is not caught up. If the host stalled,
        // the VM simply continues at its usual speed from the next cycle.
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }

        budget
    }
}

/// Pacer for headless runs. Measures cycles but never sleeps.
#[derive(Debug, Clone)]
pub struct Unpaced {
    start: Option<Instant>,
}

impl Unpaced {
    pub fn new() -> Self {
        Self { start: None }
    }
}

impl Default for Unpaced {
    fn default() -> Self {
        Self::new()
    }
}

impl Pacer for Unpaced {
    fn start(&mut self) {
        self.start = Some(Instant::now());
    }

    fn finish(&mut self) -> CycleBudget {
        CycleBudget {
            target: Duration::ZERO,
            elapsed: self.start.take().map(|t| t.elapsed()).unwrap_or_default(),
        }
    }
}
