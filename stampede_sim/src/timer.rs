//! Cadence timers pacing entity creation and state transitions.

use crate::rng::SimRng;
use crate::scope::{Cancelled, Scope};
use stampede_config::{Timer as TimerSpec, TimerKind};
use std::time::Duration;

/// Produces one next-fire delay per invocation. Stateless across calls:
/// every invocation draws a fresh delay.
#[derive(Clone, Debug)]
pub struct Timer {
    spec: TimerSpec,
    rng: SimRng,
}

impl Timer {
    pub fn new(spec: TimerSpec, rng: SimRng) -> Self {
        Self { spec, rng }
    }

    /// Computes a single delay under the configured cadence.
    pub fn delay(&self) -> Duration {
        match self.spec.kind {
            TimerKind::Immediate => Duration::ZERO,
            TimerKind::Fixed => self.spec.interval,
            TimerKind::Random => {
                if self.spec.max <= self.spec.min {
                    // a degenerate range has exactly one delay to offer
                    self.spec.min
                } else {
                    self.rng.duration_in(self.spec.min, self.spec.max)
                }
            }
        }
    }

    /// Waits for a fresh delay, or returns [`Cancelled`] if the scope
    /// terminates first.
    pub async fn next(&self, scope: &Scope) -> Result<(), Cancelled> {
        let delay = self.delay();
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = scope.cancelled() => Err(Cancelled),
        }
    }
}
