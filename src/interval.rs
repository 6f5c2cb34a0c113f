use std::sync::Arc;
use std::time::Duration;

use crate::errors::{ensure_period, TimerError};
use crate::policy::{Policy, Schedule, Verdict};
use crate::timer::{Timer, TimerCallback, TimerHandle};
use crate::timer_core::{lock, Core, Shared};

pub(crate) struct Repeat {
    interval: Duration,
}

impl Policy for Repeat {
    fn schedule(&self) -> Schedule {
        Schedule::Every(self.interval)
    }

    fn on_tick(&mut self) -> Verdict {
        Verdict::Fire
    }
}

/// Fires its callback immediately on start and then every `interval`, until
/// stopped. Pausing and resuming keeps the ticks on their original phase.
pub struct IntervalTimer {
    shared: Shared<Repeat>,
    handle: TimerHandle,
}

impl IntervalTimer {
    /// Creates a stopped interval timer. Fails if `interval` is zero.
    pub fn new<A>(action: A, interval: Duration) -> Result<Self, TimerError>
    where
        A: TimerCallback + 'static,
    {
        ensure_period(interval)?;
        let shared = Core::shared(Arc::new(action), Repeat { interval })?;
        let handle = Core::handle(&shared);
        Ok(IntervalTimer { shared, handle })
    }

    /// Period between actions.
    pub fn interval(&self) -> Duration {
        lock(&self.shared).policy.interval
    }

    /// Changes the interval. A running timer starts a fresh period now.
    pub fn set_interval(&self, interval: Duration) -> Result<(), TimerError> {
        ensure_period(interval)?;
        lock(&self.shared).retime(|policy| policy.interval = interval);
        Ok(())
    }
}

impl Timer for IntervalTimer {
    fn handle(&self) -> &TimerHandle {
        &self.handle
    }
}
