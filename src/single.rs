use std::sync::Arc;
use std::time::Duration;

use crate::errors::TimerError;
use crate::policy::{Policy, Schedule, Verdict};
use crate::timer::{Timer, TimerCallback, TimerHandle};
use crate::timer_core::{lock, Core, Shared};

pub(crate) struct OneShot {
    delay: Duration,
}

impl Policy for OneShot {
    fn schedule(&self) -> Schedule {
        Schedule::Once(self.delay)
    }

    fn on_tick(&mut self) -> Verdict {
        Verdict::FireLast
    }
}

/// Fires its callback exactly once, `delay` after being started.
///
/// Time spent paused does not count towards the delay. After firing the timer
/// is stopped and may be started again.
pub struct SingleTimer {
    shared: Shared<OneShot>,
    handle: TimerHandle,
}

impl SingleTimer {
    /// Creates a stopped one-shot timer.
    pub fn new<A>(action: A, delay: Duration) -> Result<Self, TimerError>
    where
        A: TimerCallback + 'static,
    {
        let shared = Core::shared(Arc::new(action), OneShot { delay })?;
        let handle = Core::handle(&shared);
        Ok(SingleTimer { shared, handle })
    }

    /// Delay before the action fires.
    pub fn delay(&self) -> Duration {
        lock(&self.shared).policy.delay
    }

    /// Changes the delay. On a running timer the time already waited still
    /// counts, so the firing moves to `start + delay` (or happens right away
    /// if that has passed).
    pub fn set_delay(&self, delay: Duration) {
        lock(&self.shared).reconfigure(|policy| policy.delay = delay);
    }
}

impl Timer for SingleTimer {
    fn handle(&self) -> &TimerHandle {
        &self.handle
    }
}
