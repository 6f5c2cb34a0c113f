use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::errors::{ensure_period, TimerError};
use crate::policy::{Policy, Schedule, Verdict};
use crate::state::TimerState;
use crate::timer::{Callback, Timer, TimerCallback, TimerHandle};
use crate::timer_core::{lock, Core, Shared};

pub(crate) struct Until {
    interval: Duration,
    end: Instant,
    end_callback: Option<Callback>,
}

impl Policy for Until {
    fn schedule(&self) -> Schedule {
        Schedule::Every(self.interval)
    }

    fn deadline(&self) -> Option<Instant> {
        Some(self.end)
    }

    fn end_callback(&self) -> Option<Callback> {
        self.end_callback.clone()
    }

    fn on_tick(&mut self) -> Verdict {
        Verdict::Fire
    }
}

/// Fires its callback every `interval` (the first right on start) until the
/// absolute instant `end`, then stops and runs the end callback, if one is set.
///
/// `end` is a point in time, so pausing does not hold it back: a timer that is
/// paused past its deadline stops and runs the end callback all the same. A
/// timer whose deadline has passed refuses to start.
pub struct IntervalUntilTimer {
    shared: Shared<Until>,
    handle: TimerHandle,
}

impl IntervalUntilTimer {
    /// Creates a stopped deadline timer. Fails if `interval` is zero.
    pub fn new<A>(action: A, interval: Duration, end: Instant) -> Result<Self, TimerError>
    where
        A: TimerCallback + 'static,
    {
        ensure_period(interval)?;
        let policy = Until {
            interval,
            end,
            end_callback: None,
        };
        let shared = Core::shared(Arc::new(action), policy)?;
        let handle = Core::handle(&shared);
        Ok(IntervalUntilTimer { shared, handle })
    }

    /// Sets the end callback, builder style.
    pub fn with_end_callback<E>(self, end_callback: E) -> Self
    where
        E: TimerCallback + 'static,
    {
        self.set_end_callback(end_callback);
        self
    }

    /// Period between actions.
    pub fn interval(&self) -> Duration {
        lock(&self.shared).policy.interval
    }

    /// Changes the action interval. A running timer starts a fresh period now;
    /// the deadline is unaffected.
    pub fn set_interval(&self, interval: Duration) -> Result<(), TimerError> {
        ensure_period(interval)?;
        lock(&self.shared).retime(|policy| policy.interval = interval);
        Ok(())
    }

    /// Instant at which the timer ends.
    pub fn end(&self) -> Instant {
        lock(&self.shared).policy.end
    }

    /// Moves the deadline. A deadline that has already passed stops the timer
    /// on the spot, without the end callback.
    pub fn set_end(&self, end: Instant) {
        let mut core = lock(&self.shared);
        if end <= Instant::now() {
            core.stop();
            core.policy.end = end;
            return;
        }
        match core.state() {
            TimerState::Running => core.reconfigure(|policy| policy.end = end),
            TimerState::Paused => {
                core.policy.end = end;
                core.rearm_deadline();
            }
            TimerState::Stopped | TimerState::Invalid => core.policy.end = end,
        }
    }

    /// Replaces the end callback. Neither alarm is touched; the callback is
    /// read when the deadline fires.
    pub fn set_end_callback<E>(&self, end_callback: E)
    where
        E: TimerCallback + 'static,
    {
        lock(&self.shared).policy.end_callback = Some(Arc::new(end_callback));
    }

    pub fn clear_end_callback(&self) {
        lock(&self.shared).policy.end_callback = None;
    }
}

impl Timer for IntervalUntilTimer {
    fn handle(&self) -> &TimerHandle {
        &self.handle
    }
}
