use std::sync::Arc;
use std::time::Duration;

use crate::errors::{ensure_period, TimerError};
use crate::policy::{Policy, Schedule, Verdict};
use crate::state::TimerState;
use crate::timer::{Callback, Timer, TimerCallback, TimerHandle};
use crate::timer_core::{lock, Core, Shared};

pub(crate) struct Counted {
    interval: Duration,
    count: usize,
    counter: usize,
    end_callback: Option<Callback>,
}

impl Policy for Counted {
    fn schedule(&self) -> Schedule {
        Schedule::Every(self.interval)
    }

    fn end_callback(&self) -> Option<Callback> {
        self.end_callback.clone()
    }

    fn reset(&mut self) {
        self.counter = 0;
    }

    fn on_tick(&mut self) -> Verdict {
        self.counter += 1;
        if self.counter <= self.count {
            Verdict::Fire
        } else {
            Verdict::Finish
        }
    }
}

/// Fires its callback `count` times, one `interval` apart (the first right
/// on start). The tick after the last firing stops the timer and runs the end
/// callback, if one is set.
pub struct CountIntervalTimer {
    shared: Shared<Counted>,
    handle: TimerHandle,
}

impl CountIntervalTimer {
    /// Creates a stopped counting timer. Fails if `interval` is zero.
    pub fn new<A>(action: A, count: usize, interval: Duration) -> Result<Self, TimerError>
    where
        A: TimerCallback + 'static,
    {
        ensure_period(interval)?;
        let policy = Counted {
            interval,
            count,
            counter: 0,
            end_callback: None,
        };
        let shared = Core::shared(Arc::new(action), policy)?;
        let handle = Core::handle(&shared);
        Ok(CountIntervalTimer { shared, handle })
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

    /// Changes the interval. A running timer starts a fresh period now.
    pub fn set_interval(&self, interval: Duration) -> Result<(), TimerError> {
        ensure_period(interval)?;
        lock(&self.shared).retime(|policy| policy.interval = interval);
        Ok(())
    }

    /// Number of actions per run.
    pub fn count(&self) -> usize {
        lock(&self.shared).policy.count
    }

    /// Changes the number of firings. A running timer that has already fired
    /// `count` times is stopped on the spot, without the end callback.
    pub fn set_count(&self, count: usize) {
        let mut core = lock(&self.shared);
        if core.state() == TimerState::Running && count <= core.policy.counter {
            core.stop();
            core.policy.count = count;
        } else {
            core.reconfigure(|policy| policy.count = count);
        }
    }

    /// Ticks observed since the last fresh start.
    pub fn counter(&self) -> usize {
        lock(&self.shared).policy.counter
    }

    /// Replaces the end callback. Only consulted when the count runs out.
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

impl Timer for CountIntervalTimer {
    fn handle(&self) -> &TimerHandle {
        &self.handle
    }
}
