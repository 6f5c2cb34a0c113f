use std::time::Duration;

use tokio::time::Instant;

use crate::timer::Callback;

/// How the action alarm is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Schedule {
    /// Fire once after the delay.
    Once(Duration),
    /// Fire immediately, then on every period.
    Every(Duration),
}

/// Outcome of an action tick, decided under the timer lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Invoke the action and keep going.
    Fire,
    /// Invoke the action; the timer is exhausted afterwards.
    FireLast,
    /// Do not invoke the action; stop and run the end callback.
    Finish,
}

/// A scheduling policy plugged into the shared timer core.
pub(crate) trait Policy: Send + 'static {
    fn schedule(&self) -> Schedule;

    /// Absolute instant at which the timer ends, if the policy has one.
    fn deadline(&self) -> Option<Instant> {
        None
    }

    fn end_callback(&self) -> Option<Callback> {
        None
    }

    /// Clears per-run bookkeeping ahead of a fresh start.
    fn reset(&mut self) {}

    fn on_tick(&mut self) -> Verdict;
}

/// Offset into the current cycle after `elapsed` has passed.
pub(crate) fn phase(elapsed: Duration, schedule: Schedule) -> Duration {
    match schedule {
        Schedule::Once(_) => elapsed,
        Schedule::Every(period) => {
            let nanos = elapsed.as_nanos() % period.as_nanos().max(1);
            let secs = (nanos / 1_000_000_000) as u64;
            Duration::new(secs, (nanos % 1_000_000_000) as u32)
        }
    }
}
