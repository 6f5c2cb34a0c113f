//! The alarm primitive timers are built on.
//!
//! An [`Alarm`] is a tokio task that sleeps according to a [`Program`] and
//! calls back into its timer when due. The owning timer reprograms it through
//! a watch channel; dropping the alarm closes the channel and the task exits
//! once any firing in progress has completed.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

// About 30 years; the same horizon tokio uses for "never".
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + offset`, saturating at a far-future instant instead of overflowing.
pub(crate) fn due_after(now: Instant, offset: Duration) -> Instant {
    now.checked_add(offset).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Longest period an alarm can repeat on.
pub(crate) const MAX_PERIOD: Duration = FAR_FUTURE;

/// What an alarm is currently set to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Program {
    /// Allocated but never due.
    Disarmed,
    /// Fire once at the given instant.
    Once(Instant),
    /// Fire at `first`, then every `period`.
    Every { first: Instant, period: Duration },
}

/// Owned handle to a running alarm task.
pub(crate) struct Alarm {
    program: watch::Sender<Program>,
    _task: JoinHandle<()>,
}

impl Alarm {
    /// Spawns an alarm on `runtime`. `on_fire` runs for every firing with the
    /// instant the firing was scheduled for; returning `ControlFlow::Break`
    /// retires the task.
    pub(crate) fn spawn<F, Fut>(runtime: &Handle, program: Program, on_fire: F) -> Self
    where
        F: FnMut(Instant) -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let (program, receiver) = watch::channel(program);
        let task = runtime.spawn(run(receiver, on_fire));
        Alarm {
            program,
            _task: task,
        }
    }

    pub(crate) fn reprogram(&self, program: Program) {
        self.program.send_replace(program);
    }

    pub(crate) fn disarm(&self) {
        self.reprogram(Program::Disarmed);
    }

    pub(crate) fn is_armed(&self) -> bool {
        *self.program.borrow() != Program::Disarmed
    }
}

async fn run<F, Fut>(mut receiver: watch::Receiver<Program>, mut on_fire: F)
where
    F: FnMut(Instant) -> Fut,
    Fut: Future<Output = ControlFlow<()>>,
{
    loop {
        let program = *receiver.borrow_and_update();
        match program {
            Program::Disarmed => {}
            Program::Once(due) => {
                tokio::select! {
                    biased;
                    changed = receiver.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        continue;
                    }
                    () = time::sleep_until(due) => {
                        if on_fire(due).await.is_break() {
                            return;
                        }
                    }
                }
            }
            Program::Every { first, period } => {
                let mut ticker = time::interval_at(first, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        biased;
                        changed = receiver.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            break;
                        }
                        due = ticker.tick() => {
                            if on_fire(due).await.is_break() {
                                return;
                            }
                        }
                    }
                }
                continue;
            }
        }

        // Disarmed, or a one-shot that has gone off: park until reprogrammed.
        if receiver.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(runtime: &Handle, program: Program) -> (Alarm, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let alarm = Alarm::spawn(runtime, program, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { ControlFlow::Continue(()) }
        });
        (alarm, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn once_fires_at_due_instant() {
        let due = Instant::now() + Duration::from_millis(100);
        let (_alarm, fired) = counting(&Handle::current(), Program::Once(due));

        time::sleep(Duration::from_millis(90)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_and_reprogram() {
        let period = Duration::from_millis(100);
        let (alarm, fired) = counting(
            &Handle::current(),
            Program::Every {
                first: Instant::now(),
                period,
            },
        );

        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        alarm.disarm();
        assert!(!alarm.is_armed());
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        alarm.reprogram(Program::Every {
            first: Instant::now() + Duration::from_millis(30),
            period,
        });
        time::sleep(Duration::from_millis(40)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_offsets_saturate() {
        let now = Instant::now();
        assert_eq!(due_after(now, Duration::MAX), now + FAR_FUTURE);
        assert_eq!(
            due_after(now, Duration::from_millis(5)),
            now + Duration::from_millis(5)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_releases_the_task() {
        let (alarm, fired) = counting(
            &Handle::current(),
            Program::Every {
                first: Instant::now(),
                period: Duration::from_millis(10),
            },
        );
        time::sleep(Duration::from_millis(25)).await;
        drop(alarm);
        let seen = fired.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), seen);
    }
}
