//! State shared by every timer variant and the lifecycle it drives.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;
#[cfg(feature = "logging")]
use log::{debug, error};

use crate::alarm::{due_after, Alarm, Program};
use crate::errors::TimerError;
use crate::policy::{phase, Policy, Schedule, Verdict};
use crate::state::{TimerState, Transition};
use crate::timer::{Callback, Control, TimerHandle, TimerStatistics};

pub(crate) type Shared<P> = Arc<Mutex<Core<P>>>;

/// Locks a timer core. No user code ever runs under this lock, so a poisoned
/// lock still holds consistent state.
pub(crate) fn lock<P>(shared: &Mutex<Core<P>>) -> MutexGuard<'_, Core<P>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlarmKind {
    Action,
    Deadline,
}

/// What an alarm firing turned into.
enum Dispatch {
    /// Not running; nothing to do this time.
    Skip,
    Fire(Callback),
    /// The timer stopped. Invoke the final action and then the end callback,
    /// whichever are present, and retire the alarm.
    Finish {
        last: Option<Callback>,
        end: Option<Callback>,
    },
    /// The alarm belongs to a released generation or a dropped timer.
    Retire,
}

#[derive(Debug, Default)]
struct Stats {
    executions: usize,
    run_total: Duration,
    run_since: Option<Instant>,
}

impl Stats {
    fn resume(&mut self, now: Instant) {
        self.run_since = Some(now);
    }

    fn suspend(&mut self, now: Instant) {
        if let Some(since) = self.run_since.take() {
            self.run_total += now.saturating_duration_since(since);
        }
    }
}

pub(crate) struct Core<P> {
    this: Weak<Mutex<Core<P>>>,
    runtime: Handle,
    state: TimerState,
    start_stamp: Instant,
    pause_stamp: Instant,
    action: Callback,
    alarm: Option<Alarm>,
    deadline: Option<Alarm>,
    generation: u64,
    /// Scheduled instant of the last action tick handled in this run, or of
    /// the latest resume. `None` until the first tick after a fresh start.
    tick_floor: Option<Instant>,
    stats: Stats,
    pub(crate) policy: P,
}

impl<P: Policy> Core<P> {
    /// Creates a stopped timer bound to the current tokio runtime.
    pub(crate) fn shared(action: Callback, policy: P) -> Result<Shared<P>, TimerError> {
        let runtime = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        let now = Instant::now();
        Ok(Arc::new_cyclic(|this| {
            Mutex::new(Core {
                this: this.clone(),
                runtime,
                state: TimerState::Stopped,
                start_stamp: now,
                pause_stamp: now,
                action,
                alarm: None,
                deadline: None,
                generation: 0,
                tick_floor: None,
                stats: Stats::default(),
                policy,
            })
        }))
    }

    pub(crate) fn handle(shared: &Shared<P>) -> TimerHandle {
        TimerHandle::new(shared.clone())
    }

    pub(crate) fn state(&self) -> TimerState {
        self.state
    }

    pub(crate) fn start(&mut self) {
        let Some(next) = self.state.apply(Transition::Start) else {
            return;
        };
        let now = Instant::now();
        if self.policy.deadline().is_some_and(|end| end <= now) {
            #[cfg(feature = "logging")]
            debug!("Deadline already elapsed; start refused.");
            return;
        }

        if self.state == TimerState::Paused {
            self.resume(now);
            #[cfg(feature = "logging")]
            debug!("Timer resumed.");
        } else {
            self.launch(now);
            #[cfg(feature = "logging")]
            debug!("Starting timer.");
        }
        self.state = next;
        self.stats.resume(now);
        self.check_invariant();
    }

    pub(crate) fn pause(&mut self) {
        let Some(next) = self.state.apply(Transition::Pause) else {
            return;
        };
        let now = Instant::now();
        self.pause_stamp = now;
        if let Some(alarm) = &self.alarm {
            alarm.disarm();
        }
        self.state = next;
        self.stats.suspend(now);
        self.check_invariant();
        #[cfg(feature = "logging")]
        debug!("Timer paused.");
    }

    pub(crate) fn stop(&mut self) {
        let Some(next) = self.state.apply(Transition::Stop) else {
            return;
        };
        self.stats.suspend(Instant::now());
        // Dropping an alarm closes its channel; its task winds down on its own.
        self.alarm = None;
        self.deadline = None;
        self.generation += 1;
        self.state = next;
        self.check_invariant();
        #[cfg(feature = "logging")]
        debug!("Timer stopped.");
    }

    /// Replaces the action. A firing decided before this call may still
    /// invoke the previous one.
    pub(crate) fn set_action(&mut self, action: Callback) {
        self.action = action;
    }

    /// Applies `apply` to the policy. A running timer is paused around the
    /// change and resumed with the usual phase offset.
    pub(crate) fn reconfigure(&mut self, apply: impl FnOnce(&mut P)) {
        if self.state == TimerState::Running {
            self.pause();
            apply(&mut self.policy);
            self.start();
        } else {
            apply(&mut self.policy);
        }
    }

    /// Applies `apply` to the policy. A running periodic timer begins a fresh
    /// period from now.
    pub(crate) fn retime(&mut self, apply: impl FnOnce(&mut P)) {
        apply(&mut self.policy);
        if self.state != TimerState::Running {
            return;
        }
        if let Schedule::Every(period) = self.policy.schedule() {
            let now = Instant::now();
            self.start_stamp = now;
            self.tick_floor = Some(now);
            if let Some(alarm) = &self.alarm {
                alarm.reprogram(Program::Every {
                    first: due_after(now, period),
                    period,
                });
            }
        }
    }

    /// Points the deadline alarm at the policy's current deadline.
    pub(crate) fn rearm_deadline(&self) {
        if let (Some(alarm), Some(end)) = (&self.deadline, self.policy.deadline()) {
            alarm.reprogram(Program::Once(end));
        }
    }

    fn launch(&mut self, now: Instant) {
        self.policy.reset();
        self.stats = Stats::default();
        self.start_stamp = now;
        self.tick_floor = None;
        self.generation += 1;

        let program = match self.policy.schedule() {
            Schedule::Once(delay) => Program::Once(due_after(now, delay)),
            Schedule::Every(period) => Program::Every { first: now, period },
        };
        let alarm = self.spawn_alarm(program, AlarmKind::Action);
        let deadline = self
            .policy
            .deadline()
            .map(|end| self.spawn_alarm(Program::Once(end), AlarmKind::Deadline));
        self.alarm = Some(alarm);
        self.deadline = deadline;
    }

    fn resume(&mut self, now: Instant) {
        let schedule = self.policy.schedule();
        let elapsed = self.pause_stamp.saturating_duration_since(self.start_stamp);
        let passed = phase(elapsed, schedule);
        self.start_stamp = now.checked_sub(passed).unwrap_or(now);
        self.tick_floor = Some(now);

        let program = match schedule {
            Schedule::Once(delay) => Program::Once(due_after(now, delay.saturating_sub(passed))),
            Schedule::Every(period) => Program::Every {
                first: due_after(now, period - passed),
                period,
            },
        };
        if let Some(alarm) = &self.alarm {
            alarm.reprogram(program);
        }
        self.rearm_deadline();
    }

    fn spawn_alarm(&self, program: Program, kind: AlarmKind) -> Alarm {
        let this = self.this.clone();
        let generation = self.generation;
        Alarm::spawn(&self.runtime, program, move |due| {
            let this = this.clone();
            async move { on_alarm(&this, generation, kind, due).await }
        })
    }

    /// Decides what a firing scheduled for `due` does. Counters and
    /// termination are settled here, under the lock; the returned callbacks
    /// are invoked after it is released.
    fn decide(&mut self, generation: u64, kind: AlarmKind, due: Instant) -> Dispatch {
        if generation != self.generation || !self.state.is_live() {
            return Dispatch::Retire;
        }
        if kind == AlarmKind::Deadline {
            return self.expire();
        }
        if self.state != TimerState::Running {
            return Dispatch::Skip;
        }
        // Ticks past the deadline belong to the deadline alarm, which is due
        // first and settles the boundary itself.
        if self.policy.deadline().is_some_and(|end| due > end) {
            return Dispatch::Skip;
        }
        self.tick_floor = Some(due);

        match self.policy.on_tick() {
            Verdict::Fire => {
                self.stats.executions += 1;
                Dispatch::Fire(self.action.clone())
            }
            Verdict::FireLast => {
                self.stats.executions += 1;
                let action = self.action.clone();
                self.stop();
                Dispatch::Finish {
                    last: Some(action),
                    end: None,
                }
            }
            Verdict::Finish => {
                self.stop();
                #[cfg(feature = "logging")]
                debug!("Timer reached expiration count.");
                Dispatch::Finish {
                    last: None,
                    end: self.policy.end_callback(),
                }
            }
        }
    }

    /// The deadline is inclusive: a tick scheduled exactly at the deadline
    /// fires, whichever of the two alarms is handled first.
    fn expire(&mut self) -> Dispatch {
        let last = if self.boundary_tick_pending() {
            self.stats.executions += 1;
            Some(self.action.clone())
        } else {
            None
        };
        self.stop();
        #[cfg(feature = "logging")]
        debug!("Deadline reached.");
        Dispatch::Finish {
            last,
            end: self.policy.end_callback(),
        }
    }

    /// Whether the running schedule has a tick at the deadline that has not
    /// been handled yet.
    fn boundary_tick_pending(&self) -> bool {
        let (Schedule::Every(period), Some(end)) = (self.policy.schedule(), self.policy.deadline())
        else {
            return false;
        };
        if self.state != TimerState::Running {
            return false;
        }
        let offset = phase(end.saturating_duration_since(self.start_stamp), Schedule::Every(period));
        if !offset.is_zero() {
            return false;
        }
        self.tick_floor.map_or(true, |floor| end > floor)
    }

    /// Stops the timer if `generation` is still the live run. Used when a
    /// callback unwinds out of its alarm task.
    fn abandon(&mut self, generation: u64) {
        if generation == self.generation {
            #[cfg(feature = "logging")]
            error!("Callback panicked; stopping timer.");
            self.stop();
        }
    }

    fn statistics(&self) -> TimerStatistics {
        let running = self
            .stats
            .run_since
            .map(|since| since.elapsed())
            .unwrap_or_default();
        TimerStatistics {
            execution_count: self.stats.executions,
            elapsed_time: self.stats.run_total + running,
        }
    }

    fn check_invariant(&self) {
        debug_assert!(
            match self.state {
                TimerState::Running => self.alarm.as_ref().is_some_and(Alarm::is_armed),
                TimerState::Paused => self.alarm.as_ref().is_some_and(|alarm| !alarm.is_armed()),
                TimerState::Stopped | TimerState::Invalid => {
                    self.alarm.is_none() && self.deadline.is_none()
                }
            },
            "alarm out of sync with {:?}",
            self.state
        );
    }
}

fn decide<P: Policy>(
    this: &Weak<Mutex<Core<P>>>,
    generation: u64,
    kind: AlarmKind,
    due: Instant,
) -> Dispatch {
    match this.upgrade() {
        Some(shared) => lock(&shared).decide(generation, kind, due),
        None => Dispatch::Retire,
    }
}

/// Stops the timer when dropped while still armed. tokio drops a task's
/// future after catching a panic from it, so a callback that unwinds leaves
/// its timer stopped rather than running without an alarm task.
struct StopOnUnwind<'a, P: Policy> {
    this: &'a Weak<Mutex<Core<P>>>,
    generation: u64,
    armed: bool,
}

impl<'a, P: Policy> StopOnUnwind<'a, P> {
    fn new(this: &'a Weak<Mutex<Core<P>>>, generation: u64) -> Self {
        StopOnUnwind {
            this,
            generation,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<P: Policy> Drop for StopOnUnwind<'_, P> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(shared) = self.this.upgrade() {
            lock(&shared).abandon(self.generation);
        }
    }
}

async fn on_alarm<P: Policy>(
    this: &Weak<Mutex<Core<P>>>,
    generation: u64,
    kind: AlarmKind,
    due: Instant,
) -> ControlFlow<()> {
    match decide(this, generation, kind, due) {
        Dispatch::Skip => ControlFlow::Continue(()),
        Dispatch::Fire(callback) => {
            let guard = StopOnUnwind::new(this, generation);
            invoke(&callback).await;
            guard.disarm();
            ControlFlow::Continue(())
        }
        Dispatch::Finish { last, end } => {
            if let Some(callback) = last {
                invoke(&callback).await;
            }
            if let Some(callback) = end {
                invoke(&callback).await;
            }
            ControlFlow::Break(())
        }
        Dispatch::Retire => ControlFlow::Break(()),
    }
}

async fn invoke(callback: &Callback) {
    if let Err(_err) = callback.execute().await {
        #[cfg(feature = "logging")]
        error!("Callback execution error: {}", _err);
    }
}

impl<P: Policy> Control for Mutex<Core<P>> {
    fn start(&self) {
        lock(self).start();
    }

    fn pause(&self) {
        lock(self).pause();
    }

    fn stop(&self) {
        lock(self).stop();
    }

    fn state(&self) -> TimerState {
        lock(self).state
    }

    fn set_action(&self, action: Callback) {
        lock(self).set_action(action);
    }

    fn statistics(&self) -> TimerStatistics {
        lock(self).statistics()
    }
}
