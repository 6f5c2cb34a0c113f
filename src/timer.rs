use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::TimerError;
use crate::state::{TimerState, Transition};

/// Statistics for a timer.
#[derive(Debug, Clone, Default)]
pub struct TimerStatistics {
    /// Number of times the callback has been executed since the last fresh start.
    pub execution_count: usize,
    /// Time spent running (not paused) since the last fresh start.
    pub elapsed_time: Duration,
}

/// A trait for timer callbacks.
///
/// Any `Fn()` closure that is `Send + Sync` is a callback. Callbacks run on the
/// timer's own tokio task; they are free to call back into their timer.
#[async_trait]
pub trait TimerCallback: Send + Sync {
    /// The function to execute when the timer triggers.
    async fn execute(&self) -> Result<(), TimerError>;
}

#[async_trait]
impl<F> TimerCallback for F
where
    F: Fn() + Send + Sync,
{
    async fn execute(&self) -> Result<(), TimerError> {
        self();
        Ok(())
    }
}

pub(crate) type Callback = Arc<dyn TimerCallback>;

/// Operations every timer supports regardless of policy.
pub(crate) trait Control: Send + Sync {
    fn start(&self);
    fn pause(&self);
    fn stop(&self);
    fn state(&self) -> TimerState;
    fn set_action(&self, action: Callback);
    fn statistics(&self) -> TimerStatistics;
}

/// A cloneable, type-erased reference to a timer.
///
/// Handles keep the timer alive; a timer whose last handle is dropped releases
/// its alarms and stops delivering callbacks.
#[derive(Clone)]
pub struct TimerHandle {
    control: Arc<dyn Control>,
}

impl TimerHandle {
    pub(crate) fn new(control: Arc<dyn Control>) -> Self {
        TimerHandle { control }
    }

    /// Starts the timer, or resumes it if paused. Ignored while running.
    pub fn start(&self) {
        self.control.start();
    }

    /// Pauses a running timer, keeping its phase.
    pub fn pause(&self) {
        self.control.pause();
    }

    /// Stops the timer and releases its alarms.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Gets the current state of the timer.
    pub fn state(&self) -> TimerState {
        self.control.state()
    }

    /// Assigns a state directly, dispatching to start/pause/stop.
    /// Assigning [`TimerState::Invalid`] does nothing.
    pub fn set_state(&self, state: TimerState) {
        match state.as_transition() {
            Some(Transition::Start) => self.start(),
            Some(Transition::Pause) => self.pause(),
            Some(Transition::Stop) => self.stop(),
            None => {}
        }
    }

    /// Replaces the callback; state and phase are unaffected. Firings decided
    /// after this returns invoke the new callback. One already decided, whose
    /// callback has not started yet, may still invoke the previous one.
    pub fn set_action<A>(&self, action: A)
    where
        A: TimerCallback + 'static,
    {
        self.control.set_action(Arc::new(action));
    }

    /// Gets the timer's statistics.
    pub fn statistics(&self) -> TimerStatistics {
        self.control.statistics()
    }
}

/// The uniform control surface shared by every timer variant.
pub trait Timer {
    /// Cloneable handle controlling this timer.
    fn handle(&self) -> &TimerHandle;

    /// Starts the timer, or resumes it if paused.
    fn start(&self) {
        self.handle().start();
    }

    /// Pauses a running timer, keeping its phase.
    fn pause(&self) {
        self.handle().pause();
    }

    /// Stops the timer.
    fn stop(&self) {
        self.handle().stop();
    }

    /// Gets the current state of the timer.
    fn state(&self) -> TimerState {
        self.handle().state()
    }

    /// Assigns a state, as [`TimerHandle::set_state`] does.
    fn set_state(&self, state: TimerState) {
        self.handle().set_state(state);
    }

    /// Replaces the callback, as [`TimerHandle::set_action`] does.
    fn set_action<A>(&self, action: A)
    where
        A: TimerCallback + 'static,
        Self: Sized,
    {
        self.handle().set_action(action);
    }

    /// Gets the timer's statistics.
    fn statistics(&self) -> TimerStatistics {
        self.handle().statistics()
    }

    /// Starts the timer and hands it back, for start-on-construction.
    fn started(self) -> Self
    where
        Self: Sized,
    {
        self.start();
        self
    }
}
