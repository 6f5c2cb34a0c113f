//! Lifecycle states and the transition table between them.

/// Represents the state of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Guard value. Never entered by a constructed timer.
    Invalid,
    Running,
    Paused,
    Stopped,
}

/// A requested lifecycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Start,
    Pause,
    Stop,
}

impl TimerState {
    /// Looks up `transition` in the transition table.
    ///
    /// Returns the state entered, or `None` when the transition is a no-op
    /// from this state (start while running, pause while not running, stop
    /// while stopped, anything from `Invalid`).
    pub(crate) fn apply(self, transition: Transition) -> Option<TimerState> {
        use TimerState::*;
        use Transition::*;

        match (self, transition) {
            (Paused | Stopped, Start) => Some(Running),
            (Running, Pause) => Some(Paused),
            (Running | Paused, Stop) => Some(Stopped),
            _ => None,
        }
    }

    /// The transition a direct state assignment dispatches to.
    pub(crate) fn as_transition(self) -> Option<Transition> {
        match self {
            TimerState::Invalid => None,
            TimerState::Running => Some(Transition::Start),
            TimerState::Paused => Some(Transition::Pause),
            TimerState::Stopped => Some(Transition::Stop),
        }
    }

    /// Whether alarms are allocated in this state.
    pub fn is_live(self) -> bool {
        matches!(self, TimerState::Running | TimerState::Paused)
    }
}
