//! # phase-timers
//! Pausable software timers for tokio: one-shot, interval, counted and
//! deadline-bounded, with phase-aligned resume, live reconfiguration and
//! callback replacement.

mod alarm;
pub mod count;
pub mod errors;
pub mod interval;
pub mod manager;
mod policy;
pub mod single;
pub mod state;
pub mod timer;
mod timer_core;
pub mod until;

pub use count::CountIntervalTimer;
pub use errors::TimerError;
pub use interval::IntervalTimer;
pub use manager::TimerManager;
pub use single::SingleTimer;
pub use state::TimerState;
pub use timer::{Timer, TimerCallback, TimerHandle, TimerStatistics};
pub use until::IntervalUntilTimer;
