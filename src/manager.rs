use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::state::TimerState;
use crate::timer::{Timer, TimerHandle};

/// A manager for controlling multiple timers.
///
/// The manager holds handles, so registered timers stay alive until removed.
#[derive(Default)]
pub struct TimerManager {
    timers: Mutex<HashMap<u64, TimerHandle>>,
    next_id: AtomicU64,
}

impl TimerManager {
    /// Creates a new timer manager.
    pub fn new() -> Self {
        Self::default()
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<u64, TimerHandle>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a timer to the manager and returns its ID.
    pub fn add_timer<T: Timer>(&self, timer: &T) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.timers().insert(id, timer.handle().clone());
        id
    }

    /// Forgets a timer, handing back its handle.
    pub fn remove_timer(&self, id: u64) -> Option<TimerHandle> {
        self.timers().remove(&id)
    }

    /// Pauses all running timers.
    pub fn pause_all(&self) {
        for timer in self.snapshot() {
            timer.pause();
        }
    }

    /// Stops all timers.
    pub fn stop_all(&self) {
        for timer in self.snapshot() {
            timer.stop();
        }
    }

    /// Lists the IDs of all timers that are not stopped, in ascending order.
    pub fn list_timers(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .timers()
            .iter()
            .filter_map(|(id, timer)| (timer.state() != TimerState::Stopped).then_some(*id))
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Retrieves a timer by ID.
    pub fn get_timer(&self, id: u64) -> Option<TimerHandle> {
        self.timers().get(&id).cloned()
    }

    // Timer locks are taken outside the registry lock.
    fn snapshot(&self) -> Vec<TimerHandle> {
        self.timers().values().cloned().collect()
    }
}
