mod common;

use common::{advance, hits, ms, tally};
use phase_timers::{CountIntervalTimer, IntervalTimer, SingleTimer, Timer, TimerManager, TimerState};

#[tokio::test(start_paused = true)]
async fn tracks_and_controls_registered_timers() {
    let manager = TimerManager::new();
    let (ticks, tick) = tally();

    let recurring = IntervalTimer::new(tick, ms(100)).unwrap().started();
    let one_shot = SingleTimer::new(|| {}, ms(1_000)).unwrap();
    let counted = CountIntervalTimer::new(|| {}, 5, ms(100)).unwrap().started();

    let recurring_id = manager.add_timer(&recurring);
    let one_shot_id = manager.add_timer(&one_shot);
    let counted_id = manager.add_timer(&counted);

    assert_eq!(manager.list_timers(), vec![recurring_id, counted_id]);

    manager.pause_all();
    assert_eq!(recurring.state(), TimerState::Paused);
    assert_eq!(counted.state(), TimerState::Paused);
    assert_eq!(one_shot.state(), TimerState::Stopped);
    assert_eq!(manager.list_timers(), vec![recurring_id, counted_id]);

    let handle = manager.get_timer(one_shot_id).unwrap();
    handle.start();
    assert_eq!(manager.list_timers(), vec![recurring_id, one_shot_id, counted_id]);

    manager.stop_all();
    assert!(manager.list_timers().is_empty());
    advance(500).await;
    assert_eq!(hits(&ticks), 0);
}

#[tokio::test(start_paused = true)]
async fn removed_timers_are_forgotten() {
    let manager = TimerManager::new();
    let timer = IntervalTimer::new(|| {}, ms(100)).unwrap().started();
    let id = manager.add_timer(&timer);

    let handle = manager.remove_timer(id).unwrap();
    assert_eq!(handle.state(), TimerState::Running);
    assert!(manager.get_timer(id).is_none());
    assert!(manager.list_timers().is_empty());

    let next = manager.add_timer(&timer);
    assert_ne!(next, id);
}
