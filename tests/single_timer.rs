mod common;

use std::time::Duration;

use common::{advance, assert_near, hits, ms, stamp, tally};
use phase_timers::{SingleTimer, Timer, TimerState};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn fires_once_after_delay_then_stops() {
    let (fired, action) = tally();
    let timer = SingleTimer::new(action, ms(200)).unwrap().started();
    assert_eq!(timer.state(), TimerState::Running);

    advance(190).await;
    assert_eq!(hits(&fired), 0);

    advance(20).await;
    assert_eq!(hits(&fired), 1);
    assert_eq!(timer.state(), TimerState::Stopped);

    advance(1_000).await;
    assert_eq!(hits(&fired), 1);
}

#[tokio::test(start_paused = true)]
async fn random_delay_is_honoured() {
    let delay = fastrand::u64(800..1200);
    let (fired_at, action) = stamp();
    let started = Instant::now();
    let _timer = SingleTimer::new(action, ms(delay)).unwrap().started();

    advance(delay + 50).await;
    let fired_at = (*fired_at.lock().unwrap()).expect("timer never fired");
    assert_near(fired_at - started, ms(delay));
}

#[tokio::test(start_paused = true)]
async fn not_started_by_default() {
    let (fired, action) = tally();
    let timer = SingleTimer::new(action, ms(100)).unwrap();
    assert_eq!(timer.state(), TimerState::Stopped);

    advance(500).await;
    assert_eq!(hits(&fired), 0);
}

#[tokio::test(start_paused = true)]
async fn paused_time_does_not_count() {
    let (fired, action) = tally();
    let timer = SingleTimer::new(action, ms(200)).unwrap().started();

    advance(50).await;
    timer.pause();
    assert_eq!(timer.state(), TimerState::Paused);
    advance(1_000).await;
    assert_eq!(hits(&fired), 0);

    timer.start();
    advance(140).await;
    assert_eq!(hits(&fired), 0);
    advance(20).await;
    assert_eq!(hits(&fired), 1);
    assert_eq!(timer.state(), TimerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn can_be_started_again_after_firing() {
    let (fired, action) = tally();
    let timer = SingleTimer::new(action, ms(100)).unwrap().started();

    advance(150).await;
    assert_eq!(hits(&fired), 1);

    timer.start();
    assert_eq!(timer.state(), TimerState::Running);
    advance(90).await;
    assert_eq!(hits(&fired), 1);
    advance(20).await;
    assert_eq!(hits(&fired), 2);
    assert_eq!(timer.statistics().execution_count, 1);
}

#[tokio::test(start_paused = true)]
async fn delay_change_keeps_time_already_waited() {
    let (fired, action) = tally();
    let timer = SingleTimer::new(action, ms(500)).unwrap().started();

    advance(100).await;
    timer.set_delay(ms(300));
    assert_eq!(timer.delay(), ms(300));
    assert_eq!(timer.state(), TimerState::Running);

    advance(190).await;
    assert_eq!(hits(&fired), 0);
    advance(20).await;
    assert_eq!(hits(&fired), 1);
}

#[tokio::test(start_paused = true)]
async fn shrinking_delay_below_elapsed_fires_right_away() {
    let (fired, action) = tally();
    let timer = SingleTimer::new(action, ms(500)).unwrap().started();

    advance(300).await;
    timer.set_delay(ms(100));
    advance(1).await;
    assert_eq!(hits(&fired), 1);
    assert_eq!(timer.state(), TimerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn delay_change_on_stopped_timer_is_stored() {
    let (fired, action) = tally();
    let timer = SingleTimer::new(action, ms(500)).unwrap();
    timer.set_delay(ms(50));
    assert_eq!(timer.state(), TimerState::Stopped);

    timer.start();
    advance(60).await;
    assert_eq!(hits(&fired), 1);
}

#[tokio::test(start_paused = true)]
async fn unbounded_delay_never_fires() {
    let (fired, action) = tally();
    let timer = SingleTimer::new(action, Duration::MAX).unwrap().started();
    assert_eq!(timer.state(), TimerState::Running);

    advance(60_000).await;
    timer.pause();
    timer.start();
    assert_eq!(timer.state(), TimerState::Running);

    timer.set_delay(Duration::MAX);
    advance(60_000).await;
    assert_eq!(hits(&fired), 0);
    assert_eq!(timer.state(), TimerState::Running);
}
