use async_trait::async_trait;
use phase_timers::{
    CountIntervalTimer, IntervalTimer, IntervalUntilTimer, SingleTimer, Timer, TimerCallback,
    TimerError, TimerManager,
};
use std::time::Duration;
use tokio::time::{sleep, Instant};

struct ErrorCallback;

#[async_trait]
impl TimerCallback for ErrorCallback {
    async fn execute(&self) -> Result<(), TimerError> {
        Err(TimerError::CallbackError("Simulated error!".into()))
    }
}

#[tokio::main]
async fn main() -> Result<(), TimerError> {
    let manager = TimerManager::new();

    // 1. One-shot timer
    let one_shot = SingleTimer::new(
        || println!("One-shot timer executed!"),
        Duration::from_secs(2),
    )?
    .started();
    manager.add_timer(&one_shot);

    // 2. Interval timer
    let recurring = IntervalTimer::new(
        || println!("Interval timer executed!"),
        Duration::from_secs(1),
    )?
    .started();
    let recurring_id = manager.add_timer(&recurring);

    // 3. Pause and resume; the next tick keeps its place in the cycle
    sleep(Duration::from_millis(2_500)).await;
    println!("Pausing interval timer...");
    recurring.pause();
    sleep(Duration::from_secs(3)).await;
    println!("Resuming interval timer...");
    if let Some(handle) = manager.get_timer(recurring_id) {
        handle.start();
    }

    // 4. Live interval change
    sleep(Duration::from_secs(2)).await;
    println!("Adjusting interval timer...");
    recurring.set_interval(Duration::from_millis(400))?;
    sleep(Duration::from_secs(2)).await;
    println!("Interval timer statistics: {:?}", recurring.statistics());
    recurring.stop();

    // 5. Counted timer with an end callback
    let counted = CountIntervalTimer::new(
        || println!("Counted timer executed!"),
        3,
        Duration::from_millis(500),
    )?
    .with_end_callback(|| println!("Counted timer finished."))
    .started();
    manager.add_timer(&counted);
    sleep(Duration::from_secs(2)).await;

    // 6. Deadline timer
    let _until = IntervalUntilTimer::new(
        || println!("Deadline timer executed!"),
        Duration::from_millis(300),
        Instant::now() + Duration::from_secs(1),
    )?
    .with_end_callback(|| println!("Deadline reached."))
    .started();
    sleep(Duration::from_millis(1_500)).await;

    // 7. Callback errors are reported, not fatal
    println!("Starting a timer with an error callback...");
    let _failing = SingleTimer::new(ErrorCallback, Duration::from_millis(200))?.started();
    sleep(Duration::from_millis(500)).await;

    manager.stop_all();
    println!("All timers completed!");
    Ok(())
}
