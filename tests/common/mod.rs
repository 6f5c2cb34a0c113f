#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Lets the virtual clock run forward by `millis`.
pub async fn advance(millis: u64) {
    tokio::time::sleep(ms(millis)).await;
}

/// A callback that counts its invocations.
pub fn tally() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    (hits, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

/// A callback that records when it was last invoked.
pub fn stamp() -> (Arc<Mutex<Option<Instant>>>, impl Fn() + Send + Sync + 'static) {
    let at = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&at);
    (at, move || {
        *slot.lock().unwrap() = Some(Instant::now());
    })
}

pub fn hits(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

pub fn assert_near(actual: Duration, expected: Duration) {
    let slack = ms(2);
    assert!(
        actual + slack >= expected && actual <= expected + slack,
        "expected ~{expected:?}, got {actual:?}"
    );
}
