/// Latest-deliveries poller tests.
///
/// Run the real worker thread against a scripted backend with a short
/// interval. Assertions wait on the handle rather than on fixed sleeps where
/// the outcome allows it.
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hookdash::analytics::activity;
use hookdash::dashboard::poller::{self, PollerHandle, PollerState, SharedDeliveries};

mod common;
use common::ScriptedBackend;

const FAST: Duration = Duration::from_millis(20);
const PATIENCE: Duration = Duration::from_secs(5);

fn start(backend: &Arc<ScriptedBackend>, latest: &SharedDeliveries, interval: Duration) -> PollerHandle {
    PollerHandle::start(backend.clone(), Arc::clone(latest), interval)
}

#[test]
fn stops_after_first_non_empty_page() {
    activity::set_enabled(false);
    let backend = Arc::new(ScriptedBackend::new().with_deliveries(&[Some(2)]));
    let latest = SharedDeliveries::default();

    let handle = start(&backend, &latest, FAST);
    assert!(handle.wait_idle(PATIENCE));

    assert_eq!(handle.state(), PollerState::Idle);
    assert_eq!(handle.ticks(), 1);
    assert_eq!(backend.delivery_calls(), 1);

    let cache = poller::lock(&latest);
    assert!(cache.has_events);
    assert_eq!(cache.deliveries.len(), 2);
}

#[test]
fn empty_pages_and_failures_keep_polling() {
    activity::set_enabled(false);
    let backend = Arc::new(
        ScriptedBackend::new().with_deliveries(&[Some(0), None, Some(0), Some(1)]),
    );
    let latest = SharedDeliveries::default();

    let handle = start(&backend, &latest, FAST);
    assert!(handle.wait_idle(PATIENCE));

    assert_eq!(handle.ticks(), 4);
    assert_eq!(backend.delivery_calls(), 4);
    assert!(poller::lock(&latest).has_events);
}

#[test]
fn persistent_failures_poll_until_cancelled() {
    activity::set_enabled(false);
    let backend = Arc::new(ScriptedBackend::new().with_deliveries(&[None]));
    let latest = SharedDeliveries::default();

    let mut handle = start(&backend, &latest, FAST);
    assert!(!handle.wait_idle(Duration::from_millis(200)));
    assert!(handle.is_polling());
    assert!(handle.ticks() >= 2);

    handle.cancel();
    assert_eq!(handle.state(), PollerState::Idle);

    // A fetch spawned just before the cancel may still be entering the backend.
    thread::sleep(FAST);
    let calls = backend.delivery_calls();
    thread::sleep(FAST * 4);
    assert_eq!(backend.delivery_calls(), calls, "no fetch after cancel");
    assert!(!poller::lock(&latest).has_events);
}

#[test]
fn first_fetch_waits_one_interval() {
    activity::set_enabled(false);
    let backend = Arc::new(ScriptedBackend::new().with_deliveries(&[Some(1)]));
    let latest = SharedDeliveries::default();

    let mut handle = start(&backend, &latest, Duration::from_secs(2));
    assert_eq!(handle.ticks(), 0);
    assert!(handle.is_polling());

    handle.cancel();
    assert_eq!(backend.delivery_calls(), 0);
}

#[test]
fn cancel_is_idempotent() {
    activity::set_enabled(false);
    let backend = Arc::new(ScriptedBackend::new().with_deliveries(&[Some(0)]));
    let latest = SharedDeliveries::default();

    let mut handle = start(&backend, &latest, FAST);
    handle.cancel();
    handle.cancel();
    assert_eq!(handle.state(), PollerState::Idle);

    // Cancelling after the poller stopped on its own is also a no-op.
    let backend = Arc::new(ScriptedBackend::new().with_deliveries(&[Some(1)]));
    let mut handle = start(&backend, &latest, FAST);
    assert!(handle.wait_idle(PATIENCE));
    handle.cancel();
    handle.cancel();
    assert_eq!(handle.ticks(), 1);
}

#[test]
fn dropping_the_handle_stops_the_worker() {
    activity::set_enabled(false);
    let backend = Arc::new(ScriptedBackend::new().with_deliveries(&[None]));
    let latest = SharedDeliveries::default();

    {
        let handle = start(&backend, &latest, FAST);
        thread::sleep(FAST * 3);
        drop(handle);
    }

    thread::sleep(FAST);
    let calls = backend.delivery_calls();
    thread::sleep(FAST * 4);
    assert_eq!(backend.delivery_calls(), calls);
}

// ---------------------------------------------------------------------------
// Slow fetches
// ---------------------------------------------------------------------------

#[test]
fn hung_fetch_does_not_delay_later_ticks() {
    activity::set_enabled(false);
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_deliveries(&[None])
            .with_delays(&[Duration::from_secs(1)]),
    );
    let latest = SharedDeliveries::default();

    let mut handle = start(&backend, &latest, FAST);
    thread::sleep(Duration::from_millis(300));

    // The first call is still hanging; the ticks after it kept firing.
    assert!(backend.delivery_calls() >= 5, "calls = {}", backend.delivery_calls());
    assert!(handle.ticks() >= 5);

    let started = Instant::now();
    handle.cancel();
    assert!(
        started.elapsed() < Duration::from_millis(250),
        "cancel waited {:?} on the hung fetch",
        started.elapsed()
    );
    assert_eq!(handle.state(), PollerState::Idle);
}

#[test]
fn fetch_finishing_after_cancel_is_discarded() {
    activity::set_enabled(false);
    let slow = Duration::from_millis(300);
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_deliveries(&[Some(3)])
            .with_delays(&[slow; 10]),
    );
    let latest = SharedDeliveries::default();

    let mut handle = start(&backend, &latest, FAST);
    thread::sleep(FAST * 5);
    assert!(backend.delivery_calls() >= 1);
    handle.cancel();

    thread::sleep(slow * 2);
    let cache = poller::lock(&latest);
    assert!(cache.deliveries.is_empty());
    assert!(!cache.has_events);
}

#[test]
fn stale_empty_page_after_self_stop_is_discarded() {
    activity::set_enabled(false);
    let slow = Duration::from_millis(300);
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_deliveries(&[Some(0), Some(2)])
            .with_delays(&[slow]),
    );
    let latest = SharedDeliveries::default();

    let handle = start(&backend, &latest, FAST);
    assert!(handle.wait_idle(PATIENCE));
    assert_eq!(poller::lock(&latest).deliveries.len(), 2);

    // Let the slow empty page from the first tick come back.
    thread::sleep(slow * 2);
    let cache = poller::lock(&latest);
    assert_eq!(cache.deliveries.len(), 2);
    assert!(cache.has_events);
}
