//! Latest-deliveries poller.
//!
//! While a project has never received traffic the dashboard shows an
//! onboarding panel. For incoming projects a background worker re-fetches the
//! first page of deliveries on a fixed interval so the panel can flip to the
//! chart as soon as the first webhook lands.
//!
//! ```text
//!            start (incoming)            fetch ok, page not empty
//!   Idle ────────────────────▶ Polling ──────────────────────────▶ Idle
//!                                 │  ▲
//!                   fetch failed  │  │  or page empty
//!                                 └──┘
//!                                 │
//!                                 └──── cancel() ────────────────▶ Idle
//! ```
//!
//! Every tick runs its fetch on a thread of its own, so a hung request only
//! stalls that one attempt and the next tick still fires on time. Results are
//! written to the cache only while the session is active: a fetch that
//! returns after `cancel()` or after the poller stopped itself is dropped.
//!
//! The worker is owned through a [`PollerHandle`]. Cancelling is idempotent,
//! returns without waiting for in-flight fetches, and also happens when the
//! handle is dropped. Fetch errors are written to the activity log and
//! retried on the next tick; they never reach the caller.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::analytics::activity::{self, ActivityKind};
use crate::api::DashboardBackend;
use crate::api::models::EventDelivery;

/// Time between two fetches.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

// ---------------------------------------------------------------------------
// Shared cache
// ---------------------------------------------------------------------------

/// The latest deliveries page plus whether any delivery was ever seen.
#[derive(Debug, Clone, Default)]
pub struct LatestDeliveries {
    pub deliveries: Vec<EventDelivery>,
    pub has_events: bool,
}

/// Cache shared between the controller and the poller.
pub type SharedDeliveries = Arc<Mutex<LatestDeliveries>>;

/// Lock the cache, recovering from a poisoned lock.
///
/// The cache only ever holds a whole page, so a panic mid-write cannot leave
/// it half-updated.
pub fn lock(latest: &SharedDeliveries) -> MutexGuard<'_, LatestDeliveries> {
    latest.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Single tick
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollerState {
    Idle,
    Polling,
}

/// What became of one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing found yet (or the fetch failed); keep ticking.
    Continue,
    /// Deliveries found; the session is now inactive.
    Stop,
    /// The session ended before the fetch returned; the result was dropped.
    Discarded,
}

/// Fetch the first deliveries page once and replace the cache with it.
///
/// The result is only applied while `active` is set. The flag is checked and
/// cleared under the cache lock, so no write lands after a stop or cancel.
/// Returns [`TickOutcome::Stop`] once the page holds at least one delivery.
pub fn poll_once(
    backend: &dyn DashboardBackend,
    latest: &SharedDeliveries,
    active: &AtomicBool,
) -> TickOutcome {
    let result = backend.latest_event_deliveries(1);

    let mut cache = lock(latest);
    if !active.load(Ordering::SeqCst) {
        return TickOutcome::Discarded;
    }

    match result {
        Ok(page) => {
            let found = !page.content.is_empty();
            cache.deliveries = page.content;
            if found {
                cache.has_events = true;
                active.store(false, Ordering::SeqCst);
                TickOutcome::Stop
            } else {
                TickOutcome::Continue
            }
        }
        Err(e) => {
            drop(cache);
            activity::fetch_error("latest event deliveries", &e);
            TickOutcome::Continue
        }
    }
}

/// Join the fetch threads that have finished, recording any panic.
fn reap(in_flight: &mut Vec<JoinHandle<()>>) {
    let (done, running): (Vec<_>, Vec<_>) =
        in_flight.drain(..).partition(|handle| handle.is_finished());
    *in_flight = running;

    for handle in done {
        if handle.join().is_err() {
            record_panic("poll fetch");
        }
    }
}

fn record_panic(what: &str) {
    activity::record(
        ActivityKind::PollerPanicked,
        &format!("{what} panicked"),
        None,
    );
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owned handle to a polling session.
///
/// Returned when the dashboard is activated and handed back on teardown.
#[derive(Debug)]
pub struct PollerHandle {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    latest: Option<SharedDeliveries>,
    active: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
}

impl PollerHandle {
    /// A handle that never polls (outgoing projects, polling disabled).
    pub fn idle() -> Self {
        Self {
            stop: None,
            worker: None,
            latest: None,
            active: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn the worker. The first fetch happens one `interval` from now.
    pub fn start(
        backend: Arc<dyn DashboardBackend>,
        latest: SharedDeliveries,
        interval: Duration,
    ) -> Self {
        // A zero timeout would turn the tick loop into a busy spin.
        let interval = interval.max(Duration::from_millis(1));
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let active = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicU64::new(0));

        activity::record(
            ActivityKind::PollerStarted,
            "polling latest deliveries",
            Some(format!("interval_ms={}", interval.as_millis())),
        );

        let worker = {
            let latest = Arc::clone(&latest);
            let active = Arc::clone(&active);
            let ticks = Arc::clone(&ticks);
            let self_stop = stop_tx.clone();

            thread::spawn(move || {
                let mut in_flight = Vec::new();

                // Ok(()) means a stop was requested, by cancel() or by a fetch
                // that found deliveries.
                while let Err(RecvTimeoutError::Timeout) = stop_rx.recv_timeout(interval) {
                    reap(&mut in_flight);
                    if !active.load(Ordering::SeqCst) {
                        break;
                    }

                    let tick = ticks.fetch_add(1, Ordering::SeqCst) + 1;
                    let backend = Arc::clone(&backend);
                    let latest = Arc::clone(&latest);
                    let active = Arc::clone(&active);
                    let self_stop = self_stop.clone();

                    in_flight.push(thread::spawn(move || {
                        if poll_once(backend.as_ref(), &latest, &active) == TickOutcome::Stop {
                            activity::record(
                                ActivityKind::PollerStopped,
                                "deliveries found, polling stopped",
                                Some(format!("ticks={tick}")),
                            );
                            let _ = self_stop.send(());
                        }
                    }));
                }

                reap(&mut in_flight);
            })
        };

        Self {
            stop: Some(stop_tx),
            worker: Some(worker),
            latest: Some(latest),
            active,
            ticks,
        }
    }

    pub fn state(&self) -> PollerState {
        if self.active.load(Ordering::SeqCst) {
            PollerState::Polling
        } else {
            PollerState::Idle
        }
    }

    pub fn is_polling(&self) -> bool {
        self.state() == PollerState::Polling
    }

    /// Number of ticks that have started a fetch.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Block until the poller stops on its own or `timeout` elapses.
    ///
    /// Returns `true` if the poller is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_polling() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        true
    }

    /// Stop polling. Safe to call any number of times.
    ///
    /// Fetches still in flight are left to finish on their own; their results
    /// are discarded.
    pub fn cancel(&mut self) {
        let was_polling = {
            let _cache = self.latest.as_ref().map(lock);
            self.active.swap(false, Ordering::SeqCst)
        };

        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        // The worker only ever waits on the stop channel, so this returns promptly.
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            record_panic("poll worker");
        }

        if was_polling {
            activity::record(
                ActivityKind::PollerCancelled,
                "polling cancelled",
                Some(format!("ticks={}", self.ticks())),
            );
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
