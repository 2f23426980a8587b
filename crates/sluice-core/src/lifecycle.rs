//! Reference-counted usage tracking with idle eviction.
//!
//! Every public engine operation holds a [`UsageGuard`] for its duration.
//! When the last guard is dropped a one-shot idle timer is armed; if no new
//! usage begins before it expires, the registered idle callback runs exactly
//! once. The counter and the timer slot live behind a single mutex so that
//! arming, cancelling and expiring are atomic with respect to counter
//! transitions.

use std::{
    fmt,
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    thread,
    time::Duration,
};

use jiff::Timestamp;
use log::{debug, warn};

use crate::error::{Result, SluiceError};

/// Callback invoked when an instance has been idle for the full timeout.
pub type IdleCallback = Box<dyn Fn() + Send + Sync>;

/// An armed one-shot timer. Dropping it cancels the pending expiry: the
/// timer thread observes the disconnected channel and exits.
struct IdleTimer {
    _cancel: mpsc::Sender<()>,
}

struct UsageState {
    count: usize,
    idle_since: Option<Timestamp>,
    timer: Option<IdleTimer>,
    /// Bumped on every arm so a stale expiry can recognise itself.
    generation: u64,
    disposed: bool,
}

/// Usage counter and idle-eviction timer of one engine instance.
pub struct UsageTracker {
    state: Mutex<UsageState>,
    idle_timeout: Duration,
    on_idle: Option<IdleCallback>,
}

impl fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageTracker")
            .field("usage_count", &self.usage_count())
            .field("idle_timeout", &self.idle_timeout)
            .field("timer_armed", &self.is_idle_timer_armed())
            .finish()
    }
}

impl UsageTracker {
    /// Creates a tracker with no active usage. The idle timer is armed
    /// immediately, so an instance that is never used is still reclaimed.
    pub fn new(idle_timeout: Duration, on_idle: Option<IdleCallback>) -> Arc<Self> {
        let tracker = Arc::new(Self {
            state: Mutex::new(UsageState {
                count: 0,
                idle_since: Some(Timestamp::now()),
                timer: None,
                generation: 0,
                disposed: false,
            }),
            idle_timeout,
            on_idle,
        });

        {
            let mut state = tracker.lock_state();
            tracker.arm(&mut state);
        }
        tracker
    }

    fn lock_state(&self) -> MutexGuard<'_, UsageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts one logical usage, cancelling any pending idle expiry.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::Disposed` once the instance has been torn down.
    pub fn begin_usage(self: &Arc<Self>) -> Result<UsageGuard> {
        let mut state = self.lock_state();
        if state.disposed {
            return Err(SluiceError::Disposed);
        }

        if state.timer.take().is_some() {
            debug!("idle timer cancelled");
        }
        state.count += 1;
        state.idle_since = None;

        Ok(UsageGuard {
            tracker: Arc::clone(self),
        })
    }

    fn end_usage(self: &Arc<Self>) {
        let mut state = self.lock_state();
        if state.disposed {
            return;
        }

        state.count = state.count.saturating_sub(1);
        if state.count == 0 {
            state.idle_since = Some(Timestamp::now());
            self.arm(&mut state);
        }
    }

    /// Replaces any armed timer with a fresh one. Caller holds the lock.
    fn arm(self: &Arc<Self>, state: &mut UsageState) {
        state.timer = None;
        state.generation += 1;

        let generation = state.generation;
        let tracker: Weak<Self> = Arc::downgrade(self);
        let delay = self.idle_timeout;
        let (cancel, cancelled) = mpsc::channel::<()>();

        let spawned = thread::Builder::new()
            .name("sluice-idle-timer".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(delay) {
                    if let Some(tracker) = tracker.upgrade() {
                        tracker.expire(generation);
                    }
                }
            });

        match spawned {
            Ok(_) => {
                debug!("idle timer armed for {delay:?}");
                state.timer = Some(IdleTimer { _cancel: cancel });
            }
            Err(e) => warn!("Failed to start idle timer, instance will not be evicted: {e}"),
        }
    }

    fn expire(&self, generation: u64) {
        let fire = {
            let mut state = self.lock_state();
            let current = !state.disposed
                && state.count == 0
                && state.generation == generation
                && state.timer.is_some();
            if current {
                state.timer = None;
            }
            current
        };

        if fire {
            debug!("idle timeout of {:?} expired", self.idle_timeout);
            if let Some(on_idle) = &self.on_idle {
                on_idle();
            }
        }
    }

    /// Cancels the idle timer and resets the counter. Safe to call more than
    /// once and while an expiry is in flight.
    pub fn dispose(&self) {
        let mut state = self.lock_state();
        state.disposed = true;
        state.count = 0;
        state.timer = None;
        state.idle_since = None;
    }

    pub fn usage_count(&self) -> usize {
        self.lock_state().count
    }

    pub fn is_idle_timer_armed(&self) -> bool {
        self.lock_state().timer.is_some()
    }

    /// When the counter last dropped to zero, or `None` while in use.
    pub fn idle_since(&self) -> Option<Timestamp> {
        self.lock_state().idle_since
    }

    pub fn is_disposed(&self) -> bool {
        self.lock_state().disposed
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
}

/// Scoped usage of an engine instance; ends the usage when dropped.
#[must_use = "usage ends as soon as the guard is dropped"]
pub struct UsageGuard {
    tracker: Arc<UsageTracker>,
}

impl fmt::Debug for UsageGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageGuard").finish_non_exhaustive()
    }
}

impl Drop for UsageGuard {
    fn drop(&mut self) {
        self.tracker.end_usage();
    }
}
