//! Change Scheduler Module
//!
//! Coalesces bursts of filter mutations into one notification using two
//! timers:
//! - the quiet-period timer, re-armed on every mutation (`debounce`);
//! - the max-wait timer, armed once by the first mutation of a burst and
//!   left alone until the burst ends (`batch_timeout`).
//!
//! Whichever fires first ends the burst and disarms both.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

// == Timer Slot ==
/// One-shot timer backed by a tokio task.
///
/// Re-arming cancels the previous timer.
#[derive(Debug, Default)]
pub struct TimerSlot {
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `callback` after `delay` unless cancelled first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&mut self, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

// == Fire Token ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Quiet,
    MaxWait,
}

/// Identifies the timer arming that produced a wake-up.
///
/// A timer task can wake up after it has been cancelled or superseded; its
/// token then no longer matches and the wake-up is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireToken {
    pub kind: TimerKind,
    burst: u64,
    arming: u64,
}

/// Receives timer wake-ups.
pub type FireHandler = Arc<dyn Fn(FireToken) + Send + Sync>;

// == Change Scheduler ==
/// Two-timer state machine: Idle or Pending.
pub struct ChangeScheduler {
    debounce: Duration,
    batch_timeout: Duration,
    quiet: TimerSlot,
    max_wait: TimerSlot,
    pending: bool,
    /// Bumped whenever a burst ends
    burst: u64,
    /// Bumped on every quiet-period arming
    arming: u64,
    on_fire: FireHandler,
}

impl ChangeScheduler {
    /// # Arguments
    /// * `debounce` - Quiet period after the last mutation
    /// * `batch_timeout` - Upper bound from the first mutation of a burst
    /// * `on_fire` - Called from the timer task with the token of the timer
    ///   that woke up; pass it back to [`ChangeScheduler::begin_fire`]
    pub fn new(debounce: Duration, batch_timeout: Duration, on_fire: FireHandler) -> Self {
        Self {
            debounce,
            batch_timeout,
            quiet: TimerSlot::new(),
            max_wait: TimerSlot::new(),
            pending: false,
            burst: 0,
            arming: 0,
            on_fire,
        }
    }

    // == Schedule ==
    /// Records a mutation.
    ///
    /// Idle -> Pending arms both timers; Pending -> Pending re-arms only the
    /// quiet-period timer.
    pub fn schedule(&mut self) {
        self.arming += 1;
        let token = FireToken {
            kind: TimerKind::Quiet,
            burst: self.burst,
            arming: self.arming,
        };
        let on_fire = Arc::clone(&self.on_fire);
        self.quiet.arm(self.debounce, move || on_fire(token));

        if !self.pending {
            self.pending = true;
            let token = FireToken {
                kind: TimerKind::MaxWait,
                burst: self.burst,
                arming: 0,
            };
            let on_fire = Arc::clone(&self.on_fire);
            self.max_wait.arm(self.batch_timeout, move || on_fire(token));
            trace!(burst = self.burst, "Filter burst started");
        }
    }

    // == Begin Fire ==
    /// Validates a wake-up and, if it is current, returns to Idle.
    ///
    /// Returns false for wake-ups from cancelled or superseded timers.
    pub fn begin_fire(&mut self, token: FireToken) -> bool {
        if !self.pending || token.burst != self.burst {
            return false;
        }
        if token.kind == TimerKind::Quiet && token.arming != self.arming {
            return false;
        }
        trace!(burst = self.burst, kind = ?token.kind, "Filter burst ended");
        self.disarm();
        true
    }

    /// Cancels both timers and returns to Idle.
    pub fn disarm(&mut self) {
        self.quiet.cancel();
        self.max_wait.cancel();
        if self.pending {
            self.pending = false;
            self.burst += 1;
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn timers_armed(&self) -> bool {
        self.quiet.is_armed() || self.max_wait.is_armed()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn batch_timeout(&self) -> Duration {
        self.batch_timeout
    }
}

impl std::fmt::Debug for ChangeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeScheduler")
            .field("debounce", &self.debounce)
            .field("batch_timeout", &self.batch_timeout)
            .field("pending", &self.pending)
            .field("burst", &self.burst)
            .finish_non_exhaustive()
    }
}
