//! Named, cancellable debounce timers.
//!
//! The session never sleeps. Edits arm timers with a deadline; the host calls
//! [`EditorSession::tick`](crate::EditorSession::tick) whenever convenient and the session runs
//! whatever [`Scheduler::take_due`] hands back. Re-arming a timer replaces its deadline, which is
//! what coalesces bursts of keystrokes into one snapshot or one reflow.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::block::BlockId;

/// Source of the current time.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests and deterministic replays.
///
/// Clones share the same time, so a test can keep a handle while the session owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    elapsed_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// A clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            elapsed_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Move time forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

/// Timer names. Each kind has at most one pending deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    /// Commit the staged history snapshot of a typing burst.
    Snapshot,
    /// Reflow pages after content changed.
    Reflow,
}

/// A pending timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    /// Timer name.
    pub kind: TimerKind,
    /// When it fires.
    pub deadline: Instant,
    /// Block whose edit armed the timer, if any.
    pub key: Option<BlockId>,
}

/// Debounce scheduler.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    timers: BTreeMap<TimerKind, Timer>,
}

impl Scheduler {
    /// No pending timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) a timer for `delay` after `now`.
    pub fn schedule(&mut self, kind: TimerKind, now: Instant, delay: Duration, key: Option<BlockId>) {
        let deadline = now + delay;
        trace!(?kind, ?delay, "timer armed");
        self.timers.insert(
            kind,
            Timer {
                kind,
                deadline,
                key,
            },
        );
    }

    /// Cancel a timer, returning it if it was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> Option<Timer> {
        self.timers.remove(&kind)
    }

    /// Cancel everything.
    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    /// Whether a timer is pending.
    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.timers.contains_key(&kind)
    }

    /// Deadline of a pending timer.
    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.timers.get(&kind).map(|t| t.deadline)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.deadline).min()
    }

    /// Remove and return every timer whose deadline has passed, earliest first. Snapshots sort
    /// ahead of reflows at equal deadlines.
    pub fn take_due(&mut self, now: Instant) -> Vec<Timer> {
        let due: Vec<TimerKind> = self
            .timers
            .values()
            .filter(|t| t.deadline <= now)
            .map(|t| t.kind)
            .collect();
        let mut fired: Vec<Timer> = due
            .into_iter()
            .filter_map(|kind| self.timers.remove(&kind))
            .collect();
        fired.sort_by_key(|t| (t.deadline, t.kind));
        fired
    }

    /// Remove and return every timer regardless of deadline.
    pub fn take_all(&mut self) -> Vec<Timer> {
        let mut fired: Vec<Timer> = std::mem::take(&mut self.timers).into_values().collect();
        fired.sort_by_key(|t| (t.deadline, t.kind));
        fired
    }
}
