//! Elapsed-time tracker for the stopwatch.
//!
//! This module provides the core timer functionality:
//! - State transitions (Stopped → Running ⇄ Paused → Stopped)
//! - Elapsed time recomputed from a start reference on every tick
//! - Time updates broadcast to every subscribed surface
//! - Status line refresh
//!
//! The engine is synchronous and never schedules anything itself. The
//! cadence that drives [`TimerEngine::tick`] lives in
//! [`TrackerService`](super::service::TrackerService).

use tokio::sync::broadcast;
use tokio::time::{Duration, Instant};

use crate::surface::{StatusLine, StatusSurface};
use crate::types::{StatusSnapshot, TimeUpdate, TimerState};

// ============================================================================
// Constants
// ============================================================================

/// Interval between cadence ticks while running.
pub const TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Updates buffered per subscriber before a slow one starts skipping.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// TimerEngine
// ============================================================================

/// Tracks elapsed time across start/pause/resume/stop.
///
/// While running, elapsed time is always `now - start_reference`. Entering
/// the running state sets `start_reference = now - elapsed`, so paused
/// intervals are excluded without any accumulation.
pub struct TimerEngine {
    /// Current run state
    state: TimerState,
    /// Elapsed time as of the last tick or transition
    elapsed_ms: u64,
    /// Instant the current run is measured from
    start_reference: Instant,
    /// Broadcast channel for time updates
    updates: broadcast::Sender<TimeUpdate>,
    /// Persistent status line
    status: Box<dyn StatusSurface>,
}

impl TimerEngine {
    /// Creates a stopped engine reporting to `status`.
    pub fn new(status: Box<dyn StatusSurface>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: TimerState::Stopped,
            elapsed_ms: 0,
            start_reference: Instant::now(),
            updates,
            status,
        }
    }

    /// Subscribes to time updates. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<TimeUpdate> {
        self.updates.subscribe()
    }

    /// Returns a sender that can hand out further subscriptions.
    pub fn update_sender(&self) -> broadcast::Sender<TimeUpdate> {
        self.updates.clone()
    }

    /// Returns the current run state.
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Returns the elapsed time right now, without mutating anything.
    pub fn current_elapsed(&self) -> u64 {
        if self.state.is_running() {
            millis(Instant::now().saturating_duration_since(self.start_reference))
        } else {
            self.elapsed_ms
        }
    }

    /// Returns a snapshot of the current state.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state,
            elapsed_ms: self.current_elapsed(),
        }
    }

    /// Starts counting. Does nothing to the clock if already running.
    pub fn start(&mut self) -> StatusSnapshot {
        if self.enter_running() {
            tracing::info!(elapsed_ms = self.elapsed_ms, "Timer started");
        } else {
            tracing::debug!("Start ignored, timer already running");
        }
        self.announce_running()
    }

    /// Resumes counting from the frozen elapsed time.
    ///
    /// Behaves exactly like [`start`](Self::start), including from `Stopped`.
    pub fn resume(&mut self) -> StatusSnapshot {
        if self.enter_running() {
            tracing::info!(elapsed_ms = self.elapsed_ms, "Timer resumed");
        }
        self.announce_running()
    }

    /// Freezes the elapsed time. Does nothing unless running.
    pub fn pause(&mut self) -> StatusSnapshot {
        if self.state.is_running() {
            self.elapsed_ms = self.current_elapsed();
            self.state = TimerState::Paused;
            self.refresh_status();
            tracing::info!(elapsed_ms = self.elapsed_ms, "Timer paused");
        }
        self.snapshot()
    }

    /// Resets to zero and emits a final `(0, false)` update.
    pub fn stop(&mut self) -> StatusSnapshot {
        self.state = TimerState::Stopped;
        self.elapsed_ms = 0;
        self.refresh_status();
        self.emit(TimeUpdate::with_state(0, false));
        tracing::info!("Timer stopped");
        self.snapshot()
    }

    /// Emits the current status to every subscriber without changing state.
    pub fn status(&mut self) -> StatusSnapshot {
        let snapshot = self.snapshot();
        self.emit(TimeUpdate::with_state(
            snapshot.elapsed_ms,
            snapshot.is_running(),
        ));
        snapshot
    }

    /// Recomputes the elapsed time and publishes it.
    ///
    /// Returns the new elapsed time, or `None` if not running.
    pub fn tick(&mut self) -> Option<u64> {
        if !self.state.is_running() {
            return None;
        }
        self.elapsed_ms = self.current_elapsed();
        self.emit(TimeUpdate::tick(self.elapsed_ms));
        self.refresh_status();
        Some(self.elapsed_ms)
    }

    /// Prepares for process teardown and clears the status line.
    ///
    /// Returns the elapsed time if the timer was still running, so the
    /// caller can record it.
    pub fn teardown(&mut self) -> Option<u64> {
        self.status.clear();
        if self.state.is_running() {
            self.elapsed_ms = self.current_elapsed();
            Some(self.elapsed_ms)
        } else {
            None
        }
    }

    /// Switches to running. Returns false if already running.
    fn enter_running(&mut self) -> bool {
        if self.state.is_running() {
            return false;
        }
        let now = Instant::now();
        self.start_reference = now
            .checked_sub(Duration::from_millis(self.elapsed_ms))
            .unwrap_or(now);
        self.state = TimerState::Running;
        true
    }

    fn announce_running(&mut self) -> StatusSnapshot {
        let snapshot = self.snapshot();
        self.refresh_status();
        self.emit(TimeUpdate::with_state(snapshot.elapsed_ms, true));
        snapshot
    }

    fn refresh_status(&self) {
        self.status
            .show(&StatusLine::for_state(self.state, self.current_elapsed()));
    }

    fn emit(&self, update: TimeUpdate) {
        // No subscribers is normal; the next tick replaces a lost update.
        if self.updates.send(update).is_err() {
            tracing::trace!(time = update.time, "No subscribers for time update");
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================
