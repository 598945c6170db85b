//! Tracker service: the single task that owns the [`TimerEngine`].
//!
//! Commands arrive over an mpsc channel and are answered through a oneshot,
//! so commands and cadence ticks never interleave. The cadence interval only
//! exists while the engine is running.

use std::future;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::prefs::{PrefKey, PreferenceStore};
use crate::types::{StatusSnapshot, TimeUpdate};

use super::timer::{TimerEngine, TICK_INTERVAL};

/// Commands queued before senders start waiting.
const COMMAND_CHANNEL_CAPACITY: usize = 32;

// ============================================================================
// Command
// ============================================================================

/// Commands accepted by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
    GetStatus,
}

enum Message {
    Command {
        command: Command,
        reply: oneshot::Sender<StatusSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<Option<u64>>,
    },
}

/// Errors returned by [`TrackerHandle`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    /// The tracker task has exited
    #[error("Tracker is no longer running")]
    Unavailable,
}

// ============================================================================
// TrackerHandle
// ============================================================================

/// Cloneable reference to the tracker task.
#[derive(Clone)]
pub struct TrackerHandle {
    tx: mpsc::Sender<Message>,
    updates: broadcast::Sender<TimeUpdate>,
}

impl TrackerHandle {
    /// Sends a command and waits for the resulting snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Unavailable`] if the tracker has shut down.
    pub async fn send(&self, command: Command) -> Result<StatusSnapshot, TrackerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Command { command, reply })
            .await
            .map_err(|_| TrackerError::Unavailable)?;
        rx.await.map_err(|_| TrackerError::Unavailable)
    }

    pub async fn start(&self) -> Result<StatusSnapshot, TrackerError> {
        self.send(Command::Start).await
    }

    pub async fn pause(&self) -> Result<StatusSnapshot, TrackerError> {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<StatusSnapshot, TrackerError> {
        self.send(Command::Resume).await
    }

    pub async fn stop(&self) -> Result<StatusSnapshot, TrackerError> {
        self.send(Command::Stop).await
    }

    pub async fn status(&self) -> Result<StatusSnapshot, TrackerError> {
        self.send(Command::GetStatus).await
    }

    /// Tears the tracker down and waits for it to finish.
    ///
    /// Returns the elapsed time recorded if the timer was still running.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Unavailable`] if the tracker already exited.
    pub async fn shutdown(&self) -> Result<Option<u64>, TrackerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Shutdown { reply })
            .await
            .map_err(|_| TrackerError::Unavailable)?;
        rx.await.map_err(|_| TrackerError::Unavailable)
    }

    /// Subscribes to time updates. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<TimeUpdate> {
        self.updates.subscribe()
    }
}

// ============================================================================
// TrackerService
// ============================================================================

/// Owns the engine and its cadence.
pub struct TrackerService {
    engine: TimerEngine,
    rx: mpsc::Receiver<Message>,
    cadence: Option<Interval>,
    prefs: Option<PreferenceStore>,
}

impl TrackerService {
    /// Wraps `engine` in a service. `prefs` receives `last_elapsed_time` on
    /// teardown.
    pub fn new(engine: TimerEngine, prefs: Option<PreferenceStore>) -> (Self, TrackerHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let handle = TrackerHandle {
            tx,
            updates: engine.update_sender(),
        };
        let service = Self {
            engine,
            rx,
            cadence: None,
            prefs,
        };
        (service, handle)
    }

    /// Runs until shut down or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::debug!("Tracker service started");

        let shutdown_reply = loop {
            tokio::select! {
                message = self.rx.recv() => match message {
                    Some(Message::Command { command, reply }) => {
                        let snapshot = self.dispatch(command);
                        // The requester may have given up waiting.
                        let _ = reply.send(snapshot);
                    }
                    Some(Message::Shutdown { reply }) => break Some(reply),
                    None => break None,
                },
                _ = next_tick(&mut self.cadence) => {
                    self.engine.tick();
                }
            }
        };

        let persisted = self.teardown();
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(persisted);
        }
        tracing::debug!("Tracker service stopped");
    }

    fn dispatch(&mut self, command: Command) -> StatusSnapshot {
        tracing::debug!(?command, "Tracker command");
        let snapshot = match command {
            Command::Start => self.engine.start(),
            Command::Pause => self.engine.pause(),
            Command::Resume => self.engine.resume(),
            Command::Stop => self.engine.stop(),
            Command::GetStatus => self.engine.status(),
        };
        self.sync_cadence();
        snapshot
    }

    /// Creates the cadence on entering `Running` and drops it on leaving.
    fn sync_cadence(&mut self) {
        match (self.engine.state().is_running(), self.cadence.is_some()) {
            (true, false) => {
                let mut interval = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.cadence = Some(interval);
            }
            (false, true) => self.cadence = None,
            _ => {}
        }
    }

    fn teardown(&mut self) -> Option<u64> {
        self.cadence = None;
        let persisted = self.engine.teardown();

        if let (Some(elapsed), Some(prefs)) = (persisted, &self.prefs) {
            let value = i64::try_from(elapsed).unwrap_or(i64::MAX);
            match prefs.set_int(PrefKey::LastElapsedTime, value) {
                Ok(()) => tracing::info!(elapsed_ms = elapsed, "Saved last elapsed time"),
                Err(e) => tracing::warn!("Failed to save last elapsed time: {}", e),
            }
        }
        persisted
    }
}

async fn next_tick(cadence: &mut Option<Interval>) {
    match cadence {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
