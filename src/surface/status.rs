//! Persistent status line shown while the tracker is active.
//!
//! This module handles:
//! - Generating the status text (e.g., "⏱ 計測中 00:15:30")
//! - Delivering updates from the tracker task to a dedicated writer thread
//! - Mirroring the latest line into a status file for shell prompts and bars
//!
//! The tracker runs inside tokio; the writer owns blocking file I/O on its own
//! thread and is fed through a crossbeam channel.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::types::{format_time, TimerState};

// ============================================================================
// Constants
// ============================================================================

/// Marker while counting
const RUNNING_MARKER: &str = "⏱";

/// Marker while paused
const PAUSED_MARKER: &str = "⏸";

/// Marker while stopped
const STOPPED_MARKER: &str = "⏹";

// ============================================================================
// StatusLine
// ============================================================================

/// Text rendered on the status surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Tracker state the line describes
    pub state: TimerState,
    /// Elapsed time formatted as `HH:MM:SS`
    pub text: String,
}

impl StatusLine {
    /// Builds the line for a state and elapsed time.
    pub fn for_state(state: TimerState, elapsed_ms: u64) -> Self {
        Self {
            state,
            text: format_time(elapsed_ms),
        }
    }

    /// Returns the human-readable title.
    pub fn title(&self) -> &'static str {
        match self.state {
            TimerState::Running => "計測中",
            TimerState::Paused => "一時停止中",
            TimerState::Stopped => "停止中",
        }
    }

    /// Returns the marker glyph for the state.
    pub fn marker(&self) -> &'static str {
        match self.state {
            TimerState::Running => RUNNING_MARKER,
            TimerState::Paused => PAUSED_MARKER,
            TimerState::Stopped => STOPPED_MARKER,
        }
    }

    /// Renders the single-line form, e.g. `⏱ 計測中 00:15:30`.
    pub fn render(&self) -> String {
        format!("{} {} {}", self.marker(), self.title(), self.text)
    }
}

// ============================================================================
// StatusSurface
// ============================================================================

/// Sink for status line updates.
///
/// Implementations must not block and must not fail loudly: a lost update is
/// replaced by the next tick.
pub trait StatusSurface: Send + Sync {
    /// Shows or refreshes the status line.
    fn show(&self, line: &StatusLine);

    /// Removes the status line.
    fn clear(&self);
}

/// Messages sent to the status writer thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// Show a line
    Show(StatusLine),
    /// Remove the line
    Clear,
    /// Stop the writer thread
    Shutdown,
}

// ============================================================================
// ChannelStatusSurface
// ============================================================================

/// Status surface that forwards updates over a crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelStatusSurface {
    tx: Sender<StatusUpdate>,
}

impl ChannelStatusSurface {
    /// Creates a surface sending into `tx`.
    pub fn new(tx: Sender<StatusUpdate>) -> Self {
        Self { tx }
    }

    /// Asks the receiving thread to exit.
    pub fn shutdown(&self) {
        self.send(StatusUpdate::Shutdown);
    }

    fn send(&self, update: StatusUpdate) {
        if self.tx.send(update).is_err() {
            tracing::debug!("Status writer is gone; dropping update");
        }
    }
}

impl StatusSurface for ChannelStatusSurface {
    fn show(&self, line: &StatusLine) {
        self.send(StatusUpdate::Show(line.clone()));
    }

    fn clear(&self) {
        self.send(StatusUpdate::Clear);
    }
}

// ============================================================================
// StatusFileWriter
// ============================================================================

/// Writes the latest status line to a file on a dedicated thread.
pub struct StatusFileWriter {
    path: PathBuf,
    rx: Receiver<StatusUpdate>,
    last_rendered: Option<String>,
}

impl StatusFileWriter {
    /// Spawns the writer thread for `path`.
    ///
    /// Returns the surface to hand to the tracker and the thread handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(path: impl Into<PathBuf>) -> io::Result<(ChannelStatusSurface, JoinHandle<()>)> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let writer = Self {
            path: path.into(),
            rx,
            last_rendered: None,
        };
        let handle = thread::Builder::new()
            .name("status-writer".to_string())
            .spawn(move || writer.run())?;
        Ok((ChannelStatusSurface::new(tx), handle))
    }

    fn run(mut self) {
        tracing::debug!(path = ?self.path, "Status writer started");
        while let Ok(update) = self.rx.recv() {
            match update {
                StatusUpdate::Show(line) => self.write_line(&line),
                StatusUpdate::Clear => self.remove(),
                StatusUpdate::Shutdown => break,
            }
        }
        tracing::debug!("Status writer stopped");
    }

    fn write_line(&mut self, line: &StatusLine) {
        let rendered = line.render();
        if self.last_rendered.as_deref() == Some(rendered.as_str()) {
            return;
        }
        match write_atomic(&self.path, &rendered) {
            Ok(()) => self.last_rendered = Some(rendered),
            Err(e) => tracing::warn!(path = ?self.path, "Failed to write status line: {}", e),
        }
    }

    fn remove(&mut self) {
        self.last_rendered = None;
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = ?self.path, "Failed to remove status line: {}", e);
            }
        }
    }
}

fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, format!("{}\n", contents))?;
    fs::rename(&tmp, path)
}

// ============================================================================
// MockStatusSurface
// ============================================================================

/// Status surface that records every update, for tests.
#[derive(Debug, Clone, Default)]
pub struct MockStatusSurface {
    history: Arc<Mutex<Vec<StatusUpdate>>>,
}

impl MockStatusSurface {
    /// Creates an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded update.
    pub fn history(&self) -> Vec<StatusUpdate> {
        self.history.lock().unwrap().clone()
    }

    /// Returns the most recently shown line, if the surface is not cleared.
    pub fn current(&self) -> Option<StatusLine> {
        match self.history.lock().unwrap().last() {
            Some(StatusUpdate::Show(line)) => Some(line.clone()),
            _ => None,
        }
    }
}

impl StatusSurface for MockStatusSurface {
    fn show(&self, line: &StatusLine) {
        self.history
            .lock()
            .unwrap()
            .push(StatusUpdate::Show(line.clone()));
    }

    fn clear(&self) {
        self.history.lock().unwrap().push(StatusUpdate::Clear);
    }
}

// ============================================================================
// Tests
// ============================================================================
