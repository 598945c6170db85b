//! Core data types for the stopwatch.
//!
//! This module defines the data structures used for:
//! - Tracker state and elapsed-time formatting
//! - Time updates broadcast to display surfaces
//! - IPC request/response serialization
//! - Runtime path resolution

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ============================================================================
// TimerState
// ============================================================================

/// Run state of the elapsed-time tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Timer is stopped and reset to zero
    #[default]
    Stopped,
    /// Timer is counting
    Running,
    /// Timer is frozen at its current elapsed time
    Paused,
}

impl TimerState {
    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Stopped => "stopped",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
        }
    }

    /// Returns true if the timer is counting.
    pub fn is_running(&self) -> bool {
        matches!(self, TimerState::Running)
    }
}

// ============================================================================
// Time formatting
// ============================================================================

const MILLIS_PER_HOUR: u64 = 3_600_000;
const MILLIS_PER_MINUTE: u64 = 60_000;
const MILLIS_PER_SECOND: u64 = 1_000;

/// Formats elapsed milliseconds as `HH:MM:SS`.
///
/// Every field is floor-divided and zero-padded to two digits. Hours are not
/// wrapped at 24, so long sessions render as `100:00:00` and beyond.
///
/// ```
/// use stopwatch::types::format_time;
///
/// assert_eq!(format_time(0), "00:00:00");
/// assert_eq!(format_time(3_723_999), "01:02:03");
/// ```
pub fn format_time(elapsed_ms: u64) -> String {
    let hours = elapsed_ms / MILLIS_PER_HOUR;
    let minutes = (elapsed_ms % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    let seconds = (elapsed_ms % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

// ============================================================================
// TimeUpdate
// ============================================================================

/// A time update broadcast by the tracker to every subscribed surface.
///
/// `is_running` is only present on updates triggered by start, stop and
/// status requests. Routine cadence ticks leave it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUpdate {
    /// Elapsed time in milliseconds
    pub time: u64,
    /// Whether the tracker is running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
}

impl TimeUpdate {
    /// Creates a routine cadence update.
    pub fn tick(time: u64) -> Self {
        Self {
            time,
            is_running: None,
        }
    }

    /// Creates an update that also carries the run state.
    pub fn with_state(time: u64, is_running: bool) -> Self {
        Self {
            time,
            is_running: Some(is_running),
        }
    }
}

// ============================================================================
// StatusSnapshot
// ============================================================================

/// Point-in-time view of the tracker returned by every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Current run state
    pub state: TimerState,
    /// Elapsed time in milliseconds
    pub elapsed_ms: u64,
}

impl StatusSnapshot {
    /// Returns true if the tracker is counting.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from a client to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Begin counting (idempotent while running)
    Start,
    /// Freeze the elapsed time
    Pause,
    /// Continue counting from the frozen elapsed time
    Resume,
    /// Reset to zero
    Stop,
    /// Emit and return the current status
    GetStatus,
    /// Stream time updates until the connection closes
    Subscribe,
}

impl IpcRequest {
    /// Returns the action name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            IpcRequest::Start => "start",
            IpcRequest::Pause => "pause",
            IpcRequest::Resume => "resume",
            IpcRequest::Stop => "stop",
            IpcRequest::GetStatus => "get_status",
            IpcRequest::Subscribe => "subscribe",
        }
    }
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    /// Current state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Elapsed milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    /// Whether the tracker is running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_running: Option<bool>,
}

impl ResponseData {
    /// Creates response data from a tracker snapshot.
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        Self {
            state: Some(snapshot.state.as_str().to_string()),
            elapsed_ms: Some(snapshot.elapsed_ms),
            is_running: Some(snapshot.is_running()),
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for a success response.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// AppPaths
// ============================================================================

/// Environment variable that relocates every runtime file.
pub const HOME_ENV: &str = "STOPWATCH_HOME";

/// Directory under the user's home used when no override is given.
const DEFAULT_DIR_NAME: &str = ".stopwatch";

/// Filesystem locations used by the daemon and the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// Uses `root` as the base directory for all runtime files.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the base directory from an explicit override or `~/.stopwatch`.
    ///
    /// Returns `None` if no override is given and the home directory cannot
    /// be determined.
    pub fn resolve(home_override: Option<&Path>) -> Option<Self> {
        match home_override {
            Some(root) => Some(Self::new(root)),
            None => dirs::home_dir().map(|home| Self::new(home.join(DEFAULT_DIR_NAME))),
        }
    }

    /// Base directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Unix socket the daemon listens on.
    pub fn socket_path(&self) -> PathBuf {
        self.root.join("stopwatch.sock")
    }

    /// Directory holding one file per preference key.
    pub fn prefs_dir(&self) -> PathBuf {
        self.root.join("prefs")
    }

    /// File mirroring the status line.
    pub fn status_file(&self) -> PathBuf {
        self.root.join("status")
    }

    /// Directory for LaunchAgent stdout/stderr logs.
    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

// ============================================================================
// Tests
// ============================================================================
