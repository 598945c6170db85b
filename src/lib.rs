//! Stopwatch Library
//!
//! This library provides the core functionality for the stopwatch CLI.
//! It includes:
//! - Elapsed-time tracker run by the daemon
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities
//! - Display surfaces: status line, main panel and floating overlay
//! - File-backed preferences shared by every process
//! - LaunchAgent management for auto-start at login (macOS only)

pub mod cli;
pub mod daemon;
pub mod launchagent;
pub mod prefs;
pub mod surface;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    format_time, AppPaths, IpcRequest, IpcResponse, ResponseData, StatusSnapshot, TimeUpdate,
    TimerState,
};

pub use daemon::{TimerEngine, TrackerError, TrackerHandle, TrackerService};

pub use prefs::{PrefKey, PreferenceStore, Preferences, PrefsError};

pub use surface::{FloatingOverlay, LaunchPlan, PanelState, StatusLine, StatusSurface};

pub use launchagent::{LaunchAgentError, StopwatchLaunchAgent};
