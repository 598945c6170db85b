//! Daemon module for the stopwatch.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Elapsed-time engine with state transitions
//! - `service`: Task owning the engine, its cadence and command queue
//! - `ipc`: Unix socket server and request handling
//! - `boot`: Auto-start applied when launched at login
//! - `runner`: Composition of the above into a running daemon

pub mod boot;
pub mod ipc;
pub mod runner;
pub mod service;
pub mod timer;

pub use boot::apply_boot_plan;
pub use ipc::{IpcError, IpcServer, RequestHandler};
pub use runner::run_daemon;
pub use service::{Command, TrackerError, TrackerHandle, TrackerService};
pub use timer::{TimerEngine, TICK_INTERVAL};
