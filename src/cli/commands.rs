//! Command definitions for the stopwatch CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};

use crate::types::HOME_ENV;

// ============================================================================
// CLI Structure
// ============================================================================

/// Stopwatch CLI
#[derive(Parser, Debug)]
#[command(
    name = "stopwatch",
    version,
    about = "常駐型ストップウォッチCLI",
    long_about = "バックグラウンドのデーモンが経過時間を計測し、\n\
                  ターミナルのパネルやフローティング表示で確認・操作できます。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for the socket, preferences and status file
    #[arg(long, global = true, env = HOME_ENV, value_name = "DIR")]
    pub home: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the stopwatch
    Start,

    /// Pause the stopwatch
    Pause,

    /// Resume a paused stopwatch
    Resume,

    /// Stop and reset the stopwatch
    Stop,

    /// Show the elapsed time
    Status,

    /// Open the main panel with start/pause/stop controls
    Watch,

    /// Show the floating overlay
    Overlay(OverlayArgs),

    /// Show or change preferences
    Prefs {
        #[command(subcommand)]
        action: Option<PrefsAction>,
    },

    /// Run as daemon (background service)
    #[command(hide = true)]
    Daemon {
        /// Apply the auto-start preferences (used by the LaunchAgent)
        #[arg(long)]
        boot: bool,
    },

    /// Install LaunchAgent for auto-start on login
    Install,

    /// Uninstall LaunchAgent
    Uninstall,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Arguments for the overlay command
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayArgs {
    /// Column to draw at (saved for next time)
    #[arg(long, requires = "y", allow_negative_numbers = true)]
    pub x: Option<i64>,

    /// Row to draw at (saved for next time)
    #[arg(long, requires = "x", allow_negative_numbers = true)]
    pub y: Option<i64>,
}

impl OverlayArgs {
    /// Returns the requested position, if both coordinates were given.
    pub fn position(&self) -> Option<(i64, i64)> {
        self.x.zip(self.y)
    }
}

/// Preference subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum PrefsAction {
    /// Show all preferences
    Show,

    /// Start the timer when a surface opens or the daemon boots
    AutoStart {
        #[arg(action = clap::ArgAction::Set, value_parser = BoolishValueParser::new())]
        enabled: bool,
    },

    /// Open the overlay instead of the panel when auto-starting
    AutoMinimize {
        #[arg(action = clap::ArgAction::Set, value_parser = BoolishValueParser::new())]
        enabled: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================
