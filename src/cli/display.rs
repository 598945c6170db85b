//! Display utilities for the stopwatch CLI.
//!
//! This module provides formatted output for:
//! - Success messages
//! - Error messages
//! - Status display
//! - Preferences
//! - The live panel line

use std::io::{self, Write};

use crate::prefs::{PrefKey, Preferences};
use crate::surface::{FloatingOverlay, PanelState};
use crate::types::{format_time, IpcResponse};

/// Clears the current terminal line before redrawing it.
const CLEAR_LINE: &str = "\r\x1b[2K";

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows a success message for timer start.
    pub fn show_start_success(response: &IpcResponse) {
        println!("> タイマーを開始しました");
        Self::show_elapsed(response);
    }

    /// Shows a success message for timer pause.
    pub fn show_pause_success(response: &IpcResponse) {
        println!("|| タイマーを一時停止しました");
        Self::show_elapsed(response);
    }

    /// Shows a success message for timer resume.
    pub fn show_resume_success(response: &IpcResponse) {
        println!("> タイマーを再開しました");
        Self::show_elapsed(response);
    }

    /// Shows a success message for timer stop.
    pub fn show_stop_success(_response: &IpcResponse) {
        println!("[] タイマーを停止しました");
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        for line in Self::status_lines(response) {
            println!("{}", line);
        }
    }

    /// Builds the lines printed by [`show_status`](Self::show_status).
    pub fn status_lines(response: &IpcResponse) -> Vec<String> {
        let mut lines = vec![
            "ストップウォッチ ステータス".to_string(),
            "─────────────────────────────".to_string(),
        ];

        match &response.data {
            Some(data) => {
                let state = data.state.as_deref().unwrap_or("unknown");
                lines.push(format!("状態: {}", Self::state_label(state)));
                if let Some(elapsed) = data.elapsed_ms {
                    lines.push(format!("経過時間: {}", format_time(elapsed)));
                }
            }
            None => lines.push("タイマーは起動していません".to_string()),
        }
        lines
    }

    /// Shows all preferences with their effective values.
    pub fn show_preferences(prefs: &Preferences) {
        for line in Self::preference_lines(prefs) {
            println!("{}", line);
        }
    }

    /// Builds the lines printed by [`show_preferences`](Self::show_preferences).
    pub fn preference_lines(prefs: &Preferences) -> Vec<String> {
        let (x, y) = prefs.window_position();
        let last = prefs
            .last_elapsed_time()
            .and_then(|ms| u64::try_from(ms).ok())
            .map(format_time)
            .unwrap_or_else(|| "-".to_string());

        vec![
            format!("{}: {}", PrefKey::AutoStartTimer.as_str(), prefs.auto_start_timer()),
            format!("{}: {}", PrefKey::AutoMinimize.as_str(), prefs.auto_minimize()),
            format!("{}: {}", PrefKey::WindowX.as_str(), x),
            format!("{}: {}", PrefKey::WindowY.as_str(), y),
            format!("{}: {}", PrefKey::LastElapsedTime.as_str(), last),
            format!("{}: {}", PrefKey::FirstRun.as_str(), prefs.first_run()),
        ]
    }

    /// Shows that a preference was changed.
    pub fn show_preference_updated(key: PrefKey, value: bool) {
        println!("* {} を {} に設定しました", key.as_str(), value);
    }

    /// Shows the welcome message on the first panel launch.
    pub fn show_first_run() {
        println!("ようこそ! s: 開始  p: 一時停止/再開  x: 停止  m: 最小化  q: 終了 (入力後 Enter)");
    }

    /// Redraws the panel in place.
    pub fn draw_panel(panel: &PanelState) {
        Self::draw(&format!("{}{}", CLEAR_LINE, panel.render()));
    }

    /// Redraws the overlay at its position.
    pub fn draw_overlay(overlay: &FloatingOverlay) {
        Self::draw(&overlay.render());
    }

    /// Ends the live line so the shell prompt starts on a fresh line.
    pub fn finish_live_line() {
        println!();
    }

    /// Shows the result of LaunchAgent installation.
    pub fn show_install_success(replaced: bool) {
        for line in Self::install_lines(replaced) {
            println!("{}", line);
        }
    }

    /// Builds the lines printed by [`show_install_success`](Self::show_install_success).
    pub fn install_lines(replaced: bool) -> Vec<String> {
        let headline = if replaced {
            "* LaunchAgentを再インストールしました"
        } else {
            "* LaunchAgentをインストールしました"
        };
        vec![
            headline.to_string(),
            "  次回ログイン時から自動的に起動します".to_string(),
        ]
    }

    /// Shows the result of LaunchAgent uninstallation.
    pub fn show_uninstall_success(removed: bool) {
        for line in Self::uninstall_lines(removed) {
            println!("{}", line);
        }
    }

    /// Builds the lines printed by [`show_uninstall_success`](Self::show_uninstall_success).
    pub fn uninstall_lines(removed: bool) -> Vec<String> {
        if removed {
            vec![
                "* LaunchAgentをアンインストールしました".to_string(),
                "  次回ログイン時から自動起動しなくなります".to_string(),
            ]
        } else {
            vec!["* LaunchAgentはインストールされていません".to_string()]
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    /// Maps a wire state name to its label.
    fn state_label(state: &str) -> &str {
        match state {
            "running" => "計測中",
            "paused" => "一時停止中",
            "stopped" => "停止中",
            _ => state,
        }
    }

    fn show_elapsed(response: &IpcResponse) {
        if let Some(elapsed) = response.data.as_ref().and_then(|data| data.elapsed_ms) {
            println!("  経過時間: {}", format_time(elapsed));
        }
    }

    fn draw(text: &str) {
        let mut stdout = io::stdout().lock();
        // A closed stdout only loses a frame; the next one retries.
        let _ = stdout
            .write_all(text.as_bytes())
            .and_then(|()| stdout.flush());
    }
}

// ============================================================================
// Tests
// ============================================================================
