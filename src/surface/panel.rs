//! Main panel: the full stopwatch view with start/pause/stop controls.
//!
//! The panel never owns tracker state. It renders the last update it received
//! and turns key presses into tracker requests.

use crate::types::{format_time, IpcRequest, TimeUpdate};

// ============================================================================
// PanelInput
// ============================================================================

/// Keys understood by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelInput {
    /// Start button
    Start,
    /// Pause/resume toggle button
    PauseToggle,
    /// Stop button
    Stop,
    /// Hide the panel and show the floating overlay
    Minimize,
    /// Leave the panel
    Quit,
}

impl PanelInput {
    /// Parses one line of keyboard input.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "s" | "start" => Some(PanelInput::Start),
            "p" | "pause" | "resume" => Some(PanelInput::PauseToggle),
            "x" | "stop" => Some(PanelInput::Stop),
            "m" | "minimize" => Some(PanelInput::Minimize),
            "q" | "quit" | "exit" => Some(PanelInput::Quit),
            _ => None,
        }
    }
}

/// Label currently shown on the pause toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseLabel {
    /// Pressing pauses
    Pause,
    /// Pressing resumes
    Resume,
}

impl PauseLabel {
    fn as_str(&self) -> &'static str {
        match self {
            PauseLabel::Pause => "一時停止",
            PauseLabel::Resume => "再開",
        }
    }
}

// ============================================================================
// PanelState
// ============================================================================

/// View model of the main panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelState {
    time_text: String,
    running: bool,
    pause_label: PauseLabel,
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelState {
    /// Creates a panel showing zero with only start enabled.
    pub fn new() -> Self {
        Self {
            time_text: format_time(0),
            running: false,
            pause_label: PauseLabel::Pause,
        }
    }

    /// Applies an update from the tracker.
    ///
    /// Updates without a run state only refresh the time text.
    pub fn apply(&mut self, update: &TimeUpdate) {
        self.time_text = format_time(update.time);
        if let Some(running) = update.is_running {
            self.running = running;
            if running {
                self.pause_label = PauseLabel::Pause;
            }
        }
    }

    /// Handles a button press, returning the request to send.
    ///
    /// Presses on disabled buttons, `Minimize` and `Quit` return `None`;
    /// the caller handles leaving the panel.
    pub fn press(&mut self, input: PanelInput) -> Option<IpcRequest> {
        match input {
            PanelInput::Start if self.start_enabled() => {
                self.running = true;
                Some(IpcRequest::Start)
            }
            PanelInput::PauseToggle if self.pause_enabled() => match self.pause_label {
                PauseLabel::Pause => {
                    self.pause_label = PauseLabel::Resume;
                    Some(IpcRequest::Pause)
                }
                PauseLabel::Resume => {
                    self.pause_label = PauseLabel::Pause;
                    Some(IpcRequest::Resume)
                }
            },
            PanelInput::Stop if self.stop_enabled() => {
                self.running = false;
                self.pause_label = PauseLabel::Pause;
                Some(IpcRequest::Stop)
            }
            _ => None,
        }
    }

    /// Displayed time.
    pub fn time_text(&self) -> &str {
        &self.time_text
    }

    /// Current pause toggle label.
    pub fn pause_label(&self) -> PauseLabel {
        self.pause_label
    }

    /// Whether the start button is enabled.
    pub fn start_enabled(&self) -> bool {
        !self.running
    }

    /// Whether the pause toggle is enabled.
    pub fn pause_enabled(&self) -> bool {
        self.running
    }

    /// Whether the stop button is enabled.
    pub fn stop_enabled(&self) -> bool {
        self.running
    }

    /// Renders the panel as one terminal line.
    pub fn render(&self) -> String {
        format!(
            "{}  {} {} {} {}",
            self.time_text,
            button("s", "開始", self.start_enabled()),
            button("p", self.pause_label.as_str(), self.pause_enabled()),
            button("x", "停止", self.stop_enabled()),
            button("m", "最小化", true),
        )
    }
}

fn button(key: &str, label: &str, enabled: bool) -> String {
    if enabled {
        format!("[{}:{}]", key, label)
    } else {
        format!(" {}:{} ", key, "-".repeat(label.chars().count()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod input_tests {
        use super::*;

        #[test]
        fn test_parse_keys() {
            assert_eq!(PanelInput::parse("s"), Some(PanelInput::Start));
            assert_eq!(PanelInput::parse(" P \n"), Some(PanelInput::PauseToggle));
            assert_eq!(PanelInput::parse("stop"), Some(PanelInput::Stop));
            assert_eq!(PanelInput::parse("q"), Some(PanelInput::Quit));
            assert_eq!(PanelInput::parse("m"), Some(PanelInput::Minimize));
            assert_eq!(PanelInput::parse("Minimize"), Some(PanelInput::Minimize));
            assert_eq!(PanelInput::parse("lap"), None);
            assert_eq!(PanelInput::parse(""), None);
        }
    }

    mod panel_state_tests {
        use super::*;

        #[test]
        fn test_initial_state() {
            let panel = PanelState::new();
            assert_eq!(panel.time_text(), "00:00:00");
            assert!(panel.start_enabled());
            assert!(!panel.pause_enabled());
            assert!(!panel.stop_enabled());
        }

        #[test]
        fn test_tick_only_updates_text() {
            let mut panel = PanelState::new();
            panel.apply(&TimeUpdate::tick(61_000));

            assert_eq!(panel.time_text(), "00:01:01");
            assert!(panel.start_enabled());
        }

        #[test]
        fn test_running_update_enables_controls() {
            let mut panel = PanelState::new();
            panel.apply(&TimeUpdate::with_state(5_000, true));

            assert!(!panel.start_enabled());
            assert!(panel.pause_enabled());
            assert!(panel.stop_enabled());
            assert_eq!(panel.pause_label(), PauseLabel::Pause);
        }

        #[test]
        fn test_stop_update_resets() {
            let mut panel = PanelState::new();
            panel.apply(&TimeUpdate::with_state(5_000, true));
            panel.apply(&TimeUpdate::with_state(0, false));

            assert_eq!(panel.time_text(), "00:00:00");
            assert!(panel.start_enabled());
        }

        #[test]
        fn test_pause_toggle_cycles() {
            let mut panel = PanelState::new();
            panel.apply(&TimeUpdate::with_state(0, true));

            assert_eq!(panel.press(PanelInput::PauseToggle), Some(IpcRequest::Pause));
            assert_eq!(panel.pause_label(), PauseLabel::Resume);
            assert_eq!(panel.press(PanelInput::PauseToggle), Some(IpcRequest::Resume));
            assert_eq!(panel.pause_label(), PauseLabel::Pause);
        }

        #[test]
        fn test_running_update_resets_pause_label() {
            let mut panel = PanelState::new();
            panel.apply(&TimeUpdate::with_state(0, true));
            panel.press(PanelInput::PauseToggle);

            panel.apply(&TimeUpdate::with_state(1_000, true));
            assert_eq!(panel.pause_label(), PauseLabel::Pause);
        }

        #[test]
        fn test_disabled_buttons_do_nothing() {
            let mut panel = PanelState::new();
            assert_eq!(panel.press(PanelInput::PauseToggle), None);
            assert_eq!(panel.press(PanelInput::Stop), None);
            assert_eq!(panel.press(PanelInput::Quit), None);
        }

        #[test]
        fn test_minimize_sends_nothing() {
            let mut panel = PanelState::new();
            panel.apply(&TimeUpdate::with_state(2_000, true));

            assert_eq!(panel.press(PanelInput::Minimize), None);
            assert!(panel.pause_enabled());
            assert_eq!(panel.pause_label(), PauseLabel::Pause);
        }

        #[test]
        fn test_start_then_stop_presses() {
            let mut panel = PanelState::new();
            assert_eq!(panel.press(PanelInput::Start), Some(IpcRequest::Start));
            assert_eq!(panel.press(PanelInput::Start), None);
            assert_eq!(panel.press(PanelInput::Stop), Some(IpcRequest::Stop));
            assert!(panel.start_enabled());
        }

        #[test]
        fn test_render() {
            let mut panel = PanelState::new();
            assert_eq!(panel.render(), "00:00:00  [s:開始]  p:----   x:--  [m:最小化]");

            panel.apply(&TimeUpdate::with_state(3_000, true));
            assert_eq!(panel.render(), "00:00:03   s:--  [p:一時停止] [x:停止] [m:最小化]");
        }
    }
}
