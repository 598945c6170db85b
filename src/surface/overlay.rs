//! Floating overlay: a compact time readout pinned to a terminal cell.
//!
//! The position is shared with every other process through the preference
//! store, so the overlay reopens where it was last moved to.

use crate::prefs::{self, PrefKey, PreferenceStore, Preferences};
use crate::types::{format_time, TimeUpdate};

/// Floating overlay view model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingOverlay {
    x: i64,
    y: i64,
    time_text: String,
}

impl FloatingOverlay {
    /// Creates an overlay at the saved position.
    pub fn from_preferences(prefs: &Preferences) -> Self {
        let (x, y) = prefs.window_position();
        Self {
            x,
            y,
            time_text: format_time(0),
        }
    }

    /// Current position as `(x, y)`.
    pub fn position(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    /// Displayed time.
    pub fn time_text(&self) -> &str {
        &self.time_text
    }

    /// Moves the overlay and persists the new position.
    ///
    /// # Errors
    ///
    /// Returns an error if the position cannot be saved. The in-memory
    /// position is updated either way.
    pub fn move_to(&mut self, store: &PreferenceStore, x: i64, y: i64) -> prefs::Result<()> {
        self.x = x;
        self.y = y;
        store.set_int(PrefKey::WindowX, x)?;
        store.set_int(PrefKey::WindowY, y)?;
        tracing::debug!(x, y, "Overlay moved");
        Ok(())
    }

    /// Applies an update from the tracker. Only the time is shown.
    pub fn apply(&mut self, update: &TimeUpdate) {
        self.time_text = format_time(update.time);
    }

    /// Renders the overlay as an ANSI sequence that draws the time at its
    /// cell and restores the cursor afterwards.
    ///
    /// Negative coordinates are clamped to the top-left cell; terminals clamp
    /// coordinates past their edge.
    pub fn render(&self) -> String {
        let row = self.y.max(0) + 1;
        let col = self.x.max(0) + 1;
        format!("\x1b7\x1b[{};{}H{}\x1b8", row, col, self.time_text)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_store() -> (tempfile::TempDir, PreferenceStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_default_position() {
        let (_dir, store) = create_store();
        let overlay = FloatingOverlay::from_preferences(&store.load());
        assert_eq!(overlay.position(), (0, 100));
        assert_eq!(overlay.time_text(), "00:00:00");
    }

    #[test]
    fn test_move_persists_position() {
        let (_dir, store) = create_store();
        let mut overlay = FloatingOverlay::from_preferences(&store.load());

        overlay.move_to(&store, 40, 2).unwrap();
        assert_eq!(overlay.position(), (40, 2));

        let reopened = FloatingOverlay::from_preferences(&store.load());
        assert_eq!(reopened.position(), (40, 2));
    }

    #[test]
    fn test_apply_ignores_run_state() {
        let (_dir, store) = create_store();
        let mut overlay = FloatingOverlay::from_preferences(&store.load());

        overlay.apply(&TimeUpdate::with_state(3_723_000, false));
        assert_eq!(overlay.time_text(), "01:02:03");
    }

    #[test]
    fn test_render_positions_cursor() {
        let (_dir, store) = create_store();
        let mut overlay = FloatingOverlay::from_preferences(&store.load());
        overlay.move_to(&store, 9, 4).unwrap();

        assert_eq!(overlay.render(), "\x1b7\x1b[5;10H00:00:00\x1b8");
    }

    #[test]
    fn test_render_clamps_negative_coordinates() {
        let (_dir, store) = create_store();
        let mut overlay = FloatingOverlay::from_preferences(&store.load());
        overlay.move_to(&store, -20, -3).unwrap();

        assert_eq!(overlay.render(), "\x1b7\x1b[1;1H00:00:00\x1b8");
    }
}
